//! Outbound delivery: wire payloads and the webhook channel that
//! carries them to the downstream posting automation.

pub mod error;
pub mod payload;
pub mod webhook;

pub use error::{ChannelError, Result};
pub use payload::{Ack, WirePayload};
pub use webhook::{Channel, WebhookChannel};
