//! `postwave-core` — configuration and shared error type.
//!
//! Everything process-wide lives here: the [`config::PostwaveConfig`]
//! struct loaded from `postwave.toml` with `POSTWAVE_*` env overrides,
//! and the handful of constants the rest of the workspace shares.

pub mod config;
pub mod error;

pub use config::PostwaveConfig;
pub use error::{CoreError, Result};
