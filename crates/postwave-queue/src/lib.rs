//! The schedule queue and its durable per-key job state.
//!
//! Rows are created externally when a post is scheduled; only the
//! engine mutates them, and never deletes them. Each row carries a
//! structured notes blob holding one [`JobRecord`] per key, which is
//! what makes re-running the engine idempotent.

pub mod db;
pub mod error;
pub mod state;
pub mod store;

pub use db::{init_db, SqliteQueueStore};
pub use error::{QueueError, Result};
pub use state::{JobRecord, JobStatus, RowState, NOTES_SCHEMA_VERSION};
pub use store::{QueueStore, ScheduleRow};
