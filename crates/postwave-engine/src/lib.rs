//! `postwave-engine` — the schedule execution engine.
//!
//! One run scans the queue in order, gates each row on its due-time,
//! and executes the row's keys sequentially. Per-key outcomes are
//! checkpointed into the row's notes blob after every key, which makes
//! an interrupted run safe to repeat: completed keys are skipped, and
//! only pending or failed keys are reprocessed.

pub mod assemble;
pub mod engine;
pub mod error;

pub use assemble::{AssembledPost, Assembler, PostKind};
pub use engine::{parse_due, Engine, RowOutcome, RunReport};
pub use error::{EngineError, Result};
