use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt notes blob: {reason}")]
    CorruptNotes { reason: String },
}

pub type Result<T> = std::result::Result<T, QueueError>;
