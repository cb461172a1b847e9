use thiserror::Error;

/// Errors from content lookup. "No content found" is not an error —
/// the resolver returns `Ok(None)` and callers decide what is fatal.
#[derive(Debug, Error)]
pub enum ContentError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, ContentError>;
