use thiserror::Error;

/// Errors from the image collaborators. All are hard failures for the
/// job that triggered the call.
#[derive(Debug, Error)]
pub enum MediaError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response. Body is truncated for the job record.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// 2xx response whose shape we cannot use.
    #[error("Unexpected compositor response: {0}")]
    UnexpectedResponse(String),

    /// The compositor returned raw bytes but no object store is configured.
    #[error("Compositor returned image bytes but no object storage is configured")]
    StorageUnavailable,
}

pub type Result<T> = std::result::Result<T, MediaError>;
