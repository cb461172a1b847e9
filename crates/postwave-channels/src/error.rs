use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Webhook rejected payload: {response}")]
    Rejected { response: String },

    #[error("Unreadable webhook response: {0}")]
    UnexpectedResponse(String),
}

pub type Result<T> = std::result::Result<T, ChannelError>;
