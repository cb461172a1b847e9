use thiserror::Error;

/// Errors from key parsing. Always fatal to the single key, never to the row.
#[derive(Debug, Error)]
pub enum KeyError {
    /// No directive name could be extracted from the key text.
    #[error("Key {key:?} could not be parsed: missing directive name")]
    MissingName { key: String },

    /// The parameter list is structurally broken (e.g. unclosed quote).
    #[error("Key {key:?} has a malformed parameter list: {reason}")]
    MalformedParams { key: String, reason: String },
}

pub type Result<T> = std::result::Result<T, KeyError>;
