use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Key(#[from] postwave_keys::KeyError),

    #[error(transparent)]
    Registry(#[from] postwave_registry::RegistryError),

    #[error(transparent)]
    Content(#[from] postwave_content::ContentError),

    #[error(transparent)]
    Media(#[from] postwave_media::MediaError),

    #[error(transparent)]
    Channel(#[from] postwave_channels::ChannelError),

    #[error(transparent)]
    Queue(#[from] postwave_queue::QueueError),

    #[error(transparent)]
    Catalog(#[from] postwave_catalog::CatalogError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Directive {directive:?} resolved no products")]
    NoProducts { directive: String },

    #[error("No content found for ({key_type}, {key})")]
    MissingContent { key_type: String, key: String },

    #[error("No order code found in title {title:?}")]
    MissingSku { title: String },

    #[error("Product {title:?} has no usable image")]
    NoImage { title: String },

    #[error("Manual key {key:?} has no cover override")]
    NoManualCover { key: String },

    #[error("None of the {count} resolved products had a usable cover")]
    NoCovers { count: usize },

    #[error("Unparseable due-time {raw:?}")]
    BadDueTime { raw: String },
}

pub type Result<T> = std::result::Result<T, EngineError>;
