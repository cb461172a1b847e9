use thiserror::Error;

/// Errors from directive dispatch. Always fatal to the single key.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The directive name is not in the registry (and is not `manual`).
    #[error("Unknown directive {name:?}")]
    UnknownDirective { name: String },

    /// A required parameter was not supplied.
    #[error("Directive {directive:?} requires parameter {param:?}")]
    MissingParam {
        directive: &'static str,
        param: &'static str,
    },

    /// A supplied parameter could not be interpreted.
    #[error("Directive {directive:?}: parameter {param}={value:?} is invalid")]
    InvalidParam {
        directive: &'static str,
        param: &'static str,
        value: String,
    },

    /// A named collection does not exist in the current catalog snapshot.
    #[error("Collection {name:?} not found in catalog")]
    CollectionNotFound { name: String },
}

pub type Result<T> = std::result::Result<T, RegistryError>;
