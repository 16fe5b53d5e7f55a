use thiserror::Error;

/// Validation and contract errors exposed by `pricelog-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("supplier id cannot be empty")]
    EmptySupplierId,
    #[error("supplier id length {len} exceeds max {max}")]
    SupplierIdTooLong { len: usize, max: usize },
    #[error("supplier id contains invalid character '{ch}' at index {index}")]
    SupplierIdInvalidChar { ch: char, index: usize },
    #[error("supplier '{id}' is configured more than once")]
    DuplicateSupplier { id: String },

    #[error("supplier '{supplier}' has an empty feed url")]
    EmptyFeedUrl { supplier: String },
    #[error("supplier '{supplier}' feed url needs a token; set it in config or {env_var}")]
    MissingToken { supplier: String, env_var: String },

    #[error("date must be YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },

    #[error("request_id must be at least 8 characters")]
    InvalidRequestId,
    #[error("schema_version must match vMAJOR.MINOR.PATCH: '{value}'")]
    InvalidSchemaVersion { value: String },
    #[error("error code cannot be empty")]
    EmptyErrorCode,
    #[error("error message cannot be empty")]
    EmptyErrorMessage,
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("config error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] pricelog_store::StoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
