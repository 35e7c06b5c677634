use thiserror::Error;

#[derive(Debug, Error)]
pub enum VectorError {
    /// A single record was rejected; never aborts its batch
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Embedding provider error: {0}")]
    EmbeddingProvider(String),

    #[error("Store write error: {0}")]
    StoreWrite(String),

    #[error("Index provisioning error: {0}")]
    IndexProvision(String),

    #[error("Index already exists: {0}")]
    IndexAlreadyExists(String),

    #[error("Index query error: {0}")]
    IndexQuery(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type VectorResult<T> = Result<T, VectorError>;

impl VectorError {
    /// Errors that end the current batch but not the run
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self,
            VectorError::EmbeddingProvider(_) | VectorError::StoreWrite(_)
        )
    }
}

impl From<reqwest::Error> for VectorError {
    fn from(err: reqwest::Error) -> Self {
        VectorError::EmbeddingProvider(err.to_string())
    }
}

impl From<serde_json::Error> for VectorError {
    fn from(err: serde_json::Error) -> Self {
        VectorError::Internal(format!("JSON error: {}", err))
    }
}

impl From<mongodb::bson::ser::Error> for VectorError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        VectorError::Internal(format!("BSON encoding error: {}", err))
    }
}

impl From<core_config::ConfigError> for VectorError {
    fn from(err: core_config::ConfigError) -> Self {
        VectorError::Config(err.to_string())
    }
}
