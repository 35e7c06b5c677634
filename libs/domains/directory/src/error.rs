use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The refresh-token exchange was rejected or could not be performed
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Directory request failed: {0}")]
    Request(String),

    #[error("Unexpected directory response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

impl From<reqwest::Error> for DirectoryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DirectoryError::InvalidResponse(err.to_string())
        } else {
            DirectoryError::Request(err.to_string())
        }
    }
}

impl From<core_config::ConfigError> for DirectoryError {
    fn from(err: core_config::ConfigError) -> Self {
        DirectoryError::Config(err.to_string())
    }
}
