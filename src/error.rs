use thiserror::Error;

#[derive(Error, Debug)]
pub enum LeaseError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Lease source error: {0}")]
    SourceError(String),

    #[error("Invalid lease event: {0}")]
    InvalidEvent(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No lease source configured")]
    NoSourceConfigured,
}

pub type Result<T> = std::result::Result<T, LeaseError>;
