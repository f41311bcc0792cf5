use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("document store error: {0}")]
    Remote(String),
    #[error("document does not exist")]
    DocumentMissing,
    #[error("background task failed: {0}")]
    Task(String),
}
