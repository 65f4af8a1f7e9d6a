use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CapkitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

pub type Result<T> = std::result::Result<T, CapkitError>;
