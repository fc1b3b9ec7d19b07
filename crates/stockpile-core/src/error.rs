use thiserror::Error;

use crate::id::IdError;

/// Core error types for Stockpile resources
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid ID: {0}")]
    InvalidId(#[from] IdError),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid document in '{collection}': {message}")]
    InvalidDocument { collection: String, message: String },
}

impl CoreError {
    pub fn invalid_document(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            collection: collection.into(),
            message: message.into(),
        }
    }
}

/// A rejected write payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
