//! Storage error types for the document store abstraction layer.

/// Errors that can occur during storage operations.
///
/// A missing document is never an error: `find_by_id` returns `None` and
/// update/delete report it through a zero count.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The collection name cannot be used by this backend.
    #[error("Invalid collection name: {name}")]
    InvalidCollection {
        /// The rejected collection name.
        name: String,
    },

    /// The document body is invalid.
    #[error("Invalid document: {message}")]
    InvalidDocument {
        /// Description of why the document is invalid.
        message: String,
    },

    /// Failed to connect to the storage backend.
    #[error("Connection error: {message}")]
    ConnectionError {
        /// Description of the connection error.
        message: String,
    },

    /// An internal storage error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `InvalidCollection` error.
    #[must_use]
    pub fn invalid_collection(name: impl Into<String>) -> Self {
        Self::InvalidCollection { name: name.into() }
    }

    /// Creates a new `InvalidDocument` error.
    #[must_use]
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    /// Creates a new `ConnectionError` error.
    #[must_use]
    pub fn connection_error(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

}
