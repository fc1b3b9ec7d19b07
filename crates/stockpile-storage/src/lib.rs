//! # stockpile-storage
//!
//! Document store abstraction layer for Stockpile.
//!
//! This crate defines the contract every data store backend implements. It
//! contains no implementations; see `stockpile-db-memory` and
//! `stockpile-db-postgres`.
//!
//! ## Example
//!
//! ```ignore
//! use stockpile_storage::{DocumentStore, StorageError};
//!
//! async fn restock(store: &dyn DocumentStore, id: &str) -> Result<bool, StorageError> {
//!     let matched = store
//!         .update_by_id("products", id, &serde_json::json!({"stock": 100}))
//!         .await?;
//!     Ok(matched == 1)
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::StorageError;
pub use traits::{DocumentStore, ensure_object};
pub use types::StoredDocument;

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared document store.
pub type DynDocumentStore = std::sync::Arc<dyn DocumentStore>;
