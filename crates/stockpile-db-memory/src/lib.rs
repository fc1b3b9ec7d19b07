//! In-memory document store backend for Stockpile.
//!
//! This crate provides an in-memory implementation of the `DocumentStore`
//! trait from `stockpile-storage`, using a `DashMap` for concurrent access.
//!
//! # Example
//!
//! ```ignore
//! use stockpile_db_memory::InMemoryStore;
//! use stockpile_storage::DocumentStore;
//!
//! let store = InMemoryStore::new();
//! let id = store
//!     .insert("products", &serde_json::json!({"name": "Pen", "price": 1.5, "stock": 100}))
//!     .await?;
//! ```

mod store;

pub use stockpile_storage::{DocumentStore, StorageError, StoredDocument};
pub use store::{InMemoryStore, StorageKey};

/// Creates a new shared in-memory store.
pub fn create_memory_store() -> stockpile_storage::DynDocumentStore {
    std::sync::Arc::new(InMemoryStore::new())
}
