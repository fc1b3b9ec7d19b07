//! Schema management for the PostgreSQL storage backend.
//!
//! Each document collection gets its own table holding the document body as
//! JSONB. Tables are created on first use.

use std::sync::Arc;

use dashmap::DashSet;
use sqlx_postgres::PgPool;
use stockpile_storage::StorageError;
use tracing::{info, instrument};

use crate::error::{PostgresError, Result};

/// Longest table name PostgreSQL accepts without truncation.
const MAX_TABLE_NAME_LEN: usize = 63;

/// Manages the per-collection tables.
///
/// # Table Structure
///
/// ```sql
/// CREATE TABLE "products" (
///     seq BIGSERIAL,          -- insertion order for listing
///     id  TEXT PRIMARY KEY,
///     doc JSONB NOT NULL
/// )
/// ```
#[derive(Debug, Clone)]
pub struct SchemaManager {
    pool: PgPool,
    /// Cache of tables that have been verified to exist.
    created_tables: Arc<DashSet<String>>,
}

impl SchemaManager {
    /// Creates a new `SchemaManager` with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            created_tables: Arc::new(DashSet::new()),
        }
    }

    /// Maps a collection name to its table name.
    ///
    /// Collection names are interpolated into SQL, so only lowercase ASCII
    /// letters, digits and underscores are accepted, starting with a letter.
    pub fn table_name(collection: &str) -> std::result::Result<String, StorageError> {
        let mut chars = collection.chars();
        let valid = matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
            && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            && collection.len() <= MAX_TABLE_NAME_LEN;
        if valid {
            Ok(collection.to_string())
        } else {
            Err(StorageError::invalid_collection(collection))
        }
    }

    /// Ensures the table for `collection` exists and returns its name.
    ///
    /// Idempotent; after the first success the check is served from memory.
    #[instrument(skip(self), fields(collection = %collection))]
    pub async fn ensure_table(&self, collection: &str) -> std::result::Result<String, StorageError> {
        let table = Self::table_name(collection)?;
        if self.created_tables.contains(&table) {
            return Ok(table);
        }

        self.create_table(&table).await?;
        self.created_tables.insert(table.clone());
        Ok(table)
    }

    async fn create_table(&self, table: &str) -> Result<()> {
        let sql = format!(
            r#"CREATE TABLE IF NOT EXISTS "{table}" (
                seq BIGSERIAL,
                id TEXT PRIMARY KEY,
                doc JSONB NOT NULL
            )"#
        );
        sqlx_core::query::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx_core::error::Error::Database(db) => {
                    PostgresError::Schema(format!("create table {table}: {db}"))
                }
                other => PostgresError::Connection(other),
            })?;

        info!(table = %table, "Collection table ensured");
        Ok(())
    }
}
