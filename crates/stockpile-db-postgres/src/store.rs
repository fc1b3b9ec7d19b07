//! `DocumentStore` implementation over PostgreSQL.

use async_trait::async_trait;
use serde_json::Value;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::PgPool;
use stockpile_storage::{DocumentStore, StorageError, StoredDocument, ensure_object};
use tracing::instrument;

use crate::config::PostgresConfig;
use crate::error::{Result, map_sqlx_error};
use crate::pool::{create_pool, test_connection};
use crate::schema::SchemaManager;

/// PostgreSQL document store.
///
/// Documents are stored as JSONB rows, one table per collection. Updates use
/// JSONB concatenation, which replaces the top-level fields present in the
/// payload and keeps the rest.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    schema: SchemaManager,
}

impl PostgresStore {
    /// Connects using `config` and verifies the connection.
    pub async fn new(config: PostgresConfig) -> Result<Self> {
        let pool = create_pool(&config).await?;
        test_connection(&pool).await?;
        Ok(Self::from_pool(pool))
    }

    /// Wraps an existing pool.
    #[must_use]
    fn from_pool(pool: PgPool) -> Self {
        let schema = SchemaManager::new(pool.clone());
        Self { pool, schema }
    }
}

#[async_trait]
impl DocumentStore for PostgresStore {
    #[instrument(skip(self))]
    async fn find_all(&self, collection: &str) -> std::result::Result<Vec<StoredDocument>, StorageError> {
        let table = self.schema.ensure_table(collection).await?;
        let sql = format!(r#"SELECT id, doc FROM "{table}" ORDER BY seq"#);
        let rows: Vec<(String, Value)> = query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows
            .into_iter()
            .map(|(id, doc)| StoredDocument::new(id, doc))
            .collect())
    }

    #[instrument(skip(self))]
    async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> std::result::Result<Option<StoredDocument>, StorageError> {
        let table = self.schema.ensure_table(collection).await?;
        let sql = format!(r#"SELECT id, doc FROM "{table}" WHERE id = $1"#);
        let row: Option<(String, Value)> = query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(|(id, doc)| StoredDocument::new(id, doc)))
    }

    #[instrument(skip(self, fields))]
    async fn insert(&self, collection: &str, fields: &Value) -> std::result::Result<String, StorageError> {
        ensure_object(fields)?;
        let table = self.schema.ensure_table(collection).await?;
        let id = stockpile_core::generate_id();
        let sql = format!(r#"INSERT INTO "{table}" (id, doc) VALUES ($1, $2)"#);
        query(&sql)
            .bind(&id)
            .bind(fields)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(id)
    }

    #[instrument(skip(self, fields))]
    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        fields: &Value,
    ) -> std::result::Result<u64, StorageError> {
        ensure_object(fields)?;
        let table = self.schema.ensure_table(collection).await?;
        let sql = format!(r#"UPDATE "{table}" SET doc = doc || $2 WHERE id = $1"#);
        let result = query(&sql)
            .bind(id)
            .bind(fields)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn delete_by_id(&self, collection: &str, id: &str) -> std::result::Result<u64, StorageError> {
        let table = self.schema.ensure_table(collection).await?;
        let sql = format!(r#"DELETE FROM "{table}" WHERE id = $1"#);
        let result = query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn count(&self, collection: &str) -> std::result::Result<u64, StorageError> {
        let table = self.schema.ensure_table(collection).await?;
        let sql = format!(r#"SELECT COUNT(*) FROM "{table}""#);
        let n: i64 = query_scalar(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(n.max(0) as u64)
    }

    async fn ping(&self) -> std::result::Result<(), StorageError> {
        test_connection(&self.pool).await.map_err(StorageError::from)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
