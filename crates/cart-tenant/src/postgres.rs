//! PostgreSQL adapter for tenant record storage.
//!
//! Records are stored as one JSONB document per client id, mirroring the
//! document-per-tenant shape of the original key-value table. The table is
//! created on startup when missing.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;

use crate::error::StoreError;
use crate::record::TenantRecord;
use crate::store::TenantStore;

/// PostgreSQL tenant store.
#[derive(Clone)]
pub struct PostgresTenantStore {
    pool: PgPool,
    table: String,
}

impl PostgresTenantStore {
    /// Connects to the database and ensures the table exists.
    pub async fn new(url: &str, table: String) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let store = Self { pool, table };
        store.ensure_table().await?;
        Ok(store)
    }

    async fn ensure_table(&self) -> Result<(), StoreError> {
        let create_table = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                client_id TEXT PRIMARY KEY,
                doc JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            self.table
        );

        sqlx::query(&create_table)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl TenantStore for PostgresTenantStore {
    async fn get(&self, client_id: &str) -> Result<Option<TenantRecord>, StoreError> {
        let query = format!("SELECT doc FROM {} WHERE client_id = $1", self.table);

        let row = sqlx::query(&query)
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        match row {
            Some(row) => {
                let doc: serde_json::Value = row.get("doc");
                let record = serde_json::from_value(doc)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, record: &TenantRecord) -> Result<(), StoreError> {
        let doc = serde_json::to_value(record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let query = format!(
            r#"
            INSERT INTO {} (client_id, doc, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (client_id) DO UPDATE
            SET doc = EXCLUDED.doc, updated_at = NOW()
            "#,
            self.table
        );

        sqlx::query(&query)
            .bind(&record.client_id)
            .bind(doc)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        tracing::debug!(client_id = %record.client_id, table = %self.table, "tenant record stored");
        Ok(())
    }
}

impl std::fmt::Debug for PostgresTenantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresTenantStore")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}
