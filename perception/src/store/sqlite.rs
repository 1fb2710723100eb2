use anyhow::{Context, Result};
use sqlx::SqlitePool;

use super::{DocumentStore, Fields};

/// Local document store: one row per (collection, id), body kept as JSON
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the documents table if missing. Idempotent.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                fields_json TEXT NOT NULL,
                updated_at TIMESTAMP DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
                PRIMARY KEY (collection, id)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure documents schema")?;
        Ok(())
    }

    /// Number of documents in a collection
    pub async fn count(&self, collection: &str) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM documents WHERE collection = ?")
            .bind(collection)
            .fetch_one(&self.pool)
            .await
            .context("failed to count documents")
    }

    /// Raw stored body, as written
    pub async fn raw_document(&self, collection: &str, id: &str) -> Result<Option<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT fields_json FROM documents WHERE collection = ? AND id = ?",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch document")
    }
}

#[async_trait::async_trait]
impl DocumentStore for SqliteStore {
    async fn set_document(&self, collection: &str, id: &str, fields: &Fields) -> Result<()> {
        let fields_json = serde_json::to_string(fields).context("failed to serialize document")?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO documents (collection, id, fields_json)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(&fields_json)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to upsert {}/{}", collection, id))?;
        Ok(())
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Fields>> {
        match self.raw_document(collection, id).await? {
            Some(raw) => {
                let fields = serde_json::from_str(&raw).context("failed to parse stored document")?;
                Ok(Some(fields))
            }
            None => Ok(None),
        }
    }
}
