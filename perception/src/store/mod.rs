use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use common::Config;

/// A typed document field value (the document store's value model)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    Array(Vec<FieldValue>),
    Map(Fields),
}

/// Document body. Ordered so serialized documents are byte-stable.
pub type Fields = BTreeMap<String, FieldValue>;

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

impl From<&String> for FieldValue {
    fn from(v: &String) -> Self {
        FieldValue::String(v.clone())
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Boolean(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Integer(i64::from(v))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Double(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

impl<T: Into<FieldValue> + Clone> From<&[T]> for FieldValue {
    fn from(v: &[T]) -> Self {
        FieldValue::Array(v.iter().cloned().map(Into::into).collect())
    }
}

impl From<Fields> for FieldValue {
    fn from(v: Fields) -> Self {
        FieldValue::Map(v)
    }
}

/// Builder for a document body
#[derive(Debug, Default)]
pub struct FieldsBuilder(Fields);

impl FieldsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    pub fn build(self) -> Fields {
        self.0
    }
}

/// A record with a fixed home in the document store
pub trait Document {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    fn to_fields(&self) -> Fields;
}

/// Core trait for document stores (hosted Firestore or the local SQLite backend)
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Write a whole document at collection/id, replacing whatever was there
    async fn set_document(&self, collection: &str, id: &str, fields: &Fields) -> Result<()>;

    /// Read a document, `None` if absent
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Fields>>;
}

/// Write a typed record under its collection and id
pub async fn put<D: Document + Sync>(store: &dyn DocumentStore, doc: &D) -> Result<()> {
    store
        .set_document(D::COLLECTION, doc.id(), &doc.to_fields())
        .await
        .with_context(|| format!("failed to write {}/{}", D::COLLECTION, doc.id()))
}

pub mod firestore;
pub mod sqlite;

/// Open the document store selected by `[store] backend` ("firestore" unless told otherwise)
pub async fn open_store(config: &Config) -> Result<Box<dyn DocumentStore>> {
    let backend = config
        .store
        .as_ref()
        .and_then(|s| s.backend.as_deref())
        .unwrap_or("firestore");

    match backend {
        "firestore" => {
            let project_id = config.firebase.project_id();
            let token = config
                .firebase
                .access_token()
                .context("Firestore backend needs an OAuth2 access token")?;
            let store = firestore::FirestoreStore::new(
                config.firebase.firestore_url()?,
                project_id.clone(),
                token,
            )
            .with_timeout(config.firebase.timeout_seconds.unwrap_or(30));
            info!(project = %project_id, "document store: firestore");
            Ok(Box::new(store))
        }
        "sqlite" => {
            let path = config
                .store
                .as_ref()
                .and_then(|s| s.sqlite_path.clone())
                .unwrap_or_else(|| "data/perception.db".to_string());
            let pool = common::init_db_pool(&path).await?;
            let store = sqlite::SqliteStore::new(pool);
            store.ensure_schema().await?;
            info!(path = %path, "document store: sqlite");
            Ok(Box::new(store))
        }
        other => anyhow::bail!("Unknown document store backend: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn builder_converts_common_types() {
        let at = Utc.with_ymd_and_hms(2025, 11, 14, 12, 0, 0).unwrap();
        let tags = vec!["AI".to_string(), "EU".to_string()];
        let fields = FieldsBuilder::new()
            .field("title", "EU AI Act")
            .field("score", 9u32)
            .field("publishedAt", at)
            .field("tags", tags.as_slice())
            .field("lastError", None::<String>)
            .build();

        assert_eq!(fields["title"], FieldValue::String("EU AI Act".to_string()));
        assert_eq!(fields["score"], FieldValue::Integer(9));
        assert_eq!(fields["publishedAt"], FieldValue::Timestamp(at));
        assert_eq!(fields["lastError"], FieldValue::Null);
        assert_eq!(
            fields["tags"],
            FieldValue::Array(vec![
                FieldValue::String("AI".to_string()),
                FieldValue::String("EU".to_string())
            ])
        );
    }
}
