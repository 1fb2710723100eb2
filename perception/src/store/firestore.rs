use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{DocumentStore, FieldValue, Fields};

/// Firestore document store using the REST API
pub struct FirestoreStore {
    base_url: Url,
    project_id: String,
    access_token: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl FirestoreStore {
    pub fn new(base_url: Url, project_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            base_url,
            project_id: project_id.into(),
            access_token: access_token.into(),
            timeout: Duration::from_secs(30),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout = Duration::from_secs(timeout_secs);
        self
    }

    fn document_url(&self, collection: &str, id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Firestore base URL cannot carry a path"))?
            .pop_if_empty()
            .extend([
                "v1",
                "projects",
                self.project_id.as_str(),
                "databases",
                "(default)",
                "documents",
                collection,
                id,
            ]);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl DocumentStore for FirestoreStore {
    async fn set_document(&self, collection: &str, id: &str, fields: &Fields) -> Result<()> {
        let url = self.document_url(collection, id)?;
        let body = json!({ "fields": encode_fields(fields) });
        debug!("firestore: PATCH {}/{}", collection, id);

        // PATCH without an update mask replaces the whole document
        let response = tokio::time::timeout(
            self.timeout,
            self.client
                .patch(url)
                .bearer_auth(&self.access_token)
                .json(&body)
                .send(),
        )
        .await
        .context("Firestore request timed out")?
        .context("Firestore HTTP request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Firestore API error {}: {}", status, body);
        }
        Ok(())
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Fields>> {
        let url = self.document_url(collection, id)?;
        let response = tokio::time::timeout(
            self.timeout,
            self.client.get(url).bearer_auth(&self.access_token).send(),
        )
        .await
        .context("Firestore request timed out")?
        .context("Firestore HTTP request failed")?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Firestore API error {}: {}", status, body);
        }

        let doc: Value = response
            .json()
            .await
            .context("Failed to parse Firestore document")?;
        let fields = match doc.get("fields") {
            Some(Value::Object(map)) => decode_fields(map)?,
            // A document with no fields comes back without the key
            _ => Fields::new(),
        };
        Ok(Some(fields))
    }
}

/// Encode fields into Firestore's typed JSON representation
pub fn encode_fields(fields: &Fields) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), encode_value(v)))
            .collect(),
    )
}

fn encode_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => json!({ "nullValue": null }),
        FieldValue::Boolean(b) => json!({ "booleanValue": b }),
        // int64 travels as a decimal string
        FieldValue::Integer(i) => json!({ "integerValue": i.to_string() }),
        FieldValue::Double(d) => json!({ "doubleValue": d }),
        FieldValue::String(s) => json!({ "stringValue": s }),
        FieldValue::Timestamp(t) => {
            json!({ "timestampValue": t.to_rfc3339_opts(SecondsFormat::AutoSi, true) })
        }
        FieldValue::Array(items) => {
            json!({ "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() } })
        }
        FieldValue::Map(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

/// Decode Firestore's typed JSON representation back into fields
pub fn decode_fields(map: &Map<String, Value>) -> Result<Fields> {
    map.iter()
        .map(|(k, v)| -> Result<(String, FieldValue)> {
            let value = decode_value(v).with_context(|| format!("field '{}'", k))?;
            Ok((k.clone(), value))
        })
        .collect()
}

fn decode_value(value: &Value) -> Result<FieldValue> {
    let obj = value
        .as_object()
        .context("Firestore value is not an object")?;
    let (kind, inner) = obj
        .iter()
        .next()
        .context("Firestore value has no type key")?;

    let decoded = match kind.as_str() {
        "nullValue" => FieldValue::Null,
        "booleanValue" => FieldValue::Boolean(inner.as_bool().context("bad booleanValue")?),
        "integerValue" => {
            let raw = inner.as_str().map(str::to_string).unwrap_or_else(|| inner.to_string());
            FieldValue::Integer(raw.parse().context("bad integerValue")?)
        }
        "doubleValue" => FieldValue::Double(inner.as_f64().context("bad doubleValue")?),
        "stringValue" => FieldValue::String(inner.as_str().context("bad stringValue")?.to_string()),
        "timestampValue" => {
            let raw = inner.as_str().context("bad timestampValue")?;
            FieldValue::Timestamp(
                DateTime::parse_from_rfc3339(raw)
                    .context("bad timestampValue")?
                    .with_timezone(&Utc),
            )
        }
        "arrayValue" => {
            let values = match inner.get("values") {
                Some(Value::Array(items)) => items
                    .iter()
                    .map(decode_value)
                    .collect::<Result<Vec<_>>>()?,
                _ => Vec::new(),
            };
            FieldValue::Array(values)
        }
        "mapValue" => match inner.get("fields") {
            Some(Value::Object(map)) => FieldValue::Map(decode_fields(map)?),
            _ => FieldValue::Map(Fields::new()),
        },
        other => anyhow::bail!("unsupported Firestore value type: {}", other),
    };
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn encodes_typed_values() {
        let mut top_sources = Fields::new();
        top_sources.insert("TechCrunch AI".to_string(), FieldValue::Integer(15));

        let mut fields = Fields::new();
        fields.insert("articleCount".to_string(), FieldValue::Integer(47));
        fields.insert("topSources".to_string(), FieldValue::Map(top_sources));
        fields.insert(
            "generatedAt".to_string(),
            FieldValue::Timestamp(Utc.with_ymd_and_hms(2025, 11, 14, 12, 0, 0).unwrap()),
        );
        fields.insert("lastChecked".to_string(), FieldValue::Null);

        let encoded = encode_fields(&fields);
        assert_eq!(encoded["articleCount"], json!({ "integerValue": "47" }));
        assert_eq!(
            encoded["topSources"],
            json!({ "mapValue": { "fields": { "TechCrunch AI": { "integerValue": "15" } } } })
        );
        assert_eq!(
            encoded["generatedAt"],
            json!({ "timestampValue": "2025-11-14T12:00:00Z" })
        );
        assert_eq!(encoded["lastChecked"], json!({ "nullValue": null }));

        let decoded = decode_fields(encoded.as_object().unwrap()).expect("decode");
        assert_eq!(decoded, fields);
    }

    #[test]
    fn document_url_escapes_segments() {
        let store = FirestoreStore::new(
            Url::parse("https://firestore.googleapis.com").unwrap(),
            "perception-with-intent",
            "token",
        );
        let url = store.document_url("briefs", "2025-11-14").unwrap();
        assert_eq!(
            url.as_str(),
            "https://firestore.googleapis.com/v1/projects/perception-with-intent/databases/(default)/documents/briefs/2025-11-14"
        );
    }
}
