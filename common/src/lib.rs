/*!
common/src/lib.rs

Shared configuration types and helpers for Perception.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader merging a default file with an optional override file
- Endpoint and secret resolution for the Firebase project
- A helper to open the SQLite pool used by the local document store
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

/// Default Identity Toolkit endpoint (sign-in, sign-up, lookup)
pub const DEFAULT_AUTH_URL: &str = "https://identitytoolkit.googleapis.com";
/// Default Identity Toolkit admin endpoint (project configuration)
pub const DEFAULT_ADMIN_URL: &str = "https://identitytoolkit.googleapis.com";
/// Default Secure Token endpoint (id token renewal)
pub const DEFAULT_TOKEN_URL: &str = "https://securetoken.googleapis.com";
/// Default Firestore REST endpoint
pub const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com";

/// Firebase project and endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirebaseConfig {
    /// Project id (e.g. "perception-with-intent"); `GOOGLE_CLOUD_PROJECT` overrides it
    pub project_id: String,
    /// Name of the env var holding the web API key used for sign-in calls
    pub api_key_env: Option<String>,
    /// Name of the env var holding an OAuth2 access token for admin and Firestore calls
    pub access_token_env: Option<String>,
    pub auth_url: Option<String>,
    pub token_url: Option<String>,
    pub admin_url: Option<String>,
    pub firestore_url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

impl FirebaseConfig {
    /// Effective project id, honouring the `GOOGLE_CLOUD_PROJECT` override.
    pub fn project_id(&self) -> String {
        std::env::var("GOOGLE_CLOUD_PROJECT")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| self.project_id.clone())
    }

    pub fn auth_url(&self) -> Result<Url> {
        parse_endpoint(self.auth_url.as_deref().unwrap_or(DEFAULT_AUTH_URL))
    }

    pub fn token_url(&self) -> Result<Url> {
        parse_endpoint(self.token_url.as_deref().unwrap_or(DEFAULT_TOKEN_URL))
    }

    pub fn admin_url(&self) -> Result<Url> {
        parse_endpoint(self.admin_url.as_deref().unwrap_or(DEFAULT_ADMIN_URL))
    }

    pub fn firestore_url(&self) -> Result<Url> {
        parse_endpoint(self.firestore_url.as_deref().unwrap_or(DEFAULT_FIRESTORE_URL))
    }

    /// Read the web API key from the env var named by `api_key_env`.
    pub fn api_key(&self) -> Result<String> {
        let name = self.api_key_env.as_deref().unwrap_or("FIREBASE_API_KEY");
        read_secret_env(name)
    }

    /// Read the OAuth2 access token from the env var named by `access_token_env`.
    pub fn access_token(&self) -> Result<String> {
        let name = self
            .access_token_env
            .as_deref()
            .unwrap_or("GOOGLE_OAUTH_ACCESS_TOKEN");
        read_secret_env(name)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: Option<String>,
    pub port: Option<u16>,
    /// Env var holding Rocket's secret key (needed for private cookies in release builds)
    pub secret_key_env: Option<String>,
}

/// Session gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Upper bound on how long a page load waits for the first session notification.
    /// Absent means wait indefinitely.
    pub timeout_seconds: Option<u64>,
}

/// Document store backend selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: Option<String>, // "firestore" (default) or "sqlite"
    pub sqlite_path: Option<String>,
}

/// Seed data locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    pub csv_path: Option<String>,
    pub fixtures_path: Option<String>,
}

impl SeedConfig {
    pub fn csv_path(&self) -> PathBuf {
        PathBuf::from(self.csv_path.as_deref().unwrap_or("data/initial_feeds.csv"))
    }

    pub fn fixtures_path(&self) -> PathBuf {
        PathBuf::from(
            self.fixtures_path
                .as_deref()
                .unwrap_or("data/seed_fixtures.toml"),
        )
    }
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub firebase: FirebaseConfig,
    pub server: Option<ServerConfig>,
    pub gate: Option<GateConfig>,
    pub store: Option<StoreConfig>,
    pub seed: Option<SeedConfig>,
}

impl Config {
    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(
        default_path: Option<&Path>,
        override_path: Option<&Path>,
    ) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        if let Some(path) = default_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read default config: {}", path.display()))?;
                let val: toml::Value =
                    toml::from_str(&data).context("Failed to parse default configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        if let Some(path) = override_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read override config: {}", path.display()))?;
                let val: toml::Value =
                    toml::from_str(&data).context("Failed to parse override configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        let cfg: Config = config_value
            .try_into()
            .context("Failed to parse merged configuration")?;
        Ok(cfg)
    }

    /// Load the configuration used by the argument-less admin programs:
    /// `config.default.toml` overridden by `$CONFIG_PATH`, falling back to `config.toml`.
    pub async fn load_for_tools() -> Result<Self> {
        let default_path = PathBuf::from("config.default.toml");
        let override_path = std::env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));
        Self::load_with_defaults(Some(default_path.as_path()), Some(override_path.as_path())).await
    }

    pub fn gate_timeout_seconds(&self) -> Option<u64> {
        self.gate.as_ref().and_then(|g| g.timeout_seconds)
    }

    pub fn seed(&self) -> SeedConfig {
        self.seed.clone().unwrap_or(SeedConfig {
            csv_path: None,
            fixtures_path: None,
        })
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

fn parse_endpoint(raw: &str) -> Result<Url> {
    Url::parse(raw).with_context(|| format!("Invalid endpoint URL in configuration: {}", raw))
}

fn read_secret_env(name: &str) -> Result<String> {
    let value = std::env::var(name).with_context(|| format!("env var '{}' not set", name))?;
    if value.trim().is_empty() {
        anyhow::bail!("env var '{}' is empty", name);
    }
    Ok(value)
}

/// Initialize an SQLite connection pool.
///
/// Creates the parent directory if necessary and the DB file if missing, then returns a
/// `SqlitePool` with a modest connection count. `sqlite::memory:` is passed through
/// untouched so tests can use an in-memory database.
///
/// Example:
///   let pool = init_db_pool("data/perception.db").await?;
pub async fn init_db_pool(path: &str) -> Result<SqlitePool> {
    if path == "sqlite::memory:" {
        // A single connection keeps every query on the same in-memory database.
        return SqlitePoolOptions::new()
            .max_connections(1)
            .connect(path)
            .await
            .context("Failed to open in-memory sqlite database");
    }

    if let Some(parent) = Path::new(path).parent() {
        tokio::fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create DB parent directory: {}", parent.display())
        })?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to connect to sqlite database at path: {}", path))?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [firebase]
        project_id = "perception-with-intent"
        api_key_env = "PERCEPTION_TEST_API_KEY"

        [gate]
        timeout_seconds = 5
    "#;

    #[test]
    fn config_from_string() {
        let cfg: Config = toml::from_str(MINIMAL).expect("parse config");
        assert_eq!(cfg.firebase.project_id, "perception-with-intent");
        assert_eq!(cfg.gate_timeout_seconds(), Some(5));
        assert!(cfg.server.is_none());
        assert_eq!(cfg.seed().csv_path(), PathBuf::from("data/initial_feeds.csv"));
        assert_eq!(
            cfg.firebase.auth_url().expect("default url").as_str(),
            "https://identitytoolkit.googleapis.com/"
        );
        assert_eq!(
            cfg.firebase.token_url().expect("default url").as_str(),
            "https://securetoken.googleapis.com/"
        );
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        let mut cfg: Config = toml::from_str(MINIMAL).expect("parse config");
        cfg.firebase.firestore_url = Some("not a url".to_string());
        assert!(cfg.firebase.firestore_url().is_err());
    }

    #[tokio::test]
    async fn override_file_wins_over_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let default_path = dir.path().join("config.default.toml");
        let override_path = dir.path().join("config.toml");

        std::fs::write(&default_path, MINIMAL).expect("write default");
        std::fs::write(
            &override_path,
            r#"
            [firebase]
            project_id = "staging-project"

            [store]
            backend = "sqlite"
            "#,
        )
        .expect("write override");

        let cfg = Config::load_with_defaults(Some(default_path.as_path()), Some(override_path.as_path()))
            .await
            .expect("load merged");

        assert_eq!(cfg.firebase.project_id, "staging-project");
        // Keys absent from the override survive the merge
        assert_eq!(
            cfg.firebase.api_key_env.as_deref(),
            Some("PERCEPTION_TEST_API_KEY")
        );
        assert_eq!(cfg.gate_timeout_seconds(), Some(5));
        assert_eq!(
            cfg.store.and_then(|s| s.backend).as_deref(),
            Some("sqlite")
        );
    }

    #[tokio::test]
    async fn db_pool_in_temp_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("nested").join("perception.db");
        let db_path_str = db_path.to_string_lossy().to_string();

        let pool = init_db_pool(&db_path_str).await.expect("init pool");
        let conn = pool.acquire().await.expect("acquire conn");
        drop(conn);
        assert!(db_path.exists());
    }
}
