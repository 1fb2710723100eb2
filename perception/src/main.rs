/*
perception - dashboard shell server
This binary starts the Rocket HTTP server that gates the dashboard behind Firebase sign-in.
*/

use anyhow::{Context, Result};
use clap::Parser;
use common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use perception::identity::firebase::FirebaseIdentity;
use perception::server::{launch_rocket, AppState};

#[derive(Parser, Debug)]
#[command(name = "perception", about = "Perception dashboard shell server")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let default_path = PathBuf::from("config.default.toml");
    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        std::env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .ok()
            .or_else(|| Some(PathBuf::from("config.toml")))
            .filter(|p| p.exists())
    };

    let config = match Config::load_with_defaults(
        if default_path.exists() { Some(default_path.as_path()) } else { None },
        override_path.as_deref(),
    )
    .await
    {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(%e, "failed to load configuration");
            return Err(e);
        }
    };
    info!(default = ?default_path, override = ?override_path, "configuration loaded");

    let api_key = config
        .firebase
        .api_key()
        .context("Firebase web API key is required for sign-in")?;
    let identity = FirebaseIdentity::new(
        config.firebase.auth_url()?,
        config.firebase.token_url()?,
        api_key,
    )
        .with_timeout(config.firebase.timeout_seconds.unwrap_or(10));
    info!(project = %config.firebase.project_id(), "identity provider: firebase");

    match config.gate_timeout_seconds() {
        Some(secs) => info!(timeout_seconds = secs, "session gate wait is bounded"),
        None => info!("session gate waits indefinitely for the provider"),
    }

    let state = AppState::new(Arc::new(identity), Some(Arc::new(config)));
    if let Err(e) = launch_rocket(state).await {
        error!(%e, "Rocket server failed");
        return Err(e);
    }

    info!("Shutdown complete");
    Ok(())
}
