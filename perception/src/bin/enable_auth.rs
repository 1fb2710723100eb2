//! Enable email/password sign-in on the Firebase project.
//!
//! Exits 0 on success; on failure prints the error and exits 1.

use anyhow::{Context, Result};
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

use common::Config;
use perception::admin::AdminClient;

async fn run() -> Result<()> {
    let config = Config::load_for_tools().await?;
    let project_id = config.firebase.project_id();
    let token = config
        .firebase
        .access_token()
        .context("an OAuth2 access token is required for the admin API")?;

    let client = AdminClient::new(config.firebase.admin_url()?, token)
        .with_timeout(config.firebase.timeout_seconds.unwrap_or(30));
    client.enable_email_sign_in(&project_id).await
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match run().await {
        Ok(()) => {
            println!("Email/Password authentication enabled successfully!");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}
