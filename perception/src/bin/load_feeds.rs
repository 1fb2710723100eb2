//! Add sources from a CSV to the `sources` collection, skipping ones already present.
//!
//! Usage: load_feeds [CSV_PATH]

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

use common::Config;
use perception::seed::{load_sources, read_source_rows, LoadSummary};
use perception::store::open_store;

#[derive(Parser, Debug)]
#[command(name = "load_feeds", about = "Load initial feed sources from CSV")]
struct Args {
    /// Sources CSV (defaults to `[seed] csv_path`)
    csv: Option<PathBuf>,
}

async fn run(args: Args) -> Result<LoadSummary> {
    let config = Config::load_for_tools().await?;
    let csv_path = args.csv.unwrap_or_else(|| config.seed().csv_path());

    if !csv_path.exists() {
        anyhow::bail!("CSV file not found: {}", csv_path.display());
    }
    println!("Loading feeds from: {}\n", csv_path.display());

    let rows = read_source_rows(&csv_path)
        .with_context(|| format!("failed to load {}", csv_path.display()))?;
    let store = open_store(&config).await?;
    load_sources(store.as_ref(), &rows, Utc::now()).await
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match run(args).await {
        Ok(summary) => {
            println!("\nSummary:");
            println!("   Sources added: {}", summary.added);
            println!("   Sources skipped: {}", summary.skipped);
            println!("   Total in CSV: {}", summary.total());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}
