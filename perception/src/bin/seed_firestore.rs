//! Populate the document store with sources from the CSV and the demo fixtures.
//!
//! Writes are sequential. The first failure aborts with exit code 1; earlier writes stay.

use anyhow::Result;
use chrono::Utc;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use common::Config;
use perception::seed::{run_seed, SeedPlan, SeedSummary};
use perception::store::open_store;

async fn run() -> Result<SeedSummary> {
    let config = Config::load_for_tools().await?;
    let seed = config.seed();
    info!(
        csv = %seed.csv_path().display(),
        fixtures = %seed.fixtures_path().display(),
        project = %config.firebase.project_id(),
        "loading seed data"
    );

    let plan = SeedPlan::from_files(seed.csv_path(), seed.fixtures_path(), Utc::now()).await?;
    let store = open_store(&config).await?;
    run_seed(store.as_ref(), &plan).await
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    println!("Starting Firestore seed...\n");
    match run().await {
        Ok(summary) => {
            println!("\nFirestore seeding complete!");
            println!("\nSeeded:");
            println!("  - {} sources", summary.sources);
            println!("  - {} articles", summary.articles);
            println!("  - {} briefs", summary.briefs);
            println!("  - {} ingestion runs", summary.ingestion_runs);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("\nError seeding Firestore: {:#}", e);
            ExitCode::from(1)
        }
    }
}
