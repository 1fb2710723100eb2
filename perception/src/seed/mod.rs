//! Populating the document store with sources and demo records.
//!
//! Everything time-dependent is derived from a single seeding clock `now`, so a rerun with
//! the same inputs writes identical documents.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::store::{self, Document, DocumentStore, FieldValue};

pub mod records;

pub use records::{
    ArticleDoc, BriefDoc, BriefMetrics, IngestionRunDoc, RunStats, SourceDoc, SourceRow,
    SourceStatus,
};

/// Read source rows from a CSV with a header line.
pub fn read_source_rows<P: AsRef<Path>>(path: P) -> Result<Vec<SourceRow>> {
    let path = path.as_ref();
    let reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open sources CSV {}", path.display()))?;
    parse_source_rows(reader)
}

/// Parse source rows from any CSV reader (header line required, blank lines skipped).
pub fn parse_source_rows<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<SourceRow>> {
    let mut rows = Vec::new();
    for (line, record) in reader.deserialize::<SourceRow>().enumerate() {
        let row = record.with_context(|| format!("invalid sources CSV row {}", line + 1))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Fixture records for articles, briefs and ingestion runs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedFixtures {
    #[serde(default)]
    pub articles: Vec<ArticleDoc>,
    #[serde(default)]
    pub briefs: Vec<BriefDoc>,
    #[serde(default)]
    pub ingestion_runs: Vec<IngestionRunDoc>,
}

impl SeedFixtures {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("failed to parse seed fixtures")
    }

    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read seed fixtures {}", path.display()))?;
        Self::from_toml(&content)
    }
}

/// Every record the seed writes, stamped with the seeding clock.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedPlan {
    pub sources: Vec<SourceDoc>,
    pub articles: Vec<ArticleDoc>,
    pub briefs: Vec<BriefDoc>,
    pub ingestion_runs: Vec<IngestionRunDoc>,
}

impl SeedPlan {
    pub fn build(rows: &[SourceRow], fixtures: SeedFixtures, now: DateTime<Utc>) -> Self {
        let sources = rows.iter().map(|r| SourceDoc::seeded(r, now)).collect();

        let articles = fixtures
            .articles
            .into_iter()
            .map(|mut a| {
                a.ingested_at = now;
                a
            })
            .collect();
        let briefs = fixtures
            .briefs
            .into_iter()
            .map(|mut b| {
                b.generated_at = now;
                b
            })
            .collect();
        let ingestion_runs = fixtures
            .ingestion_runs
            .into_iter()
            .map(|mut r| {
                r.now = now;
                r
            })
            .collect();

        Self {
            sources,
            articles,
            briefs,
            ingestion_runs,
        }
    }

    /// Load the CSV and fixture file and build the plan.
    pub async fn from_files<P: AsRef<Path>, Q: AsRef<Path>>(
        csv_path: P,
        fixtures_path: Q,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let rows = read_source_rows(csv_path)?;
        let fixtures = SeedFixtures::from_file(fixtures_path).await?;
        Ok(Self::build(&rows, fixtures, now))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub sources: usize,
    pub articles: usize,
    pub briefs: usize,
    pub ingestion_runs: usize,
}

fn headline(title: &str) -> String {
    if title.chars().count() > 50 {
        format!("{}...", title.chars().take(50).collect::<String>())
    } else {
        title.to_string()
    }
}

/// Write the plan one document at a time, in order: sources, articles, briefs, runs.
///
/// The first failed write aborts the run. Documents already written stay written.
pub async fn run_seed(store: &dyn DocumentStore, plan: &SeedPlan) -> Result<SeedSummary> {
    info!(
        sources = plan.sources.len(),
        articles = plan.articles.len(),
        briefs = plan.briefs.len(),
        ingestion_runs = plan.ingestion_runs.len(),
        "starting seed"
    );
    let mut summary = SeedSummary::default();

    println!("Seeding sources...");
    for source in &plan.sources {
        store::put(store, source).await?;
        summary.sources += 1;
        println!("  ✓ {}", source.name);
    }

    println!("\nSeeding articles...");
    for article in &plan.articles {
        store::put(store, article).await?;
        summary.articles += 1;
        println!("  ✓ {}", headline(&article.title));
    }

    println!("\nSeeding briefs...");
    for brief in &plan.briefs {
        store::put(store, brief).await?;
        summary.briefs += 1;
        println!("  ✓ Daily brief: {}", brief.date);
    }

    println!("\nSeeding ingestion runs...");
    for run in &plan.ingestion_runs {
        store::put(store, run).await?;
        summary.ingestion_runs += 1;
        println!("  ✓ Run: {}", run.id);
    }

    info!("seed complete");
    Ok(summary)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub added: usize,
    pub skipped: usize,
}

impl LoadSummary {
    pub fn total(&self) -> usize {
        self.added + self.skipped
    }
}

/// Add sources that are not in the store yet. Existing documents are left untouched.
pub async fn load_sources(
    store: &dyn DocumentStore,
    rows: &[SourceRow],
    now: DateTime<Utc>,
) -> Result<LoadSummary> {
    let mut summary = LoadSummary::default();

    for row in rows {
        let existing = store
            .get_document(SourceDoc::COLLECTION, &row.source_id)
            .await
            .with_context(|| format!("failed to look up source {}", row.source_id))?;
        if existing.is_some() {
            println!("Skipped (exists): {}", row.name);
            summary.skipped += 1;
            continue;
        }

        let doc = SourceDoc::unchecked(row, now);
        let mut fields = doc.to_fields();
        fields.insert("lastError".to_string(), FieldValue::Null);
        store
            .set_document(SourceDoc::COLLECTION, doc.id(), &fields)
            .await
            .with_context(|| format!("failed to write source {}", doc.id))?;
        println!("Added: {} ({} - {})", row.name, row.source_type, row.url);
        summary.added += 1;
    }

    info!(added = summary.added, skipped = summary.skipped, "sources loaded");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "source_id,name,type,url,category,enabled\n\
        techcrunch-ai,TechCrunch AI,rss,https://techcrunch.com/category/artificial-intelligence/feed/,tech,true\n\
        \n\
        mit-ai,MIT Technology Review AI,rss,https://www.technologyreview.com/topic/artificial-intelligence/feed,research,false\n";

    #[test]
    fn parses_rows_and_skips_blank_lines() {
        let rows = parse_source_rows(csv::Reader::from_reader(CSV.as_bytes())).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].source_id, "techcrunch-ai");
        assert_eq!(rows[0].source_type, "rss");
        assert_eq!(rows[1].enabled, "false");
    }

    #[test]
    fn missing_column_is_an_error() {
        let bad = "source_id,name\nx,y\n";
        assert!(parse_source_rows(csv::Reader::from_reader(bad.as_bytes())).is_err());
    }

    #[test]
    fn headline_truncates_long_titles() {
        assert_eq!(headline("short"), "short");
        let long = "Google Announces Gemini 2.0 Flash with 60% Cost Reduction";
        assert_eq!(headline(long), "Google Announces Gemini 2.0 Flash with 60% Cost Re...");
    }
}
