use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::store::{Document, FieldValue, Fields, FieldsBuilder};

/// One row of the sources CSV (`source_id,name,type,url,category,enabled`)
#[derive(Debug, Clone, Deserialize)]
pub struct SourceRow {
    pub source_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: String,
    pub url: String,
    pub category: String,
    pub enabled: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    Active,
    Disabled,
}

impl SourceStatus {
    /// Only the exact literal `true` enables a source.
    pub fn from_enabled(raw: &str) -> Self {
        if raw == "true" {
            SourceStatus::Active
        } else {
            SourceStatus::Disabled
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceStatus::Active => "active",
            SourceStatus::Disabled => "disabled",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceDoc {
    pub id: String,
    pub name: String,
    pub source_type: String,
    pub url: String,
    pub category: String,
    pub topic_tags: Vec<String>,
    pub status: SourceStatus,
    pub last_checked: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub articles_last24h: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SourceDoc {
    /// Source as written by the full seed: checked and successful as of `now`.
    pub fn seeded(row: &SourceRow, now: DateTime<Utc>) -> Self {
        Self {
            last_checked: Some(now),
            last_success: Some(now),
            ..Self::unchecked(row, now)
        }
    }

    /// Source as written by the feed loader: never checked yet.
    pub fn unchecked(row: &SourceRow, now: DateTime<Utc>) -> Self {
        Self {
            id: row.source_id.clone(),
            name: row.name.clone(),
            source_type: row.source_type.clone(),
            url: row.url.clone(),
            category: row.category.clone(),
            topic_tags: Vec::new(),
            status: SourceStatus::from_enabled(&row.enabled),
            last_checked: None,
            last_success: None,
            articles_last24h: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Document for SourceDoc {
    const COLLECTION: &'static str = "sources";

    fn id(&self) -> &str {
        &self.id
    }

    fn to_fields(&self) -> Fields {
        FieldsBuilder::new()
            .field("id", &self.id)
            .field("name", &self.name)
            .field("type", &self.source_type)
            .field("url", &self.url)
            .field("category", &self.category)
            .field("topicTags", self.topic_tags.as_slice())
            .field("status", self.status.as_str())
            .field("lastChecked", self.last_checked)
            .field("lastSuccess", self.last_success)
            .field("articlesLast24h", self.articles_last24h)
            .field("createdAt", self.created_at)
            .field("updatedAt", self.updated_at)
            .build()
    }
}

/// Article fixture. `ingested_at` is stamped from the seeding clock.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ArticleDoc {
    pub id: String,
    pub title: String,
    pub url: String,
    pub source: String,
    pub source_id: String,
    pub published_at: DateTime<Utc>,
    #[serde(skip)]
    pub ingested_at: DateTime<Utc>,
    pub summary: String,
    #[serde(default)]
    pub ai_tags: Vec<String>,
    pub relevance_score: i64,
    pub importance_score: i64,
    #[serde(default)]
    pub matched_topics: Vec<String>,
    #[serde(default)]
    pub matched_keywords: Vec<String>,
    pub sentiment: String,
}

impl Document for ArticleDoc {
    const COLLECTION: &'static str = "articles";

    fn id(&self) -> &str {
        &self.id
    }

    fn to_fields(&self) -> Fields {
        FieldsBuilder::new()
            .field("id", &self.id)
            .field("title", &self.title)
            .field("url", &self.url)
            .field("source", &self.source)
            .field("sourceId", &self.source_id)
            .field("publishedAt", self.published_at)
            .field("ingestedAt", self.ingested_at)
            .field("summary", &self.summary)
            .field("aiTags", self.ai_tags.as_slice())
            .field("relevanceScore", self.relevance_score)
            .field("importanceScore", self.importance_score)
            .field("matchedTopics", self.matched_topics.as_slice())
            .field("matchedKeywords", self.matched_keywords.as_slice())
            .field("sentiment", &self.sentiment)
            .build()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BriefMetrics {
    pub article_count: i64,
    #[serde(default)]
    pub top_sources: BTreeMap<String, i64>,
    #[serde(default)]
    pub main_topics: Vec<String>,
}

impl BriefMetrics {
    fn to_fields(&self) -> Fields {
        let top_sources: Fields = self
            .top_sources
            .iter()
            .map(|(name, count)| (name.clone(), FieldValue::Integer(*count)))
            .collect();
        FieldsBuilder::new()
            .field("articleCount", self.article_count)
            .field("topSources", top_sources)
            .field("mainTopics", self.main_topics.as_slice())
            .build()
    }
}

/// Daily brief fixture. `generated_at` is stamped from the seeding clock.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BriefDoc {
    pub id: String,
    #[serde(rename = "type")]
    pub brief_type: String,
    pub date: String,
    pub executive_summary: String,
    #[serde(default)]
    pub highlights: Vec<String>,
    pub metrics: BriefMetrics,
    #[serde(default)]
    pub articles: Vec<String>,
    #[serde(skip)]
    pub generated_at: DateTime<Utc>,
    pub generated_by: String,
}

impl Document for BriefDoc {
    const COLLECTION: &'static str = "briefs";

    fn id(&self) -> &str {
        &self.id
    }

    fn to_fields(&self) -> Fields {
        FieldsBuilder::new()
            .field("id", &self.id)
            .field("type", &self.brief_type)
            .field("date", &self.date)
            .field("executiveSummary", &self.executive_summary)
            .field("highlights", self.highlights.as_slice())
            .field("metrics", self.metrics.to_fields())
            .field("articles", self.articles.as_slice())
            .field("generatedAt", self.generated_at)
            .field("generatedBy", &self.generated_by)
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RunStats {
    pub sources_checked: i64,
    pub sources_failed: i64,
    pub articles_ingested: i64,
    pub articles_deduplicated: i64,
    pub briefs_generated: i64,
    pub alerts_triggered: i64,
}

/// Ingestion-run summary. Start and completion are offsets back from the seeding clock.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IngestionRunDoc {
    pub id: String,
    pub status: String,
    pub trigger: String,
    pub started_offset_seconds: i64,
    pub completed_offset_seconds: i64,
    pub stats: RunStats,
    pub duration: i64,
    #[serde(skip)]
    pub now: DateTime<Utc>,
}

impl IngestionRunDoc {
    pub fn started_at(&self) -> DateTime<Utc> {
        self.now - Duration::seconds(self.started_offset_seconds)
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.now - Duration::seconds(self.completed_offset_seconds)
    }
}

impl Document for IngestionRunDoc {
    const COLLECTION: &'static str = "ingestion_runs";

    fn id(&self) -> &str {
        &self.id
    }

    fn to_fields(&self) -> Fields {
        let stats = FieldsBuilder::new()
            .field("sourcesChecked", self.stats.sources_checked)
            .field("sourcesFailed", self.stats.sources_failed)
            .field("articlesIngested", self.stats.articles_ingested)
            .field("articlesDeduplicated", self.stats.articles_deduplicated)
            .field("briefsGenerated", self.stats.briefs_generated)
            .field("alertsTriggered", self.stats.alerts_triggered)
            .build();
        FieldsBuilder::new()
            .field("id", &self.id)
            .field("startedAt", self.started_at())
            .field("completedAt", self.completed_at())
            .field("status", &self.status)
            .field("trigger", &self.trigger)
            .field("stats", stats)
            .field("duration", self.duration)
            .build()
    }
}
