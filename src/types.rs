use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A feed item after fetch-time normalization. `content` is cleaned plain
/// text and never empty (falls back to the title); `published_at` falls back
/// to fetch time when the feed carries no parseable date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: String,
    /// Empty string when the feed provides no usable link.
    pub link: String,
    pub content: String,
    pub published_at: DateTime<Utc>,
    pub source_name: String,
    pub category: String,
}

impl FeedItem {
    /// Content length in characters, not bytes. All length gates in the
    /// pipeline count characters so CJK text measures the same as ASCII.
    pub fn content_chars(&self) -> usize {
        self.content.chars().count()
    }
}

/// A feed item under consideration for a report, carrying the derived
/// signals the filter and selector decide on. Built per run, never persisted.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub item: FeedItem,
    pub is_high_priority: bool,
    pub matches_topic: bool,
    pub contains_blocked_term: bool,
    pub meets_length_threshold: bool,
}

/// A finalized, numbered entry inside a persisted report.
///
/// Serialized field names follow the legacy report schema so existing
/// archives and front-end consumers keep working.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsEntry {
    pub id: String,
    pub number: usize,
    pub title: String,
    #[serde(default)]
    pub keywords: String,
    pub content: String,
    #[serde(default)]
    pub summary: Vec<String>,
    pub source: String,
    pub source_name: String,
    pub category: String,
    #[serde(rename = "contentLengthSufficient")]
    pub content_length_sufficient: bool,
}

impl NewsEntry {
    /// The title without its `"N、"` numbering prefix.
    pub fn raw_title(&self) -> &str {
        match self.title.split_once('、') {
            Some((prefix, rest)) if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()) => rest,
            _ => &self.title,
        }
    }

    pub fn content_chars(&self) -> usize {
        self.content.chars().count()
    }
}

/// The date-scoped bundle of selected, enriched news entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub date: String,
    #[serde(rename = "chineseDate")]
    pub chinese_date: String,
    pub time: String,
    pub title: String,
    pub news: Vec<NewsEntry>,
    #[serde(rename = "newsCount")]
    pub news_count: usize,
}

/// A single row in the archive listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveSummary {
    pub date: String,
    #[serde(rename = "chineseDate")]
    pub chinese_date: String,
    pub title: String,
    #[serde(rename = "newsCount")]
    pub news_count: usize,
    #[serde(rename = "filePath")]
    pub file_path: String,
}

/// One day's worth of items in a multi-date query, grouped by source.
/// No enrichment is performed for these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateGroup {
    pub date: String,
    #[serde(rename = "chineseDate")]
    pub chinese_date: String,
    #[serde(rename = "newsCount")]
    pub news_count: usize,
    #[serde(rename = "sourceGroups")]
    pub source_groups: Vec<SourceGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceGroup {
    #[serde(rename = "sourceName")]
    pub source_name: String,
    pub count: usize,
    pub items: Vec<DateGroupItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateGroupItem {
    pub id: String,
    pub title: String,
    pub link: String,
    #[serde(rename = "pubDate")]
    pub published_at: DateTime<Utc>,
    pub source_name: String,
}

/// Format a date the way report keys and the `date` field expect it.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Chinese display date, e.g. `3月28日`.
pub fn format_chinese_date(date: NaiveDate) -> String {
    use chrono::Datelike;
    format!("{}月{}日", date.month(), date.day())
}

/// Parse a `YYYY-MM-DD` parameter, rejecting anything malformed before the
/// pipeline is invoked.
pub fn parse_date_param(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| AggregatorError::InvalidDate {
        value: value.to_string(),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid date '{value}': expected YYYY-MM-DD")]
    InvalidDate { value: String },

    #[error("Invalid date range: {start} is after {end}")]
    InvalidRange { start: String, end: String },

    #[error("Report not found: {key}")]
    ReportNotFound { key: String },

    #[error("Summarizer error: {0}")]
    Summarizer(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
