//! Per-source RSS/Atom fetching and normalization into [`FeedItem`]s.
//!
//! A failing source is logged and skipped; one bad feed never aborts the
//! batch. When structured parsing fails outright, a regex-based manual
//! extraction pass produces the same canonical item shape.

use crate::config::{ContentField, FetchConfig, SourceConfig};
use crate::sanitize::clean_content;
use crate::types::{AggregatorError, FeedItem, Result};
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use chrono::{DateTime, Utc};
use feed_rs::parser;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, error, info, warn};

static ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<(?:item|entry)\b[^>]*>(.*?)</(?:item|entry)>").unwrap());
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<title[^>]*>(.*?)</title>").unwrap());
static LINK_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<link[^>]*>([^<]+)</link>").unwrap());
static LINK_HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<link[^>]*?href="([^"]+)""#).unwrap());
static DESC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(?:description|summary|content(?::encoded)?)[^>]*>(.*?)</(?:description|summary|content(?::encoded)?)>")
        .unwrap()
});
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(?:pubDate|published|updated|dc:date)[^>]*>(.*?)</(?:pubDate|published|updated|dc:date)>")
        .unwrap()
});

/// Outcome of one batch fetch across all configured sources.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub items: Vec<FeedItem>,
    pub failed_sources: Vec<String>,
}

pub struct FeedFetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl FeedFetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;
        Ok(Self { client, config })
    }

    /// Fetch every source, skipping failures. Items come back sorted by
    /// publish date, newest first.
    pub async fn fetch_all(&self, sources: &[SourceConfig]) -> FetchOutcome {
        let mut outcome = FetchOutcome::default();

        for source in sources {
            match self.fetch_source(source).await {
                Ok(items) => {
                    info!(source = %source.name, count = items.len(), "source fetched");
                    outcome.items.extend(items);
                }
                Err(e) => {
                    error!(source = %source.name, url = %source.url, error = %e, "source fetch failed, skipping");
                    outcome.failed_sources.push(source.name.clone());
                }
            }
        }

        outcome
            .items
            .sort_by(|a, b| b.published_at.cmp(&a.published_at));
        outcome
    }

    /// Fetch and normalize one source.
    pub async fn fetch_source(&self, source: &SourceConfig) -> Result<Vec<FeedItem>> {
        url::Url::parse(&source.url)?;
        let body = self.fetch_with_retry(source).await?;
        let fetch_time = Utc::now();

        match parser::parse(body.as_bytes()) {
            Ok(feed) => {
                let items = feed
                    .entries
                    .into_iter()
                    .filter_map(|entry| normalize_entry(entry, source, fetch_time))
                    .collect();
                Ok(items)
            }
            Err(e) => {
                warn!(source = %source.name, error = %e, "structured parse failed, trying manual extraction");
                let items = manual_parse(&body, source, fetch_time);
                if items.is_empty() {
                    return Err(AggregatorError::Parse(format!(
                        "feed unparseable for {}: {}",
                        source.name, e
                    )));
                }
                Ok(items)
            }
        }
    }

    async fn fetch_with_retry(&self, source: &SourceConfig) -> Result<String> {
        let timeout = Duration::from_secs(if source.timeout_secs > 0 {
            source.timeout_secs
        } else {
            self.config.default_timeout_secs
        });

        let mut backoff = ExponentialBackoff {
            current_interval: Duration::from_secs(self.config.retry_delay_secs),
            initial_interval: Duration::from_secs(self.config.retry_delay_secs),
            max_interval: Duration::from_secs(self.config.retry_delay_secs * 8),
            multiplier: 2.0,
            ..Default::default()
        };

        let mut last_error: Option<AggregatorError> = None;
        for attempt in 0..=self.config.max_retries {
            match self.fetch_once(&source.url, timeout).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.config.max_retries {
                        if let Some(delay) = backoff.next_backoff() {
                            warn!(source = %source.name, attempt = attempt + 1, ?delay, "fetch attempt failed, retrying");
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AggregatorError::General("fetch failed".to_string())))
    }

    async fn fetch_once(&self, url: &str, timeout: Duration) -> Result<String> {
        let response = self.client.get(url).timeout(timeout).send().await?;
        if !response.status().is_success() {
            return Err(AggregatorError::General(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }
        Ok(response.text().await?)
    }
}

/// Normalize one parsed entry into the canonical item shape, resolving the
/// body through the source's ordered content-field candidates and falling
/// back to the title. Returns `None` only for entries without a title.
fn normalize_entry(
    entry: feed_rs::model::Entry,
    source: &SourceConfig,
    fetch_time: DateTime<Utc>,
) -> Option<FeedItem> {
    let title = entry.title.as_ref().map(|t| t.content.trim().to_string())?;
    if title.is_empty() {
        return None;
    }

    let raw_content = source
        .content_fields
        .iter()
        .find_map(|field| extract_field(&entry, *field))
        .unwrap_or_default();

    let mut content = clean_content(&raw_content, source.strip_html);
    if content.is_empty() {
        debug!(source = %source.name, title = %title, "entry has no body, using title");
        content = title.clone();
    }

    // Feeds without a usable date get the fetch time, never a null.
    let published_at = entry
        .published
        .or(entry.updated)
        .unwrap_or(fetch_time);

    let link = entry
        .links
        .first()
        .map(|l| l.href.clone())
        .or_else(|| {
            // Some feeds put the URL in the guid.
            entry.id.starts_with("http").then(|| entry.id.clone())
        })
        .unwrap_or_default();

    Some(FeedItem {
        title,
        link,
        content,
        published_at,
        source_name: source.name.clone(),
        category: source.category.clone(),
    })
}

fn extract_field(entry: &feed_rs::model::Entry, field: ContentField) -> Option<String> {
    let value = match field {
        ContentField::Body => entry.content.as_ref().and_then(|c| c.body.clone()),
        ContentField::Summary => entry.summary.as_ref().map(|s| s.content.clone()),
        ContentField::MediaDescription => entry
            .media
            .iter()
            .find_map(|m| m.description.as_ref().map(|d| d.content.clone())),
    };
    value.filter(|v| !v.trim().is_empty())
}

/// Last-resort extraction when the XML is too broken for the structured
/// parser: pull item blocks apart with regexes and normalize them into the
/// same canonical shape.
fn manual_parse(body: &str, source: &SourceConfig, fetch_time: DateTime<Utc>) -> Vec<FeedItem> {
    let mut items = Vec::new();

    for captures in ITEM_RE.captures_iter(body) {
        let block = &captures[1];

        let title = match TITLE_RE.captures(block) {
            Some(c) => clean_content(&c[1], true),
            None => continue,
        };
        if title.is_empty() {
            continue;
        }

        let link = LINK_HREF_RE
            .captures(block)
            .or_else(|| LINK_TEXT_RE.captures(block))
            .map(|c| c[1].trim().to_string())
            .unwrap_or_default();

        let mut content = DESC_RE
            .captures(block)
            .map(|c| clean_content(&c[1], source.strip_html))
            .unwrap_or_default();
        if content.is_empty() {
            content = title.clone();
        }

        let published_at = DATE_RE
            .captures(block)
            .and_then(|c| parse_feed_date(c[1].trim()))
            .unwrap_or(fetch_time);

        items.push(FeedItem {
            title,
            link,
            content,
            published_at,
            source_name: source.name.clone(),
            category: source.category.clone(),
        });
    }

    debug!(source = %source.name, count = items.len(), "manual parse extracted items");
    items
}

fn parse_feed_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_source() -> SourceConfig {
        SourceConfig::new("https://example.com/feed", "测试源", "ai-tech")
    }

    #[test]
    fn manual_parse_extracts_canonical_items() {
        let xml = r#"
            <rss><channel>
            <item>
              <title>大模型推理成本下降</title>
              <link>https://example.com/a</link>
              <pubDate>Tue, 25 Aug 2026 08:00:00 +0000</pubDate>
              <description><![CDATA[<p>推理成本在过去一年下降了一个数量级。</p>]]></description>
            </item>
            <item>
              <title>无日期条目</title>
              <link>https://example.com/b</link>
            </item>
            </channel></rss>
        "#;
        let fetch_time = Utc::now();
        let items = manual_parse(xml, &test_source(), fetch_time);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "大模型推理成本下降");
        assert_eq!(items[0].link, "https://example.com/a");
        assert!(items[0].content.contains("推理成本"));
        assert_eq!(items[1].published_at, fetch_time);
        // No body at all falls back to the title.
        assert_eq!(items[1].content, items[1].title);
    }

    #[test]
    fn manual_parse_skips_titleless_blocks() {
        let xml = "<item><link>https://example.com/x</link></item>";
        assert!(manual_parse(xml, &test_source(), Utc::now()).is_empty());
    }
}
