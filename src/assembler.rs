//! Final report construction: the content-length gate, atomic contiguous
//! renumbering, and title synthesis.

use crate::config::{ReportConfig, SourceConfig};
use crate::types::{format_chinese_date, format_date, NewsEntry, Report};
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use tracing::{info, warn};

pub struct ReportAssembler {
    config: ReportConfig,
}

impl ReportAssembler {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    /// Build the report for `date` from enriched entries. A fresh entry
    /// vector is constructed, so numbering can never be observed partially
    /// updated and re-running on the same input yields identical output.
    pub fn assemble(
        &self,
        date: NaiveDate,
        entries: Vec<NewsEntry>,
        sources: &[SourceConfig],
    ) -> Report {
        let relaxed: HashMap<&str, bool> = sources
            .iter()
            .map(|s| (s.name.as_str(), s.relaxed_entry_gate))
            .collect();

        let qualified: Vec<NewsEntry> = entries
            .into_iter()
            .filter(|entry| self.passes_gate(entry, &relaxed))
            .collect();

        if qualified.len() < 5 {
            warn!(
                count = qualified.len(),
                "few entries qualified; filters or sources may need attention"
            );
        }

        let news = renumber(qualified);
        let title = self.synthesize_title(&news);

        let report = Report {
            date: format_date(date),
            chinese_date: format_chinese_date(date),
            time: Utc::now().format("%H:%M").to_string(),
            title,
            news_count: news.len(),
            news,
        };
        info!(date = %report.date, entries = report.news_count, "report assembled");
        report
    }

    fn passes_gate(&self, entry: &NewsEntry, relaxed: &HashMap<&str, bool>) -> bool {
        if entry.content_length_sufficient {
            return true;
        }
        // High-volume aggregator sources get a relaxed per-source threshold.
        relaxed.get(entry.source_name.as_str()).copied().unwrap_or(false)
            && entry.content_chars() >= self.config.relaxed_entry_min_chars
    }

    /// Main title from the first up-to-3 raw entry titles; generic fallback
    /// when nothing qualified.
    fn synthesize_title(&self, news: &[NewsEntry]) -> String {
        let raw_titles: Vec<&str> = news.iter().take(3).map(|e| e.raw_title()).collect();
        if raw_titles.is_empty() {
            return format!("{}: {}", self.config.title_prefix, self.config.fallback_title);
        }
        format!("{}: {}", self.config.title_prefix, raw_titles.join("; "))
    }
}

/// Renumber entries contiguously from 1, regenerating `id` and the title
/// prefix in step. Idempotent: already-numbered titles are stripped before
/// re-prefixing.
pub fn renumber(entries: Vec<NewsEntry>) -> Vec<NewsEntry> {
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let number = index + 1;
            let raw_title = entry.raw_title().to_string();
            NewsEntry {
                id: format!("news{}", number),
                number,
                title: format!("{}、{}", number, raw_title),
                ..entry
            }
        })
        .collect()
}
