//! The pipeline facade: wires fetching, filtering, selection, enrichment,
//! assembly and the archive behind one API, plus the daily scheduler.

use crate::archive::ArchiveStore;
use crate::assembler::ReportAssembler;
use crate::config::{
    default_sources, FetchConfig, KeywordConfig, ReportConfig, SelectionConfig, SourceConfig,
};
use crate::enricher::{enrich_all, ResilientSummarizer, Summarizer};
use crate::fetcher::FeedFetcher;
use crate::filter::RelevanceFilter;
use crate::selector::{DateWindow, Selector};
use crate::types::{
    format_chinese_date, format_date, AggregatorError, Candidate, DateGroup, DateGroupItem,
    ArchiveSummary, Report, Result, SourceGroup,
};
use chrono::{NaiveDate, Timelike, Utc};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

/// When the daily scheduler fires, in UTC.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Hour of the morning generation run.
    pub generate_hour: u32,
    /// Hour of the end-of-day archival run.
    pub archive_hour: u32,
    /// How often the scheduler checks the clock.
    pub poll_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            generate_hour: 7,
            archive_hour: 23,
            poll_secs: 60,
        }
    }
}

/// Everything the aggregator needs, with production defaults.
#[derive(Clone)]
pub struct AggregatorConfig {
    pub sources: Vec<SourceConfig>,
    pub keywords: KeywordConfig,
    pub selection: SelectionConfig,
    pub report: ReportConfig,
    pub fetch: FetchConfig,
    pub schedule: ScheduleConfig,
    pub data_dir: PathBuf,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            keywords: KeywordConfig::default(),
            selection: SelectionConfig::default(),
            report: ReportConfig::default(),
            fetch: FetchConfig::default(),
            schedule: ScheduleConfig::default(),
            data_dir: PathBuf::from("data"),
        }
    }
}

pub struct NewsAggregator {
    config: AggregatorConfig,
    fetcher: FeedFetcher,
    filter: RelevanceFilter,
    selector: Selector,
    assembler: ReportAssembler,
    store: ArchiveStore,
    summarizer: ResilientSummarizer,
}

impl NewsAggregator {
    pub fn new(config: AggregatorConfig, summarizer: ResilientSummarizer) -> Result<Self> {
        let fetcher = FeedFetcher::new(config.fetch.clone())?;
        let filter = RelevanceFilter::new(config.keywords.clone());
        let selector = Selector::new(config.selection.clone());
        let assembler = ReportAssembler::new(config.report.clone());
        let store = ArchiveStore::new(&config.data_dir)?;
        Ok(Self {
            config,
            fetcher,
            filter,
            selector,
            assembler,
            store,
            summarizer,
        })
    }

    /// The live report, if one has been generated.
    pub fn current_report(&self) -> Result<Option<Report>> {
        self.store.load_current()
    }

    /// Archive listing, newest first, excluding the current report's date.
    pub fn archived_reports(&self) -> Result<Vec<ArchiveSummary>> {
        self.store.list_archived()
    }

    /// One archived report by date or file name.
    pub fn archived_report(&self, key: &str) -> Result<Report> {
        self.store.get(key)
    }

    /// Run the full pipeline for `date` (today when `None`), persist the
    /// result as both the current report and that date's archive record.
    pub async fn generate_report(&self, date: Option<NaiveDate>) -> Result<Report> {
        let date = date.unwrap_or_else(|| Utc::now().date_naive());
        info!(date = %format_date(date), "generating report");

        let candidates = self.fetch_candidates().await;
        let window = DateWindow::for_day(date, self.config.selection.backfill_days);
        let selected = self
            .selector
            .select(candidates, &self.config.sources, &window);
        let entries = enrich_all(&self.summarizer, selected, &self.config.report).await;
        let report = self
            .assembler
            .assemble(date, entries, &self.config.sources);

        self.store.save_current(&report)?;
        self.store.save_archived(&report)?;
        Ok(report)
    }

    /// Copy the current report into the archive, if any.
    pub fn archive_current(&self) -> Result<bool> {
        self.store.archive_current()
    }

    /// Items for the inclusive date range, filtered exactly like the daily
    /// pipeline but grouped by date and source instead of ranked, with no
    /// enrichment. Empty dates are omitted.
    pub async fn multi_date_reports(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DateGroup>> {
        if start > end {
            return Err(AggregatorError::InvalidRange {
                start: format_date(start),
                end: format_date(end),
            });
        }

        let candidates = self.fetch_candidates().await;
        let window = DateWindow::for_range(start, end, 0);

        // BTreeMap keys keep the dates ordered without a separate sort.
        let mut by_date: BTreeMap<NaiveDate, Vec<Candidate>> = BTreeMap::new();
        for candidate in candidates {
            let ts = candidate.item.published_at;
            if window.contains(ts) {
                by_date.entry(ts.date_naive()).or_default().push(candidate);
            }
        }

        let source_order: Vec<String> =
            self.config.sources.iter().map(|s| s.name.clone()).collect();

        let mut groups = Vec::new();
        for (date, day_candidates) in by_date.into_iter().rev() {
            let mut source_groups = Vec::new();
            for source_name in &source_order {
                let items: Vec<DateGroupItem> = day_candidates
                    .iter()
                    .filter(|c| &c.item.source_name == source_name)
                    .enumerate()
                    .map(|(i, c)| DateGroupItem {
                        id: format!("news{}", i + 1),
                        title: c.item.title.clone(),
                        link: c.item.link.clone(),
                        published_at: c.item.published_at,
                        source_name: c.item.source_name.clone(),
                    })
                    .collect();
                if !items.is_empty() {
                    source_groups.push(SourceGroup {
                        source_name: source_name.clone(),
                        count: items.len(),
                        items,
                    });
                }
            }
            let news_count = source_groups.iter().map(|g| g.count).sum();
            groups.push(DateGroup {
                date: format_date(date),
                chinese_date: format_chinese_date(date),
                news_count,
                source_groups,
            });
        }
        Ok(groups)
    }

    /// Rewrite an existing report's entry bodies into ~200-250 char standalone
    /// summaries. Entries whose rewrite fails keep their original content.
    pub async fn rewrite_report(&self, date: NaiveDate) -> Result<Report> {
        let key = format_date(date);
        let mut report = self.store.get(&key)?;

        for entry in &mut report.news {
            let title = entry.raw_title().to_string();
            match self.summarizer.condense(&title, &entry.content).await {
                Ok(condensed) => entry.content = condensed,
                Err(e) => {
                    warn!(entry = %entry.id, error = %e, "rewrite failed, keeping original content");
                }
            }
        }

        self.store.save_archived(&report)?;
        if self.store.load_current()?.map(|r| r.date) == Some(report.date.clone()) {
            self.store.save_current(&report)?;
        }
        info!(date = %report.date, "report rewritten");
        Ok(report)
    }

    /// Daily loop: one morning generation and one end-of-day archival, each
    /// firing at most once per UTC day. Never returns.
    pub async fn run_scheduler(&self) -> Result<()> {
        info!(
            generate_hour = self.config.schedule.generate_hour,
            archive_hour = self.config.schedule.archive_hour,
            "scheduler started"
        );
        let mut last_generated: Option<NaiveDate> = None;
        let mut last_archived: Option<NaiveDate> = None;

        loop {
            let now = Utc::now();
            let today = now.date_naive();

            if now.hour() >= self.config.schedule.generate_hour && last_generated != Some(today) {
                last_generated = Some(today);
                // Yesterday's report goes to the archive before it is replaced.
                if let Err(e) = self.archive_current() {
                    error!(error = %e, "pre-generation archival failed");
                }
                if let Err(e) = self.generate_report(Some(today)).await {
                    error!(error = %e, "scheduled generation failed");
                }
            }

            if now.hour() >= self.config.schedule.archive_hour && last_archived != Some(today) {
                last_archived = Some(today);
                if let Err(e) = self.archive_current() {
                    error!(error = %e, "scheduled archival failed");
                }
            }

            tokio::time::sleep(Duration::from_secs(self.config.schedule.poll_secs)).await;
        }
    }

    /// Fetch every source and apply the relevance filter. Source failures
    /// are tolerated here; an empty result is legitimate.
    async fn fetch_candidates(&self) -> Vec<Candidate> {
        let outcome = self.fetcher.fetch_all(&self.config.sources).await;
        if !outcome.failed_sources.is_empty() {
            warn!(failed = ?outcome.failed_sources, "some sources failed this run");
        }

        let mut candidates = Vec::new();
        for source in &self.config.sources {
            let items: Vec<_> = outcome
                .items
                .iter()
                .filter(|i| i.source_name == source.name)
                .cloned()
                .collect();
            candidates.extend(self.filter.retain_batch(items, source));
        }
        candidates
    }
}

impl NewsAggregator {
    /// Production wiring: default config plus a remote summarizer when the
    /// environment provides credentials.
    pub fn from_env(data_dir: PathBuf) -> Result<Self> {
        let config = AggregatorConfig {
            data_dir,
            ..Default::default()
        };
        let summarizer = match std::env::var("ARK_API_KEY") {
            Ok(key) if !key.is_empty() => {
                let base_url = std::env::var("ARK_BASE_URL")
                    .unwrap_or_else(|_| "https://ark.cn-beijing.volces.com/api/v3".to_string());
                let model = std::env::var("ARK_MODEL")
                    .unwrap_or_else(|_| "doubao-1-5-pro-32k-250115".to_string());
                let remote: std::sync::Arc<dyn Summarizer> = std::sync::Arc::new(
                    crate::enricher::RemoteSummarizer::new(&base_url, &key, &model)?,
                );
                info!(model = %model, "remote summarizer configured");
                ResilientSummarizer::new(Some(remote))
            }
            _ => {
                info!("no API key configured, using local summarizer");
                ResilientSummarizer::local_only()
            }
        };
        Self::new(config, summarizer)
    }
}
