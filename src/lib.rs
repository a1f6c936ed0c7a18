//! AI news aggregation pipeline: fetch a fixed roster of RSS sources,
//! filter for topical relevance, rank and select a bounded set, enrich each
//! entry with keywords and a 3-point summary, and assemble a dated report
//! persisted to a date-keyed JSON archive.

pub mod aggregator;
pub mod archive;
pub mod assembler;
pub mod config;
pub mod enricher;
pub mod fetcher;
pub mod filter;
pub mod sanitize;
pub mod selector;
pub mod types;

pub use aggregator::{AggregatorConfig, NewsAggregator, ScheduleConfig};
pub use archive::ArchiveStore;
pub use assembler::ReportAssembler;
pub use config::{
    default_sources, ContentField, FetchConfig, KeywordConfig, ReportConfig, SelectionConfig,
    SourceConfig,
};
pub use enricher::{LocalSummarizer, RemoteSummarizer, ResilientSummarizer, Summarizer};
pub use fetcher::{FeedFetcher, FetchOutcome};
pub use filter::RelevanceFilter;
pub use selector::{DateWindow, Selector};
pub use types::{
    AggregatorError, ArchiveSummary, Candidate, DateGroup, FeedItem, NewsEntry, Report, Result,
};
