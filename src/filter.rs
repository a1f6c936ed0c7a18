//! Topical relevance classification.
//!
//! The retain/discard rule is a pure function of the item and its source
//! descriptor, so the daily pipeline and the multi-date query cannot drift
//! apart: retain iff the item meets its source's length threshold AND
//! (the source is trusted OR a topic keyword matches) AND no excluded term
//! appears. Strict sources must match a keyword even when trusted.

use crate::config::{KeywordConfig, SourceConfig};
use crate::types::{Candidate, FeedItem};
use tracing::debug;

pub struct RelevanceFilter {
    keywords: KeywordConfig,
}

impl RelevanceFilter {
    pub fn new(keywords: KeywordConfig) -> Self {
        Self { keywords }
    }

    /// Derive the decision signals for one normalized item.
    pub fn evaluate(&self, item: FeedItem, source: &SourceConfig) -> Candidate {
        let haystack = format!(
            "{} {}",
            item.title.to_lowercase(),
            item.content.to_lowercase()
        );

        let matches_topic = self
            .keywords
            .categories
            .iter()
            .any(|cat| cat.terms.iter().any(|t| haystack.contains(&t.to_lowercase())));

        let is_high_priority = self
            .keywords
            .high_priority
            .iter()
            .any(|t| haystack.contains(&t.to_lowercase()));

        let contains_blocked_term = self
            .keywords
            .excluded
            .iter()
            .any(|t| haystack.contains(&t.to_lowercase()));

        let meets_length_threshold = item.content_chars() >= source.min_content_chars;

        Candidate {
            item,
            is_high_priority,
            matches_topic,
            contains_blocked_term,
            meets_length_threshold,
        }
    }

    /// The single retain/discard decision. No side effects.
    pub fn retains(&self, candidate: &Candidate, source: &SourceConfig) -> bool {
        if !candidate.meets_length_threshold {
            return false;
        }
        if candidate.contains_blocked_term {
            return false;
        }
        if source.strict {
            // High-noise sources never get the trust bypass.
            return candidate.matches_topic;
        }
        source.trusted || candidate.matches_topic
    }

    /// Evaluate and filter a batch of items for one source.
    pub fn retain_batch(&self, items: Vec<FeedItem>, source: &SourceConfig) -> Vec<Candidate> {
        let total = items.len();
        let retained: Vec<Candidate> = items
            .into_iter()
            .map(|item| self.evaluate(item, source))
            .filter(|c| self.retains(c, source))
            .collect();
        debug!(
            source = %source.name,
            total,
            retained = retained.len(),
            "relevance filter applied"
        );
        retained
    }
}
