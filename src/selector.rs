//! Ranked selection of retained candidates for one report.
//!
//! Ordering pipeline: per-source grouping and caps first, then the
//! in-window / backfill partition, ranked sort within each partition,
//! floor-driven supplementation, and the final size cut. The output is
//! fully deterministic for identical inputs.

use crate::config::{SelectionConfig, SourceConfig};
use crate::types::Candidate;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, info};

/// The inclusive target window of a report plus the backfill horizon behind
/// it. Bounds are whole UTC calendar days.
#[derive(Debug, Clone, Copy)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub backfill_start: DateTime<Utc>,
}

impl DateWindow {
    /// Window covering a single calendar day with `backfill_days` of
    /// eligible supplements before it.
    pub fn for_day(day: NaiveDate, backfill_days: i64) -> Self {
        Self::for_range(day, day, backfill_days)
    }

    /// Window covering the inclusive day range `[start_day, end_day]`.
    pub fn for_range(start_day: NaiveDate, end_day: NaiveDate, backfill_days: i64) -> Self {
        let start = Utc.from_utc_datetime(&start_day.and_hms_opt(0, 0, 0).unwrap());
        let end = Utc.from_utc_datetime(&end_day.and_hms_opt(23, 59, 59).unwrap());
        let backfill_start = start - chrono::Duration::days(backfill_days);
        Self {
            start,
            end,
            backfill_start,
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }

    /// Backfill horizon: before the window but within `backfill_days` of it.
    pub fn in_backfill(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.backfill_start && ts < self.start
    }
}

pub struct Selector {
    config: SelectionConfig,
}

impl Selector {
    pub fn new(config: SelectionConfig) -> Self {
        Self { config }
    }

    /// Produce the ordered `selected` sequence for one report.
    pub fn select(
        &self,
        candidates: Vec<Candidate>,
        sources: &[SourceConfig],
        window: &DateWindow,
    ) -> Vec<Candidate> {
        let caps: HashMap<&str, usize> = sources
            .iter()
            .map(|s| (s.name.as_str(), s.max_per_report))
            .collect();

        // Items older than the backfill horizon leave first; otherwise a
        // stale long item could win a cap slot and then vanish in the
        // partition below, starving supplementation.
        let eligible = candidates.into_iter().filter(|c| {
            window.contains(c.item.published_at) || window.in_backfill(c.item.published_at)
        });

        // Per-source grouping and caps come before any cross-source ranking
        // so one prolific source cannot crowd out the rest.
        let mut by_source: HashMap<String, Vec<Candidate>> = HashMap::new();
        for candidate in eligible {
            by_source
                .entry(candidate.item.source_name.clone())
                .or_default()
                .push(candidate);
        }

        let mut capped: Vec<Candidate> = Vec::new();
        // Deterministic source visit order.
        let mut source_names: Vec<String> = by_source.keys().cloned().collect();
        source_names.sort();
        for name in source_names {
            let mut group = by_source.remove(&name).unwrap_or_default();
            let cap = caps.get(name.as_str()).copied().unwrap_or(4);
            group.sort_by(|a, b| Self::rank_within_source(a, b, window, &self.config));
            if group.len() > cap {
                debug!(source = %name, total = group.len(), cap, "per-source cap applied");
                group.truncate(cap);
            }
            capped.extend(group);
        }

        let (mut in_window, mut backfill): (Vec<Candidate>, Vec<Candidate>) = capped
            .into_iter()
            .partition(|c| window.contains(c.item.published_at));

        in_window.sort_by(|a, b| self.rank(a, b));
        backfill.sort_by(|a, b| self.rank(a, b));

        // Supplement only up to the floor; in-window items always rank ahead
        // of any supplement regardless of score.
        let supplement_count = if in_window.len() < self.config.window_floor {
            (self.config.window_floor - in_window.len()).min(backfill.len())
        } else {
            0
        };

        let mut selected = in_window;
        selected.extend(backfill.into_iter().take(supplement_count));
        selected.truncate(self.config.max_report_size);

        info!(
            selected = selected.len(),
            supplemented = supplement_count,
            "selection complete"
        );
        selected
    }

    /// Priority first; content length when the gap is above the noise
    /// threshold; recency otherwise.
    fn rank(&self, a: &Candidate, b: &Candidate) -> Ordering {
        rank_by_signals(a, b, self.config.length_noise_chars)
    }

    /// Within one source, in-window items must survive the cap ahead of
    /// backfill, then the usual signals apply.
    fn rank_within_source(
        a: &Candidate,
        b: &Candidate,
        window: &DateWindow,
        config: &SelectionConfig,
    ) -> Ordering {
        let a_in = window.contains(a.item.published_at);
        let b_in = window.contains(b.item.published_at);
        b_in.cmp(&a_in)
            .then_with(|| rank_by_signals(a, b, config.length_noise_chars))
    }
}

fn rank_by_signals(a: &Candidate, b: &Candidate, noise: usize) -> Ordering {
    match b.is_high_priority.cmp(&a.is_high_priority) {
        Ordering::Equal => {}
        other => return other,
    }
    let len_a = a.item.content_chars();
    let len_b = b.item.content_chars();
    if len_a.abs_diff(len_b) > noise {
        return len_b.cmp(&len_a);
    }
    b.item.published_at.cmp(&a.item.published_at)
}
