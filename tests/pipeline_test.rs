use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use daily_news::assembler::renumber;
use daily_news::enricher::{enrich_all, SUMMARY_MARKERS};
use daily_news::types::*;
use daily_news::{
    AggregatorConfig, KeywordConfig, LocalSummarizer, NewsAggregator, RelevanceFilter,
    ReportAssembler, ReportConfig, ResilientSummarizer, SelectionConfig, Selector, SourceConfig,
    Summarizer,
};
use daily_news::selector::DateWindow;
use std::sync::Arc;
use tracing::info;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init();
}

fn report_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 28).unwrap()
}

fn at(day: NaiveDate, hour: u32) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_hms_opt(hour, 0, 0).unwrap())
}

fn item(source: &str, title: &str, chars: usize, published_at: DateTime<Utc>) -> FeedItem {
    FeedItem {
        title: title.to_string(),
        link: format!("https://example.com/{}", title),
        content: format!("人工智能快讯。{}", "述".repeat(chars.saturating_sub(7))),
        published_at,
        source_name: source.to_string(),
        category: "ai-tech".to_string(),
    }
}

fn candidate(source: &str, title: &str, chars: usize, published_at: DateTime<Utc>) -> Candidate {
    Candidate {
        item: item(source, title, chars, published_at),
        is_high_priority: false,
        matches_topic: true,
        contains_blocked_term: false,
        meets_length_threshold: true,
    }
}

fn test_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig::new("https://a.example/feed", "源A", "ai-tech")
            .trusted()
            .with_min_content_chars(100),
        SourceConfig::new("https://b.example/feed", "源B", "ai-research")
            .trusted()
            .with_min_content_chars(100),
        SourceConfig::new("https://c.example/feed", "源C", "ai-industry")
            .trusted()
            .with_min_content_chars(100),
        SourceConfig::new("https://d.example/feed", "源D", "ai-tech")
            .strict()
            .with_min_content_chars(120)
            .with_max_per_report(6)
            .with_relaxed_entry_gate(),
    ]
}

#[test]
fn renumbering_is_contiguous_and_idempotent() {
    init_tracing();
    let day = report_day();
    let entries: Vec<NewsEntry> = vec![("7、第一条", 7), ("2、第二条", 2), ("第三条", 0)]
        .into_iter()
        .map(|(title, n)| NewsEntry {
            id: format!("news{}", n),
            number: n,
            title: title.to_string(),
            keywords: String::new(),
            content: item("源A", "x", 300, at(day, 9)).content,
            summary: Vec::new(),
            source: String::new(),
            source_name: "源A".to_string(),
            category: "ai-tech".to_string(),
            content_length_sufficient: true,
        })
        .collect();

    let once = renumber(entries);
    assert_eq!(once[0].id, "news1");
    assert_eq!(once[0].title, "1、第一条");
    assert_eq!(once[1].title, "2、第二条");
    assert_eq!(once[2].title, "3、第三条");
    assert_eq!(
        once.iter().map(|e| e.number).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );

    let twice = renumber(once.clone());
    for (a, b) in once.iter().zip(&twice) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.title, b.title);
    }
}

#[test]
fn backfill_supplements_only_up_to_the_floor() {
    init_tracing();
    let day = report_day();
    let window = DateWindow::for_day(day, 3);
    let selector = Selector::new(SelectionConfig::default());
    let sources = test_sources();

    // 3 in-window items spread across sources, 10 backfill candidates.
    let mut candidates = vec![
        candidate("源A", "今1", 400, at(day, 9)),
        candidate("源B", "今2", 400, at(day, 10)),
        candidate("源C", "今3", 400, at(day, 11)),
    ];
    for i in 0..10 {
        let source = ["源A", "源B", "源C", "源D"][i % 4];
        candidates.push(candidate(
            source,
            &format!("旧{}", i),
            350,
            at(day - chrono::Duration::days(1 + (i as i64 % 3)), 12),
        ));
    }

    let selected = selector.select(candidates, &sources, &window);
    info!(selected = selected.len(), "floor supplementation result");

    // Floor is 8: 3 in-window plus exactly 5 supplements, in-window first.
    assert_eq!(selected.len(), 8);
    let in_window_count = selected
        .iter()
        .filter(|c| window.contains(c.item.published_at))
        .count();
    assert_eq!(in_window_count, 3);
    for c in &selected[..3] {
        assert!(window.contains(c.item.published_at));
    }
}

#[test]
fn stale_items_never_consume_source_cap_slots() {
    init_tracing();
    let day = report_day();
    let window = DateWindow::for_day(day, 3);
    let selector = Selector::new(SelectionConfig::default());
    let sources = test_sources();

    // 源A: 4 backfill items plus 4 long stale items beyond the horizon.
    // The stale ones must not outrank the backfill inside the cap.
    let mut candidates = vec![
        candidate("源B", "今1", 400, at(day, 9)),
        candidate("源B", "今2", 400, at(day, 10)),
        candidate("源B", "今3", 400, at(day, 11)),
    ];
    for i in 0..4 {
        candidates.push(candidate(
            "源A",
            &format!("补{}", i),
            350,
            at(day - chrono::Duration::days(1 + i as i64 % 3), 12),
        ));
    }
    for i in 0..4 {
        candidates.push(candidate(
            "源A",
            &format!("陈{}", i),
            900,
            at(day - chrono::Duration::days(10 + i as i64), 12),
        ));
    }

    let selected = selector.select(candidates, &sources, &window);

    // Floor 8 with only 3 in-window: all 4 backfill items supplement.
    assert_eq!(selected.len(), 7);
    let supplements = selected
        .iter()
        .filter(|c| window.in_backfill(c.item.published_at))
        .count();
    assert_eq!(supplements, 4);
    assert!(selected.iter().all(|c| {
        window.contains(c.item.published_at) || window.in_backfill(c.item.published_at)
    }));
}

#[test]
fn no_supplement_when_window_meets_floor() {
    init_tracing();
    let day = report_day();
    let window = DateWindow::for_day(day, 3);
    let selector = Selector::new(SelectionConfig::default());
    let sources = test_sources();

    let mut candidates = Vec::new();
    for i in 0..8 {
        let source = ["源A", "源B", "源C", "源D"][i % 4];
        candidates.push(candidate(source, &format!("今{}", i), 400, at(day, 9)));
    }
    candidates.push(candidate(
        "源A",
        "旧0",
        900,
        at(day - chrono::Duration::days(1), 12),
    ));

    let selected = selector.select(candidates, &sources, &window);
    assert_eq!(selected.len(), 8);
    assert!(selected
        .iter()
        .all(|c| window.contains(c.item.published_at)));
}

#[test]
fn per_source_cap_limits_prolific_sources() {
    init_tracing();
    let day = report_day();
    let window = DateWindow::for_day(day, 3);
    let selector = Selector::new(SelectionConfig::default());
    let sources = test_sources();

    let mut candidates = Vec::new();
    for i in 0..9 {
        candidates.push(candidate("源A", &format!("甲{}", i), 400, at(day, 9)));
    }
    for i in 0..9 {
        candidates.push(candidate("源D", &format!("丁{}", i), 400, at(day, 10)));
    }

    let selected = selector.select(candidates, &sources, &window);
    let from_a = selected.iter().filter(|c| c.item.source_name == "源A").count();
    let from_d = selected.iter().filter(|c| c.item.source_name == "源D").count();
    assert_eq!(from_a, 4);
    assert_eq!(from_d, 6);
}

#[test]
fn high_priority_outranks_length_and_recency() {
    init_tracing();
    let day = report_day();
    let window = DateWindow::for_day(day, 3);
    let selector = Selector::new(SelectionConfig::default());
    let sources = test_sources();

    let mut plain_long = candidate("源A", "普通长文", 900, at(day, 20));
    plain_long.is_high_priority = false;
    let mut priority_short = candidate("源B", "重大发布", 320, at(day, 8));
    priority_short.is_high_priority = true;

    let selected = selector.select(vec![plain_long, priority_short], &sources, &window);
    assert_eq!(selected[0].item.title, "重大发布");
}

#[tokio::test]
async fn content_gate_is_exact_at_the_threshold() -> Result<()> {
    init_tracing();
    let day = report_day();
    let config = ReportConfig::default();
    let summarizer = ResilientSummarizer::local_only();

    let short = candidate("源A", "短文", 299, at(day, 9));
    let long = candidate("源A", "长文", 300, at(day, 10));

    let entries = enrich_all(&summarizer, vec![short, long], &config).await;
    assert_eq!(entries.len(), 2);

    // 299 chars: no enrichment, flagged insufficient.
    assert!(!entries[0].content_length_sufficient);
    assert!(entries[0].summary.is_empty());
    assert!(entries[0].keywords.is_empty());

    // 300 chars: enriched, content capped at 250 with an ellipsis.
    assert!(entries[1].content_length_sufficient);
    assert_eq!(entries[1].summary.len(), 3);
    assert_eq!(entries[1].content.chars().count(), 250);
    assert!(entries[1].content.ends_with("..."));

    // The assembler drops the short one for a normal source.
    let assembler = ReportAssembler::new(config);
    let report = assembler.assemble(day, entries, &test_sources());
    assert_eq!(report.news_count, 1);
    assert_eq!(report.news[0].title, "1、长文");
    Ok(())
}

#[tokio::test]
async fn relaxed_gate_rescues_short_entries_from_flagged_sources() -> Result<()> {
    init_tracing();
    let day = report_day();
    let config = ReportConfig::default();
    let summarizer = ResilientSummarizer::local_only();

    // Same length, different sources; only 源D carries the relaxed gate.
    let from_a = candidate("源A", "甲短", 150, at(day, 9));
    let from_d = candidate("源D", "丁短", 150, at(day, 10));

    let entries = enrich_all(&summarizer, vec![from_a, from_d], &config).await;
    let assembler = ReportAssembler::new(config);
    let report = assembler.assemble(day, entries, &test_sources());

    assert_eq!(report.news_count, 1);
    assert_eq!(report.news[0].source_name, "源D");
    Ok(())
}

#[tokio::test]
async fn local_summary_has_exactly_three_marked_points() -> Result<()> {
    init_tracing();
    let local = LocalSummarizer;

    // Content with only one usable sentence still yields three points.
    let points = local
        .summarize("标题", "这是唯一一句足够长的话。短。", "源A")
        .await?;
    assert_eq!(points.len(), 3);
    for point in &points {
        assert!(
            SUMMARY_MARKERS.iter().any(|m| point.starts_with(m)),
            "point missing marker: {}",
            point
        );
        let body = point.splitn(2, ' ').nth(1).unwrap_or_default();
        assert!(body.chars().count() <= 60, "point too long: {}", point);
    }
    Ok(())
}

#[tokio::test]
async fn local_keywords_are_short_ranked_terms() -> Result<()> {
    init_tracing();
    let local = LocalSummarizer;
    let keywords = local
        .extract_keywords(
            "寒武纪发布新款训练芯片",
            "寒武纪 今日发布新一代训练芯片，寒武纪 表示该芯片面向大模型训练场景，芯片 算力较上代翻倍。",
            "源A",
        )
        .await?;

    let parts: Vec<&str> = keywords.split(' ').collect();
    assert!(!parts.is_empty() && parts.len() <= 3);
    for part in &parts {
        assert!(part.chars().count() <= 4, "keyword too long: {}", part);
    }
    assert!(parts.contains(&"寒武纪"));
    Ok(())
}

struct FailingSummarizer;

#[async_trait::async_trait]
impl Summarizer for FailingSummarizer {
    async fn summarize(&self, _: &str, _: &str, _: &str) -> Result<Vec<String>> {
        Err(AggregatorError::Summarizer("unavailable".to_string()))
    }
    async fn extract_keywords(&self, _: &str, _: &str, _: &str) -> Result<String> {
        Err(AggregatorError::Summarizer("unavailable".to_string()))
    }
    async fn condense(&self, _: &str, _: &str) -> Result<String> {
        Err(AggregatorError::Summarizer("unavailable".to_string()))
    }
}

#[tokio::test]
async fn remote_failures_fall_back_without_losing_entries() -> Result<()> {
    init_tracing();
    let day = report_day();
    let remote: Arc<dyn Summarizer> = Arc::new(FailingSummarizer);
    let summarizer = ResilientSummarizer::new(Some(remote));
    let config = ReportConfig::default();

    let candidates = vec![
        candidate("源A", "第一条", 400, at(day, 9)),
        candidate("源B", "第二条", 400, at(day, 10)),
    ];
    let entries = enrich_all(&summarizer, candidates, &config).await;

    // Fallback enrichment per entry, original order preserved.
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].title, "1、第一条");
    assert_eq!(entries[1].title, "2、第二条");
    for entry in &entries {
        assert_eq!(entry.summary.len(), 3);
        assert!(!entry.keywords.is_empty());
    }
    Ok(())
}

struct TerseSummarizer;

#[async_trait::async_trait]
impl Summarizer for TerseSummarizer {
    async fn summarize(&self, _: &str, _: &str, _: &str) -> Result<Vec<String>> {
        Ok(vec!["✨ 仅有一条要点".to_string()])
    }
    async fn extract_keywords(&self, _: &str, _: &str, _: &str) -> Result<String> {
        Ok("模型".to_string())
    }
    async fn condense(&self, _: &str, content: &str) -> Result<String> {
        Ok(content.to_string())
    }
}

#[tokio::test]
async fn terse_remote_summaries_are_padded_to_three_points() -> Result<()> {
    init_tracing();
    let day = report_day();
    let config = ReportConfig::default();

    let entries = enrich_all(
        &TerseSummarizer,
        vec![candidate("源A", "要闻", 400, at(day, 9))],
        &config,
    )
    .await;

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].summary.len(), 3);
    assert_eq!(entries[0].summary[0], "✨ 仅有一条要点");
    for point in &entries[0].summary[1..] {
        assert!(SUMMARY_MARKERS.iter().any(|m| point.starts_with(m)));
    }
    Ok(())
}

#[tokio::test]
async fn inverted_date_range_is_rejected_before_fetching() -> Result<()> {
    init_tracing();
    let dir = tempfile::TempDir::new()?;
    let config = AggregatorConfig {
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let aggregator = NewsAggregator::new(config, ResilientSummarizer::local_only())?;

    let start = NaiveDate::from_ymd_opt(2026, 3, 28).unwrap();
    let end = NaiveDate::from_ymd_opt(2026, 3, 25).unwrap();
    let result = aggregator.multi_date_reports(start, end).await;
    assert!(matches!(
        result,
        Err(AggregatorError::InvalidRange { .. })
    ));
    Ok(())
}

#[test]
fn strict_sources_never_get_the_trust_bypass() {
    init_tracing();
    let filter = RelevanceFilter::new(KeywordConfig::default());
    let day = report_day();

    let trusted = SourceConfig::new("https://a.example/feed", "源A", "ai-tech")
        .trusted()
        .with_min_content_chars(100);
    let strict = SourceConfig::new("https://d.example/feed", "源D", "ai-tech")
        .strict()
        .with_min_content_chars(100);

    let mut off_topic = item("源A", "时尚周报", 300, at(day, 9));
    off_topic.content = format!("本季服饰流行趋势回顾。{}", "衣".repeat(290));

    // Trusted source retains off-topic items; strict source does not.
    let c = filter.evaluate(off_topic.clone(), &trusted);
    assert!(!c.matches_topic);
    assert!(filter.retains(&c, &trusted));

    let mut off_topic_strict = off_topic;
    off_topic_strict.source_name = "源D".to_string();
    let c = filter.evaluate(off_topic_strict, &strict);
    assert!(!filter.retains(&c, &strict));
}

#[test]
fn excluded_terms_reject_even_trusted_matches() {
    init_tracing();
    let filter = RelevanceFilter::new(KeywordConfig::default());
    let day = report_day();

    let trusted = SourceConfig::new("https://a.example/feed", "源A", "ai-tech")
        .trusted()
        .with_min_content_chars(100);

    let mut hyped = item("源A", "大模型新品", 300, at(day, 9));
    hyped.content = format!("这款大模型产品被指营销炒作。{}", "评".repeat(290));

    let c = filter.evaluate(hyped, &trusted);
    assert!(c.matches_topic);
    assert!(c.contains_blocked_term);
    assert!(!filter.retains(&c, &trusted));
}

#[tokio::test]
async fn end_to_end_report_from_four_sources() -> Result<()> {
    init_tracing();
    let day = report_day();
    let sources = test_sources();
    let filter = RelevanceFilter::new(KeywordConfig::default());
    let selector = Selector::new(SelectionConfig::default());
    let summarizer = ResilientSummarizer::local_only();
    let report_config = ReportConfig::default();
    let assembler = ReportAssembler::new(report_config.clone());

    let mut items: Vec<(usize, FeedItem)> = Vec::new();
    for (si, source) in sources.iter().enumerate() {
        for i in 0..3 {
            let mut it = item(
                &source.name,
                &format!("{}模型进展{}", source.name, i),
                400,
                at(day, 8 + i),
            );
            it.content = format!("{}发布大模型新进展。{}", source.name, "详".repeat(390));
            items.push((si, it));
        }
    }

    let mut candidates = Vec::new();
    for (si, it) in items {
        candidates.extend(filter.retain_batch(vec![it], &sources[si]));
    }

    let window = DateWindow::for_day(day, 3);
    let selected = selector.select(candidates, &sources, &window);
    let entries = enrich_all(&summarizer, selected, &report_config).await;
    let report = assembler.assemble(day, entries, &sources);

    info!(title = %report.title, count = report.news_count, "end-to-end report");

    assert_eq!(report.date, "2026-03-28");
    assert_eq!(report.chinese_date, "3月28日");
    assert!(report.news_count >= 8);
    assert_eq!(report.news_count, report.news.len());

    // Title carries the first three raw entry titles.
    assert!(report.title.starts_with("AI日报: "));
    assert!(report.title.contains(report.news[0].raw_title()));

    // Contiguous ids and numbering.
    for (i, entry) in report.news.iter().enumerate() {
        assert_eq!(entry.id, format!("news{}", i + 1));
        assert_eq!(entry.number, i + 1);
        assert!(entry.title.starts_with(&format!("{}、", i + 1)));
        assert_eq!(entry.summary.len(), 3);
        assert!(entry.content.chars().count() <= 250);
    }
    Ok(())
}

#[test]
fn empty_selection_yields_fallback_title() {
    init_tracing();
    let assembler = ReportAssembler::new(ReportConfig::default());
    let report = assembler.assemble(report_day(), Vec::new(), &test_sources());
    assert_eq!(report.news_count, 0);
    assert_eq!(report.title, "AI日报: 今日AI行业热点资讯");
}
