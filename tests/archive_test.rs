use daily_news::types::*;
use daily_news::ArchiveStore;
use tempfile::TempDir;

fn sample_report(date: &str, title: &str) -> Report {
    Report {
        date: date.to_string(),
        chinese_date: "3月28日".to_string(),
        time: "07:30".to_string(),
        title: format!("AI日报: {}", title),
        news: vec![NewsEntry {
            id: "news1".to_string(),
            number: 1,
            title: format!("1、{}", title),
            keywords: "模型 芯片".to_string(),
            content: "内容。".repeat(100),
            summary: vec!["✨ 要点一".to_string()],
            source: "https://example.com/a".to_string(),
            source_name: "源A".to_string(),
            category: "ai-tech".to_string(),
            content_length_sufficient: true,
        }],
        news_count: 1,
    }
}

#[test]
fn current_report_round_trip() -> Result<()> {
    let dir = TempDir::new()?;
    let store = ArchiveStore::new(dir.path())?;

    assert!(store.load_current()?.is_none());

    let report = sample_report("2026-03-28", "模型发布");
    store.save_current(&report)?;

    let loaded = store.load_current()?.unwrap();
    assert_eq!(loaded.date, "2026-03-28");
    assert_eq!(loaded.news_count, 1);
    assert_eq!(loaded.news[0].title, "1、模型发布");
    Ok(())
}

#[test]
fn listing_excludes_the_current_date() -> Result<()> {
    let dir = TempDir::new()?;
    let store = ArchiveStore::new(dir.path())?;

    let today = sample_report("2026-03-28", "今日要闻");
    let yesterday = sample_report("2026-03-27", "昨日要闻");
    let older = sample_report("2026-03-25", "更早要闻");

    store.save_current(&today)?;
    store.save_archived(&today)?;
    store.save_archived(&yesterday)?;
    store.save_archived(&older)?;

    // A report is never both current and listed as archived.
    let listed = store.list_archived()?;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].date, "2026-03-27");
    assert_eq!(listed[1].date, "2026-03-25");
    assert!(listed.iter().all(|s| s.date != "2026-03-28"));
    assert_eq!(listed[0].file_path, "report-2026-03-27.json");

    // Once a newer report becomes current, the old date shows up.
    let next = sample_report("2026-03-29", "次日要闻");
    store.save_current(&next)?;
    let listed = store.list_archived()?;
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0].date, "2026-03-28");
    Ok(())
}

#[test]
fn archiving_the_same_date_replaces_not_appends() -> Result<()> {
    let dir = TempDir::new()?;
    let store = ArchiveStore::new(dir.path())?;

    store.save_archived(&sample_report("2026-03-28", "第一版"))?;
    store.save_archived(&sample_report("2026-03-28", "第二版"))?;

    let report = store.get("2026-03-28")?;
    assert_eq!(report.title, "AI日报: 第二版");

    store.save_current(&sample_report("2026-03-29", "次日"))?;
    assert_eq!(store.list_archived()?.len(), 1);
    Ok(())
}

#[test]
fn archive_current_is_idempotent() -> Result<()> {
    let dir = TempDir::new()?;
    let store = ArchiveStore::new(dir.path())?;

    assert!(!store.archive_current()?);

    store.save_current(&sample_report("2026-03-28", "今日要闻"))?;
    assert!(store.archive_current()?);
    assert!(store.archive_current()?);

    let archived = store.get("2026-03-28")?;
    assert_eq!(archived.title, "AI日报: 今日要闻");
    Ok(())
}

#[test]
fn get_accepts_date_or_file_name() -> Result<()> {
    let dir = TempDir::new()?;
    let store = ArchiveStore::new(dir.path())?;
    store.save_archived(&sample_report("2026-03-28", "今日要闻"))?;

    assert_eq!(store.get("2026-03-28")?.date, "2026-03-28");
    assert_eq!(store.get("report-2026-03-28.json")?.date, "2026-03-28");
    Ok(())
}

#[test]
fn get_rejects_bad_keys() -> Result<()> {
    let dir = TempDir::new()?;
    let store = ArchiveStore::new(dir.path())?;

    assert!(matches!(
        store.get("not-a-date"),
        Err(AggregatorError::InvalidDate { .. })
    ));
    assert!(matches!(
        store.get("../etc/passwd"),
        Err(AggregatorError::InvalidDate { .. })
    ));
    assert!(matches!(
        store.get("2026-03-28"),
        Err(AggregatorError::ReportNotFound { .. })
    ));
    Ok(())
}

#[test]
fn listing_skips_foreign_files() -> Result<()> {
    let dir = TempDir::new()?;
    let store = ArchiveStore::new(dir.path())?;
    store.save_archived(&sample_report("2026-03-28", "今日要闻"))?;

    let archives = dir.path().join("archives");
    std::fs::write(archives.join("notes.txt"), "unrelated")?;
    std::fs::write(archives.join("report-2026-03-27.json"), "{ not json")?;

    // Non-matching names are ignored; unreadable records are skipped.
    let listed = store.list_archived()?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].date, "2026-03-28");
    Ok(())
}
