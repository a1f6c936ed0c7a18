//! Date-keyed report persistence.
//!
//! One JSON record per date under `archives/`, plus the single current
//! report at a fixed key. Writes go to a temp file and are renamed into
//! place, so a reader never observes a half-written report.

use crate::types::{AggregatorError, ArchiveSummary, Report, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

const CURRENT_FILE: &str = "current-report.json";
const ARCHIVE_DIR: &str = "archives";

static ARCHIVE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^report-(\d{4}-\d{2}-\d{2})\.json$").unwrap());

pub struct ArchiveStore {
    root: PathBuf,
}

impl ArchiveStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(ARCHIVE_DIR))?;
        Ok(Self { root })
    }

    fn current_path(&self) -> PathBuf {
        self.root.join(CURRENT_FILE)
    }

    fn archive_path(&self, date: &str) -> PathBuf {
        self.root.join(ARCHIVE_DIR).join(format!("report-{}.json", date))
    }

    /// Overwrite the current report. The previous current stays intact
    /// until the new value is fully on disk.
    pub fn save_current(&self, report: &Report) -> Result<()> {
        write_atomic(&self.current_path(), report)?;
        info!(date = %report.date, "current report saved");
        Ok(())
    }

    /// The current report, or `None` when none has been generated yet.
    pub fn load_current(&self) -> Result<Option<Report>> {
        let path = self.current_path();
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(read_report(&path)?))
    }

    /// Write/overwrite the archive record keyed by the report's date.
    /// Later writes for the same date replace, never append.
    pub fn save_archived(&self, report: &Report) -> Result<()> {
        write_atomic(&self.archive_path(&report.date), report)?;
        info!(date = %report.date, "report archived");
        Ok(())
    }

    /// Copy the current report into the archive. Idempotent; returns
    /// whether anything was archived.
    pub fn archive_current(&self) -> Result<bool> {
        match self.load_current()? {
            Some(report) => {
                self.save_archived(&report)?;
                Ok(true)
            }
            None => {
                debug!("no current report to archive");
                Ok(false)
            }
        }
    }

    /// All archived reports except the one sharing the current report's
    /// date, newest first.
    pub fn list_archived(&self) -> Result<Vec<ArchiveSummary>> {
        let current_date = self.load_current()?.map(|r| r.date);

        let mut summaries = Vec::new();
        for entry in fs::read_dir(self.root.join(ARCHIVE_DIR))? {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !ARCHIVE_KEY_RE.is_match(&file_name) {
                continue;
            }
            let report = match read_report(&entry.path()) {
                Ok(report) => report,
                Err(e) => {
                    warn!(file = %file_name, error = %e, "skipping unreadable archive record");
                    continue;
                }
            };
            if Some(&report.date) == current_date.as_ref() {
                continue;
            }
            summaries.push(ArchiveSummary {
                date: report.date,
                chinese_date: report.chinese_date,
                title: report.title,
                news_count: report.news_count,
                file_path: file_name,
            });
        }

        summaries.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(summaries)
    }

    /// Fetch one archived report by key. Accepts either the bare date or
    /// the full `report-{date}.json` file name.
    pub fn get(&self, key: &str) -> Result<Report> {
        let date = ARCHIVE_KEY_RE
            .captures(key)
            .map(|c| c[1].to_string())
            .unwrap_or_else(|| key.to_string());
        crate::types::parse_date_param(&date)?;

        let path = self.archive_path(&date);
        if !path.exists() {
            return Err(AggregatorError::ReportNotFound {
                key: key.to_string(),
            });
        }
        read_report(&path)
    }
}

fn read_report(path: &Path) -> Result<Report> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

fn write_atomic(path: &Path, report: &Report) -> Result<()> {
    let data = serde_json::to_string_pretty(report)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
