//! Dated scan archive.
//!
//! Each scan is stored as `rbac-scan-YYYY-MM-DD.json` with a sibling
//! `scan-YYYY-MM-DD-metadata.json`. A later scan is compared against the
//! newest archive from an earlier day.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use permiflow_rbac::report::{self, ReportFormat};
use permiflow_rbac::{DiffResult, Snapshot, diff};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::capture::{load_snapshot, write_report};

const SCAN_PREFIX: &str = "rbac-scan-";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Written next to every archived scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanMetadata {
    pub date: NaiveDate,
    pub timestamp: DateTime<Utc>,
    pub cluster_context: String,
    pub binding_count: usize,
    pub warning_count: usize,
    pub version: String,
}

impl ScanMetadata {
    fn of(snapshot: &Snapshot) -> Self {
        Self {
            date: snapshot.timestamp().date_naive(),
            timestamp: snapshot.timestamp(),
            cluster_context: snapshot.cluster_context().to_string(),
            binding_count: snapshot.bindings().len(),
            warning_count: snapshot.warning_count(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Outcome of [`History::record`].
#[derive(Debug)]
pub struct Recorded {
    pub archived: PathBuf,
    /// Date of the archive compared against, if there was one.
    pub previous: Option<NaiveDate>,
    pub drift: Option<DiffResult>,
}

pub struct History {
    dir: PathBuf,
}

impl History {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn scan_path(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{SCAN_PREFIX}{}.json", date.format(DATE_FORMAT)))
    }

    fn metadata_path(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("scan-{}-metadata.json", date.format(DATE_FORMAT)))
    }

    /// Stores `snapshot` under its own date, replacing an earlier scan of the
    /// same day.
    pub fn archive(&self, snapshot: &Snapshot) -> Result<PathBuf> {
        let metadata = ScanMetadata::of(snapshot);
        let scan_path = self.scan_path(metadata.date);

        write_report(&scan_path, &report::snapshot_json(snapshot)?)?;

        let mut metadata_json = serde_json::to_string_pretty(&metadata)?;
        metadata_json.push('\n');
        write_report(&self.metadata_path(metadata.date), &metadata_json)?;

        debug!(path = %scan_path.display(), "Archived scan");
        Ok(scan_path)
    }

    /// Dates with an archived scan, oldest first.
    pub fn dates(&self) -> Result<Vec<NaiveDate>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read history directory {}", self.dir.display()))?;

        let mut dates = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            let Some(date) = name
                .to_str()
                .and_then(|n| n.strip_prefix(SCAN_PREFIX))
                .and_then(|n| n.strip_suffix(".json"))
                .and_then(|d| NaiveDate::parse_from_str(d, DATE_FORMAT).ok())
            else {
                continue;
            };
            dates.push(date);
        }
        dates.sort();
        Ok(dates)
    }

    /// Newest archived date strictly before `date`.
    pub fn previous(&self, date: NaiveDate) -> Result<Option<NaiveDate>> {
        Ok(self.dates()?.into_iter().rev().find(|d| *d < date))
    }

    /// Archives `snapshot`, then diffs it against the previous archive and
    /// writes `daily-diff.json` and `daily-diff.md` into `report_dir`.
    pub fn record(&self, snapshot: &Snapshot, report_dir: &Path) -> Result<Recorded> {
        let date = snapshot.timestamp().date_naive();
        let previous = self.previous(date)?;
        let archived = self.archive(snapshot)?;

        let Some(previous) = previous else {
            info!(dir = %self.dir.display(), "No earlier scan in history");
            return Ok(Recorded {
                archived,
                previous: None,
                drift: None,
            });
        };

        let baseline = load_snapshot(&self.scan_path(previous))?;
        let drift = diff(&baseline, snapshot);

        for format in [ReportFormat::Json, ReportFormat::Markdown] {
            let path = report_dir.join(format!("daily-diff.{}", format.extension()));
            write_report(&path, &report::render_diff(&drift, format)?)?;
        }

        info!(
            previous = %previous,
            drift = %drift.summary(),
            "Compared against previous scan"
        );

        Ok(Recorded {
            archived,
            previous: Some(previous),
            drift: Some(drift),
        })
    }
}
