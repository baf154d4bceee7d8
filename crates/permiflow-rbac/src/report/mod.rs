//! Report emitters.
//!
//! JSON is the contract downstream automation parses: field names and array
//! presence never change, and equal inputs always produce equal bytes.
//! Markdown and CSV are presentation formats.

mod csv;
mod json;
mod markdown;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diff::DiffResult;
use crate::snapshot::{RiskSummary, Snapshot};

pub use self::csv::{diff_csv, snapshot_csv};
pub use self::json::{diff_json, snapshot_json, summary_json};
pub use self::markdown::{diff_markdown, snapshot_markdown};

/// Error type for report rendering.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("unknown report format '{0}' (expected json, markdown or csv)")]
    UnknownFormat(String),
}

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

/// Output format for scan and diff reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Json,
    Markdown,
    Csv,
}

impl ReportFormat {
    /// Every format, in the order `--output-dir` writes them.
    pub const ALL: [ReportFormat; 3] = [ReportFormat::Json, ReportFormat::Markdown, ReportFormat::Csv];

    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Markdown => "md",
            ReportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Json => f.write_str("json"),
            ReportFormat::Markdown => f.write_str("markdown"),
            ReportFormat::Csv => f.write_str("csv"),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            "csv" => Ok(ReportFormat::Csv),
            _ => Err(ReportError::UnknownFormat(s.to_string())),
        }
    }
}

/// Renders a scan report.
pub fn render_snapshot(snapshot: &Snapshot, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => snapshot_json(snapshot),
        ReportFormat::Markdown => Ok(snapshot_markdown(snapshot)),
        ReportFormat::Csv => Ok(snapshot_csv(snapshot)),
    }
}

/// Renders a drift report.
pub fn render_diff(diff: &DiffResult, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => diff_json(diff),
        ReportFormat::Markdown => Ok(diff_markdown(diff)),
        ReportFormat::Csv => Ok(diff_csv(diff)),
    }
}

impl fmt::Display for RiskSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HIGH: {}, MEDIUM: {}, LOW: {}, TOTAL: {}",
            self.high, self.medium, self.low, self.total
        )
    }
}
