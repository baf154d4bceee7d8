//! Summary command - risk counts of a saved scan.

use std::path::Path;

use anyhow::Result;
use clap::ValueEnum;
use permiflow_rbac::report;

use crate::capture::load_snapshot;
use crate::style::colors::SemanticStyle;
use crate::style::risk_summary_table;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SummaryFormat {
    /// Table for humans.
    #[default]
    Text,
    /// `{"high": .., "medium": .., "low": .., "total": ..}`.
    Json,
    /// `HIGH_COUNT=..` lines for shell `source` or CI env files.
    Env,
}

pub fn run(file: &Path, format: SummaryFormat) -> Result<()> {
    let snapshot = load_snapshot(file)?;
    let summary = snapshot.risk_summary();

    match format {
        SummaryFormat::Text => {
            println!("{}", "RBAC risk summary".header());
            if !snapshot.cluster_context().is_empty() {
                println!("{} {}", "Context:".muted(), snapshot.cluster_context());
            }
            println!("{} {}", "Scanned:".muted(), snapshot.timestamp().to_rfc3339());
            println!("{}", risk_summary_table(&summary));
        }
        SummaryFormat::Json => print!("{}", report::summary_json(&summary)?),
        SummaryFormat::Env => print!("{}", summary.to_env()),
    }

    Ok(())
}
