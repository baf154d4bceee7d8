//! Scan command - snapshot the cluster's bindings and report their risk.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::Args;
use permiflow_config::PermiflowConfig;
use permiflow_rbac::report::{self, ReportFormat};
use permiflow_rbac::Snapshot;
use tracing::info;

use crate::capture::{SourceArgs, capture, write_report};
use crate::history::History;
use crate::style::colors::SemanticStyle;
use crate::style::{
    print_hint, print_labeled, print_spacer, print_success, print_table, risk_summary_table,
};

#[derive(Debug, Args)]
pub struct ScanArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Write the report to a file instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Report format (json, markdown, csv).
    #[arg(short, long, default_value = "json")]
    pub format: ReportFormat,

    /// Write rbac-scan.json, rbac-scan.md and rbac-scan.csv into a directory.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Archive the scan here and compare it with the previous one.
    #[arg(long, value_name = "DIR")]
    pub history_dir: Option<PathBuf>,

    /// Exit non-zero when any binding is HIGH risk.
    #[arg(long)]
    pub fail_on_high_risk: bool,
}

pub fn run(args: &ScanArgs, config: &PermiflowConfig) -> Result<()> {
    let snapshot = capture(&args.source, config)?;
    let summary = snapshot.risk_summary();

    info!(
        context = %snapshot.cluster_context(),
        bindings = summary.total,
        high = summary.high,
        warnings = snapshot.warning_count(),
        "Scan complete"
    );

    if let Some(dir) = &args.output_dir {
        write_all_formats(&snapshot, dir)?;
    }

    if let Some(path) = &args.output {
        write_report(path, &report::render_snapshot(&snapshot, args.format)?)?;
        print_success(&format!("Wrote {}", path.display().code()));
    } else if args.output_dir.is_none() {
        print!("{}", report::render_snapshot(&snapshot, args.format)?);
    }

    let history_dir = args
        .history_dir
        .as_ref()
        .or(config.history.directory.as_ref());
    if let Some(history_dir) = history_dir {
        let report_dir = args
            .output_dir
            .as_deref()
            .unwrap_or(config.scan.output_dir.as_path());
        record_history(&snapshot, history_dir, report_dir)?;
    }

    print_spacer();
    print_table(&risk_summary_table(&summary));

    let fail_on_high_risk = args.fail_on_high_risk || config.scan.fail_on_high_risk;
    if fail_on_high_risk && summary.high > 0 {
        bail!("{} HIGH risk binding(s) found", summary.high);
    }

    Ok(())
}

fn write_all_formats(snapshot: &Snapshot, dir: &Path) -> Result<()> {
    for format in ReportFormat::ALL {
        let path = dir.join(format!("rbac-scan.{}", format.extension()));
        write_report(&path, &report::render_snapshot(snapshot, format)?)?;
    }
    print_success(&format!("Wrote reports to {}", dir.display().code()));
    Ok(())
}

fn record_history(snapshot: &Snapshot, history_dir: &Path, report_dir: &Path) -> Result<()> {
    let recorded = History::new(history_dir).record(snapshot, report_dir)?;
    print_labeled("Archived", &recorded.archived.display().to_string());

    match (recorded.previous, recorded.drift) {
        (Some(previous), Some(drift)) => {
            print_labeled("Since", &previous.to_string());
            print_labeled("Drift", &drift.summary().to_string());
        }
        _ => print_hint("No earlier scan to compare against"),
    }
    Ok(())
}
