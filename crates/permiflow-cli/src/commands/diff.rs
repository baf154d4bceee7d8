//! Diff command - compare a baseline scan against a later scan.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;
use permiflow_config::PermiflowConfig;
use permiflow_rbac::report::{self, ReportFormat};
use permiflow_rbac::{DiffResult, diff};
use tracing::info;

use crate::capture::{SourceArgs, capture, load_snapshot, write_report};
use crate::style::colors::{SemanticStyle, risk_label};
use crate::style::{drift_summary_table, print_spacer, print_success, print_table, print_warn};

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Earlier scan report (JSON).
    #[arg(long, value_name = "FILE")]
    pub baseline: PathBuf,

    /// Later scan report (JSON). Scans the cluster when omitted.
    #[arg(long, value_name = "FILE", conflicts_with = "objects")]
    pub current: Option<PathBuf>,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Write the report to a file instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Report format (json, markdown, csv).
    #[arg(short, long, default_value = "json")]
    pub format: ReportFormat,

    /// Exit non-zero when anything changed.
    #[arg(long)]
    pub fail_on_drift: bool,
}

pub fn run(args: &DiffArgs, config: &PermiflowConfig) -> Result<()> {
    let baseline = load_snapshot(&args.baseline)?;
    let current = match &args.current {
        Some(path) => load_snapshot(path)?,
        None => capture(&args.source, config)?,
    };

    let result = diff(&baseline, &current);
    let summary = result.summary();
    info!(drift = %summary, "Diff complete");

    let rendered = report::render_diff(&result, args.format)?;
    match &args.output {
        Some(path) => {
            write_report(path, &rendered)?;
            print_success(&format!("Wrote {}", path.display().code()));
        }
        None => print!("{rendered}"),
    }

    print_spacer();
    print_table(&drift_summary_table(&summary));
    warn_escalations(&result);

    let fail_on_drift = args.fail_on_drift || config.scan.fail_on_drift;
    if fail_on_drift && !result.is_empty() {
        bail!("RBAC drift detected: {summary}");
    }

    Ok(())
}

fn warn_escalations(result: &DiffResult) {
    for change in result.escalations() {
        print_warn(&format!(
            "{} escalated {} -> {}",
            change.after.binding_ref.name,
            risk_label(change.before.risk),
            risk_label(change.after.risk)
        ));
    }
}
