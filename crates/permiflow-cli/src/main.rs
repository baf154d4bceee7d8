//! Permiflow CLI.
//!
//! Snapshots the RBAC bindings of a Kubernetes cluster, classifies each one by
//! risk, and reports drift between two snapshots.
//!
//! # Quick Start
//!
//! ```bash
//! # Scan the current context and keep the reports
//! permiflow scan --output-dir reports
//!
//! # Scan only two namespaces (ClusterRoleBindings are always included)
//! permiflow scan --namespaces prod,staging --format markdown
//!
//! # Compare yesterday's scan with the cluster as it is now
//! permiflow diff --baseline reports/rbac-scan.json --fail-on-drift
//! ```
//!
//! Reports go to stdout unless `--output` or `--output-dir` is given; status
//! messages, tables and logs go to stderr.

mod capture;
mod commands;
mod credentials;
mod history;
mod kubectl;
mod style;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use permiflow_config::PermiflowConfig;
use tracing_subscriber::EnvFilter;

use commands::config::ConfigFormat;
use commands::diff::DiffArgs;
use commands::scan::ScanArgs;
use commands::summary::SummaryFormat;

/// Permiflow - Kubernetes RBAC scanning, risk classification and drift detection.
#[derive(Parser)]
#[command(name = "permiflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Disable colored output.
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Directory holding permiflow.toml.
    #[arg(long, global = true, value_name = "DIR", default_value = ".")]
    project_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version information.
    Version,

    /// Snapshot every binding and classify its risk.
    Scan(ScanArgs),

    /// Compare a baseline scan against a later one.
    Diff(DiffArgs),

    /// Print the risk counts of a saved scan.
    Summary {
        /// Scan report (JSON).
        file: PathBuf,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = SummaryFormat::Text)]
        format: SummaryFormat,
    },

    /// Configuration management.
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration.
    Show {
        /// Output format.
        #[arg(short, long, value_enum, default_value_t = ConfigFormat::Text)]
        format: ConfigFormat,
    },

    /// Validate configuration.
    Validate {
        /// Check this file alone instead of the layered configuration.
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Write a permiflow.toml with default settings.
    Init {
        /// Overwrite an existing permiflow.toml.
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    style::set_no_color(cli.no_color);

    // Logs share stderr with status output; stdout carries reports.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color)
        .init();

    match cli.command {
        Commands::Version => {
            commands::version::run();
            Ok(())
        }
        Commands::Scan(args) => {
            let config = PermiflowConfig::load_from_dir(&cli.project_dir)?;
            commands::scan::run(&args, &config)
        }
        Commands::Diff(args) => {
            let config = PermiflowConfig::load_from_dir(&cli.project_dir)?;
            commands::diff::run(&args, &config)
        }
        Commands::Summary { file, format } => commands::summary::run(&file, format),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show { format } => commands::config::show(&cli.project_dir, format),
            ConfigCommands::Validate { file } => {
                commands::config::validate(&cli.project_dir, file.as_deref())
            }
            ConfigCommands::Init { force } => commands::config::init(&cli.project_dir, force),
        },
    }
}
