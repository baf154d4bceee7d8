//! Configuration management commands.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use permiflow_config::{PermiflowConfig, is_initialized, project_config_file};

use crate::style::colors::SemanticStyle;
use crate::style::{info_table, print_error, print_hint, print_success};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    #[default]
    Text,
    Toml,
    Json,
}

const TEMPLATE_HEADER: &str = "\
# Permiflow configuration.
#
# Precedence, lowest to highest: built-in defaults, the user config file,
# this file, permiflow.local.toml, PERMIFLOW_* environment variables
# (e.g. PERMIFLOW_SCAN__NAMESPACES=prod,staging), then command-line flags.
#
# [cluster] also accepts `context` and `kubeconfig`.
# [history] directory = \"history\" archives every scan and writes daily diffs.

";

/// Show the effective configuration.
pub fn show(project_dir: &Path, format: ConfigFormat) -> Result<()> {
    let config =
        PermiflowConfig::load_from_dir(project_dir).context("Failed to load configuration")?;

    match format {
        ConfigFormat::Json => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{json}");
        }
        ConfigFormat::Toml => print!("{}", config.to_toml()?),
        ConfigFormat::Text => {
            let namespaces = if config.scan.namespaces.is_empty() {
                "(all)".to_string()
            } else {
                config
                    .scan
                    .namespaces
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(",")
            };
            let unset = || "(unset)".to_string();

            println!("{}", "Permiflow Configuration".header());
            println!(
                "{}",
                info_table(&[
                    ("scan.namespaces", namespaces),
                    ("scan.output_dir", config.scan.output_dir.display().to_string()),
                    ("scan.fail_on_high_risk", config.scan.fail_on_high_risk.to_string()),
                    ("scan.fail_on_drift", config.scan.fail_on_drift.to_string()),
                    ("cluster.context", config.cluster.context.clone().unwrap_or_else(unset)),
                    (
                        "cluster.kubeconfig",
                        config
                            .cluster
                            .kubeconfig
                            .as_ref()
                            .map_or_else(unset, |p| p.display().to_string()),
                    ),
                    ("cluster.kubeconfig_env", config.cluster.kubeconfig_env.clone()),
                    ("cluster.kubectl", config.cluster.kubectl.display().to_string()),
                    (
                        "history.directory",
                        config
                            .history
                            .directory
                            .as_ref()
                            .map_or_else(unset, |p| p.display().to_string()),
                    ),
                ])
            );
        }
    }

    Ok(())
}

/// Validate one configuration file, or the layered configuration.
pub fn validate(project_dir: &Path, file: Option<&Path>) -> Result<()> {
    let result = match file {
        Some(path) => PermiflowConfig::from_file(path)
            .and_then(|config| config.validate())
            .with_context(|| format!("Invalid configuration in {}", path.display())),
        None => PermiflowConfig::load_from_dir(project_dir).map(|_| ()),
    };

    match result {
        Ok(()) => {
            print_success("Configuration is valid");
            Ok(())
        }
        Err(e) => {
            print_error("Configuration validation failed");
            if file.is_none() && !is_initialized(project_dir) {
                print_hint("No permiflow.toml here; run 'permiflow config init' to create one");
            }
            Err(e)
        }
    }
}

/// Write a commented permiflow.toml with the default settings.
pub fn init(project_dir: &Path, force: bool) -> Result<()> {
    let path = project_config_file(project_dir);
    if path.exists() && !force {
        bail!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        );
    }

    let body = PermiflowConfig::default()
        .to_toml()
        .context("Failed to serialize configuration")?;
    fs::create_dir_all(project_dir)
        .with_context(|| format!("Failed to create {}", project_dir.display()))?;
    fs::write(&path, format!("{TEMPLATE_HEADER}{body}"))
        .with_context(|| format!("Failed to write {}", path.display()))?;

    print_success(&format!("Wrote {}", path.display().code()));
    Ok(())
}
