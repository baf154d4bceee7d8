//! Configuration loader with multi-source merging

use crate::{ConfigFiles, PermiflowConfig};
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    env_vars: Option<config::Map<String, String>>,
    user_config: bool,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "PERMIFLOW".to_string(),
            env_vars: None,
            user_config: true,
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "PERMIFLOW")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Read environment overrides from `vars` instead of the process environment
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Skip ~/.config/permiflow/config.toml
    pub fn without_user_config(mut self) -> Self {
        self.user_config = false;
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<PermiflowConfig> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = PermiflowConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2-4. User config, permiflow.toml, permiflow.local.toml
        let mut files = ConfigFiles::for_project(&self.project_dir);
        if !self.user_config {
            files = files.without_user();
        }
        for path in files.present() {
            builder = builder.add_source(
                config::File::from(path)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 5. Environment variables (PERMIFLOW_SCAN__OUTPUT_DIR, PERMIFLOW_SCAN__NAMESPACES=a,b)
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("scan.namespaces")
                .try_parsing(true)
                .source(self.env_vars.clone()),
        );

        // Build and deserialize
        let config = builder.build().context("Failed to build configuration")?;

        let mut permiflow_config: PermiflowConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Resolve relative paths
        permiflow_config.resolve_paths(&self.project_dir);

        permiflow_config
            .validate()
            .context("Configuration failed validation")?;

        Ok(permiflow_config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
