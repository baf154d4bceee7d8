//! Configuration management for Permiflow
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. CLI arguments (highest precedence)
//! 2. Environment variables (`PERMIFLOW_*` prefix, `__` between section and key)
//! 3. permiflow.local.toml (gitignored, local overrides)
//! 4. permiflow.toml (git-tracked, project config)
//! 5. ~/.config/permiflow/config.toml (user defaults)
//! 6. Built-in defaults (lowest precedence)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::{
    ConfigFiles, LOCAL_FILE, PROJECT_FILE, is_initialized, project_config_file, user_config_file,
};

/// Main Permiflow configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermiflowConfig {
    pub scan: ScanConfig,
    pub cluster: ClusterConfig,
    pub history: HistoryConfig,
}

/// What to scan and when to fail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Namespaces to restrict RoleBindings to; empty scans all
    pub namespaces: BTreeSet<String>,
    /// Directory that `--output-dir` style runs write reports into
    pub output_dir: PathBuf,
    pub fail_on_high_risk: bool,
    pub fail_on_drift: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            namespaces: BTreeSet::new(),
            output_dir: PathBuf::from("reports"),
            fail_on_high_risk: false,
            fail_on_drift: false,
        }
    }
}

/// How to reach the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// kubeconfig context; kubectl's current context when unset
    pub context: Option<String>,
    /// kubeconfig file; takes precedence over `kubeconfig_env`
    pub kubeconfig: Option<PathBuf>,
    /// Environment variable holding a base64-encoded kubeconfig
    pub kubeconfig_env: String,
    /// kubectl executable
    pub kubectl: PathBuf,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            context: None,
            kubeconfig: None,
            kubeconfig_env: "KUBECONFIG_BASE64".to_string(),
            kubectl: PathBuf::from("kubectl"),
        }
    }
}

/// Dated scan archive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Archive directory; history is disabled when unset
    pub directory: Option<PathBuf>,
}

impl PermiflowConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Read a single TOML file, without layering
    pub fn from_file(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Render as TOML
    pub fn to_toml(&self) -> std::result::Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Resolve relative paths to absolute
    pub fn resolve_paths(&mut self, base_dir: impl AsRef<Path>) {
        let base = base_dir.as_ref();

        if self.scan.output_dir.is_relative() {
            self.scan.output_dir = base.join(&self.scan.output_dir);
        }

        if let Some(dir) = self.history.directory.as_mut() {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }

        if let Some(kubeconfig) = self.cluster.kubeconfig.as_mut() {
            if kubeconfig.is_relative() {
                *kubeconfig = base.join(&*kubeconfig);
            }
        }
    }

    /// Check values the type system cannot
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        for namespace in &self.scan.namespaces {
            if !is_dns_label(namespace) {
                return Err(ConfigError::invalid(
                    "scan.namespaces",
                    format!("'{namespace}' is not a valid namespace name"),
                ));
            }
        }

        if self.scan.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid("scan.output_dir", "must not be empty"));
        }

        if self.cluster.kubectl.as_os_str().is_empty() {
            return Err(ConfigError::invalid("cluster.kubectl", "must not be empty"));
        }

        let env = &self.cluster.kubeconfig_env;
        if env.is_empty()
            || !env
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(ConfigError::invalid(
                "cluster.kubeconfig_env",
                format!("'{env}' is not a valid environment variable name"),
            ));
        }

        if matches!(&self.cluster.context, Some(context) if context.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "cluster.context",
                "must not be blank when set",
            ));
        }

        Ok(())
    }
}

/// RFC 1123 label: lowercase alphanumerics and '-', at most 63 characters,
/// starting and ending with an alphanumeric.
fn is_dns_label(name: &str) -> bool {
    let bytes = name.as_bytes();
    !bytes.is_empty()
        && bytes.len() <= 63
        && bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
        && bytes[0] != b'-'
        && bytes[bytes.len() - 1] != b'-'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PermiflowConfig::default();
        assert!(config.scan.namespaces.is_empty());
        assert_eq!(config.scan.output_dir, PathBuf::from("reports"));
        assert!(!config.scan.fail_on_high_risk);
        assert_eq!(config.cluster.kubeconfig_env, "KUBECONFIG_BASE64");
        assert_eq!(config.cluster.kubectl, PathBuf::from("kubectl"));
        assert!(config.history.directory.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_path_resolution() {
        let mut config = PermiflowConfig::default();
        config.history.directory = Some(PathBuf::from("history"));
        config.cluster.kubeconfig = Some(PathBuf::from("/etc/kube/config"));
        config.resolve_paths("/home/user/project");

        assert_eq!(
            config.scan.output_dir,
            PathBuf::from("/home/user/project/reports")
        );
        assert_eq!(
            config.history.directory,
            Some(PathBuf::from("/home/user/project/history"))
        );
        assert_eq!(
            config.cluster.kubeconfig,
            Some(PathBuf::from("/etc/kube/config"))
        );
    }

    #[test]
    fn test_validation() {
        let mut config = PermiflowConfig::default();
        config.scan.namespaces.insert("Staging".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "scan.namespaces", reason }) if reason.contains("Staging")
        ));

        let mut config = PermiflowConfig::default();
        config.cluster.kubeconfig_env = "kube-config".to_string();
        assert!(config.validate().is_err());

        let mut config = PermiflowConfig::default();
        config.cluster.context = Some("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dns_labels() {
        assert!(is_dns_label("kube-system"));
        assert!(is_dns_label("a1"));
        assert!(!is_dns_label("-lead"));
        assert!(!is_dns_label("trail-"));
        assert!(!is_dns_label("under_score"));
        assert!(!is_dns_label(&"a".repeat(64)));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = PermiflowConfig::default();
        config.scan.namespaces.insert("staging".to_string());
        config.scan.fail_on_drift = true;
        config.cluster.context = Some("prod".to_string());

        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("[scan]"));
        assert!(rendered.contains("fail_on_drift = true"));

        let parsed: PermiflowConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
