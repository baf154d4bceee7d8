//! Where configuration files live.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::ConfigError;

/// Git-tracked project configuration.
pub const PROJECT_FILE: &str = "permiflow.toml";

/// Untracked per-checkout overrides.
pub const LOCAL_FILE: &str = "permiflow.local.toml";

/// The file layers for one project, lowest precedence first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFiles {
    /// `~/.config/permiflow/config.toml` on Linux; `None` without a home.
    pub user: Option<PathBuf>,
    pub project: PathBuf,
    pub local: PathBuf,
}

impl ConfigFiles {
    pub fn for_project(project_dir: impl AsRef<Path>) -> Self {
        let dir = project_dir.as_ref();
        Self {
            user: user_config_file().ok(),
            project: dir.join(PROJECT_FILE),
            local: dir.join(LOCAL_FILE),
        }
    }

    /// Drops the per-user layer.
    pub fn without_user(mut self) -> Self {
        self.user = None;
        self
    }

    /// Layers that exist on disk, lowest precedence first.
    pub fn present(&self) -> Vec<&Path> {
        self.user
            .iter()
            .map(PathBuf::as_path)
            .chain([self.project.as_path(), self.local.as_path()])
            .filter(|path| path.is_file())
            .collect()
    }
}

/// Per-user defaults file, following XDG on Linux.
pub fn user_config_file() -> Result<PathBuf, ConfigError> {
    ProjectDirs::from("dev", "Permiflow", "permiflow")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .ok_or(ConfigError::NoHomeDir)
}

pub fn project_config_file(project_dir: impl AsRef<Path>) -> PathBuf {
    project_dir.as_ref().join(PROJECT_FILE)
}

/// Whether `project_dir` has a permiflow.toml.
pub fn is_initialized(project_dir: impl AsRef<Path>) -> bool {
    project_config_file(project_dir).is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_user_config_file_name() {
        // Home may be unset in sandboxed CI
        if let Ok(path) = user_config_file() {
            assert!(path.to_string_lossy().contains("permiflow"));
            assert!(path.ends_with("config.toml"));
        }
    }

    #[test]
    fn test_present_layers_in_precedence_order() {
        let dir = tempdir().unwrap();
        let files = ConfigFiles::for_project(dir.path()).without_user();
        assert!(files.present().is_empty());
        assert!(!is_initialized(dir.path()));

        fs::write(dir.path().join(LOCAL_FILE), "").unwrap();
        fs::write(dir.path().join(PROJECT_FILE), "").unwrap();

        assert_eq!(
            files.present(),
            vec![files.project.as_path(), files.local.as_path()]
        );
        assert!(is_initialized(dir.path()));
    }

    #[test]
    fn test_directory_named_like_config_is_not_a_layer() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(PROJECT_FILE)).unwrap();
        assert!(ConfigFiles::for_project(dir.path()).without_user().present().is_empty());
    }
}
