//! Errors raised while reading or checking configuration.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("{} is not valid TOML: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("cannot render configuration as TOML: {0}")]
    Render(#[from] toml::ser::Error),

    /// A value parsed but is not usable.
    #[error("{key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("no home directory to locate the user config file in")]
    NoHomeDir,
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}
