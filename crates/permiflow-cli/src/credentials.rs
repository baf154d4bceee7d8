//! Kubeconfig credential scoping.
//!
//! CI hands the kubeconfig over as base64 in an environment variable. It is
//! decoded into memory that is wiped on drop, and written to disk only while
//! kubectl runs. The file is overwritten with zeros and removed when the
//! [`ScopedKubeconfig`] guard goes out of scope, on success and error paths
//! alike.

use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Decoded kubeconfig contents. Wiped from memory when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KubeconfigBytes {
    bytes: Vec<u8>,
}

impl KubeconfigBytes {
    fn len(&self) -> usize {
        self.bytes.len()
    }
}

/// Where kubectl gets its credentials from.
pub enum Kubeconfig {
    /// kubectl's own lookup (`$KUBECONFIG`, `~/.kube/config`).
    Ambient,

    /// A kubeconfig file, passed through untouched.
    File(PathBuf),

    /// Contents decoded from an environment variable.
    Inline(KubeconfigBytes),
}

impl Kubeconfig {
    /// Picks the credential source: an explicit file first, then the base64
    /// variable named `env_var`, then kubectl's defaults.
    pub fn resolve(explicit: Option<&Path>, env_var: &str) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.is_file() {
                bail!("kubeconfig {} does not exist", path.display());
            }
            debug!(path = %path.display(), "Using kubeconfig file");
            return Ok(Self::File(path.to_path_buf()));
        }

        match std::env::var(env_var) {
            Ok(encoded) => {
                let encoded = Zeroizing::new(encoded);
                if encoded.trim().is_empty() {
                    return Ok(Self::Ambient);
                }
                debug!(variable = env_var, "Using kubeconfig from environment");
                Self::decode(&encoded, env_var)
            }
            Err(_) => Ok(Self::Ambient),
        }
    }

    /// Decodes base64 kubeconfig contents. `origin` names the source in errors;
    /// the contents never appear in them.
    pub fn decode(encoded: &str, origin: &str) -> Result<Self> {
        let compact: Zeroizing<String> =
            Zeroizing::new(encoded.chars().filter(|c| !c.is_whitespace()).collect());
        let bytes = STANDARD
            .decode(compact.as_bytes())
            .map_err(|_| anyhow!("{origin} does not hold valid base64"))?;
        if bytes.is_empty() {
            bail!("{origin} decodes to an empty kubeconfig");
        }
        Ok(Self::Inline(KubeconfigBytes { bytes }))
    }

    /// Exposes the kubeconfig as a path for as long as the guard lives.
    pub fn materialize(&self) -> Result<ScopedKubeconfig> {
        match self {
            Kubeconfig::Ambient => Ok(ScopedKubeconfig {
                path: None,
                temp: None,
                len: 0,
            }),
            Kubeconfig::File(path) => Ok(ScopedKubeconfig {
                path: Some(path.clone()),
                temp: None,
                len: 0,
            }),
            Kubeconfig::Inline(contents) => {
                // tempfile creates files readable by the owner only.
                let mut temp = tempfile::Builder::new()
                    .prefix("permiflow-kubeconfig-")
                    .suffix(".yaml")
                    .tempfile()
                    .context("Failed to create temporary kubeconfig")?;
                temp.write_all(&contents.bytes)
                    .and_then(|()| temp.flush())
                    .context("Failed to write temporary kubeconfig")?;
                Ok(ScopedKubeconfig {
                    path: Some(temp.path().to_path_buf()),
                    temp: Some(temp),
                    len: contents.len(),
                })
            }
        }
    }
}

/// A kubeconfig path valid until drop.
///
/// Files materialized from memory are overwritten and deleted on drop.
pub struct ScopedKubeconfig {
    path: Option<PathBuf>,
    temp: Option<NamedTempFile>,
    len: usize,
}

impl ScopedKubeconfig {
    /// Path to hand to `kubectl --kubeconfig`, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Drop for ScopedKubeconfig {
    fn drop(&mut self) {
        let Some(mut temp) = self.temp.take() else {
            return;
        };

        let zeros = vec![0u8; self.len];
        let file = temp.as_file_mut();
        let wiped = file
            .seek(SeekFrom::Start(0))
            .and_then(|_| file.write_all(&zeros))
            .and_then(|()| file.sync_all());
        if let Err(e) = wiped {
            warn!(error = %e, "Failed to overwrite temporary kubeconfig");
        }

        if let Err(e) = temp.close() {
            warn!(error = %e, "Failed to remove temporary kubeconfig");
        }
    }
}
