//! Producing and loading snapshots for the scan and diff commands.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use permiflow_config::PermiflowConfig;
use permiflow_rbac::{ObjectInventory, Snapshot, SnapshotBuilder};
use tracing::{debug, info};

use crate::credentials::Kubeconfig;
use crate::kubectl::Kubectl;
use crate::style::{Spinner, print_warn};

/// Where a live snapshot comes from.
#[derive(Debug, Clone, Default, Args)]
pub struct SourceArgs {
    /// Read RBAC objects from a `kubectl get ... -o json` dump instead of a cluster.
    #[arg(long, value_name = "FILE")]
    pub objects: Option<PathBuf>,

    /// kubeconfig context to scan (defaults to kubectl's current context).
    #[arg(long, env = "KUBE_CONTEXT")]
    pub context: Option<String>,

    /// kubeconfig file (defaults to $KUBECONFIG_BASE64, then kubectl's lookup).
    #[arg(long, value_name = "PATH")]
    pub kubeconfig: Option<PathBuf>,

    /// Namespaces to restrict RoleBindings to, comma-separated.
    /// ClusterRoleBindings are always included.
    #[arg(long, env = "PERMIFLOW_NAMESPACES", value_delimiter = ',')]
    pub namespaces: Vec<String>,
}

impl SourceArgs {
    /// Namespaces from the flag, else from configuration.
    fn namespace_filter(&self, config: &PermiflowConfig) -> BTreeSet<String> {
        let from_flag: BTreeSet<String> = self
            .namespaces
            .iter()
            .map(|ns| ns.trim().to_string())
            .filter(|ns| !ns.is_empty())
            .collect();
        if from_flag.is_empty() {
            config.scan.namespaces.clone()
        } else {
            from_flag
        }
    }
}

/// Builds a snapshot from an object dump or the live cluster.
pub fn capture(source: &SourceArgs, config: &PermiflowConfig) -> Result<Snapshot> {
    let namespaces = source.namespace_filter(config);
    let context = source
        .context
        .clone()
        .or_else(|| config.cluster.context.clone());

    let (inventory, context) = match &source.objects {
        Some(path) => (read_objects(path)?, context.unwrap_or_default()),
        None => fetch_live(source, config, context)?,
    };

    let snapshot = SnapshotBuilder::new()
        .with_context(context)
        .with_namespaces(namespaces)
        .build(&inventory)?;

    for warning in snapshot.warnings() {
        print_warn(&format!("Skipped binding: {}", warning.reason));
    }

    Ok(snapshot)
}

fn read_objects(path: &Path) -> Result<ObjectInventory> {
    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read cluster objects from {}", path.display()))?;
    let inventory = ObjectInventory::from_list_json(&bytes, &path.display().to_string())?;
    debug!(path = %path.display(), objects = inventory.len(), "Loaded object dump");
    Ok(inventory)
}

fn fetch_live(
    source: &SourceArgs,
    config: &PermiflowConfig,
    context: Option<String>,
) -> Result<(ObjectInventory, String)> {
    let kubeconfig_path = source
        .kubeconfig
        .clone()
        .or_else(|| config.cluster.kubeconfig.clone());
    let kubeconfig = Kubeconfig::resolve(kubeconfig_path.as_deref(), &config.cluster.kubeconfig_env)?;

    // Dropped at the end of this function, wiping any temporary file.
    let scoped = kubeconfig.materialize()?;

    let kubectl = Kubectl::new(&config.cluster.kubectl)
        .with_kubeconfig(scoped.path())
        .with_context(context.as_deref());

    let context = match context {
        Some(context) => context,
        None => kubectl.current_context().unwrap_or_else(|e| {
            debug!(error = %e, "Could not determine current context");
            String::new()
        }),
    };

    info!(context = %context, "Listing RBAC objects");
    let bytes = {
        let _spinner = Spinner::start("Listing RBAC objects...");
        kubectl.list_rbac_objects()?
    };

    let inventory = ObjectInventory::from_list_json(&bytes, "kubectl output")?;
    Ok((inventory, context))
}

/// Loads a snapshot written by `scan`.
pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    let snapshot = Snapshot::from_json(&bytes, &path.display().to_string())?;
    debug!(
        path = %path.display(),
        bindings = snapshot.bindings().len(),
        "Loaded snapshot"
    );
    Ok(snapshot)
}

/// Writes a report, creating parent directories as needed.
pub fn write_report(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
