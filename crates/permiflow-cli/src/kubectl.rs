//! Live cluster lister backed by kubectl.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use permiflow_rbac::ConnectivityError;
use tracing::debug;

/// Resource kinds fetched in a single `kubectl get`.
const RBAC_KINDS: &str = "roles,rolebindings,clusterroles,clusterrolebindings";

/// A kubectl invocation template.
#[derive(Debug, Clone)]
pub struct Kubectl {
    program: PathBuf,
    kubeconfig: Option<PathBuf>,
    context: Option<String>,
}

impl Kubectl {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            kubeconfig: None,
            context: None,
        }
    }

    pub fn with_kubeconfig(mut self, kubeconfig: Option<&Path>) -> Self {
        self.kubeconfig = kubeconfig.map(Path::to_path_buf);
        self
    }

    pub fn with_context(mut self, context: Option<&str>) -> Self {
        self.context = context.map(str::to_string);
        self
    }

    fn context_label(&self) -> &str {
        self.context.as_deref().unwrap_or("current")
    }

    fn args(&self, rest: &[&str]) -> Vec<OsString> {
        let mut args = Vec::new();
        if let Some(kubeconfig) = &self.kubeconfig {
            args.push(OsString::from("--kubeconfig"));
            args.push(kubeconfig.clone().into_os_string());
        }
        if let Some(context) = &self.context {
            args.push(OsString::from("--context"));
            args.push(OsString::from(context));
        }
        args.extend(rest.iter().map(OsString::from));
        args
    }

    fn run(&self, rest: &[&str]) -> Result<Vec<u8>, ConnectivityError> {
        let args = self.args(rest);
        debug!(program = %self.program.display(), ?rest, "Running kubectl");

        let output = Command::new(&self.program).args(&args).output().map_err(|e| {
            ConnectivityError::new(
                self.context_label(),
                format!("failed to run {}: {e}", self.program.display()),
            )
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ConnectivityError::new(
                self.context_label(),
                format!("kubectl exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        Ok(output.stdout)
    }

    /// Returns the name of kubectl's current context.
    pub fn current_context(&self) -> Result<String, ConnectivityError> {
        let stdout = self.run(&["config", "current-context"])?;
        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
    }

    /// Lists every Role, RoleBinding, ClusterRole and ClusterRoleBinding as
    /// one JSON `List` document.
    pub fn list_rbac_objects(&self) -> Result<Vec<u8>, ConnectivityError> {
        self.run(&["get", RBAC_KINDS, "--all-namespaces", "-o", "json"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_include_kubeconfig_and_context() {
        let kubectl = Kubectl::new("kubectl")
            .with_kubeconfig(Some(Path::new("/tmp/kubeconfig.yaml")))
            .with_context(Some("prod"));
        let args = kubectl.args(&["get", RBAC_KINDS]);
        let args: Vec<&str> = args.iter().filter_map(|a| a.to_str()).collect();
        assert_eq!(
            args,
            vec![
                "--kubeconfig",
                "/tmp/kubeconfig.yaml",
                "--context",
                "prod",
                "get",
                "roles,rolebindings,clusterroles,clusterrolebindings",
            ]
        );
    }

    #[test]
    fn test_args_without_overrides() {
        let args = Kubectl::new("kubectl").args(&["config", "current-context"]);
        assert_eq!(args, vec![OsString::from("config"), OsString::from("current-context")]);
    }

    #[test]
    fn test_missing_binary_is_connectivity_error() {
        let err = Kubectl::new("/nonexistent/permiflow-kubectl")
            .with_context(Some("staging"))
            .list_rbac_objects()
            .unwrap_err();
        assert_eq!(err.context, "staging");
        assert!(err.reason.contains("failed to run"));
    }
}
