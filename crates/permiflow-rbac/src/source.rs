//! Binding sources.
//!
//! The snapshot builder never talks to a cluster. It reads raw RBAC objects
//! through [`BindingSource`], which a caller backs with whatever reaches the
//! cluster. [`ObjectInventory`] is the in-memory implementation, loaded from
//! a Kubernetes `List` document such as the output of
//! `kubectl get roles,rolebindings,clusterroles,clusterrolebindings -A -o json`.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::binding::PolicyRule;
use crate::error::ConnectivityError;

/// Object metadata, reduced to what RBAC resolution needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ObjectMeta {
    /// Object name.
    pub name: String,

    /// Object namespace, empty for cluster-scoped objects.
    #[serde(default)]
    pub namespace: String,
}

/// A policy rule as the API server returns it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPolicyRule {
    #[serde(default)]
    pub verbs: Vec<String>,
    #[serde(default)]
    pub api_groups: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub resource_names: Vec<String>,
    #[serde(default, rename = "nonResourceURLs")]
    pub non_resource_urls: Vec<String>,
}

impl From<&RawPolicyRule> for PolicyRule {
    fn from(raw: &RawPolicyRule) -> Self {
        PolicyRule {
            verbs: raw.verbs.iter().cloned().collect(),
            resources: raw.resources.iter().cloned().collect(),
            api_groups: raw.api_groups.iter().cloned().collect(),
            resource_names: raw.resource_names.iter().cloned().collect(),
            non_resource_urls: raw.non_resource_urls.iter().cloned().collect(),
        }
    }
}

/// A Role or ClusterRole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawRole {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub rules: Vec<RawPolicyRule>,
}

impl RawRole {
    /// Creates a role from already-modelled rules.
    pub fn new(namespace: &str, name: &str, rules: &[PolicyRule]) -> Self {
        Self {
            metadata: ObjectMeta {
                name: name.to_string(),
                namespace: namespace.to_string(),
            },
            rules: rules
                .iter()
                .map(|rule| RawPolicyRule {
                    verbs: rule.verbs.iter().cloned().collect(),
                    api_groups: rule.api_groups.iter().cloned().collect(),
                    resources: rule.resources.iter().cloned().collect(),
                    resource_names: rule.resource_names.iter().cloned().collect(),
                    non_resource_urls: rule.non_resource_urls.iter().cloned().collect(),
                })
                .collect(),
        }
    }
}

/// A binding subject as the API server returns it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawSubject {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub namespace: String,
}

/// A binding's `roleRef`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawRoleRef {
    pub kind: String,
    pub name: String,
}

/// A RoleBinding or ClusterRoleBinding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRoleBinding {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub subjects: Vec<RawSubject>,
    pub role_ref: RawRoleRef,
}

impl RawRoleBinding {
    /// Creates a binding object.
    pub fn new(namespace: &str, name: &str, role_kind: &str, role: &str) -> Self {
        Self {
            metadata: ObjectMeta {
                name: name.to_string(),
                namespace: namespace.to_string(),
            },
            subjects: Vec::new(),
            role_ref: RawRoleRef {
                kind: role_kind.to_string(),
                name: role.to_string(),
            },
        }
    }

    /// Adds a subject.
    pub fn with_subject(mut self, kind: &str, namespace: &str, name: &str) -> Self {
        self.subjects.push(RawSubject {
            kind: kind.to_string(),
            name: name.to_string(),
            namespace: namespace.to_string(),
        });
        self
    }
}

/// Read access to the RBAC objects of one cluster.
///
/// Implementations must be safe to call from several threads at once; the
/// builder resolves role references in parallel.
pub trait BindingSource: Sync {
    /// Lists every RoleBinding in every namespace.
    fn role_bindings(&self) -> std::result::Result<Vec<RawRoleBinding>, ConnectivityError>;

    /// Lists every ClusterRoleBinding.
    fn cluster_role_bindings(
        &self,
    ) -> std::result::Result<Vec<RawRoleBinding>, ConnectivityError>;

    /// Looks up a Role. `Ok(None)` means the role does not exist.
    fn role(
        &self,
        namespace: &str,
        name: &str,
    ) -> std::result::Result<Option<RawRole>, ConnectivityError>;

    /// Looks up a ClusterRole. `Ok(None)` means the role does not exist.
    fn cluster_role(&self, name: &str) -> std::result::Result<Option<RawRole>, ConnectivityError>;
}

/// Error type for decoding cluster object dumps.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The document is not valid JSON or not a Kubernetes list.
    #[error("failed to decode cluster objects from {origin}: {reason}")]
    Decode { origin: String, reason: String },
}

/// Result type for inventory operations.
pub type Result<T> = std::result::Result<T, InventoryError>;

/// In-memory set of RBAC objects.
#[derive(Debug, Clone, Default)]
pub struct ObjectInventory {
    roles: BTreeMap<(String, String), RawRole>,
    cluster_roles: BTreeMap<String, RawRole>,
    role_bindings: Vec<RawRoleBinding>,
    cluster_role_bindings: Vec<RawRoleBinding>,
}

impl ObjectInventory {
    /// Creates an empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a Role.
    pub fn with_role(mut self, role: RawRole) -> Self {
        self.insert_role(role);
        self
    }

    /// Adds a ClusterRole.
    pub fn with_cluster_role(mut self, role: RawRole) -> Self {
        self.insert_cluster_role(role);
        self
    }

    /// Adds a RoleBinding.
    pub fn with_role_binding(mut self, binding: RawRoleBinding) -> Self {
        self.role_bindings.push(binding);
        self
    }

    /// Adds a ClusterRoleBinding.
    pub fn with_cluster_role_binding(mut self, binding: RawRoleBinding) -> Self {
        self.cluster_role_bindings.push(binding);
        self
    }

    fn insert_role(&mut self, role: RawRole) {
        let key = (role.metadata.namespace.clone(), role.metadata.name.clone());
        self.roles.insert(key, role);
    }

    fn insert_cluster_role(&mut self, role: RawRole) {
        self.cluster_roles.insert(role.metadata.name.clone(), role);
    }

    /// Decodes a Kubernetes `List` document.
    ///
    /// Items are dispatched on their `kind`; anything that is not one of the
    /// four RBAC kinds is ignored. `origin` names the document in errors.
    pub fn from_list_json(bytes: &[u8], origin: &str) -> Result<Self> {
        let decode_err = |reason: String| InventoryError::Decode {
            origin: origin.to_string(),
            reason,
        };

        let document: Value =
            serde_json::from_slice(bytes).map_err(|e| decode_err(e.to_string()))?;
        let items = document
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| decode_err("expected a list with an `items` array".to_string()))?;

        let mut inventory = Self::new();
        for (index, item) in items.iter().enumerate() {
            let kind = item.get("kind").and_then(Value::as_str).unwrap_or_default();
            let item_err = |e: serde_json::Error| decode_err(format!("item {index} ({kind}): {e}"));
            match kind {
                "Role" => inventory.insert_role(RawRole::deserialize(item).map_err(item_err)?),
                "ClusterRole" => {
                    inventory.insert_cluster_role(RawRole::deserialize(item).map_err(item_err)?);
                }
                "RoleBinding" => inventory
                    .role_bindings
                    .push(RawRoleBinding::deserialize(item).map_err(item_err)?),
                "ClusterRoleBinding" => inventory
                    .cluster_role_bindings
                    .push(RawRoleBinding::deserialize(item).map_err(item_err)?),
                other => debug!(index, kind = %other, "Ignoring non-RBAC object"),
            }
        }

        debug!(
            roles = inventory.roles.len(),
            cluster_roles = inventory.cluster_roles.len(),
            role_bindings = inventory.role_bindings.len(),
            cluster_role_bindings = inventory.cluster_role_bindings.len(),
            "Decoded cluster objects"
        );

        Ok(inventory)
    }

    /// Returns the total number of objects held.
    pub fn len(&self) -> usize {
        self.roles.len()
            + self.cluster_roles.len()
            + self.role_bindings.len()
            + self.cluster_role_bindings.len()
    }

    /// Returns whether the inventory holds no objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BindingSource for ObjectInventory {
    fn role_bindings(&self) -> std::result::Result<Vec<RawRoleBinding>, ConnectivityError> {
        Ok(self.role_bindings.clone())
    }

    fn cluster_role_bindings(
        &self,
    ) -> std::result::Result<Vec<RawRoleBinding>, ConnectivityError> {
        Ok(self.cluster_role_bindings.clone())
    }

    fn role(
        &self,
        namespace: &str,
        name: &str,
    ) -> std::result::Result<Option<RawRole>, ConnectivityError> {
        Ok(self
            .roles
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    fn cluster_role(&self, name: &str) -> std::result::Result<Option<RawRole>, ConnectivityError> {
        Ok(self.cluster_roles.get(name).cloned())
    }
}
