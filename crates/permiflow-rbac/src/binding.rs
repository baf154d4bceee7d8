#![allow(clippy::match_same_arms)]
//! Binding model.
//!
//! A [`Binding`] is one effective RBAC grant: a single subject receiving the
//! rules of a Role or ClusterRole through a RoleBinding or ClusterRoleBinding.
//! A RoleBinding naming three subjects therefore yields three bindings.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::risk::RiskTier;

/// Kind of RBAC subject.
///
/// Variants are declared in alphabetical order so the derived `Ord` matches
/// lexicographic ordering of the kind names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SubjectKind {
    /// A group of users, as asserted by the authenticator.
    Group,

    /// An in-cluster service account. Always namespaced.
    ServiceAccount,

    /// A human or external user, as asserted by the authenticator.
    User,
}

impl SubjectKind {
    /// Parses the `kind` field of a Kubernetes subject.
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "Group" => Some(SubjectKind::Group),
            "ServiceAccount" => Some(SubjectKind::ServiceAccount),
            "User" => Some(SubjectKind::User),
            _ => None,
        }
    }

    /// Returns the Kubernetes spelling of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectKind::Group => "Group",
            SubjectKind::ServiceAccount => "ServiceAccount",
            SubjectKind::User => "User",
        }
    }

    /// Returns whether subjects of this kind live in a namespace.
    pub fn is_namespaced(&self) -> bool {
        match self {
            SubjectKind::Group => false,
            SubjectKind::ServiceAccount => true,
            SubjectKind::User => false,
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of role a binding points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RoleKind {
    /// Cluster-scoped role, usable from both binding kinds.
    ClusterRole,

    /// Namespaced role, usable only from a RoleBinding in the same namespace.
    Role,
}

impl RoleKind {
    /// Parses the `roleRef.kind` field of a Kubernetes binding.
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "ClusterRole" => Some(RoleKind::ClusterRole),
            "Role" => Some(RoleKind::Role),
            _ => None,
        }
    }

    /// Returns the Kubernetes spelling of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleKind::ClusterRole => "ClusterRole",
            RoleKind::Role => "Role",
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of binding object that produced a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    /// Namespaced `RoleBinding`.
    RoleBinding,

    /// Cluster-scoped `ClusterRoleBinding`.
    ClusterRoleBinding,
}

impl BindingKind {
    /// Returns the scope of grants made through this kind of binding.
    pub fn scope(&self) -> Scope {
        match self {
            BindingKind::RoleBinding => Scope::Namespaced,
            BindingKind::ClusterRoleBinding => Scope::ClusterWide,
        }
    }

    /// Returns the Kubernetes spelling of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            BindingKind::RoleBinding => "RoleBinding",
            BindingKind::ClusterRoleBinding => "ClusterRoleBinding",
        }
    }
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a grant applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Granted inside a single namespace (RoleBinding).
    Namespaced,

    /// Granted across every namespace (ClusterRoleBinding).
    ClusterWide,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Namespaced => f.write_str("namespace"),
            Scope::ClusterWide => f.write_str("cluster"),
        }
    }
}

/// The identity receiving a grant.
///
/// Field order is the identity ordering: kind, then name, then namespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Subject {
    /// Subject kind.
    pub kind: SubjectKind,

    /// Subject name.
    pub name: String,

    /// Namespace, empty for cluster-scoped subjects (users and groups).
    #[serde(default)]
    pub namespace: String,
}

impl Subject {
    /// Creates a subject, discarding the namespace for cluster-scoped kinds.
    pub fn new(kind: SubjectKind, name: impl Into<String>, namespace: impl Into<String>) -> Self {
        let namespace = if kind.is_namespaced() {
            namespace.into()
        } else {
            String::new()
        };
        Self {
            kind,
            name: name.into(),
            namespace,
        }
    }

    /// Shorthand for a service account subject.
    pub fn service_account(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(SubjectKind::ServiceAccount, name, namespace)
    }

    /// Shorthand for a user subject.
    pub fn user(name: impl Into<String>) -> Self {
        Self::new(SubjectKind::User, name, "")
    }

    /// Shorthand for a group subject.
    pub fn group(name: impl Into<String>) -> Self {
        Self::new(SubjectKind::Group, name, "")
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}:{}", self.kind, self.name)
        } else {
            write!(f, "{}:{}/{}", self.kind, self.namespace, self.name)
        }
    }
}

/// Reference from a binding to the role it grants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleRef {
    /// Role name.
    #[serde(rename = "role")]
    pub name: String,

    /// Role kind.
    #[serde(rename = "role_kind")]
    pub kind: RoleKind,

    /// Role namespace, empty for a ClusterRole.
    #[serde(rename = "role_namespace", default)]
    pub namespace: String,
}

impl RoleRef {
    /// References a ClusterRole.
    pub fn cluster_role(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RoleKind::ClusterRole,
            namespace: String::new(),
        }
    }

    /// References a namespaced Role.
    pub fn role(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RoleKind::Role,
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for RoleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}:{}", self.kind, self.name)
        } else {
            write!(f, "{}:{}/{}", self.kind, self.namespace, self.name)
        }
    }
}

/// The RoleBinding or ClusterRoleBinding that made a grant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BindingRef {
    /// Binding object name.
    #[serde(rename = "binding")]
    pub name: String,

    /// Binding namespace, empty for a ClusterRoleBinding. Required when
    /// decoding, even if empty.
    pub namespace: String,
}

impl BindingRef {
    /// Refers to a ClusterRoleBinding.
    pub fn cluster(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: String::new(),
        }
    }

    /// Refers to a namespaced RoleBinding.
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Returns the kind of binding object this reference names.
    pub fn kind(&self) -> BindingKind {
        if self.namespace.is_empty() {
            BindingKind::ClusterRoleBinding
        } else {
            BindingKind::RoleBinding
        }
    }
}

/// A single RBAC policy rule.
///
/// Every field is a set, so the order in which the source cluster lists verbs
/// or resources never affects equality. An empty `resource_names` set means
/// the rule is not restricted to named objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Allowed verbs (`get`, `list`, `create`, `*`, ...).
    #[serde(default)]
    pub verbs: BTreeSet<String>,

    /// Resources, including subresources such as `pods/exec`.
    #[serde(default)]
    pub resources: BTreeSet<String>,

    /// API groups; the empty string is the core group.
    #[serde(default)]
    pub api_groups: BTreeSet<String>,

    /// Object names the rule is restricted to.
    #[serde(default)]
    pub resource_names: BTreeSet<String>,

    /// Non-resource URLs (`/healthz`, `/metrics`), ClusterRoles only.
    #[serde(default)]
    pub non_resource_urls: BTreeSet<String>,
}

impl PolicyRule {
    /// Creates a rule from verb, resource and API group lists.
    pub fn new<V, R, G>(verbs: V, resources: R, api_groups: G) -> Self
    where
        V: IntoIterator,
        V::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
        G: IntoIterator,
        G::Item: Into<String>,
    {
        Self {
            verbs: verbs.into_iter().map(Into::into).collect(),
            resources: resources.into_iter().map(Into::into).collect(),
            api_groups: api_groups.into_iter().map(Into::into).collect(),
            resource_names: BTreeSet::new(),
            non_resource_urls: BTreeSet::new(),
        }
    }

    /// Restricts the rule to the given object names.
    pub fn with_resource_names<N>(mut self, names: N) -> Self
    where
        N: IntoIterator,
        N::Item: Into<String>,
    {
        self.resource_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Returns whether the rule allows `verb`, honouring the `*` wildcard.
    pub fn allows_verb(&self, verb: &str) -> bool {
        self.verbs.contains("*") || self.verbs.contains(verb)
    }

    /// Returns whether the rule covers `resource`, honouring the `*` wildcard.
    pub fn covers_resource(&self, resource: &str) -> bool {
        self.resources.contains("*") || self.resources.contains(resource)
    }

    /// Returns whether the rule allows any of `verbs`.
    pub fn allows_any_verb(&self, verbs: &[&str]) -> bool {
        verbs.iter().any(|verb| self.allows_verb(verb))
    }

    /// Returns whether the rule covers any of `resources`.
    pub fn covers_any_resource(&self, resources: &[&str]) -> bool {
        resources.iter().any(|resource| self.covers_resource(resource))
    }

    /// Compact `verbs:resources` rendering used by CSV and Markdown reports.
    pub fn compact(&self) -> String {
        let join = |set: &BTreeSet<String>| set.iter().cloned().collect::<Vec<_>>().join(",");
        let targets = if self.resources.is_empty() {
            join(&self.non_resource_urls)
        } else {
            join(&self.resources)
        };
        if self.resource_names.is_empty() {
            format!("{}:{}", join(&self.verbs), targets)
        } else {
            format!(
                "{}:{}[{}]",
                join(&self.verbs),
                targets,
                join(&self.resource_names)
            )
        }
    }
}

/// Identity key of a binding.
///
/// Two bindings with equal keys are the same logical grant across snapshots,
/// even when the resolved rules differ. The derived `Ord` follows field
/// declaration order: binding name, binding namespace, subject (kind, name,
/// namespace), role name, role kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BindingKey {
    /// Binding object name.
    pub binding: String,

    /// Binding namespace, empty for a ClusterRoleBinding.
    pub namespace: String,

    /// The subject receiving the grant.
    pub subject: Subject,

    /// Role name.
    pub role: String,

    /// Role kind.
    pub role_kind: RoleKind,
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(
                f,
                "{} -> {}:{} via {}",
                self.subject, self.role_kind, self.role, self.binding
            )
        } else {
            write!(
                f,
                "{} -> {}:{} via {}/{}",
                self.subject, self.role_kind, self.role, self.namespace, self.binding
            )
        }
    }
}

/// One effective RBAC grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// The subject receiving the grant.
    pub subject: Subject,

    /// The granted role.
    #[serde(flatten)]
    pub role_ref: RoleRef,

    /// The binding object that made the grant.
    #[serde(flatten)]
    pub binding_ref: BindingRef,

    /// Resolved rules of the role at scan time.
    #[serde(default)]
    pub rules: BTreeSet<PolicyRule>,

    /// Risk tier derived from `rules` and the binding scope.
    pub risk: RiskTier,
}

impl Binding {
    /// Creates a binding and classifies it.
    pub fn new(
        subject: Subject,
        role_ref: RoleRef,
        binding_ref: BindingRef,
        rules: impl IntoIterator<Item = PolicyRule>,
    ) -> Self {
        let rules: BTreeSet<PolicyRule> = rules.into_iter().collect();
        let risk = crate::risk::classify(&rules, binding_ref.kind().scope());
        Self {
            subject,
            role_ref,
            binding_ref,
            rules,
            risk,
        }
    }

    /// Returns the identity key.
    pub fn key(&self) -> BindingKey {
        BindingKey {
            binding: self.binding_ref.name.clone(),
            namespace: self.binding_ref.namespace.clone(),
            subject: self.subject.clone(),
            role: self.role_ref.name.clone(),
            role_kind: self.role_ref.kind,
        }
    }

    /// Returns where the grant applies.
    pub fn scope(&self) -> Scope {
        self.binding_ref.kind().scope()
    }
}
