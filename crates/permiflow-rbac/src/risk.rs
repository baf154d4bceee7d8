//! Risk classification.
//!
//! Maps the resolved rules of a binding, plus the scope it was granted in, to
//! a [`RiskTier`]. Classification is a pure function of its inputs: the same
//! rule set yields the same tier no matter how the rules are ordered.
//!
//! | Tier   | Triggered by                                                        |
//! |--------|---------------------------------------------------------------------|
//! | HIGH   | full wildcard, RBAC writes/escalation, cluster-wide secret reads,   |
//! |        | `pods/exec` create, impersonation                                   |
//! | MEDIUM | cluster-wide scope, workload writes, namespaced secret reads        |
//! | LOW    | anything else                                                       |
//!
//! The tier of a binding is the maximum tier over every matched condition.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::binding::{PolicyRule, Scope};

/// Blast-radius classification of a binding.
///
/// Ordered from least to most dangerous: `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    /// Read-only or narrowly scoped access.
    Low,

    /// Cluster-wide reach or write access to workloads.
    Medium,

    /// Privilege escalation, secret exfiltration or full control.
    High,
}

impl RiskTier {
    /// All tiers, most dangerous first (report order).
    pub const DESCENDING: [RiskTier; 3] = [RiskTier::High, RiskTier::Medium, RiskTier::Low];

    /// Returns the uppercase label used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "LOW",
            RiskTier::Medium => "MEDIUM",
            RiskTier::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const RBAC_RESOURCES: &[&str] = &["clusterroles", "clusterrolebindings", "roles", "rolebindings"];
const RBAC_WRITE_VERBS: &[&str] = &["create", "update", "patch", "escalate", "bind", "impersonate"];
const IDENTITY_RESOURCES: &[&str] = &["users", "groups", "serviceaccounts"];
const READ_VERBS: &[&str] = &["get", "list", "watch"];
const WRITE_VERBS: &[&str] = &["create", "update", "patch", "delete"];
const WORKLOAD_RESOURCES: &[&str] = &[
    "pods",
    "deployments",
    "replicasets",
    "statefulsets",
    "daemonsets",
    "jobs",
    "cronjobs",
    "replicationcontrollers",
];

/// A condition that contributed to a binding's tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFinding {
    /// `*` verbs on `*` resources in `*` API groups.
    FullWildcard,

    /// Can write or escalate RBAC objects.
    RbacMutation,

    /// Can impersonate users, groups or service accounts.
    Impersonation,

    /// Can read secrets in every namespace.
    ClusterSecretRead,

    /// Can exec into pods.
    PodExec,

    /// Granted through a ClusterRoleBinding.
    ClusterWideScope,

    /// Can create, modify or delete workloads.
    WorkloadWrite,

    /// Can read secrets within one namespace.
    NamespacedSecretRead,
}

impl RiskFinding {
    /// Returns the tier this finding alone implies.
    pub fn tier(&self) -> RiskTier {
        match self {
            RiskFinding::FullWildcard
            | RiskFinding::RbacMutation
            | RiskFinding::Impersonation
            | RiskFinding::ClusterSecretRead
            | RiskFinding::PodExec => RiskTier::High,
            RiskFinding::ClusterWideScope
            | RiskFinding::WorkloadWrite
            | RiskFinding::NamespacedSecretRead => RiskTier::Medium,
        }
    }

    /// Short human-readable explanation.
    pub fn describe(&self) -> &'static str {
        match self {
            RiskFinding::FullWildcard => "full wildcard access",
            RiskFinding::RbacMutation => "can modify or escalate RBAC",
            RiskFinding::Impersonation => "can impersonate identities",
            RiskFinding::ClusterSecretRead => "reads secrets cluster-wide",
            RiskFinding::PodExec => "can exec into pods",
            RiskFinding::ClusterWideScope => "cluster-wide binding",
            RiskFinding::WorkloadWrite => "writes workloads",
            RiskFinding::NamespacedSecretRead => "reads namespace secrets",
        }
    }
}

fn rule_findings(rule: &PolicyRule, scope: Scope, findings: &mut BTreeSet<RiskFinding>) {
    if rule.verbs.contains("*") && rule.resources.contains("*") && rule.api_groups.contains("*") {
        findings.insert(RiskFinding::FullWildcard);
    }

    if rule.allows_any_verb(RBAC_WRITE_VERBS) && rule.covers_any_resource(RBAC_RESOURCES) {
        findings.insert(RiskFinding::RbacMutation);
    }

    if rule.allows_verb("impersonate") && rule.covers_any_resource(IDENTITY_RESOURCES) {
        findings.insert(RiskFinding::Impersonation);
    }

    if rule.allows_any_verb(READ_VERBS) && rule.covers_resource("secrets") {
        match scope {
            Scope::ClusterWide => findings.insert(RiskFinding::ClusterSecretRead),
            Scope::Namespaced => findings.insert(RiskFinding::NamespacedSecretRead),
        };
    }

    if rule.allows_verb("create") && rule.covers_resource("pods/exec") {
        findings.insert(RiskFinding::PodExec);
    }

    if rule.allows_any_verb(WRITE_VERBS) && rule.covers_any_resource(WORKLOAD_RESOURCES) {
        findings.insert(RiskFinding::WorkloadWrite);
    }
}

/// Returns every risk condition matched by `rules` granted at `scope`.
pub fn findings<'a, I>(rules: I, scope: Scope) -> BTreeSet<RiskFinding>
where
    I: IntoIterator<Item = &'a PolicyRule>,
{
    let mut findings = BTreeSet::new();
    if scope == Scope::ClusterWide {
        findings.insert(RiskFinding::ClusterWideScope);
    }
    for rule in rules {
        rule_findings(rule, scope, &mut findings);
    }
    findings
}

/// Classifies `rules` granted at `scope`.
///
/// # Examples
///
/// ```
/// use permiflow_rbac::binding::{PolicyRule, Scope};
/// use permiflow_rbac::risk::{classify, RiskTier};
///
/// let read_pods = [PolicyRule::new(["get", "list"], ["pods"], [""])];
/// assert_eq!(classify(&read_pods, Scope::Namespaced), RiskTier::Low);
/// assert_eq!(classify(&read_pods, Scope::ClusterWide), RiskTier::Medium);
///
/// let admin = [PolicyRule::new(["*"], ["*"], ["*"])];
/// assert_eq!(classify(&admin, Scope::Namespaced), RiskTier::High);
/// ```
pub fn classify<'a, I>(rules: I, scope: Scope) -> RiskTier
where
    I: IntoIterator<Item = &'a PolicyRule>,
{
    findings(rules, scope)
        .iter()
        .map(RiskFinding::tier)
        .max()
        .unwrap_or(RiskTier::Low)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn rule(verbs: &[&str], resources: &[&str]) -> PolicyRule {
        PolicyRule::new(verbs.iter().copied(), resources.iter().copied(), [""])
    }

    #[test]
    fn test_tier_ordering() {
        assert!(RiskTier::Low < RiskTier::Medium);
        assert!(RiskTier::Medium < RiskTier::High);
        assert_eq!(RiskTier::DESCENDING[0], RiskTier::High);
    }

    #[test]
    fn test_tier_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&RiskTier::High).unwrap(), "\"HIGH\"");
        let tier: RiskTier = serde_json::from_str("\"MEDIUM\"").unwrap();
        assert_eq!(tier, RiskTier::Medium);
    }

    #[test]
    fn test_empty_rule_set() {
        let none: [PolicyRule; 0] = [];
        assert_eq!(classify(&none, Scope::Namespaced), RiskTier::Low);
        assert_eq!(classify(&none, Scope::ClusterWide), RiskTier::Medium);
    }

    #[test_case(&["get", "list", "watch"], &["pods", "services"], RiskTier::Low; "read only")]
    #[test_case(&["create"], &["rolebindings"], RiskTier::High; "bind roles")]
    #[test_case(&["escalate"], &["clusterroles"], RiskTier::High; "escalate")]
    #[test_case(&["*"], &["roles"], RiskTier::High; "wildcard verb on roles")]
    #[test_case(&["create"], &["pods/exec"], RiskTier::High; "pod exec")]
    #[test_case(&["get"], &["pods/exec"], RiskTier::Low; "pod exec read")]
    #[test_case(&["impersonate"], &["serviceaccounts"], RiskTier::High; "impersonate sa")]
    #[test_case(&["delete"], &["deployments"], RiskTier::Medium; "workload delete")]
    #[test_case(&["patch"], &["*"], RiskTier::High; "patch everything")]
    #[test_case(&["get"], &["secrets"], RiskTier::Medium; "namespaced secrets")]
    #[test_case(&["update"], &["configmaps"], RiskTier::Low; "config writes")]
    fn test_namespaced_classification(verbs: &[&str], resources: &[&str], expected: RiskTier) {
        assert_eq!(classify(&[rule(verbs, resources)], Scope::Namespaced), expected);
    }

    #[test]
    fn test_cluster_wide_secret_read_is_high() {
        let rules = [rule(&["get"], &["secrets"])];
        assert_eq!(classify(&rules, Scope::ClusterWide), RiskTier::High);
        assert!(findings(&rules, Scope::ClusterWide).contains(&RiskFinding::ClusterSecretRead));
    }

    #[test]
    fn test_full_wildcard_requires_all_three() {
        let partial = [PolicyRule::new(["*"], ["*"], ["apps"])];
        let found = findings(&partial, Scope::Namespaced);
        assert!(!found.contains(&RiskFinding::FullWildcard));
        // `*` on `*` still covers RBAC resources and secrets
        assert_eq!(classify(&partial, Scope::Namespaced), RiskTier::High);

        let full = [PolicyRule::new(["*"], ["*"], ["*"])];
        assert!(findings(&full, Scope::Namespaced).contains(&RiskFinding::FullWildcard));
    }

    #[test]
    fn test_maximum_across_rules() {
        let rules = [
            rule(&["get"], &["pods"]),
            rule(&["delete"], &["jobs"]),
            rule(&["bind"], &["clusterroles"]),
        ];
        assert_eq!(classify(&rules, Scope::Namespaced), RiskTier::High);

        let reversed: Vec<PolicyRule> = rules.iter().rev().cloned().collect();
        assert_eq!(classify(&reversed, Scope::Namespaced), RiskTier::High);
    }

    #[test]
    fn test_findings_describe() {
        for finding in findings(&[PolicyRule::new(["*"], ["*"], ["*"])], Scope::ClusterWide) {
            assert!(!finding.describe().is_empty());
        }
    }
}
