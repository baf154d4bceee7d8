//! Snapshots and the snapshot builder.
//!
//! A [`Snapshot`] is the canonical capture of every binding visible at one
//! point in time. Bindings are sorted by identity key and unique by key, so
//! two snapshots of the same cluster state serialize to identical bytes.
//!
//! ```text
//! BindingSource ──► role_bindings ──► namespace filter ─┐
//!               └─► cluster_role_bindings ─────────────┤
//!                                                       ▼
//!                               resolve roleRef (parallel, rayon)
//!                                                       │
//!                               ┌───────────────────────┴──────────┐
//!                               ▼                                  ▼
//!                       bindings + risk                  ResolutionError → warning
//!                               │
//!                               ▼
//!                       sort by identity key ──► Snapshot
//! ```

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, SubsecRound, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::binding::{
    Binding, BindingKey, BindingKind, BindingRef, PolicyRule, RoleKind, RoleRef, Subject,
    SubjectKind,
};
use crate::error::{MalformedSnapshotError, ResolutionError, Result, ScanError};
use crate::risk::RiskTier;
use crate::source::{BindingSource, RawRoleBinding};

/// A binding, or one subject of it, skipped while building a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResolutionWarning {
    /// Name of the skipped binding.
    pub binding: String,

    /// Its namespace, empty for a ClusterRoleBinding.
    #[serde(default)]
    pub namespace: String,

    /// Why it was skipped.
    pub reason: String,
}

impl From<&ResolutionError> for ResolutionWarning {
    fn from(err: &ResolutionError) -> Self {
        let (binding, namespace) = err.binding();
        Self {
            binding: binding.to_string(),
            namespace: namespace.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Immutable, timestamped collection of bindings.
///
/// Only [`Snapshot::new`], [`Snapshot::from_json`] and the builder produce
/// one, so bindings are always sorted and unique by key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    timestamp: DateTime<Utc>,
    cluster_context: String,
    namespace_filter: BTreeSet<String>,
    bindings: Vec<Binding>,
    warnings: Vec<ResolutionWarning>,
}

/// Scan report document as read back from disk.
#[derive(Deserialize)]
struct SnapshotDocument {
    timestamp: DateTime<Utc>,
    #[serde(default)]
    cluster_context: String,
    #[serde(default)]
    namespace_filter: BTreeSet<String>,
    bindings: Vec<Binding>,
    #[serde(default)]
    warnings: Vec<ResolutionWarning>,
}

/// Rejects role references no Kubernetes binding can hold.
fn check_role_scope(binding: &Binding) -> std::result::Result<(), String> {
    if binding.role_ref.kind != RoleKind::Role {
        return Ok(());
    }
    let key = binding.key();
    if binding.binding_ref.namespace.is_empty() {
        return Err(format!("{key}: a Role can only be granted by a RoleBinding"));
    }
    if binding.role_ref.namespace != binding.binding_ref.namespace {
        return Err(format!(
            "{key}: role namespace '{}' differs from binding namespace '{}'",
            binding.role_ref.namespace, binding.binding_ref.namespace
        ));
    }
    Ok(())
}

impl Snapshot {
    /// Creates a snapshot, putting `bindings` into canonical order.
    ///
    /// Bindings sharing an identity key collapse to the first one given.
    pub fn new(
        timestamp: DateTime<Utc>,
        cluster_context: impl Into<String>,
        namespace_filter: BTreeSet<String>,
        bindings: Vec<Binding>,
        warnings: Vec<ResolutionWarning>,
    ) -> Self {
        let mut keyed: Vec<(BindingKey, Binding)> =
            bindings.into_iter().map(|b| (b.key(), b)).collect();
        // Stable sort keeps the first of each duplicate key in front.
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        keyed.dedup_by(|a, b| a.0 == b.0);

        let mut warnings = warnings;
        warnings.sort();
        warnings.dedup();

        Self {
            timestamp,
            cluster_context: cluster_context.into(),
            namespace_filter,
            bindings: keyed.into_iter().map(|(_, b)| b).collect(),
            warnings,
        }
    }

    /// Decodes a snapshot previously written as JSON.
    ///
    /// Fails when required fields are missing, when a Role is referenced
    /// outside its own namespace, or when two bindings share an identity key;
    /// `origin` names the document in the error. Bindings are re-sorted, so
    /// hand-edited documents need not be in canonical order.
    pub fn from_json(
        bytes: &[u8],
        origin: &str,
    ) -> std::result::Result<Self, MalformedSnapshotError> {
        let decoded: SnapshotDocument = serde_json::from_slice(bytes)
            .map_err(|e| MalformedSnapshotError::new(origin, e.to_string()))?;

        let mut seen = BTreeSet::new();
        for binding in &decoded.bindings {
            check_role_scope(binding)
                .map_err(|reason| MalformedSnapshotError::new(origin, reason))?;
            let key = binding.key();
            if !seen.insert(key.clone()) {
                return Err(MalformedSnapshotError::new(
                    origin,
                    format!("duplicate binding identity: {key}"),
                ));
            }
        }

        Ok(Snapshot::new(
            decoded.timestamp,
            decoded.cluster_context,
            decoded.namespace_filter,
            decoded.bindings,
            decoded.warnings,
        ))
    }

    /// When the snapshot was taken.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Cluster context label, empty when unknown.
    pub fn cluster_context(&self) -> &str {
        &self.cluster_context
    }

    /// Namespaces the scan was restricted to; empty means all.
    pub fn namespace_filter(&self) -> &BTreeSet<String> {
        &self.namespace_filter
    }

    /// Bindings in identity-key order.
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Bindings skipped during the scan.
    pub fn warnings(&self) -> &[ResolutionWarning] {
        &self.warnings
    }

    /// Number of bindings skipped during the scan.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Looks up a binding by identity key.
    pub fn get(&self, key: &BindingKey) -> Option<&Binding> {
        self.bindings
            .binary_search_by(|b| b.key().cmp(key))
            .ok()
            .map(|index| &self.bindings[index])
    }

    /// Counts bindings per risk tier.
    pub fn risk_summary(&self) -> RiskSummary {
        RiskSummary::from_bindings(&self.bindings)
    }
}

/// Per-tier binding counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub total: usize,
}

impl RiskSummary {
    /// Tallies `bindings`.
    pub fn from_bindings(bindings: &[Binding]) -> Self {
        let mut summary = Self::default();
        for binding in bindings {
            match binding.risk {
                RiskTier::High => summary.high += 1,
                RiskTier::Medium => summary.medium += 1,
                RiskTier::Low => summary.low += 1,
            }
            summary.total += 1;
        }
        summary
    }

    /// Returns the count for one tier.
    pub fn count(&self, tier: RiskTier) -> usize {
        match tier {
            RiskTier::High => self.high,
            RiskTier::Medium => self.medium,
            RiskTier::Low => self.low,
        }
    }

    /// Renders `KEY=value` lines for shell consumption.
    pub fn to_env(&self) -> String {
        format!(
            "HIGH_COUNT={}\nMEDIUM_COUNT={}\nLOW_COUNT={}\nTOTAL={}\n",
            self.high, self.medium, self.low, self.total
        )
    }
}

/// Builds snapshots from a [`BindingSource`].
#[derive(Debug, Clone, Default)]
pub struct SnapshotBuilder {
    cluster_context: String,
    namespace_filter: BTreeSet<String>,
    timestamp: Option<DateTime<Utc>>,
}

impl SnapshotBuilder {
    /// Creates a builder with no namespace filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels the snapshot with a cluster context name.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.cluster_context = context.into();
        self
    }

    /// Restricts RoleBindings to the given namespaces.
    ///
    /// ClusterRoleBindings are never filtered: they are not in any namespace
    /// and their grants reach every namespace, including the filtered ones.
    pub fn with_namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.namespace_filter = namespaces
            .into_iter()
            .map(Into::into)
            .filter(|ns: &String| !ns.is_empty())
            .collect();
        self
    }

    /// Pins the snapshot timestamp instead of reading the clock.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Enumerates, resolves and classifies every binding visible in `source`.
    ///
    /// Resolution errors skip the offending binding, or just the offending
    /// subject, and are recorded as warnings. Source failures abort with [`ScanError::Connectivity`].
    pub fn build<S>(&self, source: &S) -> Result<Snapshot>
    where
        S: BindingSource + ?Sized,
    {
        let timestamp = self.timestamp.unwrap_or_else(|| Utc::now().trunc_subsecs(0));

        let mut candidates: Vec<(BindingKind, RawRoleBinding)> = Vec::new();
        let mut filtered_out = 0usize;
        for binding in source.role_bindings()? {
            if self.namespace_filter.is_empty()
                || self.namespace_filter.contains(&binding.metadata.namespace)
            {
                candidates.push((BindingKind::RoleBinding, binding));
            } else {
                filtered_out += 1;
            }
        }
        for binding in source.cluster_role_bindings()? {
            candidates.push((BindingKind::ClusterRoleBinding, binding));
        }

        debug!(
            candidates = candidates.len(),
            filtered_out,
            "Enumerated bindings"
        );

        let resolved: Vec<std::result::Result<Resolved, ScanError>> = candidates
            .par_iter()
            .map(|(kind, raw)| resolve(source, *kind, raw))
            .collect();

        let mut bindings = Vec::new();
        let mut warnings = Vec::new();
        for outcome in resolved {
            match outcome {
                Ok(mut resolved) => {
                    bindings.append(&mut resolved.grants);
                    for err in &resolved.skipped {
                        warn!(error = %err, "Skipping subject");
                        warnings.push(ResolutionWarning::from(err));
                    }
                }
                Err(ScanError::Resolution(err)) => {
                    warn!(error = %err, "Skipping binding");
                    warnings.push(ResolutionWarning::from(&err));
                }
                Err(fatal) => return Err(fatal),
            }
        }

        let snapshot = Snapshot::new(
            timestamp,
            self.cluster_context.clone(),
            self.namespace_filter.clone(),
            bindings,
            warnings,
        );

        info!(
            context = %snapshot.cluster_context,
            bindings = snapshot.bindings.len(),
            warnings = snapshot.warning_count(),
            "Snapshot built"
        );

        Ok(snapshot)
    }
}

/// Builds a snapshot of `source`, optionally restricted to `namespace_filter`.
pub fn build<S>(source: &S, namespace_filter: Option<&BTreeSet<String>>) -> Result<Snapshot>
where
    S: BindingSource + ?Sized,
{
    let mut builder = SnapshotBuilder::new();
    if let Some(filter) = namespace_filter {
        builder = builder.with_namespaces(filter.iter().cloned());
    }
    builder.build(source)
}

/// Grants made by one binding object, plus the subjects left out.
struct Resolved {
    grants: Vec<Binding>,
    skipped: Vec<ResolutionError>,
}

/// Turns one binding object into one grant per subject.
///
/// A bad roleRef fails the whole binding; a subject of unknown kind only
/// drops that subject.
fn resolve<S>(
    source: &S,
    kind: BindingKind,
    raw: &RawRoleBinding,
) -> std::result::Result<Resolved, ScanError>
where
    S: BindingSource + ?Sized,
{
    let name = &raw.metadata.name;
    let namespace = match kind {
        BindingKind::RoleBinding => raw.metadata.namespace.clone(),
        BindingKind::ClusterRoleBinding => String::new(),
    };

    let unsupported_ref = || ResolutionError::UnsupportedRoleRef {
        binding_kind: kind,
        binding: name.clone(),
        namespace: namespace.clone(),
        kind: raw.role_ref.kind.clone(),
    };

    let role_kind = RoleKind::parse(&raw.role_ref.kind).ok_or_else(unsupported_ref)?;
    let (role_ref, role) = match (kind, role_kind) {
        (_, RoleKind::ClusterRole) => (
            RoleRef::cluster_role(&raw.role_ref.name),
            source.cluster_role(&raw.role_ref.name)?,
        ),
        (BindingKind::RoleBinding, RoleKind::Role) => (
            RoleRef::role(&namespace, &raw.role_ref.name),
            source.role(&namespace, &raw.role_ref.name)?,
        ),
        (BindingKind::ClusterRoleBinding, RoleKind::Role) => {
            return Err(unsupported_ref().into());
        }
    };

    let role = role.ok_or_else(|| ResolutionError::MissingRole {
        binding_kind: kind,
        binding: name.clone(),
        namespace: namespace.clone(),
        role_kind,
        role: raw.role_ref.name.clone(),
    })?;

    let rules: BTreeSet<PolicyRule> = role.rules.iter().map(PolicyRule::from).collect();
    let binding_ref = BindingRef {
        name: name.clone(),
        namespace: namespace.clone(),
    };

    if raw.subjects.is_empty() {
        debug!(binding = %name, namespace = %namespace, "Binding has no subjects");
    }

    let mut grants = Vec::with_capacity(raw.subjects.len());
    let mut skipped = Vec::new();
    for subject in &raw.subjects {
        let Some(subject_kind) = SubjectKind::parse(&subject.kind) else {
            skipped.push(ResolutionError::UnsupportedSubject {
                binding_kind: kind,
                binding: name.clone(),
                namespace: namespace.clone(),
                kind: subject.kind.clone(),
                name: subject.name.clone(),
            });
            continue;
        };

        // A service account named without a namespace lives in the namespace
        // of the RoleBinding that names it.
        let subject_namespace = if subject_kind.is_namespaced() && subject.namespace.is_empty() {
            namespace.as_str()
        } else {
            subject.namespace.as_str()
        };

        grants.push(Binding::new(
            Subject::new(subject_kind, subject.name.clone(), subject_namespace),
            role_ref.clone(),
            binding_ref.clone(),
            rules.iter().cloned(),
        ));
    }

    Ok(Resolved { grants, skipped })
}

/// Groups bindings by key. Used by the diff engine; input order is irrelevant.
pub(crate) fn index_by_key(bindings: &[Binding]) -> BTreeMap<BindingKey, &Binding> {
    bindings.iter().map(|b| (b.key(), b)).collect()
}
