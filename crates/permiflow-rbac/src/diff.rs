//! Structural comparison of two snapshots.
//!
//! Bindings are matched by [`BindingKey`]. A key only in the baseline is
//! removed, a key only in the current snapshot is added, and a key in both
//! whose rules, risk or role namespace differ is changed. Everything else is
//! omitted, so the size of a diff tracks the amount of drift.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::binding::{Binding, BindingKey, PolicyRule};
use crate::snapshot::{Snapshot, index_by_key};

/// A binding field that differs between baseline and current.
///
/// Declaration order is the order fields appear in `changed_fields`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangedField {
    Rules,
    Risk,
    RoleNamespace,
}

impl ChangedField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangedField::Rules => "rules",
            ChangedField::Risk => "risk",
            ChangedField::RoleNamespace => "role_namespace",
        }
    }
}

impl fmt::Display for ChangedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A binding present on both sides with different content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingChange {
    /// Identity shared by `before` and `after`.
    #[serde(flatten)]
    pub key: BindingKey,

    /// Fields that differ, in [`ChangedField`] order.
    pub changed_fields: Vec<ChangedField>,

    /// Rules present after but not before.
    pub rules_granted: Vec<PolicyRule>,

    /// Rules present before but not after.
    pub rules_revoked: Vec<PolicyRule>,

    pub before: Binding,
    pub after: Binding,
}

impl BindingChange {
    /// Compares two bindings with the same key. Returns `None` if they match.
    fn between(key: BindingKey, before: &Binding, after: &Binding) -> Option<Self> {
        let mut changed_fields = Vec::new();
        if before.rules != after.rules {
            changed_fields.push(ChangedField::Rules);
        }
        if before.risk != after.risk {
            changed_fields.push(ChangedField::Risk);
        }
        if before.role_ref.namespace != after.role_ref.namespace {
            changed_fields.push(ChangedField::RoleNamespace);
        }
        if changed_fields.is_empty() {
            return None;
        }

        Some(Self {
            key,
            changed_fields,
            rules_granted: after.rules.difference(&before.rules).cloned().collect(),
            rules_revoked: before.rules.difference(&after.rules).cloned().collect(),
            before: before.clone(),
            after: after.clone(),
        })
    }

    /// Returns whether the risk tier went up.
    pub fn is_escalation(&self) -> bool {
        self.after.risk > self.before.risk
    }
}

/// Result of comparing a baseline snapshot against a current one.
///
/// Every sequence is sorted by identity key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    #[serde(default)]
    pub added: Vec<Binding>,
    #[serde(default)]
    pub removed: Vec<Binding>,
    #[serde(default)]
    pub changed: Vec<BindingChange>,
}

impl DiffResult {
    /// Returns whether the two snapshots hold the same grants.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// Counts drift per category.
    pub fn summary(&self) -> DriftSummary {
        DriftSummary {
            added: self.added.len(),
            removed: self.removed.len(),
            changed: self.changed.len(),
            total: self.added.len() + self.removed.len() + self.changed.len(),
        }
    }

    /// Changed bindings whose risk tier went up.
    pub fn escalations(&self) -> impl Iterator<Item = &BindingChange> {
        self.changed.iter().filter(|change| change.is_escalation())
    }
}

/// Per-category drift counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftSummary {
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
    pub total: usize,
}

impl fmt::Display for DriftSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} added, {} removed, {} changed",
            self.added, self.removed, self.changed
        )
    }
}

/// Compares `baseline` against `current`.
///
/// Neither input is assumed to be sorted or to come from a live scan.
pub fn diff(baseline: &Snapshot, current: &Snapshot) -> DiffResult {
    let before = index_by_key(baseline.bindings());
    let after = index_by_key(current.bindings());

    let keys: BTreeSet<&BindingKey> = before.keys().chain(after.keys()).collect();

    let mut result = DiffResult::default();
    for key in keys {
        match (before.get(key), after.get(key)) {
            (Some(old), None) => result.removed.push((*old).clone()),
            (None, Some(new)) => result.added.push((*new).clone()),
            (Some(old), Some(new)) => {
                if let Some(change) = BindingChange::between(key.clone(), old, new) {
                    result.changed.push(change);
                }
            }
            (None, None) => {}
        }
    }

    tracing::debug!(
        added = result.added.len(),
        removed = result.removed.len(),
        changed = result.changed.len(),
        "Diff computed"
    );

    result
}
