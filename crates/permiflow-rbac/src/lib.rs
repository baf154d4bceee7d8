//! # permiflow-rbac: Kubernetes RBAC scan and drift engine
//!
//! Captures the effective RBAC grants of a cluster as a canonical snapshot,
//! classifies each grant by blast radius, and compares snapshots to surface
//! drift:
//! - **Binding model**: one grant per (binding, subject) pair, keyed by identity
//! - **Risk classification**: HIGH / MEDIUM / LOW from rules and scope
//! - **Snapshots**: sorted, deduplicated and reproducible
//! - **Diffs**: added / removed / changed with per-field detail
//! - **Reports**: JSON (stable contract), Markdown and CSV
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │  BindingSource           │  kubectl, object dump, in-memory
//! └────────────┬─────────────┘
//!              │
//!              ▼
//! ┌──────────────────────────┐
//! │  SnapshotBuilder         │
//! │  ├─ roleRef resolution   │
//! │  ├─ risk classification  │
//! │  └─ canonical ordering   │
//! └────────────┬─────────────┘
//!              │
//!      ┌───────┴────────┐
//!      ▼                ▼
//!  report::*        diff(baseline, current) ──► report::*
//! ```
//!
//! ## Examples
//!
//! ```
//! use permiflow_rbac::source::{ObjectInventory, RawRole, RawRoleBinding};
//! use permiflow_rbac::{PolicyRule, RiskTier, SnapshotBuilder, diff};
//!
//! let baseline = ObjectInventory::new()
//!     .with_cluster_role(RawRole::new("", "cluster-admin", &[PolicyRule::new(["*"], ["*"], ["*"])]))
//!     .with_cluster_role_binding(
//!         RawRoleBinding::new("", "build-bot-admin", "ClusterRole", "cluster-admin")
//!             .with_subject("ServiceAccount", "default", "build-bot"),
//!     );
//! let current = ObjectInventory::new();
//!
//! let before = SnapshotBuilder::new().build(&baseline)?;
//! let after = SnapshotBuilder::new().build(&current)?;
//! assert_eq!(before.bindings()[0].risk, RiskTier::High);
//!
//! let drift = diff(&before, &after);
//! assert_eq!(drift.removed.len(), 1);
//! assert!(drift.added.is_empty() && drift.changed.is_empty());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod binding;
pub mod diff;
pub mod error;
pub mod report;
pub mod risk;
pub mod snapshot;
pub mod source;

// Re-export commonly used types
pub use binding::{
    Binding, BindingKey, BindingKind, BindingRef, PolicyRule, RoleKind, RoleRef, Scope, Subject,
    SubjectKind,
};
pub use diff::{BindingChange, ChangedField, DiffResult, DriftSummary, diff};
pub use error::{ConnectivityError, MalformedSnapshotError, ResolutionError, ScanError};
pub use report::{ReportError, ReportFormat};
pub use risk::{RiskFinding, RiskTier, classify};
pub use snapshot::{ResolutionWarning, RiskSummary, Snapshot, SnapshotBuilder, build};
pub use source::{BindingSource, InventoryError, ObjectInventory};
