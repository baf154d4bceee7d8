//! Error types shared by the scan and diff paths.

use thiserror::Error;

use crate::binding::{BindingKind, RoleKind};

/// A binding could not be turned into a grant.
///
/// Recoverable: the snapshot builder logs it, records a warning and moves on
/// to the next binding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// The referenced Role or ClusterRole does not exist.
    #[error("{binding_kind} '{binding}' references missing {role_kind} '{role}'")]
    MissingRole {
        binding_kind: BindingKind,
        binding: String,
        namespace: String,
        role_kind: RoleKind,
        role: String,
    },

    /// The roleRef kind is unknown or not allowed for this binding kind.
    #[error("{binding_kind} '{binding}' has unsupported roleRef kind '{kind}'")]
    UnsupportedRoleRef {
        binding_kind: BindingKind,
        binding: String,
        namespace: String,
        kind: String,
    },

    /// A subject of unknown kind.
    #[error("{binding_kind} '{binding}' has subject '{name}' of unknown kind '{kind}'")]
    UnsupportedSubject {
        binding_kind: BindingKind,
        binding: String,
        namespace: String,
        kind: String,
        name: String,
    },
}

impl ResolutionError {
    /// Returns the name and namespace of the offending binding.
    pub fn binding(&self) -> (&str, &str) {
        match self {
            ResolutionError::MissingRole {
                binding, namespace, ..
            }
            | ResolutionError::UnsupportedRoleRef {
                binding, namespace, ..
            }
            | ResolutionError::UnsupportedSubject {
                binding, namespace, ..
            } => (binding, namespace),
        }
    }
}

/// The cluster (or whatever backs a binding source) could not be reached.
///
/// Fatal: aborts the scan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cluster unreachable (context '{context}'): {reason}")]
pub struct ConnectivityError {
    /// Cluster context that was being scanned, empty for the default.
    pub context: String,

    /// What went wrong.
    pub reason: String,
}

impl ConnectivityError {
    /// Creates a connectivity error.
    pub fn new(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            reason: reason.into(),
        }
    }
}

/// A snapshot document could not be read back.
///
/// Fatal to the diff: a malformed input never degrades into an empty diff.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed snapshot {origin}: {reason}")]
pub struct MalformedSnapshotError {
    /// File name or other label for where the document came from.
    pub origin: String,

    /// What is wrong with it.
    pub reason: String,
}

impl MalformedSnapshotError {
    /// Creates a malformed snapshot error.
    pub fn new(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            reason: reason.into(),
        }
    }
}

/// Error type for building a snapshot.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A single binding failed to resolve.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// The binding source failed.
    #[error(transparent)]
    Connectivity(#[from] ConnectivityError),
}

impl ScanError {
    /// Returns whether this error must abort the whole scan.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScanError::Connectivity(_))
    }
}

/// Result type for scan operations.
pub type Result<T> = std::result::Result<T, ScanError>;
