//! Core types for declarative resource reconciliation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one remote resource instance as seen by this engine.
///
/// A resource starts `Unmanaged` (no remote counterpart, no identity),
/// becomes `Managed` once a create succeeds, and falls back to `Unmanaged`
/// when it is deleted or found absent on read.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ResourceState {
    /// No remote counterpart is known
    #[default]
    Unmanaged,
    /// The remote object with this server-assigned identity is managed
    Managed { id: String },
}

impl ResourceState {
    /// Managed state for a server-assigned identity
    pub fn managed(id: impl Into<String>) -> Self {
        Self::Managed { id: id.into() }
    }

    /// Check if an identity is recorded
    pub fn is_managed(&self) -> bool {
        matches!(self, Self::Managed { .. })
    }

    /// The recorded identity, if any
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Managed { id } => Some(id),
            Self::Unmanaged => None,
        }
    }

    /// Return the identity or fail with a lifecycle error
    pub fn require_managed(&self, kind: &'static str) -> Result<&str, LifecycleError> {
        self.id().ok_or(LifecycleError::NotManaged { kind })
    }

    /// Fail with a lifecycle error if an identity is already recorded
    pub fn require_unmanaged(&self, kind: &'static str) -> Result<(), LifecycleError> {
        match self {
            Self::Unmanaged => Ok(()),
            Self::Managed { id } => Err(LifecycleError::AlreadyManaged {
                kind,
                id: id.clone(),
            }),
        }
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unmanaged => write!(f, "unmanaged"),
            Self::Managed { id } => write!(f, "managed ({id})"),
        }
    }
}

/// An operation was invoked in a lifecycle state that does not allow it
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// Read, update and delete need a recorded identity
    #[error("{kind} has no recorded identity")]
    NotManaged { kind: &'static str },
    /// Create is only valid before an identity exists
    #[error("{kind} is already managed as {id}")]
    AlreadyManaged { kind: &'static str, id: String },
}

/// A single field that differs between remote and desired state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub from: String,
    pub to: String,
}

impl FieldChange {
    pub fn new(field: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            from: from.into(),
            to: to.into(),
        }
    }
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} → {}", self.field, self.from, self.to)
    }
}

/// A computed attribute reported by the remote service (e.g. a client secret)
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub name: String,
    pub value: String,
    /// Sensitive outputs are never logged or printed unmasked by default
    pub sensitive: bool,
}

impl Output {
    pub fn plain(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            sensitive: false,
        }
    }

    pub fn sensitive(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            sensitive: true,
        }
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = if self.sensitive { "<redacted>" } else { &self.value };
        f.debug_struct("Output")
            .field("name", &self.name)
            .field("value", &value)
            .field("sensitive", &self.sensitive)
            .finish()
    }
}

/// What a plan decided to do with a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Remote already matches desired state
    NoOp,
    /// Issue a create
    Create,
    /// Issue an update against the recorded identity
    Update,
    /// Issue a delete against the recorded identity
    Delete,
    /// Delete the recorded object, then create a new one
    Replace,
}

impl Action {
    /// Check if the action touches the remote service
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoOp)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NoOp => "no-op",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Replace => "replace",
        };
        write!(f, "{label}")
    }
}

/// Result of applying a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Resource was created
    Created,
    /// Resource was modified
    Modified,
    /// Resource was removed
    Removed,
    /// Resource was deleted and created anew
    Replaced,
    /// Apply failed
    Failed { error: String },
    /// Apply was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::Modified | Self::Removed | Self::Replaced
        )
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub removed: usize,
    pub replaced: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.removed + self.replaced
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.total_changes() + self.skipped + self.failed + self.no_change
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ExecuteSummary) {
        self.created += other.created;
        self.modified += other.modified;
        self.removed += other.removed;
        self.replaced += other.replaced;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.no_change += other.no_change;
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Replaced => self.replaced += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Options for execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Skip the confirmation prompt
    pub assume_yes: bool,
    /// Verbose output
    pub verbose: bool,
}
