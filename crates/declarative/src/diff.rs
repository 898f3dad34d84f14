//! Diff computation for resources

use crate::resource::Resource;
use crate::types::{Action, FieldChange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a plan found for one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDiff {
    /// Stable address of the resource (e.g. "client.web")
    pub address: String,
    /// Type of the resource
    pub resource_type: String,
    /// Human-readable description
    pub description: String,
    /// What apply would do
    pub action: Action,
    /// Field-level changes for updates and replacements
    pub changes: Vec<FieldChange>,
    /// The recorded remote object was found missing on read
    pub drifted: bool,
}

impl ResourceDiff {
    /// A diff with no field changes
    pub fn new(resource: &dyn Resource, action: Action) -> Self {
        Self {
            address: resource.address(),
            resource_type: resource.resource_type().to_string(),
            description: resource.description(),
            action,
            changes: Vec::new(),
            drifted: false,
        }
    }

    /// Attach field changes
    pub fn with_changes(mut self, changes: Vec<FieldChange>) -> Self {
        self.changes = changes;
        self
    }

    /// Mark the diff as caused by remote drift
    pub fn drifted(mut self) -> Self {
        self.drifted = true;
        self
    }

    /// Check if this diff represents an addition
    pub fn is_addition(&self) -> bool {
        self.action == Action::Create
    }

    /// Check if this diff represents a removal
    pub fn is_removal(&self) -> bool {
        self.action == Action::Delete
    }

    /// Check if this diff represents a modification
    pub fn is_modification(&self) -> bool {
        self.action == Action::Update
    }

    /// Check if apply would touch the remote service
    pub fn is_change(&self) -> bool {
        self.action.is_change()
    }
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Number of resources to create
    pub additions: usize,
    /// Number of resources to delete
    pub removals: usize,
    /// Number of resources to update
    pub modifications: usize,
    /// Number of resources to delete and create anew
    pub replacements: usize,
    /// Number of resources found missing remotely
    pub drifted: usize,
    /// Number of resources already in sync
    pub unchanged: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            match diff.action {
                Action::Create => summary.additions += 1,
                Action::Delete => summary.removals += 1,
                Action::Update => summary.modifications += 1,
                Action::Replace => summary.replacements += 1,
                Action::NoOp => summary.unchanged += 1,
            }
            if diff.drifted {
                summary.drifted += 1;
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications + self.replacements
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by resource type
pub fn group_by_type(diffs: &[ResourceDiff]) -> BTreeMap<String, Vec<&ResourceDiff>> {
    let mut groups: BTreeMap<String, Vec<&ResourceDiff>> = BTreeMap::new();
    for diff in diffs {
        groups
            .entry(diff.resource_type.clone())
            .or_default()
            .push(diff);
    }
    groups
}
