//! Apply context and callback traits
//!
//! These traits allow the declarative crate to be used without
//! depending on a specific terminal UI.

use crate::diff::ResourceDiff;
use crate::types::ApplyResult;
use anyhow::Result;

/// Progress callback for execution operations
///
/// Implement this trait to receive progress updates during planning and
/// execution.
pub trait ProgressCallback {
    /// Called when starting a batch of resources
    fn on_batch_start(&mut self, count: usize, label: &str);

    /// Called when starting to plan or apply a single resource
    fn on_resource_start(&mut self, address: &str, description: &str);

    /// Called when a resource has been planned
    fn on_resource_planned(&mut self, _diff: &ResourceDiff) {}

    /// Called when a resource application completes (or its plan failed)
    fn on_resource_complete(&mut self, address: &str, result: &ApplyResult);

    /// Called when a batch completes
    fn on_batch_complete(&mut self);
}

/// Confirmation callback for user interaction
pub trait ConfirmCallback {
    /// Ask the user to confirm an action
    ///
    /// # Returns
    /// `true` if the user confirmed, `false` otherwise
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_batch_start(&mut self, _count: usize, _label: &str) {}
    fn on_resource_start(&mut self, _address: &str, _description: &str) {}
    fn on_resource_complete(&mut self, _address: &str, _result: &ApplyResult) {}
    fn on_batch_complete(&mut self) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}

/// Context passed to resource apply operations
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyContext {
    /// Whether this is a dry run (no remote writes)
    pub dry_run: bool,
    /// Whether to output verbose information
    pub verbose: bool,
}

impl ApplyContext {
    /// Create a new apply context
    pub fn new(dry_run: bool, verbose: bool) -> Self {
        Self { dry_run, verbose }
    }
}
