//! Resource trait for declarative state management
//!
//! A [`Resource`] is the type-erased view the executor works with. Most
//! resources are a [`ManagedResource`], which drives a [`Reconciler`]
//! from recorded state toward desired state.

use crate::context::ApplyContext;
use crate::diff::ResourceDiff;
use crate::reconciler::Reconciler;
use crate::types::{Action, ApplyResult, FieldChange, Output, ResourceState};
use anyhow::{Result, anyhow};
use std::fmt;

/// Core trait for declarative resources
///
/// Every resource provides:
/// - Identity (address, description, type)
/// - Recorded lifecycle state and computed outputs
/// - Planning (compare remote with desired)
/// - Convergence (apply the planned action)
pub trait Resource: fmt::Debug {
    /// Stable address of this resource within its manifest
    ///
    /// Examples: "client.web", "grant.web-api"
    fn address(&self) -> String;

    /// Human-readable description of what this resource is
    fn description(&self) -> String;

    /// Resource type category, used for grouping and filtering
    fn resource_type(&self) -> &'static str;

    /// Current lifecycle state
    fn state(&self) -> &ResourceState;

    /// Computed attributes from the last remote response
    fn outputs(&self) -> Vec<Output> {
        Vec::new()
    }

    /// Decide what apply would do
    ///
    /// Reading remote state may detect that the recorded object is gone, in
    /// which case the identity is cleared and the plan becomes a create.
    fn plan(&mut self) -> Result<ResourceDiff>;

    /// Apply the planned action
    ///
    /// Plans first if `plan` has not been called since the last apply.
    fn apply(&mut self, ctx: &ApplyContext) -> Result<ApplyResult>;
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;

/// Drives one reconciler-backed resource instance
///
/// `desired` is `None` when the resource should not exist (it was removed
/// from the manifest, or everything is being destroyed).
pub struct ManagedResource<R: Reconciler> {
    address: String,
    reconciler: R,
    desired: Option<R::Desired>,
    recorded: Option<R::Desired>,
    state: ResourceState,
    remote: Option<R::Remote>,
    planned: Option<ResourceDiff>,
}

impl<R: Reconciler> ManagedResource<R> {
    /// A resource that should exist with the given fields
    pub fn present(
        address: impl Into<String>,
        reconciler: R,
        desired: R::Desired,
        state: ResourceState,
    ) -> Self {
        Self {
            address: address.into(),
            reconciler,
            desired: Some(desired),
            recorded: None,
            state,
            remote: None,
            planned: None,
        }
    }

    /// A resource that should not exist
    pub fn absent(address: impl Into<String>, reconciler: R, state: ResourceState) -> Self {
        Self {
            address: address.into(),
            reconciler,
            desired: None,
            recorded: None,
            state,
            remote: None,
            planned: None,
        }
    }

    /// Fields the object was last applied with.
    ///
    /// Reads look the object up with them rather than with the desired
    /// fields, and a change the reconciler cannot update in place plans a
    /// replacement.
    pub fn with_recorded(mut self, recorded: R::Desired) -> Self {
        self.recorded = Some(recorded);
        self
    }

    /// Desired fields, if the resource should exist
    pub fn desired(&self) -> Option<&R::Desired> {
        self.desired.as_ref()
    }

    /// Last remote record seen by read, create or update
    pub fn remote(&self) -> Option<&R::Remote> {
        self.remote.as_ref()
    }

    /// Read remote state and diff it against desired state
    ///
    /// Returns `None` when the remote object is gone.
    fn refresh(&mut self) -> Result<Option<Vec<FieldChange>>> {
        let Some(desired) = self.desired.as_ref() else {
            return Ok(None);
        };

        let lookup = self.recorded.as_ref().unwrap_or(desired);
        let outcome = self.reconciler.read(&self.state, lookup)?;
        self.state = outcome.state;

        if !self.state.is_managed() {
            self.remote = None;
            return Ok(None);
        }

        let changes = outcome
            .remote
            .as_ref()
            .map(|remote| self.reconciler.diff(remote, desired))
            .unwrap_or_default();
        self.remote = outcome.remote;
        Ok(Some(changes))
    }

    fn needs_replacement(&self) -> bool {
        match (self.recorded.as_ref(), self.desired.as_ref()) {
            (Some(recorded), Some(desired)) => {
                self.reconciler.requires_replacement(recorded, desired)
            }
            _ => false,
        }
    }

    fn desired_or_err(&self) -> Result<&R::Desired> {
        self.desired
            .as_ref()
            .ok_or_else(|| anyhow!("{} has no desired state", self.address))
    }
}

impl<R: Reconciler> fmt::Debug for ManagedResource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedResource")
            .field("address", &self.address)
            .field("kind", &self.reconciler.kind())
            .field("state", &self.state)
            .field("desired", &self.desired)
            .field("remote", &self.remote)
            .finish()
    }
}

impl<R: Reconciler> Resource for ManagedResource<R> {
    fn address(&self) -> String {
        self.address.clone()
    }

    fn description(&self) -> String {
        match &self.state {
            ResourceState::Managed { id } => format!("{} {}", self.reconciler.kind(), id),
            ResourceState::Unmanaged => format!("new {}", self.reconciler.kind()),
        }
    }

    fn resource_type(&self) -> &'static str {
        self.reconciler.kind()
    }

    fn state(&self) -> &ResourceState {
        &self.state
    }

    fn outputs(&self) -> Vec<Output> {
        self.remote
            .as_ref()
            .map(|remote| self.reconciler.outputs(remote))
            .unwrap_or_default()
    }

    fn plan(&mut self) -> Result<ResourceDiff> {
        let diff = match (self.desired.is_some(), self.state.is_managed()) {
            (false, false) => ResourceDiff::new(&*self, Action::NoOp),
            (false, true) => ResourceDiff::new(&*self, Action::Delete),
            (true, false) => ResourceDiff::new(&*self, Action::Create),
            (true, true) => match self.refresh()? {
                None => {
                    log::warn!(
                        "{} no longer exists remotely; it will be recreated",
                        self.address
                    );
                    ResourceDiff::new(&*self, Action::Create).drifted()
                }
                Some(changes) if self.needs_replacement() => {
                    ResourceDiff::new(&*self, Action::Replace).with_changes(changes)
                }
                Some(changes) if changes.is_empty() => ResourceDiff::new(&*self, Action::NoOp),
                Some(changes) => ResourceDiff::new(&*self, Action::Update).with_changes(changes),
            },
        };

        self.planned = Some(diff.clone());
        Ok(diff)
    }

    fn apply(&mut self, ctx: &ApplyContext) -> Result<ApplyResult> {
        let action = match self.planned.take() {
            Some(diff) => diff.action,
            None => {
                let diff = self.plan()?;
                self.planned = None;
                diff.action
            }
        };

        if action == Action::NoOp {
            return Ok(ApplyResult::NoChange);
        }

        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: format!("dry run: would {action}"),
            });
        }

        match action {
            Action::Create => {
                let outcome = self.reconciler.create(&self.state, self.desired_or_err()?)?;
                self.state = outcome.state;
                self.remote = outcome.remote;
                self.recorded = None;
                log::info!("Created {} ({})", self.address, self.state);
                Ok(ApplyResult::Created)
            }
            Action::Update => {
                let outcome = self.reconciler.update(&self.state, self.desired_or_err()?)?;
                self.state = outcome.state;
                if outcome.remote.is_some() {
                    self.remote = outcome.remote;
                }
                log::info!("Updated {}", self.address);
                Ok(ApplyResult::Modified)
            }
            Action::Delete => {
                self.state = self.reconciler.delete(&self.state)?;
                self.remote = None;
                log::info!("Deleted {}", self.address);
                Ok(ApplyResult::Removed)
            }
            Action::Replace => {
                self.state = self.reconciler.delete(&self.state)?;
                self.remote = None;
                self.recorded = None;
                log::info!("Deleted {} to replace it", self.address);

                let outcome = self.reconciler.create(&self.state, self.desired_or_err()?)?;
                self.state = outcome.state;
                self.remote = outcome.remote;
                log::info!("Recreated {} ({})", self.address, self.state);
                Ok(ApplyResult::Replaced)
            }
            Action::NoOp => Ok(ApplyResult::NoChange),
        }
    }
}
