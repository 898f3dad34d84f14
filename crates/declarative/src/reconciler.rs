//! Reconciler trait: the four-operation lifecycle for one resource kind
//!
//! A reconciler never holds hidden state. Every operation takes the current
//! [`ResourceState`] explicitly and hands back the next one, so the caller
//! owns persistence of identities between runs.

use crate::types::{FieldChange, LifecycleError, Output, ResourceState};
use std::fmt;

/// Result of a lifecycle operation: the next state plus the remote record
/// the service reported, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<R> {
    pub state: ResourceState,
    pub remote: Option<R>,
}

impl<R> Outcome<R> {
    /// The remote object exists under `id`
    pub fn managed(id: impl Into<String>, remote: R) -> Self {
        Self {
            state: ResourceState::managed(id),
            remote: Some(remote),
        }
    }

    /// The remote object no longer exists; identity is cleared
    pub fn absent() -> Self {
        Self {
            state: ResourceState::Unmanaged,
            remote: None,
        }
    }

    /// Check if the operation left the resource without a remote counterpart
    pub fn is_absent(&self) -> bool {
        !self.state.is_managed()
    }
}

/// CRUD lifecycle for one resource kind
///
/// Implementations perform exactly one remote exchange per operation and
/// never retry. Preconditions are checked against the supplied state before
/// any I/O:
///
/// | operation | requires    | success leaves        |
/// |-----------|-------------|-----------------------|
/// | create    | `Unmanaged` | `Managed`             |
/// | read      | `Managed`   | `Managed` or `Unmanaged` (absent remotely) |
/// | update    | `Managed`   | `Managed`             |
/// | delete    | `Managed`   | `Unmanaged`           |
///
/// A failed operation leaves the state untouched.
pub trait Reconciler {
    /// Typed desired-state fields, validated before they reach the reconciler
    type Desired: fmt::Debug;
    /// Decoded remote record
    type Remote: fmt::Debug;
    /// Operation error
    type Error: std::error::Error + From<LifecycleError> + Send + Sync + 'static;

    /// Resource kind label (e.g. "client")
    fn kind(&self) -> &'static str;

    /// Create the remote object and capture its server-assigned identity
    fn create(
        &self,
        state: &ResourceState,
        desired: &Self::Desired,
    ) -> Result<Outcome<Self::Remote>, Self::Error>;

    /// Inspect the remote object; absence is reported as an `Unmanaged` outcome
    fn read(
        &self,
        state: &ResourceState,
        desired: &Self::Desired,
    ) -> Result<Outcome<Self::Remote>, Self::Error>;

    /// Push desired fields to the remote object
    fn update(
        &self,
        state: &ResourceState,
        desired: &Self::Desired,
    ) -> Result<Outcome<Self::Remote>, Self::Error>;

    /// Delete the remote object
    fn delete(&self, state: &ResourceState) -> Result<ResourceState, Self::Error>;

    /// Fields where the remote record differs from desired state
    fn diff(&self, remote: &Self::Remote, desired: &Self::Desired) -> Vec<FieldChange>;

    /// Whether moving from the fields last applied to the desired ones
    /// needs a new object rather than an update
    fn requires_replacement(&self, _recorded: &Self::Desired, _desired: &Self::Desired) -> bool {
        false
    }

    /// Computed attributes worth persisting (identities, secrets)
    fn outputs(&self, _remote: &Self::Remote) -> Vec<Output> {
        Vec::new()
    }
}
