//! # Declarative
//!
//! A framework for declarative management of remote resources.
//!
//! This crate provides the core abstractions for recording the identity of
//! remote objects, reading them back, detecting drift, and converging them
//! toward a desired state.
//!
//! ## Core Concepts
//!
//! - **ResourceState**: Lifecycle of one instance (`Unmanaged` or `Managed { id }`)
//! - **Reconciler**: The create/read/update/delete lifecycle for one resource kind
//! - **ManagedResource**: Drives a reconciler from recorded state toward desired state
//! - **ExecutionPlan**: An ordered list of resources
//! - **Executor**: Plans and applies resources sequentially
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{
//!     ExecuteOptions, ExecutionPlan, ManagedResource, NoProgress, ResourceState, apply_planned,
//!     plan_all,
//! };
//!
//! let mut plan = ExecutionPlan::new();
//! plan.add_resource(Box::new(ManagedResource::present(
//!     "client.web",
//!     clients,
//!     spec,
//!     ResourceState::Unmanaged,
//! )));
//!
//! let report = plan_all(&mut plan, &mut NoProgress, |_| Ok(()))?;
//! let summary = apply_planned(&mut plan, &report, &ExecuteOptions::default(), &mut NoProgress, |_| Ok(()))?;
//! ```
//!
//! ## Callback Traits
//!
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks.

pub mod context;
pub mod diff;
pub mod executor;
pub mod planner;
pub mod reconciler;
pub mod resource;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use context::{
    ApplyContext, AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback,
};
pub use diff::{DiffSummary, ResourceDiff, group_by_type};
pub use executor::{PlanEntry, PlanReport, apply_planned, plan_all};
pub use planner::{ExecutionPlan, matches_target};
pub use reconciler::{Outcome, Reconciler};
pub use resource::{BoxedResource, ManagedResource, Resource};
pub use types::{
    Action, ApplyResult, ExecuteOptions, ExecuteSummary, FieldChange, LifecycleError, Output,
    ResourceState,
};
