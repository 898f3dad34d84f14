//! Execution engine - runs the staged plans and persists identities
//!
//! Every stage is planned (one read per managed resource) before anything
//! is written, so the user confirms a single combined diff. Grants waiting
//! for a client created in the same run are planned after that client.

use anyhow::Result;
use declarative::{
    ApplyResult, DiffSummary, ExecuteOptions, ExecuteSummary, ExecutionPlan, PlanReport,
    ProgressCallback, Resource, ResourceDiff, apply_planned, plan_all,
};
use mgmtapi::ManagementApi;
use std::path::Path;

use super::planner::{Deferred, Planner, destroy_plans};
use crate::manifest::Manifest;
use crate::state::StateFile;

/// One planned stage
#[derive(Debug)]
pub struct Stage {
    pub plan: ExecutionPlan,
    pub report: PlanReport,
}

/// Everything known before the first write
#[derive(Debug, Default)]
pub struct Preview {
    pub stages: Vec<Stage>,
    pub deferred: Vec<Deferred>,
}

impl Preview {
    /// Diffs of every planned resource, in execution order
    pub fn diffs(&self) -> Vec<ResourceDiff> {
        self.stages.iter().flat_map(|s| s.report.diffs()).collect()
    }

    /// (address, error) of every resource that failed to plan
    pub fn failures(&self) -> Vec<(String, String)> {
        self.stages
            .iter()
            .flat_map(|s| s.report.failures())
            .map(|(address, error)| (address.to_string(), error.to_string()))
            .collect()
    }

    pub fn summary(&self) -> DiffSummary {
        DiffSummary::from_diffs(&self.diffs())
    }

    /// Planned changes, counting deferred grants as creates
    pub fn pending_changes(&self) -> usize {
        self.stages
            .iter()
            .map(|s| s.report.pending_changes())
            .sum::<usize>()
            + self.deferred.len()
    }

    /// Summary of a run that writes nothing
    pub fn baseline(&self) -> ExecuteSummary {
        let mut summary = ExecuteSummary::default();
        for stage in &self.stages {
            summary.merge(&stage.report.baseline());
        }
        summary
    }
}

/// Reconciles one tenant, saving state after every resource step
pub struct Engine<'a> {
    api: &'a ManagementApi,
    state: &'a mut StateFile,
    state_path: &'a Path,
}

impl<'a> Engine<'a> {
    pub fn new(api: &'a ManagementApi, state: &'a mut StateFile, state_path: &'a Path) -> Self {
        Self {
            api,
            state,
            state_path,
        }
    }

    /// Plan converging the tenant to `manifest`. Writes nothing remotely;
    /// identities cleared by drift detection are persisted.
    pub fn preview<P: ProgressCallback>(
        &mut self,
        manifest: &Manifest,
        target: Option<&str>,
        progress: &mut P,
    ) -> Result<Preview> {
        let planner = Planner::new(self.api, manifest, target);
        let mut preview = Preview::default();

        let orphans = planner.orphan_grants(self.state);
        preview.stages.push(self.plan_stage(orphans, progress)?);

        let clients = planner.clients(self.state);
        preview.stages.push(self.plan_stage(clients, progress)?);

        // After stage 2 planning so drifted clients defer their grants
        let (grants, deferred) = planner.grants(self.state);
        preview.stages.push(self.plan_stage(grants, progress)?);
        preview.deferred = deferred;

        Ok(preview)
    }

    /// Plan deleting every recorded resource (no reads)
    pub fn preview_destroy<P: ProgressCallback>(
        &mut self,
        target: Option<&str>,
        progress: &mut P,
    ) -> Result<Preview> {
        let mut preview = Preview::default();
        for plan in destroy_plans(self.api, self.state, target) {
            preview.stages.push(self.plan_stage(plan, progress)?);
        }
        Ok(preview)
    }

    /// Apply a preview, then plan and apply the grants it deferred
    pub fn apply<P: ProgressCallback>(
        &mut self,
        mut preview: Preview,
        manifest: &Manifest,
        target: Option<&str>,
        opts: &ExecuteOptions,
        progress: &mut P,
    ) -> Result<ExecuteSummary> {
        let mut summary = ExecuteSummary::default();

        for stage in &mut preview.stages {
            let state = &mut *self.state;
            let path = self.state_path;
            let result = apply_planned(&mut stage.plan, &stage.report, opts, progress, |r| {
                checkpoint(state, path, r)
            })?;
            summary.merge(&result);
        }

        if preview.deferred.is_empty() {
            return Ok(summary);
        }

        let planner = Planner::new(self.api, manifest, target);
        let (plan, waiting) = planner.deferred(self.state, &preview.deferred);

        for grant in waiting {
            let result = ApplyResult::Skipped {
                reason: format!("{} has no identity", grant.client_address),
            };
            progress.on_resource_complete(&grant.address, &result);
            summary.add_result(&result);
        }

        let mut stage = self.plan_stage(plan, progress)?;
        let state = &mut *self.state;
        let path = self.state_path;
        summary.merge(&apply_planned(
            &mut stage.plan,
            &stage.report,
            opts,
            progress,
            |r| checkpoint(state, path, r),
        )?);

        Ok(summary)
    }

    fn plan_stage<P: ProgressCallback>(
        &mut self,
        mut plan: ExecutionPlan,
        progress: &mut P,
    ) -> Result<Stage> {
        let state = &mut *self.state;
        let path = self.state_path;
        let report = plan_all(&mut plan, progress, |r| checkpoint(state, path, r))?;
        Ok(Stage { plan, report })
    }
}

/// Record a resource's state and outputs, saving only when they changed
fn checkpoint(state: &mut StateFile, path: &Path, resource: &dyn Resource) -> Result<()> {
    let changed = state.record(
        &resource.address(),
        resource.resource_type(),
        resource.state(),
        &resource.outputs(),
    );
    if changed {
        state.touch(path)?;
    }
    Ok(())
}
