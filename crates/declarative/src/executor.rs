//! Execution engine - plans and applies resources one at a time
//!
//! Reconciliation is strictly sequential: each resource gets one read while
//! planning and at most one write while applying. A failure is recorded
//! against that resource and the remaining ones still run.

use crate::context::{ApplyContext, ProgressCallback};
use crate::diff::ResourceDiff;
use crate::planner::ExecutionPlan;
use crate::resource::Resource;
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary};
use anyhow::{Result, bail};

/// Outcome of planning one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanEntry {
    /// The resource was planned
    Planned(ResourceDiff),
    /// Planning failed (e.g. the read was rejected)
    Failed { address: String, error: String },
}

/// Outcome of planning a whole execution plan, in plan order
#[derive(Debug, Clone, Default)]
pub struct PlanReport {
    pub entries: Vec<PlanEntry>,
}

impl PlanReport {
    /// Diffs of every successfully planned resource
    pub fn diffs(&self) -> Vec<ResourceDiff> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                PlanEntry::Planned(diff) => Some(diff.clone()),
                PlanEntry::Failed { .. } => None,
            })
            .collect()
    }

    /// (address, error) of every resource that failed to plan
    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                PlanEntry::Failed { address, error } => Some((address.as_str(), error.as_str())),
                PlanEntry::Planned(_) => None,
            })
            .collect()
    }

    /// Summary counting unchanged resources and planning failures
    pub fn baseline(&self) -> ExecuteSummary {
        let mut summary = ExecuteSummary::default();
        for entry in &self.entries {
            match entry {
                PlanEntry::Planned(diff) if diff.is_change() => {}
                PlanEntry::Planned(_) => summary.add_result(&ApplyResult::NoChange),
                PlanEntry::Failed { error, .. } => summary.add_result(&ApplyResult::Failed {
                    error: error.clone(),
                }),
            }
        }
        summary
    }

    /// Check if nothing failed to plan
    pub fn is_clean(&self) -> bool {
        self.entries
            .iter()
            .all(|e| matches!(e, PlanEntry::Planned(_)))
    }

    /// Number of planned changes
    pub fn pending_changes(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, PlanEntry::Planned(diff) if diff.is_change()))
            .count()
    }
}

/// Plan every resource in the plan
///
/// `checkpoint` is called after each resource so the caller can persist
/// identities cleared by drift detection.
pub fn plan_all<P, F>(
    plan: &mut ExecutionPlan,
    progress: &mut P,
    mut checkpoint: F,
) -> Result<PlanReport>
where
    P: ProgressCallback,
    F: FnMut(&dyn Resource) -> Result<()>,
{
    let mut report = PlanReport::default();
    if plan.is_empty() {
        return Ok(report);
    }

    progress.on_batch_start(plan.total_resources(), "Refreshing");
    for resource in &mut plan.resources {
        let address = resource.address();
        progress.on_resource_start(&address, &resource.description());

        let entry = match resource.plan() {
            Ok(diff) => {
                progress.on_resource_planned(&diff);
                PlanEntry::Planned(diff)
            }
            Err(e) => {
                let error = format!("{e:#}");
                progress.on_resource_complete(
                    &address,
                    &ApplyResult::Failed {
                        error: error.clone(),
                    },
                );
                PlanEntry::Failed { address, error }
            }
        };
        report.entries.push(entry);

        checkpoint(resource.as_ref())?;
    }
    progress.on_batch_complete();

    Ok(report)
}

/// Apply every resource that `report` planned a change for
///
/// `report` must come from [`plan_all`] on the same plan. Resources that
/// planned no change or failed to plan are only counted.
pub fn apply_planned<P, F>(
    plan: &mut ExecutionPlan,
    report: &PlanReport,
    opts: &ExecuteOptions,
    progress: &mut P,
    mut checkpoint: F,
) -> Result<ExecuteSummary>
where
    P: ProgressCallback,
    F: FnMut(&dyn Resource) -> Result<()>,
{
    if report.entries.len() != plan.total_resources() {
        bail!(
            "plan report covers {} resources, plan has {}",
            report.entries.len(),
            plan.total_resources()
        );
    }

    let mut summary = report.baseline();
    let pending: Vec<usize> = report
        .entries
        .iter()
        .enumerate()
        .filter(|(_, e)| matches!(e, PlanEntry::Planned(diff) if diff.is_change()))
        .map(|(index, _)| index)
        .collect();

    if pending.is_empty() {
        return Ok(summary);
    }

    let ctx = ApplyContext::new(opts.dry_run, opts.verbose);
    progress.on_batch_start(pending.len(), if opts.dry_run { "Dry run" } else { "Applying" });
    for index in pending {
        let resource = &mut plan.resources[index];
        let address = resource.address();
        progress.on_resource_start(&address, &resource.description());

        let result = apply_resource(resource.as_mut(), &ctx);
        progress.on_resource_complete(&address, &result);
        summary.add_result(&result);

        checkpoint(resource.as_ref())?;
    }
    progress.on_batch_complete();

    Ok(summary)
}

/// Apply a single resource
fn apply_resource(resource: &mut dyn Resource, ctx: &ApplyContext) -> ApplyResult {
    match resource.apply(ctx) {
        Ok(result) => result,
        Err(e) => ApplyResult::Failed {
            error: format!("{e:#}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NoProgress;
    use crate::resource::ManagedResource;
    use crate::testing::FakeReconciler;
    use crate::types::{Action, ResourceState};

    fn present(fake: &FakeReconciler, address: &str, value: &str, state: ResourceState) -> Box<dyn Resource> {
        Box::new(ManagedResource::present(
            address,
            fake.clone(),
            value.to_string(),
            state,
        ))
    }

    #[derive(Default)]
    struct Recorder {
        started: Vec<String>,
        completed: Vec<(String, ApplyResult)>,
    }

    impl ProgressCallback for Recorder {
        fn on_batch_start(&mut self, _count: usize, _label: &str) {}
        fn on_resource_start(&mut self, address: &str, _description: &str) {
            self.started.push(address.to_string());
        }
        fn on_resource_complete(&mut self, address: &str, result: &ApplyResult) {
            self.completed.push((address.to_string(), result.clone()));
        }
        fn on_batch_complete(&mut self) {}
    }

    fn plan_and_apply<P, F>(
        plan: &mut ExecutionPlan,
        opts: &ExecuteOptions,
        progress: &mut P,
        mut checkpoint: F,
    ) -> Result<ExecuteSummary>
    where
        P: ProgressCallback,
        F: FnMut(&dyn Resource) -> Result<()>,
    {
        let report = plan_all(plan, progress, &mut checkpoint)?;
        apply_planned(plan, &report, opts, progress, checkpoint)
    }

    #[test]
    fn test_plan_and_apply_empty_plan() {
        let mut plan = ExecutionPlan::new();
        let summary =
            plan_and_apply(&mut plan, &ExecuteOptions::default(), &mut NoProgress, |_| Ok(())).unwrap();
        assert_eq!(summary.total(), 0);
    }

    #[test]
    fn test_apply_no_changes() {
        let fake = FakeReconciler::default();
        let id = fake.seed("v1");
        let mut plan = ExecutionPlan::new();
        plan.add_resource(present(&fake, "fake.a", "v1", ResourceState::managed(&id)));

        let summary =
            plan_and_apply(&mut plan, &ExecuteOptions::default(), &mut NoProgress, |_| Ok(())).unwrap();
        assert_eq!(summary.no_change, 1);
        assert_eq!(summary.total_changes(), 0);
    }

    #[test]
    fn test_apply_with_changes() {
        let fake = FakeReconciler::default();
        let id = fake.seed("v1");
        let mut plan = ExecutionPlan::new();
        plan.add_resource(present(&fake, "fake.new", "v1", ResourceState::Unmanaged));
        plan.add_resource(present(&fake, "fake.old", "v2", ResourceState::managed(&id)));

        let summary =
            plan_and_apply(&mut plan, &ExecuteOptions::default(), &mut NoProgress, |_| Ok(())).unwrap();
        assert_eq!(summary.created, 1);
        assert_eq!(summary.modified, 1);
        assert!(summary.is_success());
    }

    #[test]
    fn test_dry_run_makes_no_writes() {
        let fake = FakeReconciler::default();
        let mut plan = ExecutionPlan::new();
        plan.add_resource(present(&fake, "fake.a", "v1", ResourceState::Unmanaged));

        let opts = ExecuteOptions {
            dry_run: true,
            ..Default::default()
        };
        let summary = plan_and_apply(&mut plan, &opts, &mut NoProgress, |_| Ok(())).unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(fake.calls(), 0);
    }

    #[test]
    fn test_failure_does_not_stop_other_resources() {
        let fake = FakeReconciler::default();
        let healthy = FakeReconciler::default();
        let id = fake.seed("v1");
        fake.fail_writes();

        let mut plan = ExecutionPlan::new();
        plan.add_resource(present(&fake, "fake.broken", "v2", ResourceState::managed(&id)));
        plan.add_resource(present(&healthy, "fake.ok", "v1", ResourceState::Unmanaged));

        let mut recorder = Recorder::default();
        let summary =
            plan_and_apply(&mut plan, &ExecuteOptions::default(), &mut recorder, |_| Ok(())).unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.created, 1);
        assert!(matches!(
            recorder.completed.last(),
            Some((address, ApplyResult::Created)) if address == "fake.ok"
        ));
        assert!(recorder.completed.iter().any(
            |(address, result)| address == "fake.broken" && matches!(result, ApplyResult::Failed { .. })
        ));
    }

    #[test]
    fn test_checkpoint_sees_final_state() {
        let fake = FakeReconciler::default();
        let mut plan = ExecutionPlan::new();
        plan.add_resource(present(&fake, "fake.a", "v1", ResourceState::Unmanaged));

        let mut seen = Vec::new();
        plan_and_apply(&mut plan, &ExecuteOptions::default(), &mut NoProgress, |r| {
            seen.push((r.address(), r.state().clone()));
            Ok(())
        })
        .unwrap();

        // once after planning, once after applying
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].1, ResourceState::Unmanaged);
        assert!(seen[1].1.is_managed());
    }

    #[test]
    fn test_checkpoint_error_aborts() {
        let fake = FakeReconciler::default();
        let mut plan = ExecutionPlan::new();
        plan.add_resource(present(&fake, "fake.a", "v1", ResourceState::Unmanaged));

        let result = plan_and_apply(&mut plan, &ExecuteOptions::default(), &mut NoProgress, |_| {
            anyhow::bail!("disk full")
        });
        assert!(result.is_err());
        assert_eq!(fake.calls(), 0);
    }

    #[test]
    fn test_plan_all_reports_drift_and_failures() {
        let fake = FakeReconciler::default();
        let mut plan = ExecutionPlan::new();
        plan.add_resource(present(&fake, "fake.gone", "v1", ResourceState::managed("missing")));
        plan.add_resource(Box::new(ManagedResource::absent(
            "fake.orphan",
            fake.clone(),
            ResourceState::managed("fake-9"),
        )));

        let report = plan_all(&mut plan, &mut NoProgress, |_| Ok(())).unwrap();
        let diffs = report.diffs();
        assert_eq!(diffs[0].action, Action::Create);
        assert!(diffs[0].drifted);
        assert_eq!(diffs[1].action, Action::Delete);
        assert_eq!(report.pending_changes(), 2);
        assert!(report.failures().is_empty());
    }

    #[test]
    fn test_apply_planned_reuses_plan_reads() {
        let fake = FakeReconciler::default();
        let id = fake.seed("v1");
        let mut plan = ExecutionPlan::new();
        plan.add_resource(present(&fake, "fake.a", "v2", ResourceState::managed(&id)));
        plan.add_resource(present(&fake, "fake.b", "v1", ResourceState::Unmanaged));

        let report = plan_all(&mut plan, &mut NoProgress, |_| Ok(())).unwrap();
        let reads = fake.calls();
        assert_eq!(reads, 1);

        let summary = apply_planned(
            &mut plan,
            &report,
            &ExecuteOptions::default(),
            &mut NoProgress,
            |_| Ok(()),
        )
        .unwrap();

        // one update and one create, no further reads
        assert_eq!(fake.calls(), reads + 2);
        assert_eq!(summary.modified, 1);
        assert_eq!(summary.created, 1);
    }

    #[test]
    fn test_apply_planned_rejects_mismatched_report() {
        let fake = FakeReconciler::default();
        let mut plan = ExecutionPlan::new();
        plan.add_resource(present(&fake, "fake.a", "v1", ResourceState::Unmanaged));

        let result = apply_planned(
            &mut plan,
            &PlanReport::default(),
            &ExecuteOptions::default(),
            &mut NoProgress,
            |_| Ok(()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_baseline_counts_unchanged_and_failed() {
        let report = PlanReport {
            entries: vec![PlanEntry::Failed {
                address: "fake.x".to_string(),
                error: "read rejected".to_string(),
            }],
        };
        let summary = report.baseline();
        assert_eq!(summary.failed, 1);
        assert!(!report.is_clean());
    }
}
