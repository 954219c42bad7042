//! Execution engine - applies resources one at a time, in plan order

use crate::context::{ApplyContext, ConfirmCallback, ProgressCallback};
use crate::diff::compute_diffs;
use crate::planner::ExecutionPlan;
use crate::resource::Resource;
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary};
use anyhow::Result;

/// Execute a plan with the given options and callbacks
///
/// Resources are applied sequentially. Every resource in the plan is
/// applied once something needs to change, since earlier resources may
/// create what later ones depend on.
///
/// Returns a summary of execution results.
pub fn execute<P, C>(
    plan: ExecutionPlan,
    opts: ExecuteOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteSummary>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let (diffs, errors) = compute_diffs(&plan.resources);
    let total_changes = diffs.len() + errors.len();

    if total_changes == 0 {
        return Ok(ExecuteSummary {
            no_change: plan.resources.len(),
            ..Default::default()
        });
    }

    if opts.dry_run {
        return Ok(ExecuteSummary::default());
    }

    if !confirm.confirm("Apply changes?")? {
        return Ok(ExecuteSummary {
            skipped: total_changes,
            ..Default::default()
        });
    }

    let mut summary = ExecuteSummary::default();
    progress.on_batch_start(plan.resources.len());

    let mut remaining = plan.resources.len();
    for resource in &plan.resources {
        remaining -= 1;
        progress.on_resource_start(&resource.id(), &resource.description());
        let result = apply_resource(resource.as_ref(), opts.verbose);
        progress.on_resource_complete(&resource.id(), &result);
        summary.add_result(&result);

        if let ApplyResult::Failed { error } = &result {
            summary.errors.push(format!("{}: {error}", resource.id()));
            if opts.fail_fast {
                summary.skipped += remaining;
                break;
            }
        }
    }

    progress.on_batch_complete();
    Ok(summary)
}

/// Apply a single resource
fn apply_resource(resource: &dyn Resource, verbose: bool) -> ApplyResult {
    let mut ctx = ApplyContext::new(false, verbose);

    match resource.apply(&mut ctx) {
        Ok(result) => result,
        Err(e) => ApplyResult::Failed {
            error: format!("{e:#}"),
        },
    }
}

/// Simple execution without callbacks
///
/// For basic use cases where you don't need progress or confirmation.
pub fn execute_simple(plan: ExecutionPlan, opts: ExecuteOptions) -> Result<ExecuteSummary> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(plan, opts, &mut NoProgress, &mut AutoConfirm)
}
