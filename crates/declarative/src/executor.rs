//! Execution engine - applies planned steps tier by tier with parallelism

use crate::context::{ApplyContext, ConfirmCallback, ProgressCallback};
use crate::planner::{ExecutionPlan, PlannedStep};
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary};
use crate::wait::Cancellation;
use anyhow::Result;
use rayon::prelude::*;
use std::sync::{Mutex, PoisonError};

/// Execute a plan with the given options and callbacks
///
/// Steps run in the batches produced by [`ExecutionPlan::into_batches`].
/// A failing step is recorded in the summary and does not stop the other
/// steps, unless `opts.fail_fast` is set: then `cancel` fires, in-flight
/// waits return early and later batches are skipped.
///
/// # Arguments
/// * `plan` - The execution plan to run
/// * `opts` - Execution options (dry_run, jobs, verbose, fail_fast)
/// * `cancel` - Token handed to every resource through its [`ApplyContext`]
/// * `progress` - Progress callback
/// * `confirm` - Confirmation callback
///
/// # Returns
/// Summary of execution results
pub fn execute<P, C>(
    plan: ExecutionPlan,
    opts: &ExecuteOptions,
    cancel: &Cancellation,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteSummary>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let unchanged = plan.total_resources() - plan.change_count();
    let total_changes = plan.change_count();

    if total_changes == 0 {
        return Ok(ExecuteSummary {
            no_change: unchanged,
            ..Default::default()
        });
    }

    // Confirm before proceeding (unless dry_run)
    if !opts.dry_run && !confirm.confirm("Apply changes?")? {
        return Ok(ExecuteSummary {
            skipped: total_changes,
            no_change: unchanged,
            ..Default::default()
        });
    }

    let mut summary = ExecuteSummary {
        no_change: unchanged,
        ..Default::default()
    };

    if opts.dry_run {
        summary.skipped = total_changes;
        return Ok(summary);
    }

    let ctx = ApplyContext::with_cancel(false, opts.verbose, cancel.clone());

    for (tier, steps) in plan.into_batches() {
        if cancel.is_cancelled() {
            for step in &steps {
                let result = ApplyResult::Skipped {
                    reason: "run aborted".to_string(),
                };
                progress.on_resource_complete(&step.address(), &result);
                summary.add_result(&step.address(), &result);
            }
            continue;
        }

        progress.on_batch_start(steps.len(), tier);
        let results = execute_batch(&steps, opts, &ctx, progress)?;
        for (address, result) in &results {
            summary.add_result(address, result);
        }
        progress.on_batch_complete();
    }

    Ok(summary)
}

/// Execute a batch of steps
fn execute_batch<P: ProgressCallback>(
    steps: &[PlannedStep],
    opts: &ExecuteOptions,
    ctx: &ApplyContext,
    progress: &mut P,
) -> Result<Vec<(String, ApplyResult)>> {
    let sequential =
        opts.jobs <= 1 || steps.len() == 1 || steps.iter().any(|s| !s.resource.can_parallelize());

    if sequential {
        let mut results = Vec::with_capacity(steps.len());
        for step in steps {
            let address = step.address();
            progress.on_resource_start(&address, &step.resource.description());
            let result = apply_step(step, ctx, opts.fail_fast);
            progress.on_resource_complete(&address, &result);
            results.push((address, result));
        }
        Ok(results)
    } else {
        execute_parallel(steps, opts, ctx, progress)
    }
}

/// Execute steps in parallel using rayon
fn execute_parallel<P: ProgressCallback>(
    steps: &[PlannedStep],
    opts: &ExecuteOptions,
    ctx: &ApplyContext,
    progress: &mut P,
) -> Result<Vec<(String, ApplyResult)>> {
    // The progress callback is not thread-safe: announce everything up front
    // and report completions after the batch.
    for step in steps {
        progress.on_resource_start(&step.address(), &step.resource.description());
    }

    let results: Mutex<Vec<(String, ApplyResult)>> = Mutex::new(Vec::with_capacity(steps.len()));

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {}", e))?;

    pool.install(|| {
        steps.par_iter().for_each(|step| {
            let result = apply_step(step, ctx, opts.fail_fast);
            results
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((step.address(), result));
        });
    });

    let results = results.into_inner().unwrap_or_else(PoisonError::into_inner);

    // Report results to progress callback
    for (address, result) in &results {
        progress.on_resource_complete(address, result);
    }

    Ok(results)
}

/// Apply a single step
fn apply_step(step: &PlannedStep, ctx: &ApplyContext, fail_fast: bool) -> ApplyResult {
    let result = match step.resource.apply(&step.action, ctx) {
        Ok(result) => result,
        Err(e) => ApplyResult::Failed {
            error: format!("{e:#}"),
        },
    };

    if !result.is_success() {
        log::warn!("{} failed to {}", step.address(), step.action.verb());
        if fail_fast {
            ctx.cancel.cancel();
        }
    }
    result
}

/// Simple execution without callbacks
///
/// For basic use cases where you don't need progress or confirmation.
pub fn execute_simple(plan: ExecutionPlan, opts: &ExecuteOptions) -> Result<ExecuteSummary> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(
        plan,
        opts,
        &Cancellation::new(),
        &mut NoProgress,
        &mut AutoConfirm,
    )
}
