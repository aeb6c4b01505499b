//! `apply` and `destroy`: plan, confirm, then reconcile tier by tier.

use anyhow::{Result, bail};
use declarative::{
    Cancellation, ExecuteOptions, ExecuteSummary, ExecutionPlan, compute_diffs, execute,
};
use std::time::Instant;

use super::plan::build_plan;
use crate::Context;
use crate::cli::ApplyArgs;
use crate::config::ProviderConfig;
use crate::progress::{PromptConfirm, SpinnerProgress};
use crate::resource;
use crate::ui;

pub fn apply(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let desired = ctx.desired()?;
    let provider = ctx.provider(desired.provider.clone())?;
    let engine = ctx.engine(&provider);
    let store = ctx.open_state()?;

    let plan = build_plan(desired, &engine, &store, args.target.as_deref())?;
    run(ctx, args, &provider, plan, "Apply")
}

pub fn destroy(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let provider = ctx.provider_without_desired()?;
    let engine = ctx.engine(&provider);
    let store = ctx.open_state()?;

    let plan = ExecutionPlan::build(resource::build_destroy(&engine, &store))?
        .filter_by_target(args.target.as_deref());
    run(ctx, args, &provider, plan, "Destroy")
}

fn run(
    ctx: &Context,
    args: &ApplyArgs,
    provider: &ProviderConfig,
    plan: ExecutionPlan,
    title: &str,
) -> Result<()> {
    let diffs = compute_diffs(&plan);
    ui::header(title);
    ui::display_plan(&diffs);

    if diffs.is_empty() {
        return Ok(());
    }
    if args.dry_run {
        println!();
        ui::info("Dry run - no changes made");
        return Ok(());
    }

    provider.require_credentials()?;

    let opts = ExecuteOptions {
        dry_run: false,
        jobs: args.jobs.max(1),
        verbose: ctx.verbose > 0,
        fail_fast: args.fail_fast,
    };

    println!();
    let cancel = Cancellation::new();
    cancel_on_interrupt(&cancel);
    let started = Instant::now();
    let summary = execute_plan(plan, &opts, &cancel, ctx.quiet, args.yes)?;

    if summary.total_changes() == 0 && summary.failed == 0 && summary.skipped == diffs.len() {
        println!();
        ui::warn("Aborted");
        return Ok(());
    }

    ui::display_summary(&summary, started.elapsed());
    if !summary.is_success() {
        bail!("{} of {} resources failed", summary.failed, diffs.len());
    }
    Ok(())
}

/// Fire `cancel` on Ctrl-C. A second Ctrl-C exits immediately.
fn cancel_on_interrupt(cancel: &Cancellation) {
    let trigger = cancel.clone();
    let installed = ctrlc::set_handler(move || {
        if trigger.is_cancelled() {
            std::process::exit(130);
        }
        eprintln!();
        log::warn!("Interrupted, waiting for in-flight calls to stop (Ctrl-C again to exit)");
        trigger.cancel();
    });
    if let Err(e) = installed {
        log::warn!("Could not install Ctrl-C handler: {e}");
    }
}

/// Execute with terminal progress and an optional confirmation prompt
///
/// `cancel` is fired by the Ctrl-C handler, or by the executor on the first
/// failure when `opts.fail_fast` is set. Waits in flight then stop, their
/// records stay in state and later batches are skipped.
pub fn execute_plan(
    plan: ExecutionPlan,
    opts: &ExecuteOptions,
    cancel: &Cancellation,
    quiet: bool,
    assume_yes: bool,
) -> Result<ExecuteSummary> {
    let mut progress = SpinnerProgress::new(quiet);
    let mut confirm = PromptConfirm::new(assume_yes);
    execute(plan, opts, cancel, &mut progress, &mut confirm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timeouts;
    use crate::function::{CodeSource, FunctionEngine, FunctionSpec, RuntimeKind};
    use crate::schema::Desired;
    use crate::secret::SecretSpec;
    use crate::state::StateStore;
    use declarative::WaitPolicy;
    use faaskit::{Client, MockBackend, Verb};
    use std::sync::Arc;
    use std::time::Duration;

    fn setup() -> (MockBackend, FunctionEngine, Arc<StateStore>) {
        let mock = MockBackend::new();
        let engine = FunctionEngine::new(
            Arc::new(Client::with_backend(Box::new(mock.clone()))),
            Timeouts::default(),
            WaitPolicy::fixed(Duration::from_secs(5), Duration::from_millis(1)),
        );
        (mock, engine, Arc::new(StateStore::in_memory()))
    }

    fn desired() -> Desired {
        let mut api = FunctionSpec::new("fn-api", RuntimeKind::Python311);
        api.code = Some(CodeSource::Inline("def handle(req):\n    return 1\n".into()));
        api.secrets = vec!["db-password".into()];
        Desired {
            functions: vec![api, FunctionSpec::new("fn-worker", RuntimeKind::Node20)],
            secrets: vec![SecretSpec {
                name: "db-password".into(),
                value: "hunter2".into(),
                namespace: None,
            }],
            ..Default::default()
        }
    }

    fn opts(fail_fast: bool) -> ExecuteOptions {
        ExecuteOptions {
            jobs: 2,
            fail_fast,
            ..Default::default()
        }
    }

    #[test]
    fn test_apply_then_destroy() {
        let (mock, engine, store) = setup();

        let plan = build_plan(desired(), &engine, &store, None).unwrap();
        let summary = execute_plan(plan, &opts(false), &Cancellation::new(), true, true).unwrap();
        assert!(summary.is_success());
        assert_eq!(summary.created, 3);
        assert_eq!(store.snapshot().functions.len(), 2);

        // Secrets are created before the functions that bind them
        let calls = mock.calls();
        let secret_at = calls.iter().position(|c| c.verb() == Verb::CreateSecret);
        let first_fn_at = calls.iter().position(|c| c.verb() == Verb::CreateFunction);
        assert!(secret_at < first_fn_at);

        let plan = build_plan(desired(), &engine, &store, None).unwrap();
        assert!(plan.is_empty());

        let plan = ExecutionPlan::build(resource::build_destroy(&engine, &store)).unwrap();
        let summary = execute_plan(plan, &opts(false), &Cancellation::new(), true, true).unwrap();
        assert_eq!(summary.deleted, 3);
        let state = store.snapshot();
        assert!(state.functions.is_empty() && state.secrets.is_empty());
    }

    #[test]
    fn test_failure_does_not_stop_other_resources() {
        let (mock, engine, store) = setup();
        mock.fail_next(
            Verb::CreateSecret,
            faaskit::Error::http("create secret", 500, "boom"),
        );

        let plan = build_plan(desired(), &engine, &store, None).unwrap();
        let summary = execute_plan(plan, &opts(false), &Cancellation::new(), true, true).unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.created, 2);
        assert_eq!(summary.failures[0].0, "secret.db-password");
    }

    #[test]
    fn test_fail_fast_skips_later_tiers() {
        let (mock, engine, store) = setup();
        mock.fail_next(
            Verb::CreateSecret,
            faaskit::Error::http("create secret", 500, "boom"),
        );

        let plan = build_plan(desired(), &engine, &store, None).unwrap();
        let summary = execute_plan(plan, &opts(true), &Cancellation::new(), true, true).unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(mock.count(Verb::CreateFunction), 0);
        assert!(store.snapshot().functions.is_empty());
    }

    #[test]
    fn test_cancel_mid_apply_keeps_tainted_records() {
        let (mock, engine, store) = setup();
        mock.set_rollout(["Deploying"]);

        let cancel = Cancellation::new();
        let trigger = cancel.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            trigger.cancel();
        });

        let plan = build_plan(desired(), &engine, &store, None).unwrap();
        let summary = execute_plan(plan, &opts(false), &cancel, true, true).unwrap();
        handle.join().unwrap();

        assert_eq!(summary.created, 1);
        assert_eq!(summary.failed, 2);
        assert!(
            summary
                .failures
                .iter()
                .all(|(_, message)| message.contains("cancelled"))
        );
        let state = store.snapshot();
        assert!(state.secrets.contains_key("db-password"));
        assert_eq!(state.functions.len(), 2);
        assert!(state.functions.values().all(|r| r.tainted));
    }
}
