//! `plan` and `validate`: compare the manifest with recorded state.

use anyhow::Result;
use declarative::{ExecutionPlan, compute_diffs};
use std::sync::Arc;

use crate::Context;
use crate::cli::PlanArgs;
use crate::function::FunctionEngine;
use crate::resource;
use crate::schema::Desired;
use crate::state::StateStore;
use crate::ui;

/// Plan every declared and recorded resource, keeping those matching `target`
pub fn build_plan(
    desired: Desired,
    engine: &FunctionEngine,
    store: &Arc<StateStore>,
    target: Option<&str>,
) -> Result<ExecutionPlan> {
    let resources = resource::build(desired, engine, store);
    Ok(ExecutionPlan::build(resources)?.filter_by_target(target))
}

pub fn run(ctx: &Context, args: &PlanArgs) -> Result<()> {
    let desired = ctx.desired()?;
    let provider = ctx.provider(desired.provider.clone())?;
    let engine = ctx.engine(&provider);
    let store = ctx.open_state()?;

    let plan = build_plan(desired, &engine, &store, args.target.as_deref())?;
    let diffs = compute_diffs(&plan);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&diffs)?);
        return Ok(());
    }

    if !ctx.quiet {
        ui::header("Plan");
        ui::kv("Manifest", &ctx.manifest.display().to_string());
        ui::kv("State", &ctx.state_path.display().to_string());
    }
    ui::display_plan(&diffs);
    Ok(())
}

/// Parse and validate the manifest without touching state or the network
pub fn validate(ctx: &Context) -> Result<()> {
    let desired = ctx.desired()?;
    ctx.provider(desired.provider.clone())?;
    ui::success(&format!(
        "{} is valid: {} functions, {} secrets",
        ctx.manifest.display(),
        desired.functions.len(),
        desired.secrets.len()
    ));
    Ok(())
}
