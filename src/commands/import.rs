//! `import`: adopt a function that already exists remotely.

use anyhow::{Context as AnyhowContext, Result, bail};

use crate::Context;
use crate::cli::ImportArgs;
use crate::function::FunctionEngine;
use crate::function::translate::spec_from_state;
use crate::schema::validate_name;
use crate::state::{FunctionRecord, StateStore};
use crate::ui;

/// Record the remote function `name` (or the one with `id`) in state
///
/// The code source cannot be read back, so the first plan after an import
/// shows a code update if the manifest declares one.
pub fn import(
    engine: &FunctionEngine,
    store: &StateStore,
    name: &str,
    id: Option<&str>,
) -> Result<FunctionRecord> {
    validate_name(name)?;
    if let Some(existing) = store.function(name) {
        bail!("Function {name} is already managed (id {})", existing.id);
    }

    let observed = match id {
        Some(id) => engine
            .read(id)?
            .with_context(|| format!("No function with id {id}"))?,
        None => engine
            .find_by_name(name)?
            .with_context(|| format!("No remote function named {name}"))?,
    };
    if observed.name != name {
        bail!(
            "Function {} is named {}, not {name}",
            observed.id,
            observed.name
        );
    }

    let spec = spec_from_state(&observed)?;
    let record = FunctionRecord {
        id: observed.id.clone(),
        spec,
        observed: Some(observed),
        tainted: false,
    };
    store.put_function(name, record.clone())?;
    log::info!("Imported function {name} with id {}", record.id);
    Ok(record)
}

pub fn run(ctx: &Context, args: &ImportArgs) -> Result<()> {
    let provider = ctx.provider_without_desired()?;
    provider.require_credentials()?;
    let engine = ctx.engine(&provider);
    let store = ctx.open_state()?;

    let record = import(&engine, &store, &args.name, args.id.as_deref())?;
    ui::success(&format!("Imported function.{} ({})", args.name, record.id));
    ui::kv("Runtime", record.spec.runtime.as_str());
    ui::kv("Template", record.spec.template.as_str());
    if let Some(observed) = &record.observed {
        ui::kv("Status", &observed.status.to_string());
    }
    ui::dim("Run `faasform plan` to compare it with the manifest.");
    Ok(())
}
