//! `runtimes`: list the runtime catalog.

use anyhow::Result;
use colored::Colorize;

use crate::Context;
use crate::cli::RuntimesArgs;
use crate::runtimes::{self, RuntimeInfo};
use crate::ui;

pub fn run(ctx: &Context, args: &RuntimesArgs) -> Result<()> {
    let provider = ctx.provider_without_desired()?;
    provider.require_credentials()?;
    let engine = ctx.engine(&provider);

    let list = runtimes::list(engine.client(), args.hardware.as_deref())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    match &args.hardware {
        Some(hw) => ui::header(&format!("Runtimes supporting {hw}")),
        None => ui::header("Runtimes"),
    }
    if list.is_empty() {
        ui::info("No matching runtimes");
        return Ok(());
    }
    print_table(&list);
    Ok(())
}

fn print_table(list: &[RuntimeInfo]) {
    println!(
        "  {} {} {} {}",
        ui::column("NAME", 20).dimmed(),
        ui::column("VERSION", 10).dimmed(),
        ui::column("HARDWARE", 10).dimmed(),
        "TEMPLATES".dimmed()
    );
    for runtime in list {
        println!(
            "  {} {} {} {}",
            ui::column(&runtime.name, 20).bold(),
            ui::column(&runtime.version, 10),
            ui::column(&runtime.hardware.join(","), 10),
            runtime.templates.join(", ")
        );
    }
}
