//! `show`: print recorded state.

use anyhow::{Result, bail};
use colored::Colorize;
use serde_json::json;

use crate::Context;
use crate::cli::ShowArgs;
use crate::state::{FunctionRecord, SecretRecord, StateFile};
use crate::ui;

pub fn run(ctx: &Context, args: &ShowArgs) -> Result<()> {
    let store = ctx.open_state()?;
    let state = store.snapshot();

    match args.name.as_deref() {
        None if args.json => println!("{}", serde_json::to_string_pretty(&state)?),
        None => show_all(&state),
        Some(name) => {
            let function = state.functions.get(name);
            let secret = state.secrets.get(name);
            if function.is_none() && secret.is_none() {
                bail!("Nothing named {name} in {}", store.path().display());
            }
            if args.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "function": function,
                        "secret": secret,
                    }))?
                );
            } else {
                if let Some(record) = function {
                    show_function(name, record);
                }
                if let Some(record) = secret {
                    show_secret(name, record);
                }
            }
        }
    }
    Ok(())
}

fn show_all(state: &StateFile) {
    ui::header("State");
    ui::kv("Serial", &state.serial.to_string());
    if let Some(updated) = state.last_updated {
        ui::kv("Updated", &updated.format("%Y-%m-%d %H:%M:%S UTC").to_string());
    }

    if state.functions.is_empty() && state.secrets.is_empty() {
        println!();
        ui::info("Nothing recorded yet");
        return;
    }

    if !state.functions.is_empty() {
        ui::section("Functions");
        for (name, record) in &state.functions {
            let status = match (&record.observed, record.tainted) {
                (_, true) => "tainted".red(),
                (Some(observed), false) => observed.status.to_string().green(),
                (None, false) => "not read".dimmed(),
            };
            println!(
                "  {} {} {} {}",
                ui::column(name, 28).bold(),
                ui::column(&record.id, 12).dimmed(),
                ui::column(record.spec.runtime.as_str(), 18),
                status
            );
        }
    }

    if !state.secrets.is_empty() {
        ui::section("Secrets");
        for (name, record) in &state.secrets {
            println!(
                "  {} {} {}",
                ui::column(name, 28).bold(),
                ui::column(&record.id, 12).dimmed(),
                record.namespace
            );
        }
    }
}

fn show_function(name: &str, record: &FunctionRecord) {
    ui::header(&format!("function.{name}"));
    ui::kv("Id", &record.id);
    ui::kv("Runtime", record.spec.runtime.as_str());
    ui::kv("Template", record.spec.template.as_str());
    ui::kv("Handler", &record.spec.handler);
    if let Some(code) = &record.spec.code {
        ui::kv("Code", &code.label());
    }
    if let Some(config) = &record.spec.config {
        ui::kv(
            "Config",
            &format!(
                "{} MB, {}s timeout, {} replicas, {}",
                config.memory_mb, config.timeout_seconds, config.replicas, config.hardware_type
            ),
        );
    }
    if record.tainted {
        ui::warn("Tainted: the last create did not finish, the next apply replaces it");
    }
    if let Some(observed) = &record.observed {
        ui::section("Observed");
        ui::kv("Status", &observed.status.to_string());
        ui::kv("Version", &observed.version);
        ui::kv("Namespace", &observed.namespace);
        ui::kv("URL", &observed.invoke_url);
        ui::kv("Updated", &observed.updated_at);
        ui::kv("Invocations", &observed.invocation_count.to_string());
        if let Some(message) = &observed.error_message {
            ui::kv("Error", message);
        }
    }
    if !record.spec.environment.is_empty() {
        ui::section("Environment");
        for (key, value) in &record.spec.environment {
            ui::kv(key, value);
        }
    }
    if !record.spec.secrets.is_empty() {
        ui::kv("Secrets", &record.spec.secrets.join(", "));
    }
}

fn show_secret(name: &str, record: &SecretRecord) {
    ui::header(&format!("secret.{name}"));
    ui::kv("Id", &record.id);
    ui::kv("Namespace", &record.namespace);
    ui::kv("Created", &record.created_at);
    ui::kv("Value hash", &record.value_hash);
}
