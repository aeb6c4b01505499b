//! `refresh`: re-read every recorded function and update its observed state.

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use rayon::prelude::*;

use crate::Context;
use crate::cli::RefreshArgs;
use crate::function::FunctionEngine;
use crate::state::{FunctionRecord, StateStore};
use crate::ui;

/// Outcome of one refresh pass
#[derive(Debug, Default)]
pub struct RefreshReport {
    pub refreshed: Vec<String>,
    /// Functions that no longer exist remotely; their records were dropped
    pub vanished: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// Read all recorded functions, `jobs` at a time
///
/// Secrets have no read verb and are left as recorded.
pub fn refresh_all(engine: &FunctionEngine, store: &StateStore, jobs: usize) -> Result<RefreshReport> {
    let records: Vec<(String, FunctionRecord)> = store.snapshot().functions.into_iter().collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .context("Failed to create thread pool")?;

    let results: Vec<_> = pool.install(|| {
        records
            .into_par_iter()
            .map(|(name, record)| {
                let observed = engine.read(&record.id);
                (name, record, observed)
            })
            .collect()
    });

    let mut report = RefreshReport::default();
    for (name, record, observed) in results {
        match observed {
            Ok(Some(observed)) => {
                store.put_function(
                    &name,
                    FunctionRecord {
                        observed: Some(observed),
                        ..record
                    },
                )?;
                report.refreshed.push(name);
            }
            Ok(None) => {
                log::warn!(
                    "Function {name} ({}) no longer exists remotely, dropping it from state",
                    record.id
                );
                store.remove_function(&name)?;
                report.vanished.push(name);
            }
            Err(e) => report.failed.push((name, e.to_string())),
        }
    }
    Ok(report)
}

pub fn run(ctx: &Context, args: &RefreshArgs) -> Result<()> {
    let provider = ctx.provider_without_desired()?;
    provider.require_credentials()?;
    let engine = ctx.engine(&provider);
    let store = ctx.open_state()?;

    ui::header("Refresh");
    let report = refresh_all(&engine, &store, args.jobs)?;

    for name in &report.refreshed {
        if let Some(observed) = store.function(name).and_then(|r| r.observed) {
            println!(
                "  {} {} {}",
                "✓".green(),
                ui::column(name, 32).bold(),
                format!("{} v{}", observed.status, observed.version).dimmed()
            );
        }
    }
    for name in &report.vanished {
        println!("  {} {} {}", "-".red(), ui::column(name, 32).bold(), "gone, record dropped".dimmed());
    }
    for (name, error) in &report.failed {
        println!("  {} {} {}", "✗".red(), ui::column(name, 32).bold(), error.dimmed());
    }

    println!();
    if report.failed.is_empty() {
        ui::success(&format!(
            "Refreshed {} functions ({} dropped)",
            report.refreshed.len(),
            report.vanished.len()
        ));
        Ok(())
    } else {
        anyhow::bail!("{} functions could not be read", report.failed.len())
    }
}
