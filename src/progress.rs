//! Terminal progress and confirmation for plan execution.
//!
//! [`SpinnerProgress`] shows one spinner per resource while it is being
//! applied (creates and updates can wait minutes for a rollout), and
//! [`PromptConfirm`] asks before anything is changed.

use anyhow::{Context, Result};
use colored::Colorize;
use declarative::{ApplyResult, ConfirmCallback, ProgressCallback};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::HashMap;
use std::time::Duration;

const TICK: Duration = Duration::from_millis(120);

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("  {spinner:.cyan} {prefix:.bold} {msg:.dim} {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// One spinner per in-flight resource
pub struct SpinnerProgress {
    multi: MultiProgress,
    bars: HashMap<String, ProgressBar>,
}

impl SpinnerProgress {
    /// Spinners drawn to stderr; hidden entirely when `quiet`
    pub fn new(quiet: bool) -> Self {
        let target = if quiet {
            ProgressDrawTarget::hidden()
        } else {
            ProgressDrawTarget::stderr()
        };
        Self {
            multi: MultiProgress::with_draw_target(target),
            bars: HashMap::new(),
        }
    }

    fn outcome(result: &ApplyResult) -> String {
        match result {
            ApplyResult::NoChange => format!("{} unchanged", "·".dimmed()),
            ApplyResult::Created => format!("{} created", "✓".green()),
            ApplyResult::Updated => format!("{} updated", "✓".green()),
            ApplyResult::Replaced => format!("{} replaced", "✓".green()),
            ApplyResult::Deleted => format!("{} deleted", "✓".green()),
            ApplyResult::Skipped { reason } => format!("{} skipped ({reason})", "-".dimmed()),
            ApplyResult::Failed { .. } => format!("{} failed", "✗".red()),
        }
    }
}

impl ProgressCallback for SpinnerProgress {
    fn on_batch_start(&mut self, count: usize, tier: u8) {
        log::debug!("Applying tier {tier} ({count} resources)");
    }

    fn on_resource_start(&mut self, address: &str, description: &str) {
        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(spinner_style());
        bar.set_prefix(address.to_string());
        bar.set_message(description.to_string());
        bar.enable_steady_tick(TICK);
        self.bars.insert(address.to_string(), bar);
    }

    fn on_resource_complete(&mut self, address: &str, result: &ApplyResult) {
        let line = format!("  {} {}", Self::outcome(result), address.bold());
        match self.bars.remove(address) {
            Some(bar) => {
                bar.finish_and_clear();
                // println on the multi-progress keeps the line above the live spinners
                if self.multi.println(&line).is_err() {
                    eprintln!("{line}");
                }
            }
            None => {
                if !self.multi.is_hidden() {
                    eprintln!("{line}");
                }
            }
        }
    }

    fn on_batch_complete(&mut self) {
        for (_, bar) in self.bars.drain() {
            bar.finish_and_clear();
        }
    }
}

/// Interactive yes/no prompt, or auto-confirm when `assume_yes`
pub struct PromptConfirm {
    assume_yes: bool,
}

impl PromptConfirm {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .context("Failed to read confirmation")
    }
}
