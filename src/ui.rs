use colored::{ColoredString, Colorize};
use declarative::{Action, DiffSummary, ExecuteSummary, ResourceDiff, group_by_type};
use std::time::Duration;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Plan Output
// ============================================================================

fn colored_symbol(action: &Action) -> ColoredString {
    let symbol = format!("{:>3}", action.symbol());
    match action {
        Action::Create => symbol.green(),
        Action::Update { .. } => symbol.yellow(),
        Action::Replace { .. } => symbol.magenta(),
        Action::Delete => symbol.red(),
        Action::NoChange => symbol.dimmed(),
    }
}

fn section_title(resource_type: &str) -> &str {
    match resource_type {
        "function" => "Functions",
        "secret" => "Secrets",
        other => other,
    }
}

/// Color one detail line by its leading marker
fn colored_detail(line: &str) -> ColoredString {
    if line.starts_with('+') {
        line.green()
    } else if line.starts_with('-') {
        line.red()
    } else if line.starts_with('~') {
        line.yellow()
    } else if line.starts_with('!') {
        line.yellow().bold()
    } else {
        line.dimmed()
    }
}

/// Print planned changes grouped by resource type
pub fn display_plan(diffs: &[ResourceDiff]) {
    if diffs.is_empty() {
        println!();
        println!("  {} No changes. Remote state matches the manifest.", "✓".green());
        return;
    }

    for (resource_type, type_diffs) in group_by_type(diffs) {
        section(section_title(&resource_type));
        for diff in type_diffs {
            println!(
                "  {} {} {}",
                colored_symbol(&diff.action),
                column(&diff.address, 32).bold(),
                diff.action.to_string().dimmed()
            );
            if !diff.description.is_empty() {
                println!("        {}", diff.description.dimmed());
            }
            for line in &diff.details {
                println!("        {}", colored_detail(line));
            }
        }
    }

    let summary = DiffSummary::from_diffs(diffs);
    println!();
    println!(
        "Plan: {} to add, {} to change, {} to replace, {} to destroy.",
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.replacements.to_string().magenta(),
        summary.removals.to_string().red()
    );
}

/// Print the outcome of an apply or destroy run
pub fn display_summary(summary: &ExecuteSummary, elapsed: Duration) {
    println!();
    if summary.is_success() {
        success(&format!(
            "Complete in {}: {} created, {} updated, {} replaced, {} deleted",
            format_duration(elapsed),
            summary.created,
            summary.updated,
            summary.replaced,
            summary.deleted
        ));
    } else {
        warn(&format!(
            "Finished with errors in {}: {} failed, {} changed",
            format_duration(elapsed),
            summary.failed,
            summary.total_changes()
        ));
        for (address, message) in &summary.failures {
            println!("  {} {}", "✗".red(), address.bold());
            for line in message.lines() {
                println!("      {}", line.dimmed());
            }
        }
    }
    if summary.skipped > 0 {
        dim(&format!("{} skipped", summary.skipped));
    }
}

// ============================================================================
// Formatting
// ============================================================================

/// Format a duration compactly, e.g. `1m 05s` or `3.2s`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

/// Pad or truncate to a fixed column width
pub fn column(value: &str, width: usize) -> String {
    let count = value.chars().count();
    if count <= width {
        format!("{value:<width$}")
    } else if width <= 1 {
        "…".to_string()
    } else {
        let kept: String = value.chars().take(width - 1).collect();
        format!("{kept}…")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_seconds() {
        assert_eq!(format_duration(Duration::from_millis(0)), "0.0s");
        assert_eq!(format_duration(Duration::from_millis(3400)), "3.4s");
    }

    #[test]
    fn test_format_duration_minutes_and_hours() {
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 05s");
        assert_eq!(format_duration(Duration::from_secs(3600 + 120)), "1h 02m");
    }

    #[test]
    fn test_column_pads_short_values() {
        assert_eq!(column("node20", 8), "node20  ");
        assert_eq!(column("exact", 5), "exact");
    }

    #[test]
    fn test_column_truncates_long_values() {
        assert_eq!(column("tensorflow2.19.0", 8), "tensorf…");
        assert_eq!(column("abc", 1), "…");
    }

    #[test]
    fn test_section_title() {
        assert_eq!(section_title("function"), "Functions");
        assert_eq!(section_title("other"), "other");
    }
}
