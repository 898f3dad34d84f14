//! Diff display

use colored::{ColoredString, Colorize};
use declarative::{Action, ExecuteSummary, FieldChange, ResourceDiff, group_by_type};

use super::executor::Preview;

/// Display a preview in a user-friendly format
pub fn display_preview(preview: &Preview) {
    let diffs = preview.diffs();
    let changes: Vec<ResourceDiff> = diffs.into_iter().filter(ResourceDiff::is_change).collect();
    let failures = preview.failures();

    if changes.is_empty() && preview.deferred.is_empty() && failures.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Tenant Diff".bold()
    );
    println!("│");

    for (resource_type, type_diffs) in &group_by_type(&changes) {
        println!("│ {}", type_heading(resource_type).bold());
        for diff in type_diffs {
            print_diff(diff);
        }
        println!("│");
    }

    if !preview.deferred.is_empty() {
        println!("│ {}", "Pending on new clients".bold());
        for grant in &preview.deferred {
            println!(
                "│   {} {:<30} {}",
                "+".green(),
                grant.address,
                format!("(after {} is created)", grant.client_address).dimmed()
            );
        }
        println!("│");
    }

    if !failures.is_empty() {
        println!("│ {}", "Could not be planned".red().bold());
        for (address, error) in &failures {
            println!("│   {} {:<30} {}", "✗".red(), address, error.dimmed());
        }
        println!("│");
    }

    let summary = preview.summary();
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} to create, {} to update, {} to replace, {} to delete{}",
        (summary.additions + preview.deferred.len()).to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.replacements.to_string().yellow(),
        summary.removals.to_string().red(),
        if failures.is_empty() {
            String::new()
        } else {
            format!(", {} failed", failures.len().to_string().red())
        }
    );
    println!("└─────────────────────────────────────────────────────┘");
}

fn type_heading(resource_type: &str) -> &str {
    match resource_type {
        "client" => "Application clients",
        "grant" => "Access grants",
        other => other,
    }
}

fn print_diff(diff: &ResourceDiff) {
    let note = match diff.action {
        Action::Create if diff.drifted => "(missing remotely, will recreate)",
        Action::Create => "(will create)",
        Action::Delete => "(will delete)",
        Action::Replace => "(will delete and recreate)",
        Action::Update => "",
        Action::NoOp => "",
    };
    println!(
        "│   {} {:<30} {}",
        symbol(diff.action),
        diff.address,
        note.dimmed()
    );
    for change in &diff.changes {
        print_change(change);
    }
}

fn print_change(change: &FieldChange) {
    println!(
        "│       {}: {} → {}",
        change.field,
        change.from.red(),
        change.to.green()
    );
}

fn symbol(action: Action) -> ColoredString {
    match action {
        Action::Create => "+".green(),
        Action::Delete => "-".red(),
        Action::Update => "~".yellow(),
        Action::Replace => "±".yellow(),
        Action::NoOp => "○".dimmed(),
    }
}

/// Print final summary
pub fn print_summary(summary: &ExecuteSummary, verb: &str) {
    println!();
    if summary.is_success() {
        println!("  {} Tenant {verb} successfully!", "✓".green().bold());
    } else {
        println!("  {} Tenant {verb} with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} resources created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} resources modified", summary.modified);
    }
    if summary.removed > 0 {
        println!("    • {} resources removed", summary.removed);
    }
    if summary.replaced > 0 {
        println!("    • {} resources replaced", summary.replaced);
    }
    if summary.no_change > 0 {
        println!("    • {} resources unchanged", summary.no_change);
    }
    if summary.skipped > 0 {
        println!("    • {} resources skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
}
