//! Progress indicators for tenantctl
//!
//! A spinner per batch of resources, with one status line per finished
//! resource.

use colored::Colorize;
use declarative::{ApplyResult, ProgressCallback, ResourceDiff};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner-backed progress callback
pub struct Spinner {
    bar: Option<ProgressBar>,
    quiet: bool,
}

impl Spinner {
    pub fn new(quiet: bool) -> Self {
        Self { bar: None, quiet }
    }

    fn println(&self, line: &str) {
        if self.quiet {
            return;
        }
        match &self.bar {
            Some(bar) => bar.suspend(|| println!("{line}")),
            None => println!("{line}"),
        }
    }
}

impl ProgressCallback for Spinner {
    fn on_batch_start(&mut self, count: usize, label: &str) {
        let bar = if self.quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(count as u64)
        };
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {prefix} [{pos}/{len}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        self.bar = Some(bar);
    }

    fn on_resource_start(&mut self, address: &str, _description: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(address.to_string());
        }
    }

    fn on_resource_planned(&mut self, _diff: &ResourceDiff) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn on_resource_complete(&mut self, address: &str, result: &ApplyResult) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
        self.println(&status_line(address, result));
    }

    fn on_batch_complete(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

/// One line describing how a resource finished
pub fn status_line(address: &str, result: &ApplyResult) -> String {
    match result {
        ApplyResult::NoChange => format!("    {} {}", "○".dimmed(), address),
        ApplyResult::Created => format!("    {} {} {}", "✓".green(), address, "created".dimmed()),
        ApplyResult::Modified => format!("    {} {} {}", "✓".green(), address, "updated".dimmed()),
        ApplyResult::Removed => format!("    {} {} {}", "✓".green(), address, "deleted".dimmed()),
        ApplyResult::Replaced => {
            format!("    {} {} {}", "✓".green(), address, "replaced".dimmed())
        }
        ApplyResult::Skipped { reason } => {
            format!("    {} {} {}", "⊘".yellow(), address, reason.dimmed())
        }
        ApplyResult::Failed { error } => format!("    {} {} {}", "✗".red(), address, error.red()),
    }
}
