//! `tenantctl destroy` - delete every recorded resource

use anyhow::Result;
use colored::Colorize;
use declarative::{ConfirmCallback, ExecuteOptions, ExecuteSummary};
use mgmtapi::Transport;
use std::sync::Arc;

use crate::Context;
use crate::cli::DestroyArgs;
use crate::config::Settings;
use crate::engine::{Engine, differ};
use crate::manifest::Manifest;
use crate::progress::Spinner;
use crate::state::StateFile;
use crate::ui;

pub fn run(ctx: &Context, settings: &Settings, args: &DestroyArgs) -> Result<()> {
    let summary = run_with(ctx, settings, super::transport(settings), args, &mut ui::Prompt)?;
    super::finish(&summary)
}

pub fn run_with<C: ConfirmCallback>(
    ctx: &Context,
    settings: &Settings,
    transport: Arc<dyn Transport>,
    args: &DestroyArgs,
    confirm: &mut C,
) -> Result<ExecuteSummary> {
    let mut state = StateFile::load(&settings.state, &settings.domain)?;
    if state.resources.is_empty() {
        ui::info("Nothing recorded, nothing to destroy");
        return Ok(ExecuteSummary::default());
    }

    let api = super::connect(transport, settings)?;
    let target = args.target.as_deref();

    let mut progress = Spinner::new(ctx.quiet);
    let mut engine = Engine::new(&api, &mut state, &settings.state);
    let preview = engine.preview_destroy(target, &mut progress)?;
    differ::display_preview(&preview);

    let pending = preview.pending_changes();
    if pending == 0 {
        return Ok(preview.baseline());
    }

    if !args.yes
        && !confirm.confirm(&format!(
            "Delete {pending} resource(s) from {}?",
            settings.domain
        ))?
    {
        println!();
        println!("  {} Aborted", "✗".red());
        let mut summary = preview.baseline();
        summary.skipped += pending;
        return Ok(summary);
    }

    let opts = ExecuteOptions {
        dry_run: false,
        assume_yes: true,
        verbose: ctx.verbose > 0,
    };
    let summary = engine.apply(preview, &Manifest::default(), target, &opts, &mut progress)?;
    differ::print_summary(&summary, "destroyed");

    Ok(summary)
}
