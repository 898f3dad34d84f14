//! `tenantctl plan` - show what apply would change

use anyhow::{Result, bail};
use mgmtapi::Transport;
use std::sync::Arc;

use crate::Context;
use crate::cli::PlanArgs;
use crate::config::Settings;
use crate::engine::{Engine, Preview, differ};
use crate::manifest::Manifest;
use crate::progress::Spinner;
use crate::state::StateFile;

pub fn run(ctx: &Context, settings: &Settings, args: &PlanArgs) -> Result<()> {
    let preview = run_with(ctx, settings, super::transport(settings), args)?;

    let failures = preview.failures().len();
    if failures > 0 {
        bail!("{failures} resource(s) could not be planned");
    }
    Ok(())
}

/// Read every managed resource and print the diff
pub fn run_with(
    ctx: &Context,
    settings: &Settings,
    transport: Arc<dyn Transport>,
    args: &PlanArgs,
) -> Result<Preview> {
    let manifest = Manifest::load(&settings.manifest)?;
    let mut state = StateFile::load(&settings.state, &settings.domain)?;
    let api = super::connect(transport, settings)?;

    let mut progress = Spinner::new(ctx.quiet);
    let mut engine = Engine::new(&api, &mut state, &settings.state);
    let preview = engine.preview(&manifest, args.target.as_deref(), &mut progress)?;

    differ::display_preview(&preview);
    Ok(preview)
}
