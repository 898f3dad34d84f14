//! `tenantctl apply` - converge the tenant to the manifest

use anyhow::Result;
use colored::Colorize;
use declarative::{ConfirmCallback, ExecuteOptions, ExecuteSummary};
use mgmtapi::Transport;
use std::sync::Arc;

use crate::Context;
use crate::cli::ApplyArgs;
use crate::config::Settings;
use crate::engine::{Engine, differ};
use crate::manifest::Manifest;
use crate::progress::Spinner;
use crate::state::StateFile;
use crate::ui;

pub fn run(ctx: &Context, settings: &Settings, args: &ApplyArgs) -> Result<()> {
    let summary = run_with(ctx, settings, super::transport(settings), args, &mut ui::Prompt)?;
    super::finish(&summary)
}

/// Plan everything, confirm once, then apply stage by stage
pub fn run_with<C: ConfirmCallback>(
    ctx: &Context,
    settings: &Settings,
    transport: Arc<dyn Transport>,
    args: &ApplyArgs,
    confirm: &mut C,
) -> Result<ExecuteSummary> {
    let manifest = Manifest::load(&settings.manifest)?;
    let mut state = StateFile::load(&settings.state, &settings.domain)?;
    let api = super::connect(transport, settings)?;
    let target = args.target.as_deref();

    let mut progress = Spinner::new(ctx.quiet);
    let mut engine = Engine::new(&api, &mut state, &settings.state);
    let preview = engine.preview(&manifest, target, &mut progress)?;
    differ::display_preview(&preview);

    let pending = preview.pending_changes();
    if pending == 0 {
        return Ok(preview.baseline());
    }

    if args.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
        let mut summary = preview.baseline();
        summary.skipped += pending;
        return Ok(summary);
    }

    if !args.yes && !confirm.confirm(&format!("Apply {pending} change(s)?"))? {
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
    let summary = engine.apply(preview, &manifest, target, &opts, &mut progress)?;
    differ::print_summary(&summary, "applied");

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;
    use declarative::{AutoConfirm, AutoDecline};
    use mgmtapi::MockTransport;
    use std::fs;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"
[clients.web]
name = "Web"
app_type = "spa"

[grants.web-api]
client = "web"
audience = "https://api.example.com/"
scope = ["read:items"]
"#;

    fn setup() -> (TempDir, Settings) {
        let dir = TempDir::new().unwrap();
        let settings = testing::settings(dir.path());
        fs::write(&settings.manifest, MANIFEST).unwrap();
        (dir, settings)
    }

    #[test]
    fn test_apply_creates_and_persists() {
        let (_dir, settings) = setup();
        let mock = MockTransport::new();
        mock.push_json(201, r#"{"client_id":"abc123","client_secret":"s3cr3t","name":"Web","app_type":"spa"}"#);
        mock.push_json(
            201,
            r#"{"id":"cgr_1","client_id":"abc123","audience":"https://api.example.com/","scope":["read:items"]}"#,
        );

        let summary = run_with(
            &testing::quiet(),
            &settings,
            Arc::new(mock.clone()),
            &ApplyArgs::default(),
            &mut AutoConfirm,
        )
        .unwrap();

        assert_eq!(summary.created, 2);
        let state = StateFile::load(&settings.state, &settings.domain).unwrap();
        assert_eq!(state.id("client.web"), Some("abc123"));
        assert_eq!(state.id("grant.web-api"), Some("cgr_1"));
    }

    #[test]
    fn test_apply_declined_writes_nothing() {
        let (_dir, settings) = setup();
        let mock = MockTransport::new();

        let summary = run_with(
            &testing::quiet(),
            &settings,
            Arc::new(mock.clone()),
            &ApplyArgs::default(),
            &mut AutoDecline,
        )
        .unwrap();

        assert_eq!(summary.skipped, 2);
        assert_eq!(mock.call_count(), 0);
        assert!(!settings.state.exists());
    }

    #[test]
    fn test_apply_dry_run_skips_prompt_and_writes() {
        let (_dir, settings) = setup();
        let mock = MockTransport::new();
        let args = ApplyArgs {
            dry_run: true,
            ..Default::default()
        };

        let summary = run_with(
            &testing::quiet(),
            &settings,
            Arc::new(mock.clone()),
            &args,
            &mut AutoDecline,
        )
        .unwrap();

        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.total_changes(), 0);
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn test_apply_yes_bypasses_prompt() {
        let (_dir, settings) = setup();
        let mock = MockTransport::new();
        mock.push_json(201, r#"{"client_id":"abc123","name":"Web"}"#);
        mock.push_json(
            201,
            r#"{"id":"cgr_1","client_id":"abc123","audience":"https://api.example.com/","scope":["read:items"]}"#,
        );
        let args = ApplyArgs {
            yes: true,
            ..Default::default()
        };

        let summary = run_with(
            &testing::quiet(),
            &settings,
            Arc::new(mock.clone()),
            &args,
            &mut AutoDecline,
        )
        .unwrap();
        assert_eq!(summary.created, 2);
    }

    #[test]
    fn test_apply_partial_failure_keeps_created_identity() {
        let (_dir, settings) = setup();
        let mock = MockTransport::new();
        mock.push_json(201, r#"{"client_id":"abc123","name":"Web"}"#);
        mock.push_json(409, r#"{"message":"grant already exists"}"#);

        let summary = run_with(
            &testing::quiet(),
            &settings,
            Arc::new(mock.clone()),
            &ApplyArgs::default(),
            &mut AutoConfirm,
        )
        .unwrap();

        assert_eq!(summary.created, 1);
        assert_eq!(summary.failed, 1);
        assert!(super::super::finish(&summary).is_err());

        let state = StateFile::load(&settings.state, &settings.domain).unwrap();
        assert_eq!(state.id("client.web"), Some("abc123"));
        assert!(state.get("grant.web-api").is_none());
    }

    #[test]
    fn test_apply_target_limits_scope() {
        let (_dir, settings) = setup();
        let mock = MockTransport::new();
        mock.push_json(201, r#"{"client_id":"abc123","name":"Web"}"#);
        let args = ApplyArgs {
            yes: true,
            target: Some("clients".to_string()),
            ..Default::default()
        };

        let summary = run_with(
            &testing::quiet(),
            &settings,
            Arc::new(mock.clone()),
            &args,
            &mut AutoDecline,
        )
        .unwrap();

        assert_eq!(summary.created, 1);
        assert_eq!(mock.call_count(), 1);
    }
}
