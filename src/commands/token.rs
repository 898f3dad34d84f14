//! `tenantctl token` - authenticate and describe the resulting token

use anyhow::Result;
use mgmtapi::{ManagementApi, Transport};
use std::sync::Arc;

use crate::cli::TokenArgs;
use crate::config::Settings;
use crate::ui;

pub fn run(settings: &Settings, args: &TokenArgs) -> Result<()> {
    let lines = run_with(settings, super::transport(settings), args)?;

    ui::header(&format!("Token for {}", settings.domain));
    for (key, value) in &lines {
        ui::kv(key, value);
    }
    Ok(())
}

pub fn run_with(
    settings: &Settings,
    transport: Arc<dyn Transport>,
    args: &TokenArgs,
) -> Result<Vec<(&'static str, String)>> {
    let api = super::connect(transport, settings)?;
    Ok(describe(&api, args.reveal))
}

/// Key/value lines describing the session's token
pub fn describe(api: &ManagementApi, reveal: bool) -> Vec<(&'static str, String)> {
    let shown = |token: &str| {
        if reveal {
            token.to_string()
        } else {
            ui::mask(token)
        }
    };

    let Some(token) = api.token() else {
        return vec![
            ("source", "pre-issued access token".to_string()),
            ("access_token", shown(api.session().access_token())),
        ];
    };

    let mut lines = vec![
        ("source", "client credentials".to_string()),
        ("access_token", shown(&token.access_token)),
    ];
    if let Some(token_type) = &token.token_type {
        lines.push(("token_type", token_type.clone()));
    }
    if let Some(expires_in) = token.expires_in {
        lines.push(("expires_in", format!("{expires_in}s")));
    }
    if let Some(scope) = &token.scope {
        lines.push(("scope", scope.clone()));
    }
    lines
}
