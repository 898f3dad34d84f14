//! `tenantctl status` - recorded resources, compared with the manifest
//!
//! Reads only local files.

use anyhow::Result;
use colored::Colorize;

use crate::Context;
use crate::config::Settings;
use crate::manifest::{Manifest, client_address, grant_address};
use crate::state::StateFile;
use crate::ui;

/// How a resource stands locally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standing {
    /// Declared and recorded
    Managed,
    /// Declared, no identity yet
    Pending,
    /// Recorded, no longer declared
    Orphaned,
    /// Recorded; no manifest to compare with
    Recorded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    pub address: String,
    pub id: Option<String>,
    pub standing: Standing,
}

pub fn run(ctx: &Context, settings: &Settings) -> Result<()> {
    let state = StateFile::load(&settings.state, &settings.domain)?;

    let manifest = if settings.manifest.exists() {
        match Manifest::load(&settings.manifest) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                ui::warn(&format!("{e:#}"));
                None
            }
        }
    } else {
        None
    };

    ui::header(&format!("Tenant {}", settings.domain));
    ui::kv("State", &settings.state.display().to_string());
    if !state.resources.is_empty() {
        ui::kv(
            "Updated",
            &state.last_updated.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        );
    }
    if manifest.is_some() {
        ui::kv("Manifest", &settings.manifest.display().to_string());
    }

    let rows = rows(&state, manifest.as_ref());
    if rows.is_empty() {
        println!();
        ui::info("No resources recorded or declared");
        return Ok(());
    }

    ui::section("Resources");
    for row in &rows {
        let (symbol, note) = match row.standing {
            Standing::Managed | Standing::Recorded => ("✓".green(), String::new()),
            Standing::Pending => ("○".dimmed(), "not created yet".to_string()),
            Standing::Orphaned => ("-".red(), "no longer declared".to_string()),
        };
        println!(
            "  {} {:<30} {} {}",
            symbol,
            row.address,
            row.id.as_deref().unwrap_or("").dimmed(),
            note.yellow()
        );
    }

    if !ctx.quiet {
        let pending = rows
            .iter()
            .filter(|r| matches!(r.standing, Standing::Pending | Standing::Orphaned))
            .count();
        if pending > 0 {
            println!();
            ui::dim(&format!(
                "{pending} resource(s) differ from the manifest; run `tenantctl plan`"
            ));
        }
    }

    Ok(())
}

/// Recorded resources, plus declared ones not yet recorded
pub fn rows(state: &StateFile, manifest: Option<&Manifest>) -> Vec<StatusRow> {
    let declared: Option<Vec<String>> = manifest.map(|m| {
        m.clients
            .keys()
            .map(|k| client_address(k))
            .chain(m.grants.keys().map(|k| grant_address(k)))
            .collect()
    });

    let mut rows: Vec<StatusRow> = state
        .resources
        .iter()
        .map(|(address, record)| {
            let standing = match &declared {
                None => Standing::Recorded,
                Some(declared) if declared.contains(address) => Standing::Managed,
                Some(_) => Standing::Orphaned,
            };
            StatusRow {
                address: address.clone(),
                id: Some(record.id.clone()),
                standing,
            }
        })
        .collect();

    for address in declared.into_iter().flatten() {
        if state.get(&address).is_none() {
            rows.push(StatusRow {
                address,
                id: None,
                standing: Standing::Pending,
            });
        }
    }

    rows.sort_by(|a, b| a.address.cmp(&b.address));
    rows
}
