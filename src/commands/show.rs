//! `tenantctl show <address>` - one recorded resource and its outputs

use anyhow::{Result, bail};

use crate::cli::ShowArgs;
use crate::config::Settings;
use crate::state::{ResourceRecord, StateFile};
use crate::ui;

pub fn run(settings: &Settings, args: &ShowArgs) -> Result<()> {
    let state = StateFile::load(&settings.state, &settings.domain)?;
    let Some(record) = state.get(&args.address) else {
        bail!(
            "No recorded resource at {} (see `tenantctl status`)",
            args.address
        );
    };

    ui::header(&args.address);
    ui::kv("kind", &record.kind);
    ui::kv("id", &record.id);
    for (name, value) in outputs(record, args.reveal) {
        ui::kv(&name, &value);
    }
    if !args.reveal && !record.sensitive.is_empty() {
        println!();
        ui::dim("Sensitive outputs are masked; pass --reveal to print them");
    }

    Ok(())
}

/// Output name and displayed value, masking sensitive ones unless revealed
pub fn outputs(record: &ResourceRecord, reveal: bool) -> Vec<(String, String)> {
    record
        .outputs
        .iter()
        .map(|(name, value)| {
            let shown = if record.is_sensitive(name) && !reveal {
                ui::mask(value)
            } else {
                value.clone()
            };
            (name.clone(), shown)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;
    use declarative::{Output, ResourceState};
    use tempfile::TempDir;

    fn record() -> ResourceRecord {
        let mut state = StateFile::new("tenant.example.com");
        state.record(
            "client.web",
            "client",
            &ResourceState::managed("abc123"),
            &[
                Output::plain("client_id", "abc123"),
                Output::sensitive("client_secret", "wubbalubbadubdub"),
            ],
        );
        state.get("client.web").unwrap().clone()
    }

    #[test]
    fn test_outputs_masked_by_default() {
        let shown = outputs(&record(), false);
        assert_eq!(
            shown,
            vec![
                ("client_id".to_string(), "abc123".to_string()),
                ("client_secret".to_string(), "********bdub".to_string()),
            ]
        );
    }

    #[test]
    fn test_outputs_revealed() {
        let shown = outputs(&record(), true);
        assert_eq!(shown[1].1, "wubbalubbadubdub");
    }

    #[test]
    fn test_show_unknown_address() {
        let dir = TempDir::new().unwrap();
        let settings = testing::settings(dir.path());
        let args = ShowArgs {
            address: "client.nope".to_string(),
            reveal: false,
        };
        let err = run(&settings, &args).unwrap_err();
        assert!(err.to_string().contains("client.nope"));
    }
}
