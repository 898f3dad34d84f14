//! Desired-state manifest
//!
//! A TOML file of keyed tables, so every resource has a stable address:
//!
//! ```toml
//! [clients.web]
//! name = "Web Frontend"
//! app_type = "spa"
//!
//! [grants.web-api]
//! client = "web"                  # or: client_id = "abc123"
//! audience = "https://api.example.com/"
//! scope = ["read:items"]
//! ```

use anyhow::{Context, Result};
use mgmtapi::ClientSpec;
use mgmtapi::resources::{client, grant};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// Address of a client entry
pub fn client_address(key: &str) -> String {
    format!("{}.{key}", client::KIND)
}

/// Address of a grant entry
pub fn grant_address(key: &str) -> String {
    format!("{}.{key}", grant::KIND)
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub clients: BTreeMap<String, ClientSpec>,

    #[serde(default)]
    pub grants: BTreeMap<String, GrantEntry>,
}

/// A grant as written in the manifest
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrantEntry {
    /// Key of a `[clients.*]` entry
    #[serde(default)]
    pub client: Option<String>,

    /// Literal client id of a client managed elsewhere
    #[serde(default)]
    pub client_id: Option<String>,

    pub audience: String,

    pub scope: Vec<String>,
}

/// Which client a grant belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientRef<'a> {
    /// Manifest key, resolved through state
    Key(&'a str),
    /// Literal identity
    Id(&'a str),
}

impl GrantEntry {
    /// The client reference, once validated
    pub fn client_ref(&self) -> Option<ClientRef<'_>> {
        match (self.client.as_deref(), self.client_id.as_deref()) {
            (Some(key), None) => Some(ClientRef::Key(key)),
            (None, Some(id)) => Some(ClientRef::Id(id)),
            _ => None,
        }
    }
}

/// Every problem found in a manifest
#[derive(Debug, thiserror::Error)]
#[error("manifest has {} problem(s):{}", .problems.len(), bullet_list(.problems))]
pub struct ValidationError {
    pub problems: Vec<String>,
}

fn bullet_list(items: &[String]) -> String {
    items.iter().map(|item| format!("\n  - {item}")).collect()
}

impl Manifest {
    /// Load and validate a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid manifest: {}", path.display()))
    }

    /// Parse and validate manifest text
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Self = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Check the manifest, collecting every problem
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        let mut problems = Vec::new();

        for (key, spec) in &self.clients {
            check_key(&mut problems, "client", key);
            if spec.name.trim().is_empty() {
                problems.push(format!("{}: name must not be empty", client_address(key)));
            }
        }

        let mut targets: HashMap<(ClientRef<'_>, &str), &str> = HashMap::new();
        for (key, entry) in &self.grants {
            check_key(&mut problems, "grant", key);
            let address = grant_address(key);

            match (entry.client.as_deref(), entry.client_id.as_deref()) {
                (Some(_), Some(_)) => problems.push(format!(
                    "{address}: set either `client` or `client_id`, not both"
                )),
                (None, None) => {
                    problems.push(format!("{address}: one of `client` or `client_id` is required"));
                }
                (Some(client), None) if !self.clients.contains_key(client) => problems.push(
                    format!("{address}: client `{client}` is not defined under [clients]"),
                ),
                (None, Some(id)) if id.trim().is_empty() => {
                    problems.push(format!("{address}: client_id must not be empty"));
                }
                _ => {}
            }

            if entry.audience.trim().is_empty() {
                problems.push(format!("{address}: audience must not be empty"));
            }

            if let Some(client) = entry.client_ref()
                && let Some(other) = targets.insert((client, entry.audience.as_str()), key)
            {
                problems.push(format!(
                    "{address}: same client and audience as {}",
                    grant_address(other)
                ));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { problems })
        }
    }

    /// Number of declared resources
    pub fn len(&self) -> usize {
        self.clients.len() + self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn check_key(problems: &mut Vec<String>, kind: &str, key: &str) {
    if key.is_empty() {
        problems.push(format!("{kind} keys must not be empty"));
    } else if key.contains('.') {
        problems.push(format!("{kind} key `{key}` must not contain '.'"));
    }
}
