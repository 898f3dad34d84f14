//! Persisted identities of managed resources
//!
//! The state file maps each resource address to the identity the service
//! assigned it, plus computed outputs. It holds client secrets, so it is
//! written owner-only on Unix.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use declarative::{Output, ResourceState};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Current state file format version
pub const STATE_VERSION: u32 = 1;

/// State for one tenant
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct StateFile {
    /// Format version
    pub version: u32,

    /// Tenant domain the identities belong to
    #[serde(default)]
    pub domain: String,

    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,

    /// Recorded resources by address
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceRecord>,
}

/// Identity and outputs of one managed resource
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub kind: String,
    pub id: String,

    #[serde(default)]
    pub outputs: BTreeMap<String, String>,

    /// Names of outputs that must not be shown by default
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub sensitive: BTreeSet<String>,
}

impl ResourceRecord {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            outputs: BTreeMap::new(),
            sensitive: BTreeSet::new(),
        }
    }

    pub fn is_sensitive(&self, output: &str) -> bool {
        self.sensitive.contains(output)
    }
}

impl fmt::Debug for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outputs: BTreeMap<&str, &str> = self
            .outputs
            .iter()
            .map(|(name, value)| {
                let shown = if self.is_sensitive(name) {
                    "<redacted>"
                } else {
                    value.as_str()
                };
                (name.as_str(), shown)
            })
            .collect();
        f.debug_struct("ResourceRecord")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("outputs", &outputs)
            .finish()
    }
}

impl StateFile {
    /// Empty state for a domain
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            version: STATE_VERSION,
            domain: domain.into(),
            last_updated: Utc::now(),
            resources: BTreeMap::new(),
        }
    }

    /// Load state from disk, or return empty state if the file doesn't exist
    ///
    /// State recorded for a different domain is refused.
    pub fn load(path: &Path, domain: &str) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file {} does not exist, starting empty", path.display());
            return Ok(Self::new(domain));
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;
        let mut state: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        if state.version > STATE_VERSION {
            bail!(
                "State file {} has version {}, this build understands up to {}",
                path.display(),
                state.version,
                STATE_VERSION
            );
        }

        if state.domain.is_empty() {
            state.domain = domain.to_string();
        } else if state.domain != domain {
            bail!(
                "State file {} belongs to {}, not {}",
                path.display(),
                state.domain,
                domain
            );
        }

        log::debug!(
            "Loaded {} recorded resource(s) from {}",
            state.resources.len(),
            path.display()
        );
        Ok(state)
    }

    /// Save state to disk, replacing the previous file in one rename
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize state to TOML")?;

        let tmp = path.with_extension("toml.tmp");
        write_private(&tmp, content.as_bytes())
            .with_context(|| format!("Failed to write state file: {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    /// Update the last_updated timestamp and save
    pub fn touch(&mut self, path: &Path) -> Result<()> {
        self.last_updated = Utc::now();
        self.save(path)
    }

    pub fn get(&self, address: &str) -> Option<&ResourceRecord> {
        self.resources.get(address)
    }

    /// Recorded identity of an address
    pub fn id(&self, address: &str) -> Option<&str> {
        self.get(address).map(|r| r.id.as_str())
    }

    /// Lifecycle state of an address
    pub fn resource_state(&self, address: &str) -> ResourceState {
        self.id(address)
            .map_or(ResourceState::Unmanaged, ResourceState::managed)
    }

    /// Recorded addresses of one kind
    pub fn addresses_of(&self, kind: &str) -> Vec<String> {
        self.resources
            .iter()
            .filter(|(_, r)| r.kind == kind)
            .map(|(address, _)| address.clone())
            .collect()
    }

    /// Record the current state of a resource.
    ///
    /// Empty output values keep the previously recorded value: the service
    /// only returns a client secret on some responses. A new identity drops
    /// all previous outputs.
    ///
    /// Returns whether anything changed.
    pub fn record(
        &mut self,
        address: &str,
        kind: &str,
        state: &ResourceState,
        outputs: &[Output],
    ) -> bool {
        let Some(id) = state.id() else {
            return self.resources.remove(address).is_some();
        };

        let before = self.resources.get(address).cloned();
        let record = self
            .resources
            .entry(address.to_string())
            .or_insert_with(|| ResourceRecord::new(kind, id));

        if record.id != id {
            *record = ResourceRecord::new(kind, id);
        }
        record.kind = kind.to_string();

        for output in outputs.iter().filter(|o| !o.value.is_empty()) {
            record
                .outputs
                .insert(output.name.clone(), output.value.clone());
            if output.sensitive {
                record.sensitive.insert(output.name.clone());
            } else {
                record.sensitive.remove(&output.name);
            }
        }

        before.as_ref() != Some(&*record)
    }
}

#[cfg(unix)]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(content)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(content)?;
    file.sync_all()
}
