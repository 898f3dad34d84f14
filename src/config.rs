//! Connection settings: command-line flag, then environment, then config.toml.
//!
//! Flag and environment precedence is handled by clap (`env = ...`); this
//! module layers the config file underneath and applies defaults.

use crate::cli::ConnectionArgs;
use crate::paths;
use anyhow::{Context, Result, bail};
use mgmtapi::CredentialInput;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default transport timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default manifest file, relative to the working directory
pub const DEFAULT_MANIFEST: &str = "tenant.toml";

/// Contents of config.toml
#[derive(Default, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub domain: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    pub timeout_secs: Option<u64>,
    pub manifest: Option<String>,
    pub state: Option<String>,
}

impl FileConfig {
    /// Load config from disk, or return default if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("Config file {} does not exist, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}

impl fmt::Debug for FileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileConfig")
            .field("domain", &self.domain)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("manifest", &self.manifest)
            .field("state", &self.state)
            .finish()
    }
}

/// Fully resolved settings for one invocation
#[derive(Debug, Clone)]
pub struct Settings {
    pub domain: String,
    pub credentials: CredentialInput,
    pub timeout: Duration,
    pub manifest: PathBuf,
    pub state: PathBuf,
}

impl Settings {
    /// Resolve settings from flags/environment and the user's config file
    pub fn load(args: &ConnectionArgs) -> Result<Self> {
        let file = FileConfig::load(&paths::config_file()?)?;
        Self::resolve(args, file, paths::state_dir)
    }

    /// Merge parsed arguments over a config file.
    ///
    /// `state_dir` is only consulted when no state path is configured.
    pub fn resolve<F>(args: &ConnectionArgs, file: FileConfig, state_dir: F) -> Result<Self>
    where
        F: FnOnce() -> Result<PathBuf>,
    {
        let Some(domain) = pick(args.domain.clone(), file.domain) else {
            bail!(
                "No tenant domain configured. Pass --domain, set MANAGEMENT_API_DOMAIN, \
                 or add `domain` to config.toml"
            );
        };

        let credentials = CredentialInput {
            access_token: pick(args.access_token.clone(), file.access_token),
            client_id: pick(args.client_id.clone(), file.client_id),
            client_secret: pick(args.client_secret.clone(), file.client_secret),
        };

        let timeout_secs = args
            .timeout
            .or(file.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            bail!("Timeout must be at least one second");
        }

        let manifest = args
            .manifest
            .clone()
            .or_else(|| file.manifest.as_deref().map(paths::expand))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MANIFEST));

        let state = match args
            .state
            .clone()
            .or_else(|| file.state.as_deref().map(paths::expand))
        {
            Some(path) => path,
            None => state_dir()?.join(paths::state_file_name(&domain)),
        };

        Ok(Self {
            domain,
            credentials,
            timeout: Duration::from_secs(timeout_secs),
            manifest,
            state,
        })
    }
}

/// First non-blank value
fn pick(primary: Option<String>, fallback: Option<String>) -> Option<String> {
    primary
        .filter(|v| !v.trim().is_empty())
        .or_else(|| fallback.filter(|v| !v.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_state_dir() -> Result<PathBuf> {
        Ok(PathBuf::from("/state"))
    }

    #[test]
    fn test_load_missing_config_is_default() {
        let dir = TempDir::new().unwrap();
        let config = FileConfig::load(&dir.path().join("config.toml")).unwrap();
        assert!(config.domain.is_none());
    }

    #[test]
    fn test_load_malformed_config_names_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "domain = [").unwrap();

        let err = FileConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("config.toml"));
    }

    #[test]
    fn test_load_rejects_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "domian = \"typo.example.com\"\n").unwrap();
        assert!(FileConfig::load(&path).is_err());
    }

    #[test]
    fn test_flag_wins_over_file() {
        let args = ConnectionArgs {
            domain: Some("flag.example.com".to_string()),
            timeout: Some(5),
            ..Default::default()
        };
        let file = FileConfig {
            domain: Some("file.example.com".to_string()),
            client_id: Some("file-id".to_string()),
            client_secret: Some("file-secret".to_string()),
            timeout_secs: Some(60),
            ..Default::default()
        };

        let settings = Settings::resolve(&args, file, no_state_dir).unwrap();
        assert_eq!(settings.domain, "flag.example.com");
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(settings.credentials.client_id.as_deref(), Some("file-id"));
        assert_eq!(
            settings.state,
            PathBuf::from("/state/flag.example.com.toml")
        );
        assert_eq!(settings.manifest, PathBuf::from(DEFAULT_MANIFEST));
    }

    #[test]
    fn test_blank_flag_falls_back_to_file() {
        let args = ConnectionArgs {
            domain: Some("  ".to_string()),
            ..Default::default()
        };
        let file = FileConfig {
            domain: Some("file.example.com".to_string()),
            ..Default::default()
        };
        let settings = Settings::resolve(&args, file, no_state_dir).unwrap();
        assert_eq!(settings.domain, "file.example.com");
        assert_eq!(settings.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_missing_domain_is_error() {
        let err = Settings::resolve(&ConnectionArgs::default(), FileConfig::default(), no_state_dir)
            .unwrap_err();
        assert!(err.to_string().contains("--domain"));
    }

    #[test]
    fn test_explicit_state_skips_state_dir() {
        let args = ConnectionArgs {
            domain: Some("tenant.example.com".to_string()),
            state: Some(PathBuf::from("/tmp/s.toml")),
            ..Default::default()
        };
        let settings = Settings::resolve(&args, FileConfig::default(), || {
            anyhow::bail!("state dir should not be consulted")
        })
        .unwrap();
        assert_eq!(settings.state, PathBuf::from("/tmp/s.toml"));
    }

    #[test]
    fn test_zero_timeout_is_error() {
        let args = ConnectionArgs {
            domain: Some("tenant.example.com".to_string()),
            timeout: Some(0),
            ..Default::default()
        };
        assert!(Settings::resolve(&args, FileConfig::default(), no_state_dir).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let file = FileConfig {
            client_secret: Some("cauliflower".to_string()),
            access_token: Some("wubbalubbadubdub".to_string()),
            ..Default::default()
        };
        let debug = format!("{file:?}");
        assert!(!debug.contains("cauliflower"));
        assert!(!debug.contains("wubbalubbadubdub"));
    }
}
