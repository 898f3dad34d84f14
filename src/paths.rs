//! Centralized path resolution for tenantctl
//!
//! # Environment Variables
//!
//! - `TENANTCTL_CONFIG_DIR` - Override config directory (e.g., `~/work/tenant-config`)
//! - `TENANTCTL_STATE_DIR` - Override state directory
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `TENANTCTL_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/tenantctl` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\tenantctl`
//!    - macOS/Linux: `~/.config/tenantctl`
//!
//! For state_dir():
//! 1. `TENANTCTL_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/tenantctl` (if set)
//! 3. Platform default:
//!    - Windows: `%LOCALAPPDATA%\tenantctl`
//!    - macOS/Linux: `~/.local/state/tenantctl`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "TENANTCTL_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "TENANTCTL_STATE_DIR";

const APP_DIR: &str = "tenantctl";

/// Looks up an environment variable; empty values count as unset
type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get the tenantctl config directory path
pub fn config_dir() -> Result<PathBuf> {
    resolve_config_dir(&process_env)
}

/// Get the tenantctl state directory path
pub fn state_dir() -> Result<PathBuf> {
    resolve_state_dir(&process_env)
}

/// Path of the optional config file
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

fn resolve_config_dir(env: EnvLookup<'_>) -> Result<PathBuf> {
    // 1. Check environment variable override
    if let Some(dir) = env(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!("Using config dir from {}: {}", ENV_CONFIG_DIR, path.display());
        return Ok(path);
    }

    // 2. Check XDG_CONFIG_HOME
    if let Some(xdg_config) = env("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join(APP_DIR);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    // 3. Platform default
    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            return Ok(app_data.join(APP_DIR));
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join(APP_DIR);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

fn resolve_state_dir(env: EnvLookup<'_>) -> Result<PathBuf> {
    if let Some(dir) = env(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    if let Some(xdg_state) = env("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join(APP_DIR);
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(local_app_data) = dirs::data_local_dir() {
            return Ok(local_app_data.join(APP_DIR));
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".local").join("state").join(APP_DIR);
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// Expand ~ and environment variables in a path string.
///
/// Unresolvable variables leave the input untouched.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

/// Turn a domain into a file name for its default state file
pub fn state_file_name(domain: &str) -> String {
    let safe: String = domain
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{safe}.toml")
}
