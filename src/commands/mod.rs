//! Command implementations
//!
//! Every command that talks to the tenant has a `run` entry point wired to
//! the real transport and a `run_with` taking the transport (and prompt)
//! explicitly.

pub mod apply;
pub mod destroy;
pub mod plan;
pub mod show;
pub mod status;
pub mod token;

use anyhow::{Result, anyhow, bail};
use declarative::ExecuteSummary;
use mgmtapi::{ManagementApi, Transport, UreqTransport};
use std::sync::Arc;

use crate::config::Settings;

/// Blocking HTTP transport honouring the configured timeout
pub fn transport(settings: &Settings) -> Arc<dyn Transport> {
    Arc::new(UreqTransport::new(settings.timeout))
}

/// Authenticate against the configured tenant
pub fn connect(transport: Arc<dyn Transport>, settings: &Settings) -> Result<ManagementApi> {
    ManagementApi::connect(transport, &settings.domain, &settings.credentials).map_err(|e| {
        let advice = e.category().advice();
        anyhow!(e).context(format!(
            "Could not authenticate with {} ({advice})",
            settings.domain
        ))
    })
}

/// Turn failed resources into a non-zero exit
pub fn finish(summary: &ExecuteSummary) -> Result<()> {
    if summary.failed > 0 {
        bail!("{} resource(s) failed", summary.failed);
    }
    Ok(())
}
