use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tenantctl")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declaratively manage application clients and access grants on a tenant", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Connection settings. Each falls back to its environment variable,
/// then to config.toml.
#[derive(Args, Debug, Default, Clone)]
pub struct ConnectionArgs {
    /// Tenant domain (e.g. tenant.example.com)
    #[arg(long, env = "MANAGEMENT_API_DOMAIN", global = true)]
    pub domain: Option<String>,

    /// Client id for the client-credentials exchange
    #[arg(long, env = "MANAGEMENT_API_CLIENT_ID", global = true)]
    pub client_id: Option<String>,

    /// Client secret for the client-credentials exchange
    #[arg(long, env = "MANAGEMENT_API_CLIENT_SECRET", global = true, hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Pre-issued management API token (wins over client credentials)
    #[arg(long, env = "MANAGEMENT_ACCESS_TOKEN", global = true, hide_env_values = true)]
    pub access_token: Option<String>,

    /// Transport timeout in seconds
    #[arg(long, env = "TENANTCTL_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Desired-state manifest
    #[arg(short = 'f', long, env = "TENANTCTL_MANIFEST", global = true)]
    pub manifest: Option<PathBuf>,

    /// State file
    #[arg(long, env = "TENANTCTL_STATE", global = true)]
    pub state: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change (reads only)
    Plan(PlanArgs),

    /// Converge the tenant to the manifest
    Apply(ApplyArgs),

    /// Delete every recorded resource
    Destroy(DestroyArgs),

    /// List recorded resources (no network)
    Status,

    /// Show one recorded resource and its outputs
    Show(ShowArgs),

    /// Authenticate and print token metadata
    Token(TokenArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Default)]
pub struct PlanArgs {
    /// Only plan a specific resource type or address (e.g. "grants", "client.web")
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct ApplyArgs {
    /// Show what would be done without making changes
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Only apply a specific resource type or address (e.g. "grants", "client.web")
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct DestroyArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Only destroy a specific resource type or address
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Resource address (e.g. "client.web")
    pub address: String,

    /// Print sensitive outputs in clear text
    #[arg(long)]
    pub reveal: bool,
}

#[derive(Args, Debug, Default)]
pub struct TokenArgs {
    /// Print the access token in clear text
    #[arg(long)]
    pub reveal: bool,
}
