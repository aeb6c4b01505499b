use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::config::{DEFAULT_MANIFEST, ENV_API_KEY, ENV_AUTH_TOKEN, ENV_ENDPOINT};

#[derive(Parser)]
#[command(name = "faasform")]
#[command(version)]
#[command(about = "Declarative management of FaaS functions and secrets", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Manifest describing the desired functions and secrets
    #[arg(short = 'f', long, global = true, default_value = DEFAULT_MANIFEST)]
    pub manifest: PathBuf,

    /// State file (default: .faasform/state.json next to the manifest)
    #[arg(long, global = true)]
    pub state: Option<String>,

    /// Control plane base URL
    #[arg(long, global = true, env = ENV_ENDPOINT)]
    pub endpoint: Option<String>,

    /// Bearer token for the control plane
    #[arg(long, global = true, env = ENV_AUTH_TOKEN, hide_env_values = true)]
    pub auth_token: Option<String>,

    /// API key sent with read and delete requests
    #[arg(long, global = true, env = ENV_API_KEY, hide_env_values = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change
    Plan(PlanArgs),

    /// Create, update and delete remote resources to match the manifest
    Apply(ApplyArgs),

    /// Delete every resource recorded in state
    Destroy(ApplyArgs),

    /// Re-read recorded functions and update state
    Refresh(RefreshArgs),

    /// Adopt an existing remote function into state
    Import(ImportArgs),

    /// List runtimes offered by the platform
    Runtimes(RuntimesArgs),

    /// Show recorded state
    Show(ShowArgs),

    /// Check the manifest without contacting the platform
    Validate,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Reconciliation
// ============================================================================

#[derive(Args)]
pub struct PlanArgs {
    /// Only plan matching resources: TYPE, NAME or TYPE.NAME
    #[arg(short, long)]
    pub target: Option<String>,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Only touch matching resources: TYPE, NAME or TYPE.NAME
    #[arg(short, long)]
    pub target: Option<String>,

    /// Resources reconciled at once
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Show the plan and stop
    #[arg(long)]
    pub dry_run: bool,

    /// Abort remaining work after the first failure
    #[arg(long)]
    pub fail_fast: bool,
}

#[derive(Args)]
pub struct RefreshArgs {
    /// Functions read at once
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

// ============================================================================
// Inspection
// ============================================================================

#[derive(Args)]
pub struct ImportArgs {
    /// Name to record the function under
    pub name: String,

    /// Remote id; looked up by name when omitted
    #[arg(long)]
    pub id: Option<String>,
}

#[derive(Args)]
pub struct RuntimesArgs {
    /// Only runtimes supporting this hardware (cpu, gpu)
    #[arg(long)]
    pub hardware: Option<String>,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Only this resource
    pub name: Option<String>,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}
