use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use declarative::DesiredState;

#[derive(Parser)]
#[command(name = "tower-inventory")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Idempotently manage AWX / Ansible Tower inventories", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create, update, copy or delete an inventory so it matches the declaration
    Apply(Box<ApplyArgs>),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Apply
// ============================================================================

#[derive(Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub inventory: InventoryArgs,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Report what would change without changing anything
    #[arg(long)]
    pub check: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// The inventory to converge
#[derive(Args, Debug, Default)]
#[command(next_help_heading = "Inventory")]
pub struct InventoryArgs {
    /// TOML file declaring the inventory (flags override its fields)
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<String>,

    /// Inventory name
    #[arg(short, long)]
    pub name: Option<String>,

    /// Organization the inventory belongs to (name or id)
    #[arg(short, long)]
    pub organization: Option<String>,

    /// Inventory description
    #[arg(long)]
    pub description: Option<String>,

    /// Inventory variables as a JSON or YAML mapping
    #[arg(long, conflicts_with = "variables_file")]
    pub variables: Option<String>,

    /// File holding inventory variables (JSON or YAML)
    #[arg(long, value_name = "PATH")]
    pub variables_file: Option<String>,

    /// Inventory kind: "" (regular) or "smart"
    #[arg(long)]
    pub kind: Option<String>,

    /// Host filter for smart inventories
    #[arg(long)]
    pub host_filter: Option<String>,

    /// Credential used for Insights (name or id)
    #[arg(long)]
    pub insights_credential: Option<String>,

    /// Instance group to associate, in order (repeatable)
    #[arg(long = "instance-group", value_name = "NAME")]
    pub instance_groups: Vec<String>,

    /// Remove every instance group from the inventory
    #[arg(long, conflicts_with = "instance_groups")]
    pub no_instance_groups: bool,

    /// Create the inventory by copying this one when it does not exist
    #[arg(long, value_name = "INVENTORY")]
    pub copy_from: Option<String>,

    /// Desired state
    #[arg(long, value_enum)]
    pub state: Option<StateArg>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StateArg {
    Present,
    Absent,
}

impl From<StateArg> for DesiredState {
    fn from(state: StateArg) -> Self {
        match state {
            StateArg::Present => Self::Present,
            StateArg::Absent => Self::Absent,
        }
    }
}

/// How to reach the server
#[derive(Args, Debug, Default)]
#[command(next_help_heading = "Connection")]
pub struct ConnectionArgs {
    /// Server URL (default: https://127.0.0.1)
    #[arg(long, env = "TOWER_HOST", value_name = "URL")]
    pub host: Option<String>,

    /// Username for basic authentication
    #[arg(long, env = "TOWER_USERNAME", value_name = "USER")]
    pub username: Option<String>,

    /// Password for basic authentication
    #[arg(
        long,
        env = "TOWER_PASSWORD",
        hide_env_values = true,
        value_name = "PASSWORD"
    )]
    pub password: Option<String>,

    /// OAuth2 token (takes precedence over username/password)
    #[arg(
        long,
        env = "TOWER_OAUTH_TOKEN",
        hide_env_values = true,
        value_name = "TOKEN"
    )]
    pub oauth_token: Option<String>,

    /// Verify TLS certificates
    #[arg(long, env = "TOWER_VERIFY_SSL", value_name = "BOOL")]
    pub verify_ssl: Option<bool>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Connection settings file (default: ~/.config/tower-inventory/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config_file: Option<String>,
}
