//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Proxy Cache - inspect and maintain the proxy artifact cache
///
/// Shows cached proxy artifacts, containers and the persisted thumbprint,
/// and runs thumbprint invalidation outside the host process.
#[derive(Parser, Debug)]
#[command(name = "proxy-cache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PROXY_CACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cache root (overrides cache.root)
    #[arg(long, global = true, env = "PROXY_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show cache paths, thumbprint and file counts
    Status(StatusArgs),

    /// List cached files
    List(ListArgs),

    /// Purge stale proxies for the current package build
    Purge(PurgeArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the status command
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Package record to compare the persisted thumbprint against
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the purge command
#[derive(Parser, Debug)]
pub struct PurgeArgs {
    /// Package record (defaults to package.manifest)
    #[arg(short, long, conflicts_with = "all")]
    pub manifest: Option<PathBuf>,

    /// Delete every cached file regardless of thumbprint
    #[arg(long)]
    pub all: bool,

    /// Skip confirmation for --all
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for list command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
