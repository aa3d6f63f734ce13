//! Proxy Cache - maintenance CLI
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use proxy_cache::cli::{Cli, Commands};
use proxy_cache::config::ConfigManager;
use proxy_cache::error::ProxyResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> ProxyResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let mut config = config_manager.load().await?;
    if let Some(ref dir) = cli.cache_dir {
        config.cache.root = Some(dir.clone());
    }

    // 0 = warn, 1 = info, 2+ = debug; general.verbose lifts 0 to info
    let level = match cli.verbose {
        0 if config.general.verbose => 1,
        n => n,
    };
    let filter = match level {
        0 => EnvFilter::new("proxy_cache=warn"),
        1 => EnvFilter::new("proxy_cache=info"),
        _ => EnvFilter::new("proxy_cache=debug"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if config.general.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.without_time().init();
    }

    match cli.command {
        Commands::Status(args) => proxy_cache::cli::commands::status(args, &config).await,
        Commands::List(args) => proxy_cache::cli::commands::list(args, &config).await,
        Commands::Purge(args) => proxy_cache::cli::commands::purge(args, &config).await,
        Commands::Config(args) => {
            proxy_cache::cli::commands::config(args, &config, cli.config).await
        }
    }
}
