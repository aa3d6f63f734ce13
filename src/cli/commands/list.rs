//! List command - show cached proxy files

use crate::cache::{CacheEntryKind, CacheFile};
use crate::cli::args::{ListArgs, OutputFormat};
use crate::cli::commands::{format_bytes, layout_for};
use crate::config::Config;
use crate::error::ProxyResult;
use console::style;

/// Execute the list command
pub async fn execute(args: ListArgs, config: &Config) -> ProxyResult<()> {
    let layout = layout_for(config);
    let files = layout.scan().await?;

    if files.is_empty() && !matches!(args.format, OutputFormat::Json) {
        println!("No cached proxy files.");
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&files),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&files)?),
        OutputFormat::Plain => {
            for file in &files {
                println!("{}", file.path.display());
            }
        }
    }

    Ok(())
}

fn print_table(files: &[CacheFile]) {
    println!("{:<10} {:>10}  {}", "KIND", "SIZE", "PATH");
    println!("{}", "-".repeat(80));

    for file in files {
        let kind = match file.kind {
            CacheEntryKind::Artifact => style("artifact").cyan().to_string(),
            CacheEntryKind::Container => style("container").green().to_string(),
            CacheEntryKind::Optimized => style("optimized").blue().to_string(),
            CacheEntryKind::Marker => style("marker").yellow().to_string(),
            CacheEntryKind::Other => style("other").dim().to_string(),
        };

        println!(
            "{:<10} {:>10}  {}",
            kind,
            format_bytes(file.size_bytes),
            file.path.display()
        );
    }

    let total: u64 = files.iter().map(|f| f.size_bytes).sum();
    println!();
    println!("Total: {} file(s), {}", files.len(), format_bytes(total));
}
