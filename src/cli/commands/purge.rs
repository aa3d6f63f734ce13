//! Purge command - run thumbprint invalidation outside the host

use crate::cache::{
    InvalidationAction, PurgeFilter, PurgeReport, Thumbprint, ThumbprintInvalidator,
};
use crate::cli::args::PurgeArgs;
use crate::cli::commands::layout_for;
use crate::config::Config;
use crate::error::{ProxyError, ProxyResult};
use crate::proxy::{ManifestPackageMetadata, PackageMetadataProvider};
use console::style;
use std::io::{self, Write};
use tracing::debug;

/// Execute the purge command
pub async fn execute(args: PurgeArgs, config: &Config) -> ProxyResult<()> {
    let layout = layout_for(config);
    let invalidator = ThumbprintInvalidator::new(&layout);

    if args.all {
        if !args.yes && !confirm(&format!(
            "Delete every file under {}?",
            layout.secondary_dir().display()
        )) {
            println!("Aborted.");
            return Ok(());
        }

        let report = invalidator.purge(&PurgeFilter::All).await;
        print_report(&report);
        return Ok(());
    }

    let manifest = args
        .manifest
        .or_else(|| config.package.manifest.clone())
        .ok_or_else(|| ProxyError::Thumbprint("no package manifest given".to_string()))?;
    debug!("Reading package record {}", manifest.display());

    let info = ManifestPackageMetadata::new(manifest)
        .current_version_token()
        .await?;
    let current = Thumbprint::from_package(&info);
    let outcome = invalidator.run(&current).await?;

    match (outcome.action, &outcome.previous) {
        (InvalidationAction::Unchanged, _) => {
            println!("{} Thumbprint {} unchanged, nothing to purge", style("✓").green(), current)
        }
        (InvalidationAction::Selective, Some(previous)) => println!(
            "Thumbprint changed {} -> {}",
            style(previous).dim(),
            style(&current).cyan()
        ),
        _ => println!(
            "No thumbprint recorded, purged everything (now {})",
            style(&current).cyan()
        ),
    }

    if outcome.action != InvalidationAction::Unchanged {
        print_report(&outcome.report);
    }

    Ok(())
}

fn confirm(prompt: &str) -> bool {
    print!("{} [y/N] ", prompt);
    let _ = io::stdout().flush();

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }
    input.trim().eq_ignore_ascii_case("y")
}

fn print_report(report: &PurgeReport) {
    println!(
        "{} removed {} file(s)",
        style("✓").green(),
        report.deleted.len()
    );

    if !report.warnings.is_empty() {
        println!(
            "{} {} file(s) could not be removed:",
            style("⚠").yellow(),
            report.warnings.len()
        );
        for warning in &report.warnings {
            println!("  {} {}", style("•").red(), warning);
        }
    }
}
