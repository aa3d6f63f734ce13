//! Status command - cache paths, thumbprint and file counts

use crate::cache::thumbprint::read_persisted;
use crate::cache::{CacheEntryKind, Thumbprint};
use crate::cli::args::StatusArgs;
use crate::cli::commands::{format_bytes, layout_for};
use crate::config::Config;
use crate::error::ProxyResult;
use crate::proxy::{ManifestPackageMetadata, PackageMetadataProvider};
use console::{style, Emoji};

static CHECK: Emoji<'_, '_> = Emoji("✓ ", "[OK] ");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "[FAIL] ");
static WARN: Emoji<'_, '_> = Emoji("⚠ ", "[WARN] ");

/// Execute the status command
pub async fn execute(args: StatusArgs, config: &Config) -> ProxyResult<()> {
    let layout = layout_for(config);

    println!("{}", style("Proxy Cache Status").bold().cyan());
    println!();

    println!("{}", style("Paths:").bold());
    println!("  Secondary: {}", layout.secondary_dir().display());
    println!("  Optimized: {}", layout.optimized_dir().display());
    println!("  Marker:    {}", layout.marker_path().display());

    println!();
    println!("{}", style("Thumbprint:").bold());
    let persisted = read_persisted(layout.marker_path()).await;
    match &persisted {
        Some(thumb) => println!("  {} Persisted: {}", CHECK, thumb),
        None => println!(
            "  {} {} - next start purges every cached file",
            WARN,
            style("No thumbprint recorded").yellow()
        ),
    }

    let manifest = args.manifest.or_else(|| config.package.manifest.clone());
    if let Some(manifest) = manifest {
        match ManifestPackageMetadata::new(manifest)
            .current_version_token()
            .await
        {
            Ok(info) => {
                let current = Thumbprint::from_package(&info);
                if persisted.as_ref() == Some(&current) {
                    println!("  {} Current:   {} (up to date)", CHECK, current);
                } else {
                    println!(
                        "  {} Current:   {} ({})",
                        WARN,
                        current,
                        style("stale proxies will be purged").yellow()
                    );
                }
            }
            Err(e) => println!("  {} {}", CROSS, style(e).red()),
        }
    }

    println!();
    println!("{}", style("Files:").bold());
    let files = layout.scan().await?;
    for kind in [
        CacheEntryKind::Artifact,
        CacheEntryKind::Container,
        CacheEntryKind::Optimized,
        CacheEntryKind::Other,
    ] {
        let count = files.iter().filter(|f| f.kind == kind).count();
        println!("  {:<10} {}", kind, count);
    }
    let total: u64 = files.iter().map(|f| f.size_bytes).sum();
    println!("  {:<10} {}", "size", format_bytes(total));

    Ok(())
}
