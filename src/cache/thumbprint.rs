//! Thumbprint-based cache invalidation
//!
//! The thumbprint identifies the host application build. Every artifact file
//! name carries the thumbprint it was generated under, and the marker file in
//! the secondary root records the thumbprint of the previous run. On start-up
//! a changed thumbprint purges every file whose name contains the old one; a
//! missing marker purges everything, since no file can be verified without it.

use crate::cache::layout::{write_atomic, CacheLayout};
use crate::error::ProxyResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Host package metadata the thumbprint is derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    /// Monotonic build number of the host package
    pub version_code: i64,
    /// Last install/update time in epoch milliseconds
    pub last_update_time: i64,
}

/// Token identifying one host application build
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Thumbprint(String);

impl Thumbprint {
    /// Wrap a raw token
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Derive the thumbprint for a package: `<lastUpdateTime>-<versionCode>`
    pub fn from_package(info: &PackageInfo) -> Self {
        Self(format!("{}-{}", info.last_update_time, info.version_code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Thumbprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read the thumbprint persisted by a previous run
///
/// A missing, empty or unreadable marker yields `None`, which forces a full
/// purge.
pub async fn read_persisted(marker: &Path) -> Option<Thumbprint> {
    match fs::read_to_string(marker).await {
        Ok(content) => {
            let line = content.lines().next().unwrap_or("").trim();
            if line.is_empty() {
                None
            } else {
                Some(Thumbprint::new(line))
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => {
            warn!("Error reading proxy thumbprint {}: {}", marker.display(), e);
            None
        }
    }
}

/// Persist a thumbprint as a single newline-terminated line
pub async fn persist(marker: &Path, thumbprint: &Thumbprint) -> std::io::Result<()> {
    write_atomic(marker, format!("{}\n", thumbprint).as_bytes()).await
}

/// Which files a purge walk deletes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeFilter {
    /// Every file
    All,
    /// Files whose name contains the token anywhere
    Containing(String),
}

impl PurgeFilter {
    fn matches(&self, file_name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Containing(token) => file_name.contains(token.as_str()),
        }
    }
}

/// A file the purge could not delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeWarning {
    pub path: PathBuf,
    pub reason: String,
}

impl fmt::Display for PurgeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}

/// Aggregated result of a purge
#[derive(Debug, Clone, Default)]
pub struct PurgeReport {
    pub deleted: Vec<PathBuf>,
    pub warnings: Vec<PurgeWarning>,
}

impl PurgeReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    fn warn(&mut self, path: PathBuf, reason: impl Into<String>) {
        let warning = PurgeWarning {
            path,
            reason: reason.into(),
        };
        warn!("Error purging cached proxy file: {}", warning);
        self.warnings.push(warning);
    }

    fn merge(&mut self, other: PurgeReport) {
        self.deleted.extend(other.deleted);
        self.warnings.extend(other.warnings);
    }
}

/// Delete matching files under `root`, recursing into directories
///
/// Directories themselves are never removed. Failures are recorded in the
/// report and the walk continues.
pub async fn purge_tree(root: &Path, filter: &PurgeFilter) -> PurgeReport {
    let mut report = PurgeReport::default();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound && dir == root => {
                debug!("Purge root {} does not exist", root.display());
                continue;
            }
            Err(e) => {
                report.warn(dir, e.to_string());
                continue;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    report.warn(dir.clone(), e.to_string());
                    break;
                }
            };

            let path = entry.path();
            let is_dir = match entry.file_type().await {
                Ok(file_type) => file_type.is_dir(),
                Err(e) => {
                    report.warn(path, e.to_string());
                    continue;
                }
            };

            if is_dir {
                stack.push(path);
                continue;
            }

            let name = entry.file_name();
            if !filter.matches(&name.to_string_lossy()) {
                continue;
            }

            match fs::remove_file(&path).await {
                Ok(()) => {
                    debug!("Purged {}", path.display());
                    report.deleted.push(path);
                }
                Err(e) => report.warn(path, e.to_string()),
            }
        }
    }

    report
}

/// What the invalidator did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationAction {
    /// Persisted thumbprint matched, nothing touched
    Unchanged,
    /// Files carrying the previous thumbprint were purged
    Selective,
    /// No previous thumbprint, every file was purged
    Full,
}

/// Outcome of one invalidation run
#[derive(Debug, Clone)]
pub struct InvalidationOutcome {
    pub previous: Option<Thumbprint>,
    pub action: InvalidationAction,
    pub report: PurgeReport,
}

/// Compares the live thumbprint with the persisted one and purges stale files
pub struct ThumbprintInvalidator<'a> {
    layout: &'a CacheLayout,
}

impl<'a> ThumbprintInvalidator<'a> {
    pub fn new(layout: &'a CacheLayout) -> Self {
        Self { layout }
    }

    /// Run invalidation to completion for the live thumbprint
    pub async fn run(&self, current: &Thumbprint) -> ProxyResult<InvalidationOutcome> {
        self.layout.ensure_structure().await?;

        let marker = self.layout.marker_path();
        let previous = read_persisted(marker).await;

        if previous.as_ref() == Some(current) {
            debug!("Proxy thumbprint {} unchanged", current);
            return Ok(InvalidationOutcome {
                previous,
                action: InvalidationAction::Unchanged,
                report: PurgeReport::default(),
            });
        }

        let (action, filter) = match &previous {
            Some(old) => {
                info!("Proxy thumbprint changed {} -> {}, purging", old, current);
                (
                    InvalidationAction::Selective,
                    PurgeFilter::Containing(old.as_str().to_string()),
                )
            }
            None => {
                info!("No proxy thumbprint recorded, purging all cached proxies");
                (InvalidationAction::Full, PurgeFilter::All)
            }
        };

        let mut report = self.purge(&filter).await;

        if let Err(e) = persist(marker, current).await {
            report.warn(
                marker.to_path_buf(),
                format!("writing current proxy thumbprint: {}", e),
            );
        }

        Ok(InvalidationOutcome {
            previous,
            action,
            report,
        })
    }

    /// Walk both roots with a filter
    pub async fn purge(&self, filter: &PurgeFilter) -> PurgeReport {
        let mut report = PurgeReport::default();
        for root in distinct_roots(&self.layout.roots()) {
            report.merge(purge_tree(root, filter).await);
        }
        report
    }
}

/// Drop roots nested inside an earlier root so each file is visited once
fn distinct_roots<'p>(roots: &[&'p Path]) -> Vec<&'p Path> {
    let mut kept: Vec<&Path> = Vec::new();
    for root in roots {
        if !kept.iter().any(|k| root.starts_with(k)) {
            kept.push(root);
        }
    }
    kept
}
