//! Host package metadata providers

use crate::cache::thumbprint::PackageInfo;
use crate::error::{ProxyError, ProxyResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Source of the host package's version record
#[async_trait]
pub trait PackageMetadataProvider: Send + Sync {
    /// Current version token; fails when the package record is missing
    async fn current_version_token(&self) -> ProxyResult<PackageInfo>;
}

/// Fixed package record, for hosts that already know their build
#[derive(Debug, Clone, Copy)]
pub struct StaticPackageInfo(pub PackageInfo);

#[async_trait]
impl PackageMetadataProvider for StaticPackageInfo {
    async fn current_version_token(&self) -> ProxyResult<PackageInfo> {
        Ok(self.0)
    }
}

#[derive(Debug, Deserialize)]
struct ManifestRecord {
    version_code: i64,
    last_update_time: Option<i64>,
}

/// Package record read from a JSON manifest
///
/// `version_code` is required. `last_update_time` defaults to the manifest's
/// modification time, so reinstalling the same version still changes the
/// thumbprint.
#[derive(Debug, Clone)]
pub struct ManifestPackageMetadata {
    path: PathBuf,
}

impl ManifestPackageMetadata {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PackageMetadataProvider for ManifestPackageMetadata {
    async fn current_version_token(&self) -> ProxyResult<PackageInfo> {
        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            ProxyError::Thumbprint(format!(
                "reading package record {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let record: ManifestRecord = serde_json::from_str(&content).map_err(|e| {
            ProxyError::Thumbprint(format!(
                "parsing package record {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let last_update_time = match record.last_update_time {
            Some(time) => time,
            None => {
                let modified = fs::metadata(&self.path)
                    .await
                    .and_then(|m| m.modified())
                    .map_err(|e| {
                        ProxyError::Thumbprint(format!(
                            "reading update time of {}: {}",
                            self.path.display(),
                            e
                        ))
                    })?;
                DateTime::<Utc>::from(modified).timestamp_millis()
            }
        };

        Ok(PackageInfo {
            version_code: record.version_code,
            last_update_time,
        })
    }
}
