//! On-disk cache layout
//!
//! ```text
//! <root>/secondary/                 artifacts, containers, thumbprint marker
//! <root>/secondary/optimized/       loader workspace
//! <root>/secondary/proxyThumb       "<lastUpdateTime>-<versionCode>\n"
//! ```

use crate::cache::thumbprint::Thumbprint;
use crate::config::schema::CacheConfig;
use crate::error::{ProxyError, ProxyResult};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Resolved cache directories and file naming rules
#[derive(Debug, Clone)]
pub struct CacheLayout {
    secondary: PathBuf,
    optimized: PathBuf,
    marker: PathBuf,
    artifact_ext: String,
    container_ext: String,
    optimized_ext: String,
    container_entry: String,
}

impl CacheLayout {
    /// Build a layout rooted at `root` using the configured names
    pub fn new(root: &Path, config: &CacheConfig) -> Self {
        let secondary = root.join(&config.secondary_dir);
        Self {
            optimized: secondary.join(&config.optimized_dir),
            marker: secondary.join(&config.thumb_file),
            secondary,
            artifact_ext: config.artifact_ext.clone(),
            container_ext: config.container_ext.clone(),
            optimized_ext: config.optimized_ext.clone(),
            container_entry: config.container_entry.clone(),
        }
    }

    /// Build a layout with default names
    pub fn with_defaults(root: &Path) -> Self {
        Self::new(root, &CacheConfig::default())
    }

    /// Artifact and container root
    pub fn secondary_dir(&self) -> &Path {
        &self.secondary
    }

    /// Loader workspace root
    pub fn optimized_dir(&self) -> &Path {
        &self.optimized
    }

    /// Persisted thumbprint marker
    pub fn marker_path(&self) -> &Path {
        &self.marker
    }

    /// Name of the single entry inside every container
    pub fn container_entry(&self) -> &str {
        &self.container_entry
    }

    /// Both roots walked by invalidation, outermost first
    pub fn roots(&self) -> [&Path; 2] {
        [&self.secondary, &self.optimized]
    }

    /// Deterministic artifact path for an identity under a thumbprint
    pub fn artifact_path(&self, identity: &str, thumbprint: &Thumbprint) -> PathBuf {
        self.secondary.join(format!(
            "{}-{}.{}",
            identity, thumbprint, self.artifact_ext
        ))
    }

    /// Container path derived from an artifact path (same stem)
    pub fn container_path(&self, artifact: &Path) -> PathBuf {
        artifact.with_extension(&self.container_ext)
    }

    /// Workspace path the loader stages a container's code into
    pub fn optimized_path(&self, container: &Path) -> PathBuf {
        let stem = container
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.optimized
            .join(format!("{}.{}", stem, self.optimized_ext))
    }

    /// Create both roots
    pub async fn ensure_structure(&self) -> ProxyResult<()> {
        for dir in [&self.secondary, &self.optimized] {
            fs::create_dir_all(dir).await.map_err(|e| {
                ProxyError::io(format!("creating directory {}", dir.display()), e)
            })?;
        }
        Ok(())
    }

    /// Classify a file found under the cache roots
    pub fn classify(&self, path: &Path) -> CacheEntryKind {
        if path == self.marker {
            return CacheEntryKind::Marker;
        }
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if path.starts_with(&self.optimized) && ext == self.optimized_ext {
            CacheEntryKind::Optimized
        } else if ext == self.artifact_ext {
            CacheEntryKind::Artifact
        } else if ext == self.container_ext {
            CacheEntryKind::Container
        } else {
            CacheEntryKind::Other
        }
    }

    /// List every file under both roots
    pub async fn scan(&self) -> ProxyResult<Vec<CacheFile>> {
        let mut files = Vec::new();
        let mut stack = vec![self.secondary.clone()];
        if !self.optimized.starts_with(&self.secondary) {
            stack.push(self.optimized.clone());
        }

        while let Some(dir) = stack.pop() {
            if !dir.is_dir() {
                continue;
            }
            let mut entries = fs::read_dir(&dir)
                .await
                .map_err(|e| ProxyError::io(format!("reading {}", dir.display()), e))?;

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| ProxyError::io("reading cache entry", e))?
            {
                let path = entry.path();
                let metadata = entry
                    .metadata()
                    .await
                    .map_err(|e| ProxyError::io(format!("stat {}", path.display()), e))?;
                if metadata.is_dir() {
                    stack.push(path);
                } else {
                    files.push(CacheFile {
                        kind: self.classify(&path),
                        size_bytes: metadata.len(),
                        path,
                    });
                }
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }
}

/// Kind of file found in the cache roots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheEntryKind {
    Artifact,
    Container,
    Optimized,
    Marker,
    Other,
}

impl fmt::Display for CacheEntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Artifact => "artifact",
            Self::Container => "container",
            Self::Optimized => "optimized",
            Self::Marker => "marker",
            Self::Other => "other",
        };
        f.pad(name)
    }
}

/// A file found in the cache roots
#[derive(Debug, Clone, Serialize)]
pub struct CacheFile {
    pub path: PathBuf,
    pub kind: CacheEntryKind,
    pub size_bytes: u64,
}

/// Temporary sibling used for write-then-rename
///
/// Keeps the final file name as a prefix so a stale temp file carries the
/// same thumbprint and is purged with it.
pub(crate) fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}.{}.tmp", name, Uuid::new_v4().simple()))
}

/// Write `bytes` to `path` through a temporary sibling and a rename
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = temp_sibling(path);
    if let Err(e) = fs::write(&tmp, bytes).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}
