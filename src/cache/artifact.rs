//! Artifact generation and container packaging
//!
//! An artifact is the raw generator output for one identity under one
//! thumbprint. The loader consumes it through a container: a single-entry
//! tar archive sharing the artifact's stem. Both files are written through a
//! temporary sibling and renamed into place, so a reader never sees a
//! partial file.

use crate::cache::layout::{temp_sibling, write_atomic, CacheLayout};
use crate::cache::thumbprint::Thumbprint;
use crate::error::{ProxyError, ProxyResult};
use crate::proxy::generator::{GenerationRequest, ProxyGenerator};
use crate::proxy::identity::ProxyIdentity;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info};

/// Result of looking for an artifact on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactLookup {
    /// Artifact exists at the path
    Hit(PathBuf),
    /// Artifact must be generated at the path
    Miss(PathBuf),
}

impl ArtifactLookup {
    pub fn path(&self) -> &Path {
        match self {
            Self::Hit(path) | Self::Miss(path) => path,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }
}

/// Produces artifacts through the generator and packages them into containers
pub struct ArtifactBuilder {
    layout: Arc<CacheLayout>,
    generator: Arc<dyn ProxyGenerator>,
}

impl ArtifactBuilder {
    pub fn new(layout: Arc<CacheLayout>, generator: Arc<dyn ProxyGenerator>) -> Self {
        Self { layout, generator }
    }

    /// Check whether the artifact for an identity already exists
    pub async fn lookup(
        &self,
        identity: &ProxyIdentity,
        thumbprint: &Thumbprint,
    ) -> ProxyResult<ArtifactLookup> {
        let path = self.layout.artifact_path(identity.as_str(), thumbprint);
        let exists = fs::try_exists(&path)
            .await
            .map_err(|e| ProxyError::io(format!("checking {}", path.display()), e))?;

        debug!(
            "Looking for proxy file: {} Result: {}",
            path.display(),
            if exists { "found" } else { "not found" }
        );

        Ok(if exists {
            ArtifactLookup::Hit(path)
        } else {
            ArtifactLookup::Miss(path)
        })
    }

    /// Run the generator and move its output to `artifact`
    pub async fn generate(
        &self,
        request: &GenerationRequest<'_>,
        artifact: &Path,
    ) -> ProxyResult<PathBuf> {
        let tmp = temp_sibling(artifact);
        info!("Generating proxy {}", request.identity);

        let produced = match self.generator.generate(request, &tmp).await {
            Ok(path) => path,
            Err(e) => {
                let _ = fs::remove_file(&tmp).await;
                return Err(e);
            }
        };

        let is_file = fs::metadata(&produced)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(ProxyError::generation(
                request.identity.as_str(),
                format!("generator produced no file at {}", produced.display()),
            ));
        }

        fs::rename(&produced, artifact).await.map_err(|e| {
            ProxyError::io(
                format!("moving {} to {}", produced.display(), artifact.display()),
                e,
            )
        })?;

        Ok(artifact.to_path_buf())
    }

    /// Wrap an artifact into its container unless the container exists
    pub async fn package(&self, artifact: &Path) -> ProxyResult<PathBuf> {
        let container = self.layout.container_path(artifact);
        let exists = fs::try_exists(&container)
            .await
            .map_err(|e| ProxyError::packaging(&container, e))?;
        if exists {
            return Ok(container);
        }

        let payload = fs::read(artifact)
            .await
            .map_err(|e| ProxyError::packaging(artifact, e))?;
        let archive = build_container(self.layout.container_entry(), &payload)
            .map_err(|e| ProxyError::packaging(&container, e))?;
        write_atomic(&container, &archive)
            .await
            .map_err(|e| ProxyError::packaging(&container, e))?;

        debug!(
            "Packaged {} ({} bytes) into {}",
            artifact.display(),
            payload.len(),
            container.display()
        );
        Ok(container)
    }
}

/// Build a single-entry tar archive in memory
///
/// The header is fully deterministic so concurrent writers of the same
/// artifact produce identical containers.
pub fn build_container(entry: &str, payload: &[u8]) -> io::Result<Vec<u8>> {
    let mut header = tar::Header::new_gnu();
    header.set_size(payload.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);

    let mut builder = tar::Builder::new(Vec::new());
    builder.append_data(&mut header, entry, payload)?;
    builder.into_inner()
}

/// Extract a named entry from a container archive
pub fn read_container_entry(archive: &[u8], entry: &str) -> io::Result<Option<Vec<u8>>> {
    let mut archive = tar::Archive::new(archive);
    for file in archive.entries()? {
        let mut file = file?;
        if file.path()? == Path::new(entry) {
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            return Ok(Some(data));
        }
    }
    Ok(None)
}
