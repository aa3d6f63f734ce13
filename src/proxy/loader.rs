//! Loading proxy containers through the host runtime
//!
//! The bridge opens a container, stages its code unit in the optimized-code
//! workspace and asks the host loader to define the proxy type from it. The
//! host loader stays the parent, so base-type references inside the proxy
//! resolve against the host application's own types.

use crate::cache::artifact::read_container_entry;
use crate::cache::layout::{write_atomic, CacheLayout};
use crate::error::{ProxyError, ProxyResult};
use crate::proxy::identity::ProxyIdentity;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

/// Where a loaded type came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeOrigin {
    /// Part of the host application
    Host,
    /// Defined from a proxy container
    Proxy { container: PathBuf },
}

#[derive(Debug)]
struct LoadedType {
    name: String,
    origin: TypeOrigin,
}

/// Runtime type handle; clones share one allocation
#[derive(Debug, Clone)]
pub struct TypeHandle(Arc<LoadedType>);

impl TypeHandle {
    pub fn new(name: impl Into<String>, origin: TypeOrigin) -> Self {
        Self(Arc::new(LoadedType {
            name: name.into(),
            origin,
        }))
    }

    /// Handle for a type owned by the host application
    pub fn host(name: impl Into<String>) -> Self {
        Self::new(name, TypeOrigin::Host)
    }

    /// Handle for a type defined from a proxy container
    pub fn proxy(name: impl Into<String>, container: PathBuf) -> Self {
        Self::new(name, TypeOrigin::Proxy { container })
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn origin(&self) -> &TypeOrigin {
        &self.0.origin
    }

    /// Whether both handles are the same loaded instance
    pub fn ptr_eq(&self, other: &TypeHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

/// Code extracted from a container, ready to be defined
#[derive(Debug, Clone)]
pub struct CodeUnit {
    /// Container the code came from
    pub container: PathBuf,
    /// Copy staged in the optimized-code workspace
    pub staged: PathBuf,
    /// Raw compiled bytes
    pub code: Vec<u8>,
}

/// The host application's class-loading subsystem
#[async_trait]
pub trait HostLoader: Send + Sync {
    /// Resolve a type the host already knows
    async fn load_by_canonical_name(&self, name: &str) -> ProxyResult<TypeHandle>;

    /// Define `name` from a code unit, parented to the host loader
    ///
    /// Fails with `TypeNotFound` when the unit does not define `name`.
    async fn define_type(&self, name: &str, unit: &CodeUnit) -> ProxyResult<TypeHandle>;
}

/// Loader scoped to the container root and the optimized-code root
pub struct LoaderBridge {
    layout: Arc<CacheLayout>,
    host: Arc<dyn HostLoader>,
}

impl LoaderBridge {
    pub fn new(layout: Arc<CacheLayout>, host: Arc<dyn HostLoader>) -> Self {
        Self { layout, host }
    }

    /// Load the proxy type named by `identity` from a container
    pub async fn load(&self, identity: &ProxyIdentity, container: &Path) -> ProxyResult<TypeHandle> {
        let archive = fs::read(container)
            .await
            .map_err(|e| ProxyError::packaging(container, e))?;

        let entry = self.layout.container_entry();
        let code = read_container_entry(&archive, entry)
            .map_err(|e| ProxyError::packaging(container, e))?
            .ok_or_else(|| {
                ProxyError::TypeNotFound(format!(
                    "{} ({} has no {} entry)",
                    identity,
                    container.display(),
                    entry
                ))
            })?;

        let staged = self.layout.optimized_path(container);
        let already_staged = fs::try_exists(&staged)
            .await
            .map_err(|e| ProxyError::io(format!("checking {}", staged.display()), e))?;
        if !already_staged {
            write_atomic(&staged, &code)
                .await
                .map_err(|e| ProxyError::io(format!("staging {}", staged.display()), e))?;
        }

        let unit = CodeUnit {
            container: container.to_path_buf(),
            staged,
            code,
        };
        let handle = self.host.define_type(identity.as_str(), &unit).await?;

        if handle.name() != identity.as_str() {
            return Err(ProxyError::TypeNotFound(format!(
                "{} (container {} defines {})",
                identity,
                container.display(),
                handle.name()
            )));
        }

        debug!("Loaded {} from {}", identity, container.display());
        Ok(handle)
    }

    /// Resolve a non-generated type directly through the host loader
    ///
    /// Accepts both `a/b/C` and `a.b.C` spellings.
    pub async fn load_existing(&self, class_name: &str) -> ProxyResult<TypeHandle> {
        let canonical = class_name.replace('/', ".");
        self.host.load_by_canonical_name(&canonical).await
    }
}
