//! Proxy resolution: memory cache, disk cache, build pipeline
//!
//! One resolver per host process. Construction runs thumbprint invalidation
//! to completion, so no request can race a purge. Builds for the same
//! identity are serialized by a per-identity lock; different identities
//! build concurrently.

use crate::cache::artifact::{ArtifactBuilder, ArtifactLookup};
use crate::cache::class_cache::ClassCache;
use crate::cache::layout::CacheLayout;
use crate::cache::thumbprint::{
    InvalidationOutcome, PurgeWarning, Thumbprint, ThumbprintInvalidator,
};
use crate::config::schema::ProxyConfig;
use crate::config::{Config, ConfigManager};
use crate::error::{ProxyError, ProxyResult};
use crate::proxy::generator::{CommandGenerator, GenerationRequest, ProxyGenerator};
use crate::proxy::identity::{is_reserved, ProxyIdentity, ProxyRequest};
use crate::proxy::loader::{HostLoader, LoaderBridge, TypeHandle};
use crate::proxy::metadata::{ManifestPackageMetadata, PackageMetadataProvider};
use crate::proxy::observer::{BuildObserver, NoopObserver, TracingObserver};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::sync::{Mutex as AsyncMutex, OnceCell, OwnedMutexGuard};
use tracing::{debug, info, warn};

/// External collaborators a resolver drives
#[derive(Clone)]
pub struct Collaborators {
    pub generator: Arc<dyn ProxyGenerator>,
    pub host: Arc<dyn HostLoader>,
    pub metadata: Arc<dyn PackageMetadataProvider>,
    pub observer: Arc<dyn BuildObserver>,
}

impl Collaborators {
    pub fn new(
        generator: Arc<dyn ProxyGenerator>,
        host: Arc<dyn HostLoader>,
        metadata: Arc<dyn PackageMetadataProvider>,
    ) -> Self {
        Self {
            generator,
            host,
            metadata,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn BuildObserver>) -> Self {
        self.observer = observer;
        self
    }
}

/// How a request was served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPath {
    /// Reserved base type, fixed handle
    Reserved,
    /// In-memory class cache
    MemoryHit,
    /// Artifact found on disk, packaged if needed, then loaded
    DiskHit,
    /// Artifact generated, packaged and loaded
    Generated,
}

impl fmt::Display for ResolutionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reserved => write!(f, "reserved"),
            Self::MemoryHit => write!(f, "memory"),
            Self::DiskHit => write!(f, "disk"),
            Self::Generated => write!(f, "generated"),
        }
    }
}

/// A resolved proxy and how it was obtained
#[derive(Debug, Clone)]
pub struct Resolution {
    pub handle: TypeHandle,
    pub path: ResolutionPath,
}

/// Per-identity build locks
#[derive(Default)]
struct IdentityLocks {
    locks: Mutex<HashMap<ProxyIdentity, Arc<AsyncMutex<()>>>>,
}

impl IdentityLocks {
    async fn acquire(&self, identity: &ProxyIdentity) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(identity.clone())
            .or_default()
            .clone();
        lock.lock_owned().await
    }
}

/// Resolves proxy requests to loaded types
pub struct ProxyResolver {
    rules: ProxyConfig,
    reserved: OnceCell<TypeHandle>,
    layout: Arc<CacheLayout>,
    thumbprint: Thumbprint,
    invalidation: InvalidationOutcome,
    cache: ClassCache,
    locks: IdentityLocks,
    builder: ArtifactBuilder,
    bridge: LoaderBridge,
    host: Arc<dyn HostLoader>,
    observer: Arc<dyn BuildObserver>,
}

impl ProxyResolver {
    /// Compute the thumbprint, invalidate stale artifacts, then accept requests
    ///
    /// Fails when package metadata is unavailable. The reserved base type is
    /// looked up on the first request for it, not here.
    pub async fn new(
        layout: CacheLayout,
        rules: ProxyConfig,
        collaborators: Collaborators,
    ) -> ProxyResult<Self> {
        let Collaborators {
            generator,
            host,
            metadata,
            observer,
        } = collaborators;

        let package = metadata.current_version_token().await?;
        let thumbprint = Thumbprint::from_package(&package);

        let invalidation = ThumbprintInvalidator::new(&layout).run(&thumbprint).await?;
        if !invalidation.report.is_clean() {
            warn!(
                "{} cached proxy file(s) could not be purged",
                invalidation.report.warnings.len()
            );
        }

        let layout = Arc::new(layout);
        info!(
            "Proxy cache ready at {} (thumbprint {})",
            layout.secondary_dir().display(),
            thumbprint
        );

        Ok(Self {
            rules,
            reserved: OnceCell::new(),
            builder: ArtifactBuilder::new(layout.clone(), generator),
            bridge: LoaderBridge::new(layout.clone(), host.clone()),
            layout,
            thumbprint,
            invalidation,
            cache: ClassCache::new(),
            locks: IdentityLocks::default(),
            host,
            observer,
        })
    }

    /// Wire a resolver from configuration
    ///
    /// Uses the configured generator command and package manifest, and a
    /// `TracingObserver` for timings.
    pub async fn from_config(config: &Config, host: Arc<dyn HostLoader>) -> ProxyResult<Self> {
        let generator =
            CommandGenerator::from_config(&config.generator).ok_or(ProxyError::GeneratorNotConfigured)?;
        let manifest = config.package.manifest.clone().ok_or_else(|| {
            ProxyError::Thumbprint("no package manifest configured".to_string())
        })?;

        let layout = CacheLayout::new(&ConfigManager::cache_root(config), &config.cache);
        let collaborators = Collaborators::new(
            Arc::new(generator),
            host,
            Arc::new(ManifestPackageMetadata::new(manifest)),
        )
        .with_observer(Arc::new(TracingObserver::new()));

        Self::new(layout, config.proxy.clone(), collaborators).await
    }

    /// Resolve a request to a loaded type
    pub async fn resolve(&self, request: &ProxyRequest) -> ProxyResult<TypeHandle> {
        Ok(self.resolve_with_path(request).await?.handle)
    }

    /// Resolve a request and report which path served it
    pub async fn resolve_with_path(&self, request: &ProxyRequest) -> ProxyResult<Resolution> {
        if is_reserved(&request.base_type, &self.rules) {
            let handle = self
                .reserved
                .get_or_try_init(|| self.host.load_by_canonical_name(&request.base_type))
                .await?;
            return Ok(Resolution {
                handle: handle.clone(),
                path: ResolutionPath::Reserved,
            });
        }

        let (identity, base_name) = ProxyIdentity::for_request(request, &self.rules)?;

        if let Some(resolution) = self.memory_hit(&identity) {
            return Ok(resolution);
        }

        let _guard = self.locks.acquire(&identity).await;

        // Another task may have finished the build while we waited.
        if let Some(resolution) = self.memory_hit(&identity) {
            return Ok(resolution);
        }

        let (artifact, path) = match self.builder.lookup(&identity, &self.thumbprint).await? {
            ArtifactLookup::Hit(artifact) => {
                debug!("Proxy file found for {}", identity);
                (artifact, ResolutionPath::DiskHit)
            }
            ArtifactLookup::Miss(target) => {
                let base = self.host.load_by_canonical_name(base_name).await?;
                let generation = GenerationRequest {
                    identity: &identity,
                    proxy_name: &request.requested_name,
                    base_type: &base,
                    overrides: request.overrides.as_ref(),
                    thumbprint: &self.thumbprint,
                };

                let started = Instant::now();
                let artifact = self.builder.generate(&generation, &target).await?;
                self.observer.generated(&identity, started.elapsed());
                (artifact, ResolutionPath::Generated)
            }
        };

        let started = Instant::now();
        let container = self.builder.package(&artifact).await?;
        self.observer.packaged(&identity, started.elapsed());

        let started = Instant::now();
        let handle = self.bridge.load(&identity, &container).await?;
        self.observer.loaded(&identity, started.elapsed());

        let handle = self.cache.insert(&identity, handle);
        Ok(Resolution { handle, path })
    }

    /// Resolve a non-generated type through the host loader
    pub async fn find_type(&self, class_name: &str) -> ProxyResult<TypeHandle> {
        self.bridge.load_existing(class_name).await
    }

    fn memory_hit(&self, identity: &ProxyIdentity) -> Option<Resolution> {
        self.cache.get(identity).map(|handle| {
            self.observer.cache_hit(identity);
            Resolution {
                handle,
                path: ResolutionPath::MemoryHit,
            }
        })
    }

    /// Live thumbprint
    pub fn thumbprint(&self) -> &Thumbprint {
        &self.thumbprint
    }

    /// What start-up invalidation did
    pub fn invalidation(&self) -> &InvalidationOutcome {
        &self.invalidation
    }

    /// Files start-up invalidation could not delete
    pub fn purge_warnings(&self) -> &[PurgeWarning] {
        &self.invalidation.report.warnings
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    /// Identities loaded so far
    pub fn cached_identities(&self) -> Vec<String> {
        self.cache.identities()
    }
}
