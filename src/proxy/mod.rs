//! Proxy resolution and its collaborators
//!
//! - [`identity`]: request -> canonical identity
//! - [`generator`]: external artifact generator
//! - [`loader`]: container loading through the host runtime
//! - [`metadata`]: host package version record
//! - [`observer`]: pipeline timing hooks
//! - [`resolver`]: ties them to the cache

pub mod generator;
pub mod identity;
pub mod loader;
pub mod metadata;
pub mod observer;
mod resolver;

pub use generator::{CommandGenerator, GenerationRequest, ProxyGenerator};
pub use identity::{ProxyIdentity, ProxyRequest};
pub use loader::{CodeUnit, HostLoader, LoaderBridge, TypeHandle, TypeOrigin};
pub use metadata::{ManifestPackageMetadata, PackageMetadataProvider, StaticPackageInfo};
pub use observer::{BuildObserver, BuildTimings, NoopObserver, TracingObserver};
pub use resolver::{Collaborators, ProxyResolver, Resolution, ResolutionPath};
