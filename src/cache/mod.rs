//! Persistent proxy artifact cache
//!
//! Artifacts are keyed by proxy identity and the host thumbprint, so a file
//! generated for an older build can never be mistaken for a current one.
//!
//! # Per-identity states
//!
//! | State | Work |
//! |-------|------|
//! | MemoryHit | none, handle returned from [`ClassCache`] |
//! | DiskHit | package if the container is missing, then load |
//! | Miss | generate, package, load |
//!
//! Failures are never cached; the next request retries the pipeline.

pub mod artifact;
pub mod class_cache;
pub mod layout;
pub mod thumbprint;

pub use artifact::{ArtifactBuilder, ArtifactLookup};
pub use class_cache::ClassCache;
pub use layout::{CacheEntryKind, CacheFile, CacheLayout};
pub use thumbprint::{
    InvalidationAction, InvalidationOutcome, PackageInfo, PurgeFilter, PurgeReport, PurgeWarning,
    Thumbprint, ThumbprintInvalidator,
};
