//! Build observability hooks
//!
//! The resolver reports each pipeline stage to a `BuildObserver` instead of
//! bumping shared counters.

use crate::proxy::identity::ProxyIdentity;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

/// Receives pipeline events from a resolver
pub trait BuildObserver: Send + Sync {
    /// Identity served from the in-memory cache
    fn cache_hit(&self, _identity: &ProxyIdentity) {}

    /// Generator finished
    fn generated(&self, _identity: &ProxyIdentity, _elapsed: Duration) {}

    /// Artifact packaged (or container found)
    fn packaged(&self, _identity: &ProxyIdentity, _elapsed: Duration) {}

    /// Type loaded from its container
    fn loaded(&self, _identity: &ProxyIdentity, _elapsed: Duration) {}
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl BuildObserver for NoopObserver {}

/// Accumulated pipeline timings
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuildTimings {
    pub generation: Duration,
    pub packaging: Duration,
    pub loading: Duration,
    pub generated: u32,
    pub cache_hits: u32,
}

/// Observer that logs each stage and keeps running totals
#[derive(Debug, Default)]
pub struct TracingObserver {
    totals: Mutex<BuildTimings>,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the totals so far
    pub fn timings(&self) -> BuildTimings {
        *self.totals.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut BuildTimings)) -> BuildTimings {
        let mut totals = self.totals.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut totals);
        *totals
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

impl BuildObserver for TracingObserver {
    fn cache_hit(&self, identity: &ProxyIdentity) {
        self.update(|t| t.cache_hits += 1);
        debug!("Proxy {} served from memory", identity);
    }

    fn generated(&self, identity: &ProxyIdentity, elapsed: Duration) {
        let totals = self.update(|t| {
            t.generation += elapsed;
            t.generated += 1;
        });
        debug!(
            "Generated {} in {:.3}ms (total generation {:.3}ms)",
            identity,
            millis(elapsed),
            millis(totals.generation)
        );
    }

    fn packaged(&self, identity: &ProxyIdentity, elapsed: Duration) {
        let totals = self.update(|t| t.packaging += elapsed);
        debug!(
            "Packaged {} in {:.3}ms (total packaging {:.3}ms)",
            identity,
            millis(elapsed),
            millis(totals.packaging)
        );
    }

    fn loaded(&self, identity: &ProxyIdentity, elapsed: Duration) {
        let totals = self.update(|t| t.loading += elapsed);
        debug!(
            "Loaded {} in {:.3}ms (total loading {:.3}ms)",
            identity,
            millis(elapsed),
            millis(totals.loading)
        );
    }
}
