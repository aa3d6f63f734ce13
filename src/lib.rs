//! Proxy Cache - on-demand proxy types for an interop host
//!
//! Resolves (base type, proxy name, overrides) requests to loaded proxy
//! types, generating and packaging them on first use and serving them from
//! disk and memory afterwards. Artifacts are invalidated en masse when the
//! host application build changes.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod proxy;

pub use error::{ProxyError, ProxyResult};
pub use proxy::{ProxyRequest, ProxyResolver, TypeHandle};
