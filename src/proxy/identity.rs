//! Proxy requests and their canonical identities

use crate::config::schema::ProxyConfig;
use crate::error::{ProxyError, ProxyResult};
use std::collections::BTreeSet;
use std::fmt;

/// One request for a proxy type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRequest {
    /// Name the caller gives the proxy
    pub requested_name: String,
    /// Fully qualified base type to extend
    pub base_type: String,
    /// Methods to override; `None` lets the generator decide
    pub overrides: Option<BTreeSet<String>>,
}

impl ProxyRequest {
    pub fn new(requested_name: impl Into<String>, base_type: impl Into<String>) -> Self {
        Self {
            requested_name: requested_name.into(),
            base_type: base_type.into(),
            overrides: None,
        }
    }

    /// Set the override set
    pub fn with_overrides<I, S>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.overrides = Some(overrides.into_iter().map(Into::into).collect());
        self
    }
}

/// Canonical cache key: `<normalized base type>-<requested name>`
///
/// The override set does not take part in the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProxyIdentity(String);

impl ProxyIdentity {
    /// Derive the identity of a request
    ///
    /// Returns the identity together with the base type to hand to the host
    /// loader, which has the proxy namespace stripped once.
    pub fn for_request<'r>(
        request: &'r ProxyRequest,
        rules: &ProxyConfig,
    ) -> ProxyResult<(Self, &'r str)> {
        let base = strip_proxy_namespace(&request.base_type, &rules.namespace_prefix)?;
        let normalized = normalize(base, rules);
        let identity = Self(format!("{}-{}", normalized, request.requested_name));
        Ok((identity, base))
    }

    #[cfg(test)]
    pub(crate) fn from_raw(identity: impl Into<String>) -> Self {
        Self(identity.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProxyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a base type is the reserved, already extended type
pub fn is_reserved(base_type: &str, rules: &ProxyConfig) -> bool {
    rules.reserved_base_type.as_deref() == Some(base_type)
}

/// Replace namespace-unsafe separators
pub fn normalize(base_type: &str, rules: &ProxyConfig) -> String {
    base_type.replace(rules.unsafe_separator, &rules.safe_separator.to_string())
}

/// Strip the proxy namespace once; a second prefix means proxy-of-proxy
pub fn strip_proxy_namespace<'a>(base_type: &'a str, prefix: &str) -> ProxyResult<&'a str> {
    if prefix.is_empty() {
        return Ok(base_type);
    }

    let stripped = base_type.strip_prefix(prefix).unwrap_or(base_type);
    if stripped.starts_with(prefix) {
        return Err(ProxyError::InvalidProxy {
            base_type: base_type.to_string(),
            reason: "can't generate proxy of proxy".to_string(),
        });
    }
    Ok(stripped)
}
