//! In-memory cache of loaded proxy types

use crate::proxy::identity::ProxyIdentity;
use crate::proxy::loader::TypeHandle;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Identity -> loaded type, populated only after a successful load
///
/// Entries are never evicted or replaced for the lifetime of the owner.
#[derive(Debug, Default)]
pub struct ClassCache {
    entries: RwLock<HashMap<String, TypeHandle>>,
}

impl ClassCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a loaded type
    pub fn get(&self, identity: &ProxyIdentity) -> Option<TypeHandle> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identity.as_str())
            .cloned()
    }

    /// Insert a loaded type, keeping the first handle if one is present
    pub fn insert(&self, identity: &ProxyIdentity, handle: TypeHandle) -> TypeHandle {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(identity.as_str().to_string())
            .or_insert(handle)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted identities currently cached
    pub fn identities(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}
