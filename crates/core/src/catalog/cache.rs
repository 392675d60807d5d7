//! Identity cache: at most one in-memory instance per identifier.

use std::collections::HashMap;
use std::sync::RwLock;

use super::CatalogError;
use crate::model::{EntryHandle, ObjectId};

/// Process-lifetime map from identifier to the live entry. Nothing is
/// evicted; entries only leave when they are deleted.
///
/// The map has its own lock, taken without holding it across any entry or
/// storage lock.
#[derive(Default)]
pub(crate) struct IdentityCache {
    entries: RwLock<HashMap<ObjectId, EntryHandle>>,
}

impl IdentityCache {
    pub(crate) fn get(&self, id: ObjectId) -> Result<Option<EntryHandle>, CatalogError> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(&id).cloned())
    }

    /// Register `handle`, or return the instance registered first.
    pub(crate) fn insert(&self, handle: EntryHandle) -> Result<EntryHandle, CatalogError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        Ok(entries.entry(handle.id()).or_insert(handle).clone())
    }

    /// Drop `ids`, returning the handles that were cached.
    pub(crate) fn remove(&self, ids: &[ObjectId]) -> Result<Vec<EntryHandle>, CatalogError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        Ok(ids.iter().filter_map(|id| entries.remove(id)).collect())
    }

    pub(crate) fn len(&self) -> Result<usize, CatalogError> {
        Ok(self.entries.read().map_err(|_| poisoned())?.len())
    }
}

fn poisoned() -> CatalogError {
    CatalogError::Internal("identity cache lock poisoned".to_string())
}
