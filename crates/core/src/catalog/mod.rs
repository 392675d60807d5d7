//! Catalog service.
//!
//! Owns the identity cache and the identifier counters, and wraps every
//! write in a storage unit of work. Locks are always taken in the same
//! order: entry locks (parent before child), then the unit of work, then
//! table locks. The identity cache lock is never held while waiting on
//! anything else.

mod allocator;
mod browse;
mod cache;
mod epg;
mod stats;
mod well_known;

pub use allocator::FALLBACK_ID_BASE;
pub use browse::{BrowseError, BrowseFlag, BrowseRequest, BrowseResult};
pub use stats::CatalogStats;
pub use well_known::{WellKnownContainer, FIRST_DYNAMIC_ID};

use std::collections::HashSet;
use std::sync::Arc;

use rusqlite::params;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{CatalogConfig, DatabaseConfig};
use crate::mediator::{resource, MediatorError, PersistenceDispatcher};
use crate::metrics;
use crate::model::{
    CatalogEntry, ClassTag, EntryBody, EntryHandle, EntryState, ModelError, NewResource, ObjectId,
    Resource, ResourceId, NO_PARENT, NO_REFERENCE,
};
use crate::storage::{Statement, StorageEngine, StorageError, TableFamily};
use allocator::{bump_system_update_id, IdAllocator};
use cache::IdentityCache;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Object {0} not found")]
    NotFound(ObjectId),

    #[error("Object {0} has been deleted")]
    Detached(ObjectId),

    #[error("Entry is already initialized")]
    AlreadyInitialized,

    #[error("Identifier {0} is already in use")]
    IdInUse(ObjectId),

    #[error("Identifier {0} is outside the reserved range")]
    NotReserved(ObjectId),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Mediator(#[from] MediatorError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// The persistent content catalog.
pub struct MediaCatalog {
    engine: Arc<StorageEngine>,
    dispatcher: PersistenceDispatcher,
    cache: IdentityCache,
    allocator: IdAllocator,
    hidden: HashSet<ObjectId>,
}

impl MediaCatalog {
    /// Open the catalog database described by `database`.
    pub fn open(database: &DatabaseConfig, catalog: &CatalogConfig) -> Result<Self, CatalogError> {
        let engine = StorageEngine::open(&database.path, database.auto_commit)?;
        info!("Opened catalog at {:?}", database.path);
        Self::with_engine(engine, catalog)
    }

    /// Create an in-memory catalog (useful for testing).
    pub fn in_memory(catalog: &CatalogConfig) -> Result<Self, CatalogError> {
        Self::with_engine(StorageEngine::in_memory()?, catalog)
    }

    fn with_engine(engine: StorageEngine, catalog: &CatalogConfig) -> Result<Self, CatalogError> {
        let engine = Arc::new(engine);
        let allocator = IdAllocator::new(engine.clone())?;
        Ok(Self {
            dispatcher: PersistenceDispatcher::with_defaults(engine.clone()),
            engine,
            cache: IdentityCache::default(),
            allocator,
            hidden: catalog.hidden_subtrees.iter().map(|w| w.id()).collect(),
        })
    }

    pub fn storage(&self) -> &StorageEngine {
        &self.engine
    }

    pub fn dispatcher(&self) -> &PersistenceDispatcher {
        &self.dispatcher
    }

    /// Create any missing well-known container.
    pub fn ensure_well_known_tree(&self) -> Result<(), CatalogError> {
        for container in WellKnownContainer::ALL {
            if self.get_object_by_id(container.id())?.is_none() {
                let mut entry =
                    self.create_object(ClassTag::Container.as_str(), container.title(), true)?;
                if let Some(settings) = entry.container_mut() {
                    settings.searchable = true;
                    settings.search_classes = container.search_classes();
                }
                let parent = match container.parent() {
                    Some(parent) => Some(
                        self.get_object_by_id(parent.id())?
                            .ok_or(CatalogError::NotFound(parent.id()))?,
                    ),
                    None => None,
                };
                self.initialize_object_with_id(parent.as_ref(), entry, container.id())?;
                info!(
                    "Created well-known container '{}' ({})",
                    container.title(),
                    container.id()
                );
            }

            self.engine.with_transaction(|engine| -> Result<(), CatalogError> {
                let _guard = engine.lock(TableFamily::Objects)?;
                engine.execute(
                    Statement::InsertWellKnown,
                    params![container.name(), container.id()],
                )?;
                Ok(())
            })?;
        }
        Ok(())
    }

    /// Resolve a well-known container through the reserved-identifier table.
    pub fn well_known(
        &self,
        container: WellKnownContainer,
    ) -> Result<Option<EntryHandle>, CatalogError> {
        let id: Option<ObjectId> = {
            let _guard = self.engine.lock(TableFamily::Objects)?;
            self.engine
                .query_row(Statement::SelectWellKnown, params![container.name()], |row| {
                    row.get(0)
                })?
        };
        match id {
            Some(id) => self.get_object_by_id(id),
            None => Ok(None),
        }
    }

    /// Build a transient entry of class `tag`.
    pub fn create_object(
        &self,
        tag: &str,
        title: &str,
        restricted: bool,
    ) -> Result<CatalogEntry, CatalogError> {
        Ok(self.dispatcher.create_object(tag, title, restricted)?)
    }

    /// Persist a transient entry as a new child of `parent` and cache it.
    pub fn initialize_object(
        &self,
        parent: &EntryHandle,
        entry: CatalogEntry,
    ) -> Result<EntryHandle, CatalogError> {
        if entry.state() != EntryState::Transient {
            return Err(CatalogError::AlreadyInitialized);
        }
        entry.validate()?;
        let id = self.allocator.next_object_id();
        self.insert_new(Some(parent), entry, id)
    }

    /// Persist a transient entry under a reserved identifier.
    ///
    /// Without a parent the entry becomes the root.
    pub fn initialize_object_with_id(
        &self,
        parent: Option<&EntryHandle>,
        entry: CatalogEntry,
        id: ObjectId,
    ) -> Result<EntryHandle, CatalogError> {
        if !(0..FIRST_DYNAMIC_ID).contains(&id) {
            return Err(CatalogError::NotReserved(id));
        }
        if self.get_object_by_id(id)?.is_some() {
            return Err(CatalogError::IdInUse(id));
        }
        self.insert_new(parent, entry, id)
    }

    fn insert_new(
        &self,
        parent: Option<&EntryHandle>,
        mut entry: CatalogEntry,
        id: ObjectId,
    ) -> Result<EntryHandle, CatalogError> {
        if entry.state() != EntryState::Transient {
            return Err(CatalogError::AlreadyInitialized);
        }
        entry.validate()?;
        entry.id = Some(id);

        match parent {
            None => {
                entry.parent_id = NO_PARENT;
                self.engine.with_transaction(|engine| -> Result<(), CatalogError> {
                    self.dispatcher.save_object(&entry)?;
                    bump_system_update_id(engine)?;
                    Ok(())
                })?;
            }
            Some(parent) => {
                let mut parent_entry = parent.write()?;
                if parent_entry.state() == EntryState::Detached {
                    return Err(CatalogError::Detached(parent.id()));
                }
                let mut updated = parent_entry.clone();
                updated.add_child(&mut entry)?;

                self.engine.with_transaction(|engine| -> Result<(), CatalogError> {
                    self.dispatcher.save_object(&entry)?;
                    self.dispatcher.save_object(&updated)?;
                    bump_system_update_id(engine)?;
                    Ok(())
                })?;
                updated.pending_fast_find.clear();
                *parent_entry = updated;
            }
        }

        let class = entry.class();
        entry.pending_fast_find.clear();
        entry.state = EntryState::Cached;
        let handle = self.cache.insert(EntryHandle::new(id, entry))?;

        metrics::OBJECTS_CREATED
            .with_label_values(&[class.as_str()])
            .inc();
        debug!("Initialized {} {}", class, id);
        Ok(handle)
    }

    /// Look an entry up, loading and caching it on first access.
    ///
    /// Repeated lookups of a cached id return the same instance.
    pub fn get_object_by_id(&self, id: ObjectId) -> Result<Option<EntryHandle>, CatalogError> {
        if let Some(handle) = self.cache.get(id)? {
            metrics::CACHE_LOOKUPS.with_label_values(&["hit"]).inc();
            return Ok(Some(handle));
        }
        metrics::CACHE_LOOKUPS.with_label_values(&["miss"]).inc();

        self.engine
            .with_transaction(|_| -> Result<Option<EntryHandle>, CatalogError> {
                let Some(mut entry) = self.dispatcher.get_object(id)? else {
                    return Ok(None);
                };
                entry.state = EntryState::Cached;
                Ok(Some(self.cache.insert(EntryHandle::new(id, entry))?))
            })
    }

    /// Persist the current state of a cached entry.
    pub fn save_object(&self, handle: &EntryHandle) -> Result<(), CatalogError> {
        let mut entry = handle.write()?;
        if entry.state() == EntryState::Detached {
            return Err(CatalogError::Detached(handle.id()));
        }
        entry.validate()?;
        self.engine.with_transaction(|_| -> Result<(), CatalogError> {
            self.dispatcher.save_object(&entry)?;
            Ok(())
        })?;
        entry.pending_fast_find.clear();
        Ok(())
    }

    /// Delete an entry with its resources and, for containers, every descendant.
    ///
    /// The entry and its descendants leave the identity cache and are marked
    /// detached; later lookups of their ids report nothing.
    pub fn delete_object(&self, handle: &EntryHandle) -> Result<(), CatalogError> {
        let id = handle.id();
        let parent_id = {
            let entry = handle.read()?;
            if entry.state() == EntryState::Detached {
                return Err(CatalogError::Detached(id));
            }
            entry.parent_id()
        };
        let parent = if parent_id == NO_PARENT {
            None
        } else {
            self.get_object_by_id(parent_id)?
        };

        let mut parent_entry = match &parent {
            Some(parent) => Some(parent.write()?),
            None => None,
        };
        let mut entry = handle.write()?;
        if entry.state() == EntryState::Detached {
            return Err(CatalogError::Detached(id));
        }

        let mut updated_parent = parent_entry.as_ref().map(|guard| (**guard).clone());
        if let Some(updated) = updated_parent.as_mut() {
            updated.remove_child_id(id)?;
        }

        let (deleted, aliases, purged) = self.engine.with_transaction(
            |engine| -> Result<(Vec<ObjectId>, Vec<ObjectId>, Vec<EntryHandle>), CatalogError> {
                let mut ids = descendant_ids(engine, id)?;
                let aliases = referencing_item_ids(engine, id)?;
                self.dispatcher.delete_object(&entry)?;
                if let Some(updated) = &updated_parent {
                    self.dispatcher.save_object(updated)?;
                }
                bump_system_update_id(engine)?;
                ids.push(id);
                let purged = self.cache.remove(&ids)?;
                Ok((ids, aliases, purged))
            },
        )?;

        if let (Some(guard), Some(updated)) = (parent_entry.as_mut(), updated_parent) {
            **guard = updated;
        }
        let class = entry.class();
        detach(&mut *entry);
        drop(entry);
        drop(parent_entry);

        mark_detached(&purged)?;
        self.drop_stale_references(&aliases, &deleted)?;
        metrics::OBJECTS_DELETED
            .with_label_values(&[class.as_str()])
            .inc();
        debug!("Deleted {} {} ({} cached entries purged)", class, id, purged.len());
        Ok(())
    }

    /// Delete every child of a container. Returns the number of direct children removed.
    pub fn clear_object(&self, handle: &EntryHandle) -> Result<usize, CatalogError> {
        let id = handle.id();
        let mut entry = handle.write()?;
        if entry.state() == EntryState::Detached {
            return Err(CatalogError::Detached(id));
        }
        let mut updated = entry.clone();
        let removed = updated
            .container_mut()
            .ok_or(ModelError::NotAContainer(id))?
            .clear_children();
        if removed.is_empty() {
            return Ok(0);
        }

        let (deleted, aliases, purged) = self.engine.with_transaction(
            |engine| -> Result<(Vec<ObjectId>, Vec<ObjectId>, Vec<EntryHandle>), CatalogError> {
                let ids = descendant_ids(engine, id)?;
                // Containers are never alias targets
                let aliases = referencing_item_ids(engine, id)?;
                self.dispatcher.clear_object(&entry)?;
                self.dispatcher.save_object(&updated)?;
                bump_system_update_id(engine)?;
                let purged = self.cache.remove(&ids)?;
                Ok((ids, aliases, purged))
            },
        )?;

        *entry = updated;
        drop(entry);
        mark_detached(&purged)?;
        self.drop_stale_references(&aliases, &deleted)?;
        debug!("Cleared {} children of {}", removed.len(), id);
        Ok(removed.len())
    }

    /// Allocate the next object identifier.
    pub fn get_next_object_id(&self) -> ObjectId {
        self.allocator.next_object_id()
    }

    /// Map `key` to a persisted entry in the fast-find index.
    pub fn add_fast_find(&self, handle: &EntryHandle, key: &str) -> Result<(), CatalogError> {
        {
            let entry = handle.read()?;
            if entry.state() == EntryState::Detached {
                return Err(CatalogError::Detached(handle.id()));
            }
        }
        self.engine.with_transaction(|engine| -> Result<(), CatalogError> {
            let _guard = engine.lock(TableFamily::FastFind)?;
            engine.execute(Statement::UpsertFastFind, params![key, handle.id()])?;
            Ok(())
        })
    }

    /// Resolve a fast-find key. Keys of deleted entries resolve to nothing.
    pub fn get_object_by_fast_find(&self, key: &str) -> Result<Option<EntryHandle>, CatalogError> {
        let id: Option<ObjectId> = {
            let _guard = self.engine.lock(TableFamily::FastFind)?;
            self.engine
                .query_row(Statement::SelectFastFind, params![key], |row| row.get(0))?
        };
        match id {
            Some(id) => self.get_object_by_id(id),
            None => Ok(None),
        }
    }

    pub fn remove_fast_find(&self, key: &str) -> Result<bool, CatalogError> {
        self.engine.with_transaction(|engine| -> Result<bool, CatalogError> {
            let _guard = engine.lock(TableFamily::FastFind)?;
            Ok(engine.execute(Statement::DeleteFastFind, params![key])? > 0)
        })
    }

    /// Register a resource for an entry under a fresh resource id.
    pub fn add_resource(
        &self,
        handle: &EntryHandle,
        new: NewResource,
    ) -> Result<Resource, CatalogError> {
        let mut entry = handle.write()?;
        if entry.state() == EntryState::Detached {
            return Err(CatalogError::Detached(handle.id()));
        }
        let resource = new.into_resource(self.allocator.next_resource_id(), handle.id());
        self.engine.with_transaction(|engine| -> Result<(), CatalogError> {
            resource::store_resource(engine, &resource)?;
            Ok(())
        })?;
        entry.resources.push(resource.clone());
        entry.touch();
        Ok(resource)
    }

    pub fn get_resource(&self, resource_id: ResourceId) -> Result<Option<Resource>, CatalogError> {
        Ok(resource::load_resource(&self.engine, resource_id)?)
    }

    /// Clear a resource's record timer flag.
    ///
    /// Returns the owning entry id if the flag was set, so the scheduling
    /// side effect runs at most once per flag.
    pub fn take_record_timer_flag(
        &self,
        resource_id: ResourceId,
    ) -> Result<Option<ObjectId>, CatalogError> {
        let Some(owner) = resource::load_resource(&self.engine, resource_id)?.map(|r| r.object_id)
        else {
            return Ok(None);
        };

        // Entry lock before the unit of work, as in `save_object`
        loop {
            let handle = self.cache.get(owner)?;
            let mut entry = match &handle {
                Some(handle) => Some(handle.write()?),
                None => None,
            };
            let taken = self
                .engine
                .with_transaction(|engine| -> Result<Option<bool>, CatalogError> {
                    let current = self.cache.get(owner)?;
                    let unchanged = match (&handle, &current) {
                        (Some(locked), Some(current)) => locked.ptr_eq(current),
                        (None, None) => true,
                        _ => false,
                    };
                    if !unchanged {
                        return Ok(None);
                    }
                    Ok(Some(resource::clear_record_timer_flag(engine, resource_id)?))
                })?;

            match taken {
                // Loaded or purged meanwhile
                None => continue,
                Some(false) => return Ok(None),
                Some(true) => {
                    if let Some(entry) = entry.as_mut() {
                        for r in entry.resources.iter_mut().filter(|r| r.id == resource_id) {
                            r.record_timer_flag = false;
                        }
                    }
                    return Ok(Some(owner));
                }
            }
        }
    }

    /// Follow an item's reference to the item it aliases.
    pub fn resolve_reference(
        &self,
        handle: &EntryHandle,
    ) -> Result<Option<EntryHandle>, CatalogError> {
        let reference_id = {
            let entry = handle.read()?;
            match entry.as_item() {
                Some(item) if item.is_reference() => item.reference_id(),
                _ => return Ok(None),
            }
        };
        self.get_object_by_id(reference_id)
    }

    /// Catalog-wide change counter, bumped whenever any container's child set changes.
    pub fn system_update_id(&self) -> Result<i64, CatalogError> {
        Ok(self.allocator.system_update_id()?)
    }

    pub fn cached_count(&self) -> Result<usize, CatalogError> {
        self.cache.len()
    }

    pub(crate) fn is_hidden(&self, id: ObjectId) -> bool {
        self.hidden.contains(&id)
    }

    /// Reset cached aliases of deleted items, mirroring the cascade in storage.
    fn drop_stale_references(
        &self,
        aliases: &[ObjectId],
        deleted: &[ObjectId],
    ) -> Result<(), CatalogError> {
        let deleted: HashSet<ObjectId> = deleted.iter().copied().collect();
        for alias in aliases.iter().filter(|alias| !deleted.contains(*alias)) {
            let Some(handle) = self.cache.get(*alias)? else {
                continue;
            };
            let mut entry = handle.write()?;
            if let EntryBody::Item(item) = &mut entry.body {
                if deleted.contains(&item.reference_id) {
                    item.reference_id = NO_REFERENCE;
                }
            }
        }
        Ok(())
    }
}

fn referencing_item_ids(
    engine: &StorageEngine,
    id: ObjectId,
) -> Result<Vec<ObjectId>, StorageError> {
    let _guard = engine.lock(TableFamily::Items)?;
    engine.query_map(Statement::SelectReferencingItems, params![id], |row| row.get(0))
}

fn descendant_ids(engine: &StorageEngine, id: ObjectId) -> Result<Vec<ObjectId>, StorageError> {
    let _guard = engine.lock(TableFamily::Objects)?;
    engine.query_map(Statement::SelectDescendantIds, params![id], |row| row.get(0))
}

/// Sever containment and resource links of a deleted entry.
fn detach(entry: &mut CatalogEntry) {
    entry.state = EntryState::Detached;
    entry.parent_id = NO_PARENT;
    entry.resources.clear();
    if let Some(container) = entry.container_mut() {
        container.clear_children();
    }
}

fn mark_detached(handles: &[EntryHandle]) -> Result<(), CatalogError> {
    for handle in handles {
        detach(&mut *handle.write()?);
    }
    Ok(())
}
