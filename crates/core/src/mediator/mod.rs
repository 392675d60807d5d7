//! Persistence dispatcher: class tag to mediator.
//!
//! Mediators are registered explicitly at startup. Lookups by an unknown or
//! unregistered tag are an expected condition: loads report "no entry"
//! instead of failing the caller.

mod chain;
pub(crate) mod resource;

pub use chain::Mediator;

use std::collections::HashMap;
use std::sync::Arc;

use rusqlite::params;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{CatalogEntry, ClassTag, ModelError, ObjectId};
use crate::storage::{Statement, StorageEngine, StorageError, TableFamily};

#[derive(Debug, Error)]
pub enum MediatorError {
    #[error("No mediator registered for class {0}")]
    NoMediator(String),

    #[error("Entry of class {class} has no {level} level")]
    LevelMismatch { level: ClassTag, class: ClassTag },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Registry of mediators plus the engine they persist through.
pub struct PersistenceDispatcher {
    engine: Arc<StorageEngine>,
    mediators: HashMap<ClassTag, Mediator>,
}

impl PersistenceDispatcher {
    /// A dispatcher with no mediators registered.
    pub fn new(engine: Arc<StorageEngine>) -> Self {
        Self {
            engine,
            mediators: HashMap::new(),
        }
    }

    /// A dispatcher with a mediator for every concrete class.
    pub fn with_defaults(engine: Arc<StorageEngine>) -> Self {
        let mut dispatcher = Self::new(engine);
        for class in ClassTag::ALL {
            if !class.is_abstract() {
                dispatcher
                    .mediators
                    .insert(class, Mediator::new(class));
            }
        }
        dispatcher
    }

    /// Register the mediator for `class`. Abstract classes are refused.
    pub fn register(&mut self, class: ClassTag) -> Result<(), MediatorError> {
        if class.is_abstract() {
            return Err(ModelError::AbstractClass(class).into());
        }
        if self.mediators.contains_key(&class) {
            debug!("Mediator for {} already registered", class);
            return Ok(());
        }
        self.mediators.insert(class, Mediator::new(class));
        Ok(())
    }

    pub fn is_registered(&self, class: ClassTag) -> bool {
        self.mediators.contains_key(&class)
    }

    pub fn engine(&self) -> &Arc<StorageEngine> {
        &self.engine
    }

    pub fn mediator(&self, class: ClassTag) -> Result<&Mediator, MediatorError> {
        self.mediators
            .get(&class)
            .ok_or_else(|| MediatorError::NoMediator(class.to_string()))
    }

    /// Look a mediator up by class tag string.
    pub fn mediator_for(&self, tag: &str) -> Result<&Mediator, MediatorError> {
        let class: ClassTag = tag
            .parse()
            .map_err(|_| MediatorError::NoMediator(tag.to_string()))?;
        self.mediator(class)
    }

    /// Build a transient entry of class `tag`.
    pub fn create_object(
        &self,
        tag: &str,
        title: &str,
        restricted: bool,
    ) -> Result<CatalogEntry, MediatorError> {
        if let Ok(class) = tag.parse::<ClassTag>() {
            if class.is_abstract() {
                return Err(ModelError::AbstractClass(class).into());
            }
        }
        self.mediator_for(tag)?.create(title, restricted)
    }

    /// Load entry `id` through the mediator of its stored class.
    ///
    /// Returns `None` for a missing row or a class without a mediator.
    pub fn get_object(&self, id: ObjectId) -> Result<Option<CatalogEntry>, MediatorError> {
        let tag: Option<String> = {
            let _guard = self.engine.lock(TableFamily::Objects)?;
            self.engine
                .query_row(Statement::SelectObjectClass, params![id], |row| row.get(0))?
        };
        let Some(tag) = tag else {
            debug!("Object {} not found", id);
            return Ok(None);
        };

        match self.mediator_for(&tag) {
            Ok(mediator) => mediator.from_store(&self.engine, id),
            Err(e) => {
                warn!("Cannot load object {}: {}", id, e);
                Ok(None)
            }
        }
    }

    /// Validate and persist every level of `entry`.
    pub fn save_object(&self, entry: &CatalogEntry) -> Result<(), MediatorError> {
        entry.validate()?;
        self.mediator(entry.class())?.to_store(&self.engine, entry)
    }

    /// Delete `entry` and, through the cascade triggers, everything it owns.
    pub fn delete_object(&self, entry: &CatalogEntry) -> Result<bool, MediatorError> {
        let id = entry.id().ok_or(ModelError::NotPersisted)?;
        self.mediator(entry.class())?.delete(&self.engine, id)
    }

    /// Delete every child of container `entry`.
    pub fn clear_object(&self, entry: &CatalogEntry) -> Result<usize, MediatorError> {
        let id = entry.id().ok_or(ModelError::NotPersisted)?;
        self.mediator(entry.class())?.clear(&self.engine, id)
    }
}
