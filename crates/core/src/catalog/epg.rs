//! Program guide housekeeping.

use chrono::{DateTime, Utc};
use rusqlite::params;
use tracing::{debug, info};

use super::{CatalogError, MediaCatalog};
use crate::model::{ClassTag, EntryHandle, ModelError, ObjectId};
use crate::storage::{Statement, TableFamily};

impl MediaCatalog {
    /// Ids of program guide events that ended before `cutoff`.
    pub fn expired_epg_items(&self, cutoff: DateTime<Utc>) -> Result<Vec<ObjectId>, CatalogError> {
        let engine = self.storage();
        let _guard = engine.lock(TableFamily::Items)?;
        Ok(engine.query_map(
            Statement::SelectExpiredEpgItems,
            params![cutoff.timestamp()],
            |row| row.get(0),
        )?)
    }

    /// Delete every program guide event that ended before `cutoff`.
    pub fn sweep_expired_epg_items(&self, cutoff: DateTime<Utc>) -> Result<usize, CatalogError> {
        let mut removed = 0;
        for id in self.expired_epg_items(cutoff)? {
            let Some(handle) = self.get_object_by_id(id)? else {
                continue;
            };
            match self.delete_object(&handle) {
                Ok(()) => removed += 1,
                // Removed concurrently
                Err(CatalogError::Detached(_)) => {}
                Err(e) => return Err(e),
            }
        }
        if removed > 0 {
            info!("Removed {} expired program guide events", removed);
        } else {
            debug!("No expired program guide events");
        }
        Ok(removed)
    }

    /// The program guide container of a channel, if one exists.
    pub fn find_epg_container(&self, channel_id: &str) -> Result<Option<EntryHandle>, CatalogError> {
        let id: Option<ObjectId> = {
            let engine = self.storage();
            let _guard = engine.lock(TableFamily::Containers)?;
            engine.query_row(
                Statement::SelectEpgContainerByChannel,
                params![channel_id],
                |row| row.get(0),
            )?
        };
        match id {
            Some(id) => self.get_object_by_id(id),
            None => Ok(None),
        }
    }

    /// Program guide events filed under `container_id`, in insertion order.
    pub fn epg_items_of(&self, container_id: ObjectId) -> Result<Vec<EntryHandle>, CatalogError> {
        let container = self
            .get_object_by_id(container_id)?
            .ok_or(CatalogError::NotFound(container_id))?;
        let children = {
            let entry = container.read()?;
            entry
                .as_container()
                .ok_or(ModelError::NotAContainer(container_id))?
                .children()
                .to_vec()
        };

        let mut events = Vec::new();
        for id in children {
            if let Some(handle) = self.get_object_by_id(id)? {
                if handle.read()?.class() == ClassTag::EpgItem {
                    events.push(handle);
                }
            }
        }
        Ok(events)
    }
}
