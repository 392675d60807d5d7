use std::collections::BTreeMap;

use serde::Serialize;

use super::{CatalogError, MediaCatalog};
use crate::mediator::resource;
use crate::storage::{Statement, TableFamily};

/// Catalog size figures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    /// Object count keyed by class string.
    pub objects_by_class: BTreeMap<String, i64>,
    pub total_objects: i64,
    pub resources: i64,
    pub fast_find_entries: i64,
    pub cached_entries: usize,
    pub system_update_id: i64,
}

impl MediaCatalog {
    pub fn stats(&self) -> Result<CatalogStats, CatalogError> {
        let engine = self.storage();

        let objects_by_class: BTreeMap<String, i64> = {
            let _guard = engine.lock(TableFamily::Objects)?;
            engine
                .query_map(Statement::CountObjectsByClass, [], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?
                .into_iter()
                .collect()
        };
        let fast_find_entries: i64 = {
            let _guard = engine.lock(TableFamily::FastFind)?;
            engine
                .query_row(Statement::CountFastFind, [], |row| row.get(0))?
                .unwrap_or(0)
        };

        Ok(CatalogStats {
            total_objects: objects_by_class.values().sum(),
            objects_by_class,
            resources: resource::count_resources(engine)?,
            fast_find_entries,
            cached_entries: self.cached_count()?,
            system_update_id: self.system_update_id()?,
        })
    }
}
