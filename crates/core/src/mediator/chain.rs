//! Per-class mediators.
//!
//! A mediator walks its class lineage from the root level down. Each level
//! persists or loads only the columns it introduces, under the lock of the
//! table family it touches.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use tracing::{debug, warn};

use super::resource;
use super::MediatorError;
use crate::model::{
    AudioBroadcastProps, AudioItemProps, AudioRecordProps, CatalogEntry, ClassFilter, ClassTag,
    Container, EntryBody, EntryState, EpgContainerProps, EpgItemProps, FilterKind, Item, ItemKind,
    MovieProps, ObjectId, RecordTimerProps, VideoBroadcastProps, VideoItemProps, WriteStatus,
};
use crate::storage::{Statement, StorageEngine, TableFamily};

/// Translates entries of one concrete class to and from rows.
#[derive(Debug, Clone)]
pub struct Mediator {
    class: ClassTag,
    chain: Vec<ClassTag>,
}

impl Mediator {
    pub(crate) fn new(class: ClassTag) -> Self {
        Self {
            class,
            chain: class.lineage(),
        }
    }

    pub fn class(&self) -> ClassTag {
        self.class
    }

    /// Build a transient entry of this mediator's class.
    pub fn create(&self, title: &str, restricted: bool) -> Result<CatalogEntry, MediatorError> {
        Ok(CatalogEntry::new(self.class, title, restricted)?)
    }

    /// Write every level of `entry`, root level first.
    pub fn to_store(&self, engine: &StorageEngine, entry: &CatalogEntry) -> Result<(), MediatorError> {
        if entry.class != self.class {
            return Err(MediatorError::LevelMismatch {
                level: self.class,
                class: entry.class,
            });
        }
        let id = entry.id.ok_or(crate::model::ModelError::NotPersisted)?;
        for level in &self.chain {
            store_level(*level, engine, id, entry)?;
        }
        Ok(())
    }

    /// Load entry `id`, root level first.
    ///
    /// Returns `None` if any level's row is missing.
    pub fn from_store(
        &self,
        engine: &StorageEngine,
        id: ObjectId,
    ) -> Result<Option<CatalogEntry>, MediatorError> {
        let mut entry = CatalogEntry::blank(self.class)?;
        entry.id = Some(id);
        for level in &self.chain {
            if !load_level(*level, engine, id, &mut entry)? {
                if *level == ClassTag::Object {
                    debug!("Object {} not found", id);
                } else {
                    warn!("Object {} is missing its {} row", id, level);
                }
                return Ok(None);
            }
        }
        entry.state = EntryState::Persisted;
        Ok(Some(entry))
    }

    /// Delete the entry's row; triggers remove dependent rows and descendants.
    pub fn delete(&self, engine: &StorageEngine, id: ObjectId) -> Result<bool, MediatorError> {
        let _guard = engine.lock(TableFamily::Objects)?;
        let changed = engine.execute(Statement::DeleteObject, params![id])?;
        Ok(changed > 0)
    }

    /// Delete every child of container `id`. Returns the number of direct children removed.
    pub fn clear(&self, engine: &StorageEngine, id: ObjectId) -> Result<usize, MediatorError> {
        if !self.class.is_container() {
            return Err(crate::model::ModelError::NotAContainer(id).into());
        }
        let _guard = engine.lock(TableFamily::Objects)?;
        Ok(engine.execute(Statement::DeleteChildren, params![id])?)
    }
}

fn mismatch(level: ClassTag, entry: &CatalogEntry) -> MediatorError {
    MediatorError::LevelMismatch {
        level,
        class: entry.class,
    }
}

fn item_of(level: ClassTag, entry: &CatalogEntry) -> Result<&Item, MediatorError> {
    match &entry.body {
        EntryBody::Item(item) => Ok(item),
        EntryBody::Container(_) => Err(mismatch(level, entry)),
    }
}

fn container_of(level: ClassTag, entry: &CatalogEntry) -> Result<&Container, MediatorError> {
    match &entry.body {
        EntryBody::Container(container) => Ok(container),
        EntryBody::Item(_) => Err(mismatch(level, entry)),
    }
}

fn item_mut(level: ClassTag, entry: &mut CatalogEntry) -> Result<&mut Item, MediatorError> {
    let class = entry.class;
    match &mut entry.body {
        EntryBody::Item(item) => Ok(item),
        EntryBody::Container(_) => Err(MediatorError::LevelMismatch { level, class }),
    }
}

fn container_mut(level: ClassTag, entry: &mut CatalogEntry) -> Result<&mut Container, MediatorError> {
    let class = entry.class;
    match &mut entry.body {
        EntryBody::Container(container) => Ok(container),
        EntryBody::Item(_) => Err(MediatorError::LevelMismatch { level, class }),
    }
}

// ============================================================================
// Store
// ============================================================================

fn store_level(
    level: ClassTag,
    engine: &StorageEngine,
    id: ObjectId,
    entry: &CatalogEntry,
) -> Result<(), MediatorError> {
    match level {
        ClassTag::Object => store_object(engine, id, entry),
        ClassTag::Item => {
            let item = item_of(level, entry)?;
            let _guard = engine.lock(TableFamily::Items)?;
            engine.execute(Statement::UpsertItem, params![id, item.reference_id])?;
            Ok(())
        }
        ClassTag::VideoItem => {
            let v = item_of(level, entry)?
                .kind
                .video()
                .ok_or_else(|| mismatch(level, entry))?;
            let _guard = engine.lock(TableFamily::Items)?;
            engine.execute(
                Statement::UpsertVideoItem,
                params![
                    id,
                    v.genre,
                    v.description,
                    v.long_description,
                    v.producers,
                    v.rating,
                    v.actors,
                    v.directors,
                    v.publishers,
                    v.language,
                    v.relations,
                ],
            )?;
            Ok(())
        }
        ClassTag::AudioItem => {
            let a = item_of(level, entry)?
                .kind
                .audio()
                .ok_or_else(|| mismatch(level, entry))?;
            let _guard = engine.lock(TableFamily::Items)?;
            engine.execute(
                Statement::UpsertAudioItem,
                params![
                    id,
                    a.genre,
                    a.description,
                    a.long_description,
                    a.publishers,
                    a.language,
                    a.relations,
                    a.rights,
                ],
            )?;
            Ok(())
        }
        ClassTag::Movie => {
            let ItemKind::Movie(_, m) = &item_of(level, entry)?.kind else {
                return Err(mismatch(level, entry));
            };
            let _guard = engine.lock(TableFamily::Items)?;
            engine.execute(
                Statement::UpsertMovie,
                params![id, m.storage_medium, m.dvd_region_code, m.channel_name],
            )?;
            Ok(())
        }
        ClassTag::AudioRecord => {
            let ItemKind::AudioRecord(_, r) = &item_of(level, entry)?.kind else {
                return Err(mismatch(level, entry));
            };
            let _guard = engine.lock(TableFamily::Items)?;
            engine.execute(
                Statement::UpsertAudioRecord,
                params![id, r.storage_medium, r.channel_name],
            )?;
            Ok(())
        }
        ClassTag::VideoBroadcast => {
            let ItemKind::VideoBroadcast(_, b) = &item_of(level, entry)?.kind else {
                return Err(mismatch(level, entry));
            };
            let _guard = engine.lock(TableFamily::Items)?;
            engine.execute(
                Statement::UpsertVideoBroadcast,
                params![id, b.icon, b.region, b.channel_nr, b.channel_name],
            )?;
            Ok(())
        }
        ClassTag::AudioBroadcast => {
            let ItemKind::AudioBroadcast(_, b) = &item_of(level, entry)?.kind else {
                return Err(mismatch(level, entry));
            };
            let _guard = engine.lock(TableFamily::Items)?;
            engine.execute(
                Statement::UpsertAudioBroadcast,
                params![
                    id,
                    b.region,
                    b.radio_call_sign,
                    b.radio_station_id,
                    b.radio_band,
                    b.channel_nr,
                    b.channel_name,
                ],
            )?;
            Ok(())
        }
        ClassTag::EpgItem => {
            let ItemKind::Epg(e) = &item_of(level, entry)?.kind else {
                return Err(mismatch(level, entry));
            };
            let _guard = engine.lock(TableFamily::Items)?;
            engine.execute(
                Statement::UpsertEpgItem,
                params![
                    id,
                    e.event_id,
                    e.channel_id,
                    e.duration,
                    e.synopsis,
                    e.start_time,
                    e.table_id,
                    e.version,
                ],
            )?;
            Ok(())
        }
        ClassTag::RecordTimerItem => {
            let ItemKind::RecordTimer(t) = &item_of(level, entry)?.kind else {
                return Err(mismatch(level, entry));
            };
            let _guard = engine.lock(TableFamily::Items)?;
            engine.execute(
                Statement::UpsertRecordTimer,
                params![
                    id,
                    t.status,
                    t.day,
                    t.start,
                    t.stop,
                    t.priority,
                    t.lifetime,
                    t.file,
                    t.channel_id,
                ],
            )?;
            Ok(())
        }
        ClassTag::Container => store_container(engine, id, entry),
        ClassTag::EpgContainer => {
            let epg = container_of(level, entry)?
                .epg
                .as_ref()
                .ok_or_else(|| mismatch(level, entry))?;
            let _guard = engine.lock(TableFamily::Containers)?;
            engine.execute(
                Statement::UpsertEpgContainer,
                params![id, epg.channel_id, epg.channel_name, epg.is_radio],
            )?;
            Ok(())
        }
    }
}

fn store_object(engine: &StorageEngine, id: ObjectId, entry: &CatalogEntry) -> Result<(), MediatorError> {
    {
        let _guard = engine.lock(TableFamily::Objects)?;
        engine.execute(
            Statement::UpsertObject,
            params![
                id,
                entry.parent_id,
                entry.class.as_str(),
                entry.title,
                entry.creator,
                entry.restricted,
                entry.write_status.code(),
                entry.last_modified.to_rfc3339(),
            ],
        )?;
    }

    for r in &entry.resources {
        resource::store_resource(engine, r)?;
    }

    if !entry.pending_fast_find.is_empty() {
        let _guard = engine.lock(TableFamily::FastFind)?;
        for key in &entry.pending_fast_find {
            engine.execute(Statement::UpsertFastFind, params![key, id])?;
        }
    }
    Ok(())
}

fn store_container(engine: &StorageEngine, id: ObjectId, entry: &CatalogEntry) -> Result<(), MediatorError> {
    let container = container_of(ClassTag::Container, entry)?;
    {
        let _guard = engine.lock(TableFamily::Containers)?;
        engine.execute(
            Statement::UpsertContainer,
            params![id, container.searchable, container.update_id()],
        )?;
    }

    let _guard = engine.lock(TableFamily::SearchClasses)?;
    engine.execute(Statement::DeleteClassFilters, params![id])?;
    let filters = container
        .search_classes
        .iter()
        .map(|f| (FilterKind::Search, f))
        .chain(container.create_classes.iter().map(|f| (FilterKind::Create, f)));
    for (kind, filter) in filters {
        engine.execute(
            Statement::InsertClassFilter,
            params![id, kind.as_str(), filter.class.as_str(), filter.include_derived],
        )?;
    }
    Ok(())
}

// ============================================================================
// Load
// ============================================================================

fn load_level(
    level: ClassTag,
    engine: &StorageEngine,
    id: ObjectId,
    entry: &mut CatalogEntry,
) -> Result<bool, MediatorError> {
    match level {
        ClassTag::Object => load_object(engine, id, entry),
        ClassTag::Item => {
            let reference_id = {
                let _guard = engine.lock(TableFamily::Items)?;
                engine.query_row(Statement::SelectItem, params![id], |row| row.get::<_, ObjectId>(0))?
            };
            let Some(reference_id) = reference_id else {
                return Ok(false);
            };
            item_mut(level, entry)?.reference_id = reference_id;
            Ok(true)
        }
        ClassTag::VideoItem => {
            let Some(props) = select(engine, Statement::SelectVideoItem, id, video_item_from_row)? else {
                return Ok(false);
            };
            let class = entry.class;
            let slot = item_mut(level, entry)?
                .kind
                .video_mut()
                .ok_or(MediatorError::LevelMismatch { level, class })?;
            *slot = props;
            Ok(true)
        }
        ClassTag::AudioItem => {
            let Some(props) = select(engine, Statement::SelectAudioItem, id, audio_item_from_row)? else {
                return Ok(false);
            };
            let class = entry.class;
            let slot = item_mut(level, entry)?
                .kind
                .audio_mut()
                .ok_or(MediatorError::LevelMismatch { level, class })?;
            *slot = props;
            Ok(true)
        }
        ClassTag::Movie => {
            let Some(props) = select(engine, Statement::SelectMovie, id, |row| {
                Ok(MovieProps {
                    storage_medium: row.get(0)?,
                    dvd_region_code: row.get(1)?,
                    channel_name: row.get(2)?,
                })
            })?
            else {
                return Ok(false);
            };
            set_kind_level(level, entry, |kind| match kind {
                ItemKind::Movie(_, m) => {
                    *m = props;
                    true
                }
                _ => false,
            })
        }
        ClassTag::AudioRecord => {
            let Some(props) = select(engine, Statement::SelectAudioRecord, id, |row| {
                Ok(AudioRecordProps {
                    storage_medium: row.get(0)?,
                    channel_name: row.get(1)?,
                })
            })?
            else {
                return Ok(false);
            };
            set_kind_level(level, entry, |kind| match kind {
                ItemKind::AudioRecord(_, r) => {
                    *r = props;
                    true
                }
                _ => false,
            })
        }
        ClassTag::VideoBroadcast => {
            let Some(props) = select(engine, Statement::SelectVideoBroadcast, id, |row| {
                Ok(VideoBroadcastProps {
                    icon: row.get(0)?,
                    region: row.get(1)?,
                    channel_nr: row.get(2)?,
                    channel_name: row.get(3)?,
                })
            })?
            else {
                return Ok(false);
            };
            set_kind_level(level, entry, |kind| match kind {
                ItemKind::VideoBroadcast(_, b) => {
                    *b = props;
                    true
                }
                _ => false,
            })
        }
        ClassTag::AudioBroadcast => {
            let Some(props) = select(engine, Statement::SelectAudioBroadcast, id, |row| {
                Ok(AudioBroadcastProps {
                    region: row.get(0)?,
                    radio_call_sign: row.get(1)?,
                    radio_station_id: row.get(2)?,
                    radio_band: row.get(3)?,
                    channel_nr: row.get(4)?,
                    channel_name: row.get(5)?,
                })
            })?
            else {
                return Ok(false);
            };
            set_kind_level(level, entry, |kind| match kind {
                ItemKind::AudioBroadcast(_, b) => {
                    *b = props;
                    true
                }
                _ => false,
            })
        }
        ClassTag::EpgItem => {
            let Some(props) = select(engine, Statement::SelectEpgItem, id, |row| {
                Ok(EpgItemProps {
                    event_id: row.get(0)?,
                    channel_id: row.get(1)?,
                    duration: row.get(2)?,
                    synopsis: row.get(3)?,
                    start_time: row.get(4)?,
                    table_id: row.get(5)?,
                    version: row.get(6)?,
                })
            })?
            else {
                return Ok(false);
            };
            set_kind_level(level, entry, |kind| match kind {
                ItemKind::Epg(e) => {
                    *e = props;
                    true
                }
                _ => false,
            })
        }
        ClassTag::RecordTimerItem => {
            let Some(props) = select(engine, Statement::SelectRecordTimer, id, |row| {
                Ok(RecordTimerProps {
                    status: row.get(0)?,
                    day: row.get(1)?,
                    start: row.get(2)?,
                    stop: row.get(3)?,
                    priority: row.get(4)?,
                    lifetime: row.get(5)?,
                    file: row.get(6)?,
                    channel_id: row.get(7)?,
                })
            })?
            else {
                return Ok(false);
            };
            set_kind_level(level, entry, |kind| match kind {
                ItemKind::RecordTimer(t) => {
                    *t = props;
                    true
                }
                _ => false,
            })
        }
        ClassTag::Container => load_container(engine, id, entry),
        ClassTag::EpgContainer => {
            let props = {
                let _guard = engine.lock(TableFamily::Containers)?;
                engine.query_row(Statement::SelectEpgContainer, params![id], |row| {
                    Ok(EpgContainerProps {
                        channel_id: row.get(0)?,
                        channel_name: row.get(1)?,
                        is_radio: row.get(2)?,
                    })
                })?
            };
            let Some(props) = props else {
                return Ok(false);
            };
            container_mut(level, entry)?.epg = Some(props);
            Ok(true)
        }
    }
}

/// Run a single-row select against the item family.
fn select<T, F>(
    engine: &StorageEngine,
    statement: Statement,
    id: ObjectId,
    f: F,
) -> Result<Option<T>, MediatorError>
where
    F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
{
    let _guard = engine.lock(TableFamily::Items)?;
    Ok(engine.query_row(statement, params![id], f)?)
}

fn set_kind_level<F>(level: ClassTag, entry: &mut CatalogEntry, assign: F) -> Result<bool, MediatorError>
where
    F: FnOnce(&mut ItemKind) -> bool,
{
    let class = entry.class;
    if assign(&mut item_mut(level, entry)?.kind) {
        Ok(true)
    } else {
        Err(MediatorError::LevelMismatch { level, class })
    }
}

fn video_item_from_row(row: &Row<'_>) -> rusqlite::Result<VideoItemProps> {
    Ok(VideoItemProps {
        genre: row.get(0)?,
        description: row.get(1)?,
        long_description: row.get(2)?,
        producers: row.get(3)?,
        rating: row.get(4)?,
        actors: row.get(5)?,
        directors: row.get(6)?,
        publishers: row.get(7)?,
        language: row.get(8)?,
        relations: row.get(9)?,
    })
}

fn audio_item_from_row(row: &Row<'_>) -> rusqlite::Result<AudioItemProps> {
    Ok(AudioItemProps {
        genre: row.get(0)?,
        description: row.get(1)?,
        long_description: row.get(2)?,
        publishers: row.get(3)?,
        language: row.get(4)?,
        relations: row.get(5)?,
        rights: row.get(6)?,
    })
}

struct ObjectRow {
    parent_id: ObjectId,
    class: String,
    title: String,
    creator: Option<String>,
    restricted: bool,
    write_status: i64,
    last_modified: String,
}

fn load_object(engine: &StorageEngine, id: ObjectId, entry: &mut CatalogEntry) -> Result<bool, MediatorError> {
    let row = {
        let _guard = engine.lock(TableFamily::Objects)?;
        engine.query_row(Statement::SelectObject, params![id], |row| {
            Ok(ObjectRow {
                parent_id: row.get(0)?,
                class: row.get(1)?,
                title: row.get(2)?,
                creator: row.get(3)?,
                restricted: row.get(4)?,
                write_status: row.get(5)?,
                last_modified: row.get(6)?,
            })
        })?
    };
    let Some(row) = row else {
        return Ok(false);
    };

    if row.class != entry.class.as_str() {
        return Err(MediatorError::LevelMismatch {
            level: ClassTag::Object,
            class: entry.class,
        });
    }

    entry.parent_id = row.parent_id;
    entry.title = row.title;
    entry.creator = row.creator;
    entry.restricted = row.restricted;
    entry.write_status = WriteStatus::from_code(row.write_status)?;
    // Fall back to now for rows written by hand
    entry.last_modified = DateTime::parse_from_rfc3339(&row.last_modified)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    entry.resources = resource::load_resources(engine, id)?;
    Ok(true)
}

fn load_container(engine: &StorageEngine, id: ObjectId, entry: &mut CatalogEntry) -> Result<bool, MediatorError> {
    let state = {
        let _guard = engine.lock(TableFamily::Containers)?;
        engine.query_row(Statement::SelectContainer, params![id], |row| {
            Ok((row.get::<_, bool>(0)?, row.get::<_, i64>(1)?))
        })?
    };
    let Some((searchable, update_id)) = state else {
        return Ok(false);
    };

    let children: Vec<ObjectId> = {
        let _guard = engine.lock(TableFamily::Objects)?;
        engine.query_map(Statement::SelectChildIds, params![id], |row| row.get(0))?
    };

    let filter_rows: Vec<(String, String, bool)> = {
        let _guard = engine.lock(TableFamily::SearchClasses)?;
        engine.query_map(Statement::SelectClassFilters, params![id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?
    };

    let container = container_mut(ClassTag::Container, entry)?;
    container.searchable = searchable;
    container.load_update_id(update_id);
    container.load_children(children);
    container.search_classes.clear();
    container.create_classes.clear();
    for (kind, class, include_derived) in filter_rows {
        let (Ok(kind), Ok(class)) = (kind.parse::<FilterKind>(), class.parse::<ClassTag>()) else {
            warn!("Skipping unreadable class filter ({}, {}) of container {}", kind, class, id);
            continue;
        };
        let filter = ClassFilter::new(class, include_derived);
        match kind {
            FilterKind::Search => container.search_classes.push(filter),
            FilterKind::Create => container.create_classes.push(filter),
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelError, PropertyValue};

    fn engine_with_root() -> StorageEngine {
        let engine = StorageEngine::in_memory().unwrap();
        let root = Mediator::new(ClassTag::Container);
        let mut entry = root.create("Root", true).unwrap();
        entry.id = Some(0);
        root.to_store(&engine, &entry).unwrap();
        engine
    }

    fn persisted(mediator: &Mediator, title: &str, id: ObjectId, parent_id: ObjectId) -> CatalogEntry {
        let mut entry = mediator.create(title, true).unwrap();
        entry.id = Some(id);
        entry.parent_id = parent_id;
        entry
    }

    #[test]
    fn test_movie_round_trip() {
        let engine = engine_with_root();
        let mediator = Mediator::new(ClassTag::Movie);
        let mut movie = persisted(&mediator, "Metropolis", 100, 0);
        movie.set_creator(Some("Fritz Lang"));
        movie.set_property("upnp:genre", &"Science Fiction".into()).unwrap();
        movie.set_property("upnp:DVDRegionCode", &2i64.into()).unwrap();
        movie.set_property("upnp:channelName", &"arte".into()).unwrap();

        mediator.to_store(&engine, &movie).unwrap();
        let loaded = mediator.from_store(&engine, 100).unwrap().unwrap();

        assert_eq!(loaded.title(), "Metropolis");
        assert_eq!(loaded.creator(), Some("Fritz Lang"));
        assert_eq!(loaded.parent_id(), 0);
        assert_eq!(loaded.state(), EntryState::Persisted);
        for name in ClassTag::Movie.properties() {
            assert_eq!(
                loaded.get_property(name).unwrap(),
                movie.get_property(name).unwrap(),
                "{name}"
            );
        }
    }

    /// A value of the same kind as `current` that differs from the default.
    fn changed_value(name: &str, current: &PropertyValue) -> PropertyValue {
        match current {
            PropertyValue::Text(_) => PropertyValue::Text(format!("{name} value")),
            // Valid as region code, channel number and write status alike
            PropertyValue::Integer(_) => PropertyValue::Integer(3),
            PropertyValue::Bool(b) => PropertyValue::Bool(!b),
        }
    }

    #[test]
    fn test_every_concrete_class_round_trips_its_properties() {
        for class in ClassTag::ALL.into_iter().filter(|c| !c.is_abstract()) {
            let engine = engine_with_root();
            let mediator = Mediator::new(class);
            let mut entry = persisted(&mediator, "Original", 100, 0);

            let mut written = 0;
            for name in class.properties() {
                if name == "@refID" {
                    continue;
                }
                let value = changed_value(name, &entry.get_property(name).unwrap());
                match entry.set_property(name, &value) {
                    Ok(()) => written += 1,
                    Err(ModelError::ReadOnlyProperty(_)) => {}
                    Err(e) => panic!("{class} rejected {name}: {e}"),
                }
            }
            assert!(written >= 4, "{class} wrote only {written} properties");

            mediator.to_store(&engine, &entry).unwrap();
            let loaded = mediator.from_store(&engine, 100).unwrap().unwrap();
            assert_eq!(loaded.class(), class);
            for name in class.properties() {
                assert_eq!(
                    loaded.get_property(name).unwrap(),
                    entry.get_property(name).unwrap(),
                    "{class} {name}"
                );
            }
        }
    }

    #[test]
    fn test_duplicate_class_filters_are_merged() {
        let engine = engine_with_root();
        let mediator = Mediator::new(ClassTag::Container);
        let mut video = persisted(&mediator, "Video", 1, 0);
        {
            let container = video.container_mut().unwrap();
            container
                .search_classes
                .push(ClassFilter::new(ClassTag::VideoItem, false));
            container
                .search_classes
                .push(ClassFilter::new(ClassTag::VideoItem, true));
        }

        mediator.to_store(&engine, &video).unwrap();
        let loaded = mediator.from_store(&engine, 1).unwrap().unwrap();
        assert_eq!(
            loaded.as_container().unwrap().search_classes,
            vec![ClassFilter::new(ClassTag::VideoItem, true)]
        );
    }

    #[test]
    fn test_container_round_trip_with_filters() {
        let engine = engine_with_root();
        let mediator = Mediator::new(ClassTag::Container);
        let mut video = persisted(&mediator, "Video", 1, 0);
        {
            let container = video.container_mut().unwrap();
            container.searchable = true;
            container
                .search_classes
                .push(ClassFilter::new(ClassTag::VideoItem, true));
            container
                .create_classes
                .push(ClassFilter::new(ClassTag::Movie, false));
        }

        mediator.to_store(&engine, &video).unwrap();
        // Saving again leaves a single copy of each filter
        mediator.to_store(&engine, &video).unwrap();

        let loaded = mediator.from_store(&engine, 1).unwrap().unwrap();
        let container = loaded.as_container().unwrap();
        assert!(container.searchable);
        assert_eq!(
            container.search_classes,
            vec![ClassFilter::new(ClassTag::VideoItem, true)]
        );
        assert_eq!(
            container.create_classes,
            vec![ClassFilter::new(ClassTag::Movie, false)]
        );
    }

    #[test]
    fn test_container_loads_children() {
        let engine = engine_with_root();
        let containers = Mediator::new(ClassTag::Container);
        let clips = Mediator::new(ClassTag::VideoItem);
        containers
            .to_store(&engine, &persisted(&containers, "Video", 1, 0))
            .unwrap();
        clips.to_store(&engine, &persisted(&clips, "A", 100, 1)).unwrap();
        clips.to_store(&engine, &persisted(&clips, "B", 101, 1)).unwrap();

        let loaded = containers.from_store(&engine, 1).unwrap().unwrap();
        assert_eq!(loaded.as_container().unwrap().children(), &[100, 101]);
    }

    #[test]
    fn test_epg_container_round_trip() {
        let engine = engine_with_root();
        let mediator = Mediator::new(ClassTag::EpgContainer);
        let mut channel = persisted(&mediator, "Das Erste", 140, 0);
        channel.set_property("epg:channelID", &"C1-1051-28106".into()).unwrap();
        channel.set_property("epg:isRadio", &false.into()).unwrap();

        mediator.to_store(&engine, &channel).unwrap();
        let loaded = mediator.from_store(&engine, 140).unwrap().unwrap();
        assert_eq!(
            loaded.as_container().unwrap().epg.as_ref().unwrap().channel_id,
            "C1-1051-28106"
        );
    }

    #[test]
    fn test_missing_variant_row_yields_none() {
        let engine = engine_with_root();
        engine
            .execute_batch(
                "INSERT INTO objects VALUES (100, 0, 'object.item.videoItem.movie', 'Half', NULL, 1, 0, 'now');
                 INSERT INTO items VALUES (100, -1);",
            )
            .unwrap();

        let mediator = Mediator::new(ClassTag::Movie);
        assert!(mediator.from_store(&engine, 100).unwrap().is_none());
        assert!(mediator.from_store(&engine, 555).unwrap().is_none());
    }

    #[test]
    fn test_store_under_missing_parent_fails() {
        let engine = engine_with_root();
        let mediator = Mediator::new(ClassTag::VideoItem);
        let orphan = persisted(&mediator, "Orphan", 100, 42);
        let err = mediator.to_store(&engine, &orphan).unwrap_err();
        assert!(matches!(err, MediatorError::Storage(ref e) if e.is_constraint_violation()));
    }

    #[test]
    fn test_to_store_rejects_foreign_class() {
        let engine = engine_with_root();
        let movies = Mediator::new(ClassTag::Movie);
        let clip = persisted(&Mediator::new(ClassTag::VideoItem), "Clip", 100, 0);
        assert!(matches!(
            movies.to_store(&engine, &clip),
            Err(MediatorError::LevelMismatch { .. })
        ));
    }

    #[test]
    fn test_clear_rejects_items() {
        let engine = engine_with_root();
        let mediator = Mediator::new(ClassTag::VideoItem);
        assert!(mediator.clear(&engine, 100).is_err());
    }
}
