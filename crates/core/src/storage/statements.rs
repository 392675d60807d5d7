//! Precompiled statements, keyed by purpose.

/// Every statement the catalog issues more than once.
///
/// The SQL text of each purpose is fixed, so the connection's statement cache
/// compiles it once and later calls only bind fresh parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statement {
    // Objects
    SelectObjectClass,
    SelectObject,
    UpsertObject,
    DeleteObject,
    DeleteChildren,
    SelectChildIds,
    SelectDescendantIds,
    SelectReferencingItems,
    CountObjectsByClass,

    // Containers
    SelectContainer,
    UpsertContainer,
    SelectClassFilters,
    DeleteClassFilters,
    InsertClassFilter,
    SelectEpgContainer,
    UpsertEpgContainer,
    SelectEpgContainerByChannel,

    // Items and variants
    SelectItem,
    UpsertItem,
    SelectVideoItem,
    UpsertVideoItem,
    SelectAudioItem,
    UpsertAudioItem,
    SelectMovie,
    UpsertMovie,
    SelectAudioRecord,
    UpsertAudioRecord,
    SelectVideoBroadcast,
    UpsertVideoBroadcast,
    SelectAudioBroadcast,
    UpsertAudioBroadcast,
    SelectEpgItem,
    UpsertEpgItem,
    SelectExpiredEpgItems,
    SelectRecordTimer,
    UpsertRecordTimer,

    // Resources
    SelectResourcesOfObject,
    SelectResource,
    UpsertResource,
    ClearRecordTimerFlag,
    CountResources,

    // Counters and well-known identifiers
    SeedCounter,
    SelectCounter,
    UpdateCounter,
    InsertWellKnown,
    SelectWellKnown,

    // Fast-find index
    SelectFastFind,
    UpsertFastFind,
    DeleteFastFind,
    CountFastFind,
}

impl Statement {
    pub fn sql(self) -> &'static str {
        match self {
            Statement::SelectObjectClass => "SELECT class FROM objects WHERE object_id = ?1",
            Statement::SelectObject => {
                "SELECT parent_id, class, title, creator, restricted, write_status, last_modified
                 FROM objects WHERE object_id = ?1"
            }
            Statement::UpsertObject => {
                "INSERT INTO objects (object_id, parent_id, class, title, creator, restricted, write_status, last_modified)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(object_id) DO UPDATE SET
                    parent_id = excluded.parent_id,
                    class = excluded.class,
                    title = excluded.title,
                    creator = excluded.creator,
                    restricted = excluded.restricted,
                    write_status = excluded.write_status,
                    last_modified = excluded.last_modified"
            }
            Statement::DeleteObject => "DELETE FROM objects WHERE object_id = ?1",
            Statement::DeleteChildren => "DELETE FROM objects WHERE parent_id = ?1",
            Statement::SelectChildIds => {
                "SELECT object_id FROM objects WHERE parent_id = ?1 ORDER BY object_id"
            }
            Statement::SelectDescendantIds => {
                "WITH RECURSIVE descendants(object_id) AS (
                    SELECT object_id FROM objects WHERE parent_id = ?1
                    UNION ALL
                    SELECT o.object_id FROM objects o JOIN descendants d ON o.parent_id = d.object_id
                 )
                 SELECT object_id FROM descendants"
            }
            Statement::SelectReferencingItems => {
                "WITH RECURSIVE subtree(object_id) AS (
                    SELECT ?1
                    UNION ALL
                    SELECT o.object_id FROM objects o JOIN subtree s ON o.parent_id = s.object_id
                 )
                 SELECT object_id FROM items WHERE ref_id IN (SELECT object_id FROM subtree)"
            }
            Statement::CountObjectsByClass => {
                "SELECT class, COUNT(*) FROM objects GROUP BY class ORDER BY class"
            }

            Statement::SelectContainer => {
                "SELECT searchable, update_id FROM containers WHERE object_id = ?1"
            }
            Statement::UpsertContainer => {
                "INSERT INTO containers (object_id, searchable, update_id) VALUES (?1, ?2, ?3)
                 ON CONFLICT(object_id) DO UPDATE SET
                    searchable = excluded.searchable,
                    update_id = excluded.update_id"
            }
            Statement::SelectClassFilters => {
                "SELECT filter_kind, class, include_derived FROM search_classes
                 WHERE object_id = ?1 ORDER BY rowid"
            }
            Statement::DeleteClassFilters => "DELETE FROM search_classes WHERE object_id = ?1",
            Statement::InsertClassFilter => {
                "INSERT INTO search_classes (object_id, filter_kind, class, include_derived)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(object_id, filter_kind, class) DO UPDATE SET
                    include_derived = MAX(include_derived, excluded.include_derived)"
            }
            Statement::SelectEpgContainer => {
                "SELECT channel_id, channel_name, is_radio FROM epg_containers WHERE object_id = ?1"
            }
            Statement::UpsertEpgContainer => {
                "INSERT INTO epg_containers (object_id, channel_id, channel_name, is_radio)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(object_id) DO UPDATE SET
                    channel_id = excluded.channel_id,
                    channel_name = excluded.channel_name,
                    is_radio = excluded.is_radio"
            }
            Statement::SelectEpgContainerByChannel => {
                "SELECT object_id FROM epg_containers WHERE channel_id = ?1 ORDER BY object_id LIMIT 1"
            }

            Statement::SelectItem => "SELECT ref_id FROM items WHERE object_id = ?1",
            Statement::UpsertItem => {
                "INSERT INTO items (object_id, ref_id) VALUES (?1, ?2)
                 ON CONFLICT(object_id) DO UPDATE SET ref_id = excluded.ref_id"
            }
            Statement::SelectVideoItem => {
                "SELECT genre, description, long_description, producers, rating, actors,
                        directors, publishers, language, relations
                 FROM video_items WHERE object_id = ?1"
            }
            Statement::UpsertVideoItem => {
                "INSERT INTO video_items (object_id, genre, description, long_description, producers,
                                          rating, actors, directors, publishers, language, relations)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(object_id) DO UPDATE SET
                    genre = excluded.genre,
                    description = excluded.description,
                    long_description = excluded.long_description,
                    producers = excluded.producers,
                    rating = excluded.rating,
                    actors = excluded.actors,
                    directors = excluded.directors,
                    publishers = excluded.publishers,
                    language = excluded.language,
                    relations = excluded.relations"
            }
            Statement::SelectAudioItem => {
                "SELECT genre, description, long_description, publishers, language, relations, rights
                 FROM audio_items WHERE object_id = ?1"
            }
            Statement::UpsertAudioItem => {
                "INSERT INTO audio_items (object_id, genre, description, long_description,
                                          publishers, language, relations, rights)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(object_id) DO UPDATE SET
                    genre = excluded.genre,
                    description = excluded.description,
                    long_description = excluded.long_description,
                    publishers = excluded.publishers,
                    language = excluded.language,
                    relations = excluded.relations,
                    rights = excluded.rights"
            }
            Statement::SelectMovie => {
                "SELECT storage_medium, dvd_region_code, channel_name FROM movies WHERE object_id = ?1"
            }
            Statement::UpsertMovie => {
                "INSERT INTO movies (object_id, storage_medium, dvd_region_code, channel_name)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(object_id) DO UPDATE SET
                    storage_medium = excluded.storage_medium,
                    dvd_region_code = excluded.dvd_region_code,
                    channel_name = excluded.channel_name"
            }
            Statement::SelectAudioRecord => {
                "SELECT storage_medium, channel_name FROM audio_records WHERE object_id = ?1"
            }
            Statement::UpsertAudioRecord => {
                "INSERT INTO audio_records (object_id, storage_medium, channel_name)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(object_id) DO UPDATE SET
                    storage_medium = excluded.storage_medium,
                    channel_name = excluded.channel_name"
            }
            Statement::SelectVideoBroadcast => {
                "SELECT icon, region, channel_nr, channel_name FROM video_broadcasts WHERE object_id = ?1"
            }
            Statement::UpsertVideoBroadcast => {
                "INSERT INTO video_broadcasts (object_id, icon, region, channel_nr, channel_name)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(object_id) DO UPDATE SET
                    icon = excluded.icon,
                    region = excluded.region,
                    channel_nr = excluded.channel_nr,
                    channel_name = excluded.channel_name"
            }
            Statement::SelectAudioBroadcast => {
                "SELECT region, radio_call_sign, radio_station_id, radio_band, channel_nr, channel_name
                 FROM audio_broadcasts WHERE object_id = ?1"
            }
            Statement::UpsertAudioBroadcast => {
                "INSERT INTO audio_broadcasts (object_id, region, radio_call_sign, radio_station_id,
                                               radio_band, channel_nr, channel_name)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(object_id) DO UPDATE SET
                    region = excluded.region,
                    radio_call_sign = excluded.radio_call_sign,
                    radio_station_id = excluded.radio_station_id,
                    radio_band = excluded.radio_band,
                    channel_nr = excluded.channel_nr,
                    channel_name = excluded.channel_name"
            }
            Statement::SelectEpgItem => {
                "SELECT event_id, channel_id, duration, synopsis, start_time, table_id, version
                 FROM epg_items WHERE object_id = ?1"
            }
            Statement::UpsertEpgItem => {
                "INSERT INTO epg_items (object_id, event_id, channel_id, duration, synopsis,
                                        start_time, table_id, version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(object_id) DO UPDATE SET
                    event_id = excluded.event_id,
                    channel_id = excluded.channel_id,
                    duration = excluded.duration,
                    synopsis = excluded.synopsis,
                    start_time = excluded.start_time,
                    table_id = excluded.table_id,
                    version = excluded.version"
            }
            Statement::SelectExpiredEpgItems => {
                "SELECT object_id FROM epg_items WHERE start_time + duration < ?1 ORDER BY object_id"
            }
            Statement::SelectRecordTimer => {
                "SELECT status, day, start, stop, priority, lifetime, file, channel_id
                 FROM record_timer_items WHERE object_id = ?1"
            }
            Statement::UpsertRecordTimer => {
                "INSERT INTO record_timer_items (object_id, status, day, start, stop, priority,
                                                 lifetime, file, channel_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(object_id) DO UPDATE SET
                    status = excluded.status,
                    day = excluded.day,
                    start = excluded.start,
                    stop = excluded.stop,
                    priority = excluded.priority,
                    lifetime = excluded.lifetime,
                    file = excluded.file,
                    channel_id = excluded.channel_id"
            }

            Statement::SelectResourcesOfObject => {
                "SELECT resource_id, object_id, resource_type, locator, protocol_info, content_type,
                        size, duration, bitrate, sample_frequency, bits_per_sample,
                        nr_audio_channels, resolution, color_depth, record_timer_flag
                 FROM resources WHERE object_id = ?1 ORDER BY resource_id"
            }
            Statement::SelectResource => {
                "SELECT resource_id, object_id, resource_type, locator, protocol_info, content_type,
                        size, duration, bitrate, sample_frequency, bits_per_sample,
                        nr_audio_channels, resolution, color_depth, record_timer_flag
                 FROM resources WHERE resource_id = ?1"
            }
            Statement::UpsertResource => {
                "INSERT INTO resources (resource_id, object_id, resource_type, locator, protocol_info,
                                        content_type, size, duration, bitrate, sample_frequency,
                                        bits_per_sample, nr_audio_channels, resolution, color_depth,
                                        record_timer_flag)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                 ON CONFLICT(resource_id) DO UPDATE SET
                    object_id = excluded.object_id,
                    resource_type = excluded.resource_type,
                    locator = excluded.locator,
                    protocol_info = excluded.protocol_info,
                    content_type = excluded.content_type,
                    size = excluded.size,
                    duration = excluded.duration,
                    bitrate = excluded.bitrate,
                    sample_frequency = excluded.sample_frequency,
                    bits_per_sample = excluded.bits_per_sample,
                    nr_audio_channels = excluded.nr_audio_channels,
                    resolution = excluded.resolution,
                    color_depth = excluded.color_depth,
                    record_timer_flag = excluded.record_timer_flag"
            }
            Statement::ClearRecordTimerFlag => {
                "UPDATE resources SET record_timer_flag = 0
                 WHERE resource_id = ?1 AND record_timer_flag != 0"
            }
            Statement::CountResources => "SELECT COUNT(*) FROM resources",

            Statement::SeedCounter => {
                "INSERT OR IGNORE INTO counters (name, value) VALUES (?1, ?2)"
            }
            Statement::SelectCounter => "SELECT value FROM counters WHERE name = ?1",
            Statement::UpdateCounter => "UPDATE counters SET value = ?2 WHERE name = ?1",
            Statement::InsertWellKnown => {
                "INSERT OR IGNORE INTO well_known_objects (name, object_id) VALUES (?1, ?2)"
            }
            Statement::SelectWellKnown => {
                "SELECT object_id FROM well_known_objects WHERE name = ?1"
            }

            Statement::SelectFastFind => "SELECT object_id FROM fast_find WHERE key = ?1",
            Statement::UpsertFastFind => {
                "INSERT INTO fast_find (key, object_id) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET object_id = excluded.object_id"
            }
            Statement::DeleteFastFind => "DELETE FROM fast_find WHERE key = ?1",
            Statement::CountFastFind => "SELECT COUNT(*) FROM fast_find",
        }
    }
}
