//! Resource rows.

use rusqlite::types::Type;
use rusqlite::{params, Row};

use crate::model::{ObjectId, Resource, ResourceId, ResourceType};
use crate::storage::{Statement, StorageEngine, StorageError, TableFamily};

fn row_to_resource(row: &Row<'_>) -> rusqlite::Result<Resource> {
    let type_code: i64 = row.get(2)?;
    let resource_type = ResourceType::from_code(type_code)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Integer, Box::new(e)))?;

    Ok(Resource {
        id: row.get(0)?,
        object_id: row.get(1)?,
        resource_type,
        locator: row.get(3)?,
        protocol_info: row.get(4)?,
        content_type: row.get(5)?,
        size: row.get(6)?,
        duration: row.get(7)?,
        bitrate: row.get(8)?,
        sample_frequency: row.get(9)?,
        bits_per_sample: row.get(10)?,
        nr_audio_channels: row.get(11)?,
        resolution: row.get(12)?,
        color_depth: row.get(13)?,
        record_timer_flag: row.get(14)?,
    })
}

pub(crate) fn store_resource(engine: &StorageEngine, r: &Resource) -> Result<(), StorageError> {
    let _guard = engine.lock(TableFamily::Resources)?;
    engine.execute(
        Statement::UpsertResource,
        params![
            r.id,
            r.object_id,
            r.resource_type.code(),
            r.locator,
            r.protocol_info,
            r.content_type,
            r.size,
            r.duration,
            r.bitrate,
            r.sample_frequency,
            r.bits_per_sample,
            r.nr_audio_channels,
            r.resolution,
            r.color_depth,
            r.record_timer_flag,
        ],
    )?;
    Ok(())
}

pub(crate) fn load_resources(
    engine: &StorageEngine,
    object_id: ObjectId,
) -> Result<Vec<Resource>, StorageError> {
    let _guard = engine.lock(TableFamily::Resources)?;
    engine.query_map(
        Statement::SelectResourcesOfObject,
        params![object_id],
        row_to_resource,
    )
}

pub(crate) fn load_resource(
    engine: &StorageEngine,
    resource_id: ResourceId,
) -> Result<Option<Resource>, StorageError> {
    let _guard = engine.lock(TableFamily::Resources)?;
    engine.query_row(Statement::SelectResource, params![resource_id], row_to_resource)
}

/// Clear the record timer flag. Returns whether it was set.
pub(crate) fn clear_record_timer_flag(
    engine: &StorageEngine,
    resource_id: ResourceId,
) -> Result<bool, StorageError> {
    let _guard = engine.lock(TableFamily::Resources)?;
    let changed = engine.execute(Statement::ClearRecordTimerFlag, params![resource_id])?;
    Ok(changed > 0)
}

pub(crate) fn count_resources(engine: &StorageEngine) -> Result<i64, StorageError> {
    let _guard = engine.lock(TableFamily::Resources)?;
    let count = engine.query_row(Statement::CountResources, [], |row| row.get(0))?;
    Ok(count.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewResource;

    fn engine_with_item() -> StorageEngine {
        let engine = StorageEngine::in_memory().unwrap();
        engine
            .execute_batch(
                "INSERT INTO objects VALUES (0, -1, 'object.container', 'Root', NULL, 1, 0, 'now');
                 INSERT INTO containers VALUES (0, 0, 0);
                 INSERT INTO objects VALUES (100, 0, 'object.item.videoItem', 'Clip', NULL, 1, 0, 'now');",
            )
            .unwrap();
        engine
    }

    #[test]
    fn test_store_and_load() {
        let engine = engine_with_item();
        let resource = NewResource {
            duration: Some("0:42:00".to_string()),
            record_timer_flag: true,
            ..NewResource::new(
                ResourceType::Recording,
                "/recordings/clip.ts",
                "http-get:*:video/mpeg:*",
                "video/mpeg",
            )
        }
        .into_resource(1, 100);

        store_resource(&engine, &resource).unwrap();

        assert_eq!(load_resources(&engine, 100).unwrap(), vec![resource.clone()]);
        assert_eq!(load_resource(&engine, 1).unwrap(), Some(resource));
        assert_eq!(load_resource(&engine, 2).unwrap(), None);
        assert_eq!(count_resources(&engine).unwrap(), 1);
    }

    #[test]
    fn test_record_timer_flag_clears_once() {
        let engine = engine_with_item();
        let resource = NewResource {
            record_timer_flag: true,
            ..NewResource::new(ResourceType::Channel, "dvb://1", "rtsp-rtp-udp:*:video/mpeg:*", "video/mpeg")
        }
        .into_resource(5, 100);
        store_resource(&engine, &resource).unwrap();

        assert!(clear_record_timer_flag(&engine, 5).unwrap());
        assert!(!clear_record_timer_flag(&engine, 5).unwrap());
        assert!(!load_resource(&engine, 5).unwrap().unwrap().record_timer_flag);
    }

    #[test]
    fn test_resource_without_owner_rejected() {
        let engine = engine_with_item();
        let orphan = NewResource::new(ResourceType::File, "/tmp/x", "", "video/mpeg")
            .into_resource(9, 777);
        let err = store_resource(&engine, &orphan).unwrap_err();
        assert!(err.is_constraint_violation());
    }
}
