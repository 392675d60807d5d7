//! Catalog schema: tables and consistency triggers.

use rusqlite::Connection;
use tracing::{debug, info};

use super::StorageError;

/// Version stamped into `PRAGMA user_version` when the schema is created.
pub const SCHEMA_VERSION: i64 = 1;

const TABLES: &str = r#"
    -- Every catalog entry, regardless of variant
    CREATE TABLE IF NOT EXISTS objects (
        object_id INTEGER PRIMARY KEY,
        parent_id INTEGER NOT NULL,
        class TEXT NOT NULL,
        title TEXT NOT NULL,
        creator TEXT,
        restricted INTEGER NOT NULL DEFAULT 1,
        write_status INTEGER NOT NULL DEFAULT 0,
        last_modified TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_objects_parent ON objects(parent_id);
    CREATE INDEX IF NOT EXISTS idx_objects_class ON objects(class);

    CREATE TABLE IF NOT EXISTS containers (
        object_id INTEGER PRIMARY KEY,
        searchable INTEGER NOT NULL DEFAULT 0,
        update_id INTEGER NOT NULL DEFAULT 0
    );

    -- Search and create class filters of a container
    CREATE TABLE IF NOT EXISTS search_classes (
        object_id INTEGER NOT NULL,
        filter_kind TEXT NOT NULL,
        class TEXT NOT NULL,
        include_derived INTEGER NOT NULL DEFAULT 0,
        UNIQUE(object_id, filter_kind, class)
    );

    CREATE INDEX IF NOT EXISTS idx_search_classes_object ON search_classes(object_id);

    CREATE TABLE IF NOT EXISTS items (
        object_id INTEGER PRIMARY KEY,
        ref_id INTEGER NOT NULL DEFAULT -1
    );

    CREATE INDEX IF NOT EXISTS idx_items_ref ON items(ref_id);

    CREATE TABLE IF NOT EXISTS video_items (
        object_id INTEGER PRIMARY KEY,
        genre TEXT NOT NULL DEFAULT '',
        description TEXT NOT NULL DEFAULT '',
        long_description TEXT NOT NULL DEFAULT '',
        producers TEXT NOT NULL DEFAULT '',
        rating TEXT NOT NULL DEFAULT '',
        actors TEXT NOT NULL DEFAULT '',
        directors TEXT NOT NULL DEFAULT '',
        publishers TEXT NOT NULL DEFAULT '',
        language TEXT NOT NULL DEFAULT '',
        relations TEXT NOT NULL DEFAULT ''
    );

    CREATE TABLE IF NOT EXISTS audio_items (
        object_id INTEGER PRIMARY KEY,
        genre TEXT NOT NULL DEFAULT '',
        description TEXT NOT NULL DEFAULT '',
        long_description TEXT NOT NULL DEFAULT '',
        publishers TEXT NOT NULL DEFAULT '',
        language TEXT NOT NULL DEFAULT '',
        relations TEXT NOT NULL DEFAULT '',
        rights TEXT NOT NULL DEFAULT ''
    );

    CREATE TABLE IF NOT EXISTS movies (
        object_id INTEGER PRIMARY KEY,
        storage_medium TEXT NOT NULL DEFAULT '',
        dvd_region_code INTEGER NOT NULL DEFAULT 0,
        channel_name TEXT NOT NULL DEFAULT ''
    );

    CREATE TABLE IF NOT EXISTS audio_records (
        object_id INTEGER PRIMARY KEY,
        storage_medium TEXT NOT NULL DEFAULT '',
        channel_name TEXT NOT NULL DEFAULT ''
    );

    CREATE TABLE IF NOT EXISTS video_broadcasts (
        object_id INTEGER PRIMARY KEY,
        icon TEXT NOT NULL DEFAULT '',
        region TEXT NOT NULL DEFAULT '',
        channel_nr INTEGER NOT NULL DEFAULT 0,
        channel_name TEXT NOT NULL DEFAULT ''
    );

    CREATE TABLE IF NOT EXISTS audio_broadcasts (
        object_id INTEGER PRIMARY KEY,
        region TEXT NOT NULL DEFAULT '',
        radio_call_sign TEXT NOT NULL DEFAULT '',
        radio_station_id TEXT NOT NULL DEFAULT '',
        radio_band TEXT NOT NULL DEFAULT '',
        channel_nr INTEGER NOT NULL DEFAULT 0,
        channel_name TEXT NOT NULL DEFAULT ''
    );

    CREATE TABLE IF NOT EXISTS epg_items (
        object_id INTEGER PRIMARY KEY,
        event_id INTEGER NOT NULL DEFAULT 0,
        channel_id TEXT NOT NULL DEFAULT '',
        duration INTEGER NOT NULL DEFAULT 0,
        synopsis TEXT NOT NULL DEFAULT '',
        start_time INTEGER NOT NULL DEFAULT 0,
        table_id INTEGER NOT NULL DEFAULT 0,
        version INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX IF NOT EXISTS idx_epg_items_start ON epg_items(start_time);

    CREATE TABLE IF NOT EXISTS record_timer_items (
        object_id INTEGER PRIMARY KEY,
        status INTEGER NOT NULL DEFAULT 0,
        day TEXT NOT NULL DEFAULT '',
        start INTEGER NOT NULL DEFAULT 0,
        stop INTEGER NOT NULL DEFAULT 0,
        priority INTEGER NOT NULL DEFAULT 0,
        lifetime INTEGER NOT NULL DEFAULT 0,
        file TEXT NOT NULL DEFAULT '',
        channel_id TEXT NOT NULL DEFAULT ''
    );

    CREATE TABLE IF NOT EXISTS epg_containers (
        object_id INTEGER PRIMARY KEY,
        channel_id TEXT NOT NULL,
        channel_name TEXT NOT NULL DEFAULT '',
        is_radio INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX IF NOT EXISTS idx_epg_containers_channel ON epg_containers(channel_id);

    CREATE TABLE IF NOT EXISTS resources (
        resource_id INTEGER PRIMARY KEY,
        object_id INTEGER NOT NULL,
        resource_type INTEGER NOT NULL,
        locator TEXT NOT NULL,
        protocol_info TEXT NOT NULL,
        content_type TEXT NOT NULL,
        size INTEGER,
        duration TEXT,
        bitrate INTEGER,
        sample_frequency INTEGER,
        bits_per_sample INTEGER,
        nr_audio_channels INTEGER,
        resolution TEXT,
        color_depth INTEGER,
        record_timer_flag INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX IF NOT EXISTS idx_resources_object ON resources(object_id);

    -- Fixed identifiers of the well-known top-level containers
    CREATE TABLE IF NOT EXISTS well_known_objects (
        name TEXT PRIMARY KEY,
        object_id INTEGER NOT NULL UNIQUE
    );

    -- Monotonic counters (id allocators, system update id)
    CREATE TABLE IF NOT EXISTS counters (
        name TEXT PRIMARY KEY,
        value INTEGER NOT NULL
    );

    -- Secondary index from an external key to a catalog identifier
    CREATE TABLE IF NOT EXISTS fast_find (
        key TEXT PRIMARY KEY,
        object_id INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_fast_find_object ON fast_find(object_id);
"#;

/// Dependent-table insert checks, as (trigger suffix, table, parent table).
///
/// Each variant row may only exist once the row of the level it extends does.
const DEPENDENT_TABLES: &[(&str, &str, &str)] = &[
    ("containers_object", "containers", "objects"),
    ("search_classes_container", "search_classes", "containers"),
    ("items_object", "items", "objects"),
    ("video_items_item", "video_items", "items"),
    ("audio_items_item", "audio_items", "items"),
    ("movies_video_item", "movies", "video_items"),
    ("video_broadcasts_video_item", "video_broadcasts", "video_items"),
    ("audio_records_audio_item", "audio_records", "audio_items"),
    ("audio_broadcasts_audio_item", "audio_broadcasts", "audio_items"),
    ("epg_items_item", "epg_items", "items"),
    ("record_timer_items_item", "record_timer_items", "items"),
    ("epg_containers_container", "epg_containers", "containers"),
    ("resources_object", "resources", "objects"),
    ("fast_find_object", "fast_find", "objects"),
];

/// Variant tables cleaned up when an object row is deleted.
const VARIANT_TABLES: &[&str] = &[
    "containers",
    "search_classes",
    "items",
    "video_items",
    "audio_items",
    "movies",
    "audio_records",
    "video_broadcasts",
    "audio_broadcasts",
    "epg_items",
    "record_timer_items",
    "epg_containers",
    "resources",
    "fast_find",
];

const OBJECT_TRIGGERS: &str = r#"
    CREATE TRIGGER IF NOT EXISTS fki_objects_parent
    BEFORE INSERT ON objects
    FOR EACH ROW WHEN NEW.parent_id != -1
    BEGIN
        SELECT RAISE(ABORT, 'insert on objects violates parent container constraint')
        WHERE (SELECT object_id FROM containers WHERE object_id = NEW.parent_id) IS NULL;
    END;

    CREATE TRIGGER IF NOT EXISTS fki_objects_single_root
    BEFORE INSERT ON objects
    FOR EACH ROW WHEN NEW.parent_id = -1
    BEGIN
        SELECT RAISE(ABORT, 'insert on objects violates single root constraint')
        WHERE EXISTS (
            SELECT 1 FROM objects WHERE parent_id = -1 AND object_id != NEW.object_id
        );
    END;

    CREATE TRIGGER IF NOT EXISTS fku_objects_parent
    BEFORE UPDATE OF parent_id ON objects
    FOR EACH ROW WHEN NEW.parent_id != -1
    BEGIN
        SELECT RAISE(ABORT, 'update on objects violates parent container constraint')
        WHERE NEW.parent_id = NEW.object_id
           OR (SELECT object_id FROM containers WHERE object_id = NEW.parent_id) IS NULL;
    END;

    CREATE TRIGGER IF NOT EXISTS fki_items_reference
    BEFORE INSERT ON items
    FOR EACH ROW WHEN NEW.ref_id != -1
    BEGIN
        SELECT RAISE(ABORT, 'insert on items violates reference constraint')
        WHERE NEW.ref_id = NEW.object_id
           OR (SELECT object_id FROM items WHERE object_id = NEW.ref_id) IS NULL;
    END;

    CREATE TRIGGER IF NOT EXISTS fku_items_reference
    BEFORE UPDATE OF ref_id ON items
    FOR EACH ROW WHEN NEW.ref_id != -1
    BEGIN
        SELECT RAISE(ABORT, 'update on items violates reference constraint')
        WHERE NEW.ref_id = NEW.object_id
           OR (SELECT object_id FROM items WHERE object_id = NEW.ref_id) IS NULL;
    END;

    CREATE TRIGGER IF NOT EXISTS fku_fast_find_object
    BEFORE UPDATE OF object_id ON fast_find
    FOR EACH ROW
    BEGIN
        SELECT RAISE(ABORT, 'update on fast_find violates object constraint')
        WHERE (SELECT object_id FROM objects WHERE object_id = NEW.object_id) IS NULL;
    END;
"#;

/// Build the insert trigger guarding `table` against rows without a `parent` row.
fn dependent_insert_trigger(suffix: &str, table: &str, parent: &str) -> String {
    format!(
        "CREATE TRIGGER IF NOT EXISTS fki_{suffix}
         BEFORE INSERT ON {table}
         FOR EACH ROW
         BEGIN
             SELECT RAISE(ABORT, 'insert on {table} violates {parent} constraint')
             WHERE (SELECT object_id FROM {parent} WHERE object_id = NEW.object_id) IS NULL;
         END;"
    )
}

/// Build the cascade trigger fired before an object row is deleted.
///
/// Children are removed first, which re-enters this trigger for every
/// descendant (requires `recursive_triggers`).
fn cascade_delete_trigger() -> String {
    let mut body = String::from("DELETE FROM objects WHERE parent_id = OLD.object_id;\n");
    for table in VARIANT_TABLES {
        body.push_str(&format!(
            "DELETE FROM {table} WHERE object_id = OLD.object_id;\n"
        ));
    }
    body.push_str("UPDATE items SET ref_id = -1 WHERE ref_id = OLD.object_id;\n");

    format!(
        "CREATE TRIGGER IF NOT EXISTS fkd_objects_cascade
         BEFORE DELETE ON objects
         FOR EACH ROW
         BEGIN
         {body}
         END;"
    )
}

fn db_error(statement: &str, e: rusqlite::Error) -> StorageError {
    StorageError::Database {
        statement: statement.to_string(),
        message: e.to_string(),
    }
}

/// Create tables and triggers if absent and stamp the schema version.
///
/// Idempotent: opening an existing catalog leaves its contents untouched.
pub(crate) fn initialize(conn: &Connection) -> Result<(), StorageError> {
    conn.pragma_update(None, "recursive_triggers", "ON")
        .map_err(|e| db_error("PRAGMA recursive_triggers", e))?;

    let found: i64 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| db_error("PRAGMA user_version", e))?;

    if found != 0 && found != SCHEMA_VERSION {
        return Err(StorageError::IncompatibleSchema {
            found,
            expected: SCHEMA_VERSION,
        });
    }

    conn.execute_batch(TABLES)
        .map_err(|e| db_error("CREATE TABLE", e))?;

    for (suffix, table, parent) in DEPENDENT_TABLES {
        let sql = dependent_insert_trigger(suffix, table, parent);
        conn.execute_batch(&sql).map_err(|e| db_error(&sql, e))?;
    }
    conn.execute_batch(OBJECT_TRIGGERS)
        .map_err(|e| db_error("CREATE TRIGGER", e))?;
    let cascade = cascade_delete_trigger();
    conn.execute_batch(&cascade)
        .map_err(|e| db_error(&cascade, e))?;

    if found == 0 {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .map_err(|e| db_error("PRAGMA user_version", e))?;
        info!("Created catalog schema at version {}", SCHEMA_VERSION);
    } else {
        debug!("Catalog schema at version {} already present", found);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection, kind: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = ? ORDER BY name")
            .unwrap();
        stmt.query_map([kind], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<String>, _>>()
            .unwrap()
    }

    #[test]
    fn test_initialize_creates_tables_and_triggers() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let tables = table_names(&conn, "table");
        for expected in [
            "objects",
            "containers",
            "items",
            "movies",
            "resources",
            "counters",
            "fast_find",
            "well_known_objects",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing {expected}");
        }

        let triggers = table_names(&conn, "trigger");
        assert!(triggers.iter().any(|t| t == "fkd_objects_cascade"));
        assert!(triggers.iter().any(|t| t == "fki_movies_video_item"));
        assert_eq!(
            triggers.len(),
            DEPENDENT_TABLES.len() + 6 + 1,
            "unexpected trigger set: {triggers:?}"
        );
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn.execute(
            "INSERT INTO counters (name, value) VALUES ('sample', 7)",
            [],
        )
        .unwrap();

        initialize(&conn).unwrap();

        let value: i64 = conn
            .query_row("SELECT value FROM counters WHERE name = 'sample'", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_initialize_rejects_foreign_schema_version() {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", 42).unwrap();

        let result = initialize(&conn);
        assert!(matches!(
            result,
            Err(StorageError::IncompatibleSchema {
                found: 42,
                expected: SCHEMA_VERSION
            })
        ));
    }

    #[test]
    fn test_cascade_trigger_removes_descendants() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO objects VALUES (0, -1, 'object.container', 'Root', NULL, 1, 0, 'now');
             INSERT INTO containers VALUES (0, 0, 0);
             INSERT INTO objects VALUES (1, 0, 'object.container', 'Video', NULL, 1, 0, 'now');
             INSERT INTO containers VALUES (1, 0, 0);
             INSERT INTO objects VALUES (2, 1, 'object.item.videoItem', 'Clip', NULL, 1, 0, 'now');
             INSERT INTO items VALUES (2, -1);
             INSERT INTO video_items (object_id) VALUES (2);
             INSERT INTO fast_find VALUES ('clip', 2);",
        )
        .unwrap();

        conn.execute("DELETE FROM objects WHERE object_id = 1", [])
            .unwrap();

        let objects: i64 = conn
            .query_row("SELECT COUNT(*) FROM objects", [], |r| r.get(0))
            .unwrap();
        let video_items: i64 = conn
            .query_row("SELECT COUNT(*) FROM video_items", [], |r| r.get(0))
            .unwrap();
        let fast_find: i64 = conn
            .query_row("SELECT COUNT(*) FROM fast_find", [], |r| r.get(0))
            .unwrap();
        assert_eq!(objects, 1);
        assert_eq!(video_items, 0);
        assert_eq!(fast_find, 0);
    }

    #[test]
    fn test_insert_without_parent_container_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO objects VALUES (5, 99, 'object.item.videoItem', 'Orphan', NULL, 1, 0, 'now')",
            [],
        );
        let message = result.unwrap_err().to_string();
        assert!(message.contains("violates parent container constraint"));
    }

    #[test]
    fn test_second_root_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn.execute(
            "INSERT INTO objects VALUES (0, -1, 'object.container', 'Root', NULL, 1, 0, 'now')",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO objects VALUES (7, -1, 'object.container', 'Other', NULL, 1, 0, 'now')",
            [],
        );
        assert!(result.is_err());
    }
}
