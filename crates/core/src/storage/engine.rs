//! SQLite-backed storage engine.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, Params, Row, Rows};
use tracing::{debug, error, warn};

use super::{schema, Statement, StorageError, TableFamily};
use crate::metrics;

/// Comfortably above the number of distinct [`Statement`] purposes.
const STATEMENT_CACHE_CAPACITY: usize = 64;

struct Session {
    conn: Connection,
    in_transaction: bool,
}

/// Owner of the single catalog connection.
///
/// Statements run one at a time on the shared connection. Callers touching a
/// table family take [`StorageEngine::lock`] for it first, so concurrent
/// mediators contend per family rather than across the whole catalog.
pub struct StorageEngine {
    session: Mutex<Session>,
    table_locks: [Mutex<()>; TableFamily::COUNT],
    unit_of_work: Mutex<()>,
    auto_commit: bool,
}

impl StorageEngine {
    /// Open (or create) the catalog database at `path`.
    ///
    /// `auto_commit` decides what happens to an active transaction when a new
    /// one is started: commit it (`true`) or roll it back (`false`).
    pub fn open(path: &Path, auto_commit: bool) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|e| StorageError::Open(e.to_string()))?;
        debug!("Opened catalog database at {:?}", path);
        Self::from_connection(conn, auto_commit)
    }

    /// Create an in-memory catalog database (useful for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(|e| StorageError::Open(e.to_string()))?;
        Self::from_connection(conn, true)
    }

    fn from_connection(conn: Connection, auto_commit: bool) -> Result<Self, StorageError> {
        conn.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);
        schema::initialize(&conn)?;
        Ok(Self {
            session: Mutex::new(Session {
                conn,
                in_transaction: false,
            }),
            table_locks: std::array::from_fn(|_| Mutex::new(())),
            unit_of_work: Mutex::new(()),
            auto_commit,
        })
    }

    pub fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    fn session(&self) -> Result<MutexGuard<'_, Session>, StorageError> {
        self.session
            .lock()
            .map_err(|_| StorageError::LockPoisoned("connection"))
    }

    /// Acquire the lock guarding a table family.
    pub fn lock(&self, family: TableFamily) -> Result<MutexGuard<'_, ()>, StorageError> {
        self.table_locks[family.index()]
            .lock()
            .map_err(|_| StorageError::LockPoisoned(family.name()))
    }

    /// Run a non-query statement, returning the number of changed rows.
    pub fn execute<P: Params>(&self, statement: Statement, params: P) -> Result<usize, StorageError> {
        let session = self.session()?;
        let mut stmt = session
            .conn
            .prepare_cached(statement.sql())
            .map_err(|e| statement_error(statement, e))?;
        stmt.execute(params)
            .map_err(|e| statement_error(statement, e))
    }

    /// Run a query and hand its lazily stepped row cursor to `f`.
    pub fn query<P, T, F>(&self, statement: Statement, params: P, f: F) -> Result<T, StorageError>
    where
        P: Params,
        F: FnOnce(&mut Rows<'_>) -> rusqlite::Result<T>,
    {
        let session = self.session()?;
        let mut stmt = session
            .conn
            .prepare_cached(statement.sql())
            .map_err(|e| statement_error(statement, e))?;
        let mut rows = stmt
            .query(params)
            .map_err(|e| statement_error(statement, e))?;
        let value = f(&mut rows).map_err(|e| statement_error(statement, e))?;
        Ok(value)
    }

    /// Run a query expected to yield at most one row.
    pub fn query_row<P, T, F>(
        &self,
        statement: Statement,
        params: P,
        f: F,
    ) -> Result<Option<T>, StorageError>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        let session = self.session()?;
        let mut stmt = session
            .conn
            .prepare_cached(statement.sql())
            .map_err(|e| statement_error(statement, e))?;
        stmt.query_row(params, f)
            .optional()
            .map_err(|e| statement_error(statement, e))
    }

    /// Run a query and map every row.
    pub fn query_map<P, T, F>(
        &self,
        statement: Statement,
        params: P,
        mut f: F,
    ) -> Result<Vec<T>, StorageError>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.query(statement, params, |rows| {
            let mut values = Vec::new();
            while let Some(row) = rows.next()? {
                values.push(f(row)?);
            }
            Ok(values)
        })
    }

    /// Run an ad-hoc batch outside the statement cache (maintenance only).
    pub fn execute_batch(&self, sql: &str) -> Result<(), StorageError> {
        let session = self.session()?;
        session.conn.execute_batch(sql).map_err(|e| {
            error!("Batch failed: {} ({})", e, sql);
            StorageError::Database {
                statement: sql.to_string(),
                message: e.to_string(),
            }
        })
    }

    /// Every row of every table, rendered and sorted.
    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> Vec<String> {
        let session = self.session().unwrap();
        let tables: Vec<String> = {
            let mut stmt = session
                .conn
                .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .unwrap();
            let names = stmt.query_map([], |row| row.get(0)).unwrap();
            names.collect::<rusqlite::Result<_>>().unwrap()
        };

        let mut rows = Vec::new();
        for table in tables {
            let mut stmt = session.conn.prepare(&format!("SELECT * FROM {table}")).unwrap();
            let columns = stmt.column_count();
            let mut cursor = stmt.query([]).unwrap();
            while let Some(row) = cursor.next().unwrap() {
                let values: Vec<String> = (0..columns)
                    .map(|i| format!("{:?}", row.get_ref(i).unwrap()))
                    .collect();
                rows.push(format!("{table}: {}", values.join(", ")));
            }
        }
        rows.sort();
        rows
    }

    /// Start a transaction.
    ///
    /// An already active transaction is committed or rolled back first,
    /// depending on the auto-commit flag.
    pub fn begin_transaction(&self) -> Result<(), StorageError> {
        let mut session = self.session()?;
        if session.in_transaction {
            let finish = if self.auto_commit {
                warn!("Transaction already active, committing it before starting a new one");
                "COMMIT"
            } else {
                warn!("Transaction already active, rolling it back before starting a new one");
                "ROLLBACK"
            };
            run_control(&mut session, finish)?;
        }
        run_control(&mut session, "BEGIN")
    }

    pub fn commit(&self) -> Result<(), StorageError> {
        let mut session = self.session()?;
        if !session.in_transaction {
            return Err(StorageError::NoTransaction);
        }
        run_control(&mut session, "COMMIT")
    }

    pub fn rollback(&self) -> Result<(), StorageError> {
        let mut session = self.session()?;
        if !session.in_transaction {
            return Err(StorageError::NoTransaction);
        }
        run_control(&mut session, "ROLLBACK")
    }

    pub fn in_transaction(&self) -> Result<bool, StorageError> {
        Ok(self.session()?.in_transaction)
    }

    /// Run `f` as one unit of work.
    ///
    /// Units of work are serialized against each other. The transaction is
    /// committed when `f` succeeds and rolled back when it fails.
    pub fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<StorageError>,
    {
        let _unit = self
            .unit_of_work
            .lock()
            .map_err(|_| StorageError::LockPoisoned("unit_of_work"))?;

        self.begin_transaction()?;
        match f(self) {
            Ok(value) => {
                if let Err(e) = self.commit() {
                    if let Err(rollback_err) = self.rollback() {
                        error!("Rollback after failed commit also failed: {}", rollback_err);
                    }
                    return Err(e.into());
                }
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = self.rollback() {
                    error!("Failed to roll back transaction: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

fn run_control(session: &mut Session, sql: &'static str) -> Result<(), StorageError> {
    let result = session.conn.execute_batch(sql);
    session.in_transaction = !session.conn.is_autocommit();
    result.map_err(|e| {
        error!("{} failed: {}", sql, e);
        StorageError::Database {
            statement: sql.to_string(),
            message: e.to_string(),
        }
    })
}

fn statement_error(statement: Statement, e: rusqlite::Error) -> StorageError {
    let message = e.to_string();
    if message.contains("violates") {
        warn!(?statement, "Consistency trigger aborted statement: {}", message);
    } else {
        error!(?statement, "Statement failed: {} ({})", message, statement.sql());
    }
    metrics::STORAGE_ERRORS
        .with_label_values(&[&format!("{:?}", statement)])
        .inc();
    StorageError::Database {
        statement: statement.sql().to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;

    fn counter(engine: &StorageEngine, name: &str) -> Option<i64> {
        engine
            .query_row(Statement::SelectCounter, params![name], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_execute_and_query_row() {
        let engine = StorageEngine::in_memory().unwrap();
        let changed = engine
            .execute(Statement::SeedCounter, params!["sample", 3])
            .unwrap();
        assert_eq!(changed, 1);
        assert_eq!(counter(&engine, "sample"), Some(3));
        assert_eq!(counter(&engine, "missing"), None);
    }

    #[test]
    fn test_repeated_execution_rebinds_parameters() {
        let engine = StorageEngine::in_memory().unwrap();
        for i in 0..5 {
            engine
                .execute(Statement::SeedCounter, params![format!("c{i}"), i])
                .unwrap();
        }
        for i in 0..5 {
            assert_eq!(counter(&engine, &format!("c{i}")), Some(i));
        }
    }

    #[test]
    fn test_query_cursor_is_stepped_lazily() {
        let engine = StorageEngine::in_memory().unwrap();
        engine.execute_batch(
            "INSERT INTO objects VALUES (0, -1, 'object.container', 'Root', NULL, 1, 0, 'now');
             INSERT INTO containers VALUES (0, 0, 0);
             INSERT INTO objects VALUES (1, 0, 'object.container', 'A', NULL, 1, 0, 'now');
             INSERT INTO objects VALUES (2, 0, 'object.container', 'B', NULL, 1, 0, 'now');",
        )
        .unwrap();

        // Only the first row is consumed
        let first: Option<i64> = engine
            .query(Statement::SelectChildIds, params![0], |rows| {
                rows.next()?.map(|row| row.get(0)).transpose()
            })
            .unwrap();
        assert_eq!(first, Some(1));

        let all: Vec<i64> = engine
            .query_map(Statement::SelectChildIds, params![0], |row| row.get(0))
            .unwrap();
        assert_eq!(all, vec![1, 2]);
    }

    #[test]
    fn test_commit_and_rollback() {
        let engine = StorageEngine::in_memory().unwrap();

        engine.begin_transaction().unwrap();
        engine
            .execute(Statement::SeedCounter, params!["kept", 1])
            .unwrap();
        engine.commit().unwrap();

        engine.begin_transaction().unwrap();
        engine
            .execute(Statement::SeedCounter, params!["dropped", 1])
            .unwrap();
        engine.rollback().unwrap();

        assert_eq!(counter(&engine, "kept"), Some(1));
        assert_eq!(counter(&engine, "dropped"), None);
        assert!(!engine.in_transaction().unwrap());
    }

    #[test]
    fn test_commit_without_transaction_fails() {
        let engine = StorageEngine::in_memory().unwrap();
        assert!(matches!(engine.commit(), Err(StorageError::NoTransaction)));
        assert!(matches!(engine.rollback(), Err(StorageError::NoTransaction)));
    }

    #[test]
    fn test_nested_begin_commits_previous_with_auto_commit() {
        let engine = StorageEngine::in_memory().unwrap();
        assert!(engine.auto_commit());

        engine.begin_transaction().unwrap();
        engine
            .execute(Statement::SeedCounter, params!["first", 1])
            .unwrap();
        engine.begin_transaction().unwrap();
        engine.rollback().unwrap();

        assert_eq!(counter(&engine, "first"), Some(1));
    }

    #[test]
    fn test_nested_begin_rolls_back_previous_without_auto_commit() {
        let dir = tempfile::TempDir::new().unwrap();
        let engine = StorageEngine::open(&dir.path().join("catalog.db"), false).unwrap();

        engine.begin_transaction().unwrap();
        engine
            .execute(Statement::SeedCounter, params!["first", 1])
            .unwrap();
        engine.begin_transaction().unwrap();
        engine.commit().unwrap();

        assert_eq!(counter(&engine, "first"), None);
    }

    #[test]
    fn test_with_transaction_rolls_back_on_error() {
        let engine = StorageEngine::in_memory().unwrap();

        let result: Result<(), StorageError> = engine.with_transaction(|engine| {
            engine.execute(Statement::SeedCounter, params!["partial", 1])?;
            // Orphan object: parent container 42 does not exist
            engine.execute(
                Statement::UpsertObject,
                params![9, 42, "object.item.videoItem", "Orphan", None::<String>, 1, 0, "now"],
            )?;
            Ok(())
        });

        let err = result.unwrap_err();
        assert!(err.is_constraint_violation());
        assert!(err.to_string().contains("violates parent container constraint"));
        assert_eq!(counter(&engine, "partial"), None);
        assert!(!engine.in_transaction().unwrap());
    }

    #[test]
    fn test_with_transaction_commits_on_success() {
        let engine = StorageEngine::in_memory().unwrap();
        let value: Result<i64, StorageError> = engine.with_transaction(|engine| {
            engine.execute(Statement::SeedCounter, params!["done", 5])?;
            Ok(5)
        });
        assert_eq!(value.unwrap(), 5);
        assert_eq!(counter(&engine, "done"), Some(5));
    }

    #[test]
    fn test_table_locks_are_independent() {
        let engine = StorageEngine::in_memory().unwrap();
        let _objects = engine.lock(TableFamily::Objects).unwrap();
        // A different family can be taken while the first is held
        let _resources = engine.lock(TableFamily::Resources).unwrap();
    }

    #[test]
    fn test_reopen_preserves_data() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("catalog.db");
        {
            let engine = StorageEngine::open(&path, true).unwrap();
            engine
                .execute(Statement::SeedCounter, params!["persisted", 11])
                .unwrap();
        }
        let engine = StorageEngine::open(&path, true).unwrap();
        assert_eq!(counter(&engine, "persisted"), Some(11));
    }
}
