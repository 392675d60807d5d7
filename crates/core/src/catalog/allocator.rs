//! Monotonic identifier counters.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rusqlite::params;
use tracing::warn;

use super::well_known::FIRST_DYNAMIC_ID;
use crate::metrics;
use crate::storage::{Statement, StorageEngine, StorageError, TableFamily};

/// Start of the identifier range used when the counter cannot be read.
///
/// Far above anything the counters will reach, so degraded ids never
/// collide with regular ones.
pub const FALLBACK_ID_BASE: i64 = 1 << 40;

pub(crate) const NEXT_OBJECT_ID: &str = "next_object_id";
pub(crate) const NEXT_RESOURCE_ID: &str = "next_resource_id";
pub(crate) const SYSTEM_UPDATE_ID: &str = "system_update_id";

pub(crate) struct IdAllocator {
    engine: Arc<StorageEngine>,
    last_fallback: AtomicI64,
}

impl IdAllocator {
    /// Create the counters if absent.
    pub(crate) fn new(engine: Arc<StorageEngine>) -> Result<Self, StorageError> {
        {
            let _guard = engine.lock(TableFamily::IdAllocator)?;
            engine.execute(Statement::SeedCounter, params![NEXT_OBJECT_ID, FIRST_DYNAMIC_ID])?;
            engine.execute(Statement::SeedCounter, params![NEXT_RESOURCE_ID, 1])?;
        }
        {
            let _guard = engine.lock(TableFamily::SystemCounters)?;
            engine.execute(Statement::SeedCounter, params![SYSTEM_UPDATE_ID, 0])?;
        }
        Ok(Self {
            engine,
            last_fallback: AtomicI64::new(FALLBACK_ID_BASE - 1),
        })
    }

    pub(crate) fn next_object_id(&self) -> i64 {
        self.next(NEXT_OBJECT_ID)
    }

    pub(crate) fn next_resource_id(&self) -> i64 {
        self.next(NEXT_RESOURCE_ID)
    }

    fn next(&self, counter: &'static str) -> i64 {
        let result = self.engine.with_transaction(|engine| {
            let _guard = engine.lock(TableFamily::IdAllocator)?;
            increment(engine, counter)
        });
        match result {
            Ok(id) => id,
            Err(e) => {
                let id = self.fallback_id();
                warn!(
                    "Reading counter {} failed ({}), using fallback id {}",
                    counter, e, id
                );
                metrics::ID_ALLOCATOR_FALLBACKS.inc();
                id
            }
        }
    }

    /// Wall-clock milliseconds mapped into the fallback range, strictly increasing.
    fn fallback_id(&self) -> i64 {
        let candidate = FALLBACK_ID_BASE + Utc::now().timestamp_millis().rem_euclid(FALLBACK_ID_BASE);
        let previous = self
            .last_fallback
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(candidate.max(last + 1))
            })
            .unwrap_or(candidate - 1);
        candidate.max(previous + 1)
    }

    pub(crate) fn system_update_id(&self) -> Result<i64, StorageError> {
        let _guard = self.engine.lock(TableFamily::SystemCounters)?;
        let value = self
            .engine
            .query_row(Statement::SelectCounter, params![SYSTEM_UPDATE_ID], |row| row.get(0))?;
        Ok(value.unwrap_or(0))
    }
}

/// Bump the system update id. Must run inside the caller's unit of work.
pub(crate) fn bump_system_update_id(engine: &StorageEngine) -> Result<i64, StorageError> {
    let _guard = engine.lock(TableFamily::SystemCounters)?;
    increment(engine, SYSTEM_UPDATE_ID).map(|previous| previous + 1)
}

/// Read-and-increment `counter`, returning the value read.
fn increment(engine: &StorageEngine, counter: &str) -> Result<i64, StorageError> {
    let current: i64 = engine
        .query_row(Statement::SelectCounter, params![counter], |row| row.get(0))?
        .ok_or_else(|| StorageError::Database {
            statement: Statement::SelectCounter.sql().to_string(),
            message: format!("counter {counter} is missing"),
        })?;
    engine.execute(Statement::UpdateCounter, params![counter, current + 1])?;
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocator() -> IdAllocator {
        IdAllocator::new(Arc::new(StorageEngine::in_memory().unwrap())).unwrap()
    }

    #[test]
    fn test_object_ids_start_after_reserved_range() {
        let allocator = allocator();
        assert_eq!(allocator.next_object_id(), FIRST_DYNAMIC_ID);
        assert_eq!(allocator.next_object_id(), FIRST_DYNAMIC_ID + 1);
    }

    #[test]
    fn test_counters_are_independent() {
        let allocator = allocator();
        assert_eq!(allocator.next_resource_id(), 1);
        assert_eq!(allocator.next_object_id(), FIRST_DYNAMIC_ID);
        assert_eq!(allocator.next_resource_id(), 2);
    }

    #[test]
    fn test_reseeding_keeps_counter_value() {
        let engine = Arc::new(StorageEngine::in_memory().unwrap());
        let first = IdAllocator::new(engine.clone()).unwrap();
        first.next_object_id();
        first.next_object_id();

        let second = IdAllocator::new(engine).unwrap();
        assert_eq!(second.next_object_id(), FIRST_DYNAMIC_ID + 2);
    }

    #[test]
    fn test_fallback_when_counter_missing() {
        let engine = Arc::new(StorageEngine::in_memory().unwrap());
        let allocator = IdAllocator::new(engine.clone()).unwrap();
        engine
            .execute_batch("DELETE FROM counters WHERE name = 'next_object_id'")
            .unwrap();

        let a = allocator.next_object_id();
        let b = allocator.next_object_id();
        assert!(a >= FALLBACK_ID_BASE);
        assert!(b > a);
        assert!(!engine.in_transaction().unwrap());
    }

    #[test]
    fn test_system_update_id_bumps() {
        let engine = Arc::new(StorageEngine::in_memory().unwrap());
        let allocator = IdAllocator::new(engine.clone()).unwrap();
        assert_eq!(allocator.system_update_id().unwrap(), 0);
        assert_eq!(bump_system_update_id(&engine).unwrap(), 1);
        assert_eq!(allocator.system_update_id().unwrap(), 1);
    }
}
