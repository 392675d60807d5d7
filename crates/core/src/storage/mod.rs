//! Embedded relational storage for the catalog.
//!
//! A single SQLite connection owns the fixed catalog schema. Referential
//! integrity and cascading deletes are emulated with triggers because the
//! engine does not enforce foreign keys unless asked to. Frequently used
//! statements are compiled once and reused through the connection's
//! statement cache, keyed by [`Statement`] purpose.

mod engine;
mod schema;
mod statements;

pub use engine::StorageEngine;
pub use schema::SCHEMA_VERSION;
pub use statements::Statement;

use thiserror::Error;

/// Errors for storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to open database: {0}")]
    Open(String),

    #[error("Database error in `{statement}`: {message}")]
    Database { statement: String, message: String },

    #[error("Incompatible schema version {found}, expected {expected}")]
    IncompatibleSchema { found: i64, expected: i64 },

    #[error("Lock poisoned: {0}")]
    LockPoisoned(&'static str),

    #[error("No active transaction")]
    NoTransaction,
}

impl StorageError {
    /// Whether the failure came from a consistency trigger aborting the statement.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, StorageError::Database { message, .. } if message.contains("violates"))
    }
}

/// Logical table families, each guarded by its own lock.
///
/// Mediator levels take the lock of the family they touch for the duration
/// of their bind/step sequence and release it before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableFamily {
    Objects,
    Containers,
    Items,
    Resources,
    SearchClasses,
    FastFind,
    IdAllocator,
    SystemCounters,
}

impl TableFamily {
    pub const COUNT: usize = 8;

    pub(crate) fn index(self) -> usize {
        match self {
            TableFamily::Objects => 0,
            TableFamily::Containers => 1,
            TableFamily::Items => 2,
            TableFamily::Resources => 3,
            TableFamily::SearchClasses => 4,
            TableFamily::FastFind => 5,
            TableFamily::IdAllocator => 6,
            TableFamily::SystemCounters => 7,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TableFamily::Objects => "objects",
            TableFamily::Containers => "containers",
            TableFamily::Items => "items",
            TableFamily::Resources => "resources",
            TableFamily::SearchClasses => "search_classes",
            TableFamily::FastFind => "fast_find",
            TableFamily::IdAllocator => "id_allocator",
            TableFamily::SystemCounters => "system_counters",
        }
    }
}
