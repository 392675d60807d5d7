//! In-memory content object model.
//!
//! A closed hierarchy of catalog entries: leaf items (with per-variant
//! columns) and containers (with an ordered, indexed child set). Entries are
//! validated at their setters so a rejected value never leaves a partially
//! mutated entry behind.

mod class;
mod container;
mod entry;
mod item;
mod property;
mod resource;
mod sort;

pub use class::{ClassFilter, ClassTag, FilterKind};
pub use container::Container;
pub use entry::{CatalogEntry, EntryBody, EntryHandle, EntryState, WriteStatus};
pub use item::{
    AudioBroadcastProps, AudioItemProps, AudioRecordProps, EpgContainerProps, EpgItemProps, Item,
    ItemKind, MovieProps, RecordTimerProps, VideoBroadcastProps, VideoItemProps,
    MAX_DVD_REGION_CODE,
};
pub use property::PropertyValue;
pub use resource::{NewResource, Resource, ResourceId, ResourceType};
pub use sort::{SortCriteria, SortDirection, SortKey, SortSnapshot};

use thiserror::Error;

/// Catalog object identifier.
pub type ObjectId = i64;

/// Parent id of the root entry.
pub const NO_PARENT: ObjectId = -1;

/// Reference id of an item that aliases nothing.
pub const NO_REFERENCE: ObjectId = -1;

/// Malformed input rejected by the object model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Title must not be empty")]
    EmptyTitle,

    #[error("Unknown class: {0}")]
    UnknownClass(String),

    #[error("Class {0} is abstract and cannot be instantiated")]
    AbstractClass(ClassTag),

    #[error("Invalid write status: {0}")]
    InvalidWriteStatus(i64),

    #[error("Invalid DVD region code: {0}")]
    InvalidRegionCode(i64),

    #[error("Invalid channel number: {0}")]
    InvalidChannelNumber(i64),

    #[error("Invalid resource type: {0}")]
    InvalidResourceType(i64),

    #[error("Invalid reference: {0}")]
    InvalidReference(ObjectId),

    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    #[error("Property is read-only: {0}")]
    ReadOnlyProperty(String),

    #[error("Property {property} expects a {expected} value")]
    TypeMismatch {
        property: String,
        expected: &'static str,
    },

    #[error("Object {0} is not a container")]
    NotAContainer(ObjectId),

    #[error("Entry has no identifier yet")]
    NotPersisted,

    #[error("Invalid sort criteria: {0}")]
    InvalidSortCriteria(String),

    #[error("Lock poisoned for object {0}")]
    Poisoned(ObjectId),
}
