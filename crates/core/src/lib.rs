pub mod catalog;
pub mod config;
pub mod mediator;
pub mod metrics;
pub mod model;
pub mod storage;

pub use catalog::{
    BrowseError, BrowseFlag, BrowseRequest, BrowseResult, CatalogError, CatalogStats,
    MediaCatalog, WellKnownContainer, FIRST_DYNAMIC_ID,
};
pub use config::{
    load_config, load_config_from_str, validate_config, CatalogConfig, Config, ConfigError,
    DatabaseConfig, ServerConfig,
};
pub use mediator::{MediatorError, PersistenceDispatcher};
pub use model::{
    CatalogEntry, ClassTag, EntryHandle, EntryState, ModelError, NewResource, ObjectId,
    PropertyValue, Resource, ResourceType,
};
pub use storage::{StorageEngine, StorageError};
