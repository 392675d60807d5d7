use super::{types::Config, ConfigError};
use crate::catalog::WellKnownContainer;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Maintenance interval is not 0
/// - The root container is not hidden
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.catalog.maintenance_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "catalog.maintenance_interval_secs cannot be 0".to_string(),
        ));
    }

    if config
        .catalog
        .hidden_subtrees
        .contains(&WellKnownContainer::Root)
    {
        return Err(ConfigError::ValidationError(
            "catalog.hidden_subtrees cannot contain the root container".to_string(),
        ));
    }

    Ok(())
}
