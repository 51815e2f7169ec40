use super::{
    types::{AuthMethod, Config},
    ConfigError,
};

/// Validate configuration
/// Currently validates:
/// - Auth section exists (enforced by serde)
/// - Server port is not 0
/// - Pool allows at least one connection
/// - API key auth has a non-empty key
/// - Default page size fits under the maximum
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.database.max_connections == 0 {
        return Err(ConfigError::ValidationError(
            "database.max_connections cannot be 0".to_string(),
        ));
    }

    if config.auth.method == AuthMethod::ApiKey
        && config.auth.api_key.as_deref().map_or(true, str::is_empty)
    {
        return Err(ConfigError::ValidationError(
            "auth.api_key is required when auth.method = \"api_key\"".to_string(),
        ));
    }

    if config.catalog.max_page_size == 0 {
        return Err(ConfigError::ValidationError(
            "catalog.max_page_size cannot be 0".to_string(),
        ));
    }

    if config.catalog.default_page_size > config.catalog.max_page_size {
        return Err(ConfigError::ValidationError(format!(
            "catalog.default_page_size ({}) exceeds catalog.max_page_size ({})",
            config.catalog.default_page_size, config.catalog.max_page_size
        )));
    }

    Ok(())
}
