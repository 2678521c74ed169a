//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section, and every field carries a serde default so an empty file
//! (or no file at all) yields a usable configuration.

pub mod cache;
pub mod hierarchy;
pub mod locking;
pub mod logging;
pub mod permissions;
pub mod store;

use serde::{Deserialize, Serialize};

pub use self::cache::CacheConfig;
pub use self::hierarchy::HierarchyConfig;
pub use self::locking::LockingConfig;
pub use self::logging::LoggingConfig;
pub use self::permissions::{InheritanceMode, PermissionConfig};
pub use self::store::{DatabaseConfig, StoreBackend, StoreConfig};

use crate::error::AppError;

/// Root application configuration.
///
/// Top-level deserialization target for the merged configuration
/// (base file + environment overlay + `MEDIAHUB__*` variables).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Folder store backend settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Tree shape limits and naming rules.
    #[serde(default)]
    pub hierarchy: HierarchyConfig,
    /// Permission resolution policy.
    #[serde(default)]
    pub permissions: PermissionConfig,
    /// Tree cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Subtree write-lock settings.
    #[serde(default)]
    pub locking: LockingConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files and the environment.
    ///
    /// Merges `path` with an environment-specific overlay
    /// (`config/{env}.toml`) and environment variables prefixed with
    /// `MEDIAHUB__` (e.g. `MEDIAHUB__STORE__BACKEND=postgres`). Missing
    /// files are not an error.
    pub fn load(path: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("MEDIAHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Parse configuration from an in-memory TOML string.
    pub fn from_toml(source: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_toml("").expect("empty config should parse");
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.hierarchy.max_depth, 32);
        assert_eq!(config.hierarchy.max_name_length, 255);
        assert!(config.hierarchy.case_insensitive_names);
        assert_eq!(config.permissions.inheritance, InheritanceMode::None);
        assert!(config.cache.enabled);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [store]
            backend = "postgres"

            [store.database]
            url = "postgres://media:secret@db:5432/media"
            max_connections = 4

            [hierarchy]
            max_depth = 8

            [permissions]
            inheritance = "ancestors"

            [logging]
            format = "pretty"
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.store.backend, StoreBackend::Postgres);
        assert_eq!(config.store.database.max_connections, 4);
        assert_eq!(config.store.database.min_connections, 1);
        assert_eq!(config.hierarchy.max_depth, 8);
        assert_eq!(config.permissions.inheritance, InheritanceMode::Ancestors);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let err = AppConfig::from_toml("[store]\nbackend = \"sqlite\"").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Configuration);
    }
}
