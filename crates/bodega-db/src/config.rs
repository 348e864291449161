//! Runtime configuration.
//!
//! Loaded from `BODEGA_*` environment variables with fallback to defaults.
//!
//! | Variable                     | Default                | Meaning                                   |
//! |------------------------------|------------------------|-------------------------------------------|
//! | `BODEGA_DB_PATH`             | `bodega.db`            | SQLite file (`:memory:` for a scratch DB) |
//! | `BODEGA_TENANT_ID`           | `DEFAULT_TENANT_ID`    | Tenant the process operates on            |
//! | `BODEGA_INVENTORY_METHOD`    | `cpp`                  | Method for tenants without settings       |
//! | `BODEGA_EXPIRY_WINDOW_DAYS`  | `30`                   | Horizon of the expiring-products report   |

use std::env;
use std::path::PathBuf;

use bodega_core::{InventoryMethod, DEFAULT_TENANT_ID};
use serde::{Deserialize, Serialize};

use crate::pool::DbConfig;

/// Process configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite database path
    pub database_path: PathBuf,

    /// Tenant this process reads and writes
    pub tenant_id: String,

    /// Costing method for tenants that never saved settings
    pub default_inventory_method: InventoryMethod,

    /// Days ahead the expiring-products report looks
    pub expiry_window_days: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: PathBuf::from("bodega.db"),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            default_inventory_method: InventoryMethod::Cpp,
            expiry_window_days: 30,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        AppConfig::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();

        let config = AppConfig {
            database_path: lookup("BODEGA_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            tenant_id: lookup("BODEGA_TENANT_ID").unwrap_or(defaults.tenant_id),

            default_inventory_method: lookup("BODEGA_INVENTORY_METHOD")
                .unwrap_or_else(|| defaults.default_inventory_method.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("BODEGA_INVENTORY_METHOD".to_string()))?,

            expiry_window_days: lookup("BODEGA_EXPIRY_WINDOW_DAYS")
                .unwrap_or_else(|| defaults.expiry_window_days.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("BODEGA_EXPIRY_WINDOW_DAYS".to_string()))?,
        };

        if config.tenant_id.trim().is_empty() {
            return Err(ConfigError::MissingRequired("BODEGA_TENANT_ID".to_string()));
        }
        if config.expiry_window_days < 0 {
            return Err(ConfigError::InvalidValue("BODEGA_EXPIRY_WINDOW_DAYS".to_string()));
        }

        Ok(config)
    }

    /// Pool configuration for the configured database.
    pub fn db_config(&self) -> DbConfig {
        if self.database_path.as_os_str() == ":memory:" {
            DbConfig::in_memory()
        } else {
            DbConfig::new(&self.database_path)
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
