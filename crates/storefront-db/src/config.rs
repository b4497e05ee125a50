//! # Storefront Configuration
//!
//! Settings for the database and checkout layers.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STOREFRONT_DB_PATH=/var/lib/storefront/shop.db                     │
//! │     STOREFRONT_MAX_CART_ITEMS=50                                       │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     storefront.toml (path passed by the caller)                        │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     ./storefront.db, 100 lines, 999 per line                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "./storefront.db"
//! max_connections = 5
//!
//! [checkout]
//! max_cart_items = 100
//! max_item_quantity = 999
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use crate::pool::DbConfig;
use storefront_core::{CartLimits, MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

// =============================================================================
// Sections
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file, or `:memory:`.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./storefront.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// `[checkout]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSettings {
    #[serde(default = "default_max_cart_items")]
    pub max_cart_items: usize,

    #[serde(default = "default_max_item_quantity")]
    pub max_item_quantity: i64,
}

fn default_max_cart_items() -> usize {
    MAX_CART_ITEMS
}

fn default_max_item_quantity() -> i64 {
    MAX_ITEM_QUANTITY
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        CheckoutSettings {
            max_cart_items: default_max_cart_items(),
            max_item_quantity: default_max_item_quantity(),
        }
    }
}

// =============================================================================
// App Configuration
// =============================================================================

/// Complete storefront configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub checkout: CheckoutSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file, when `path` is given and exists
    /// 3. `STOREFRONT_*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => {
                info!(?path, "Loading storefront config from file");
                Self::from_file(path)?
            }
            Some(path) => {
                debug!(?path, "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML file; missing sections and keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Applies `STOREFRONT_*` overrides read through `lookup`.
    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("STOREFRONT_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }
        if let Some(max) = parse_override(&lookup, "STOREFRONT_DB_MAX_CONNECTIONS")? {
            self.database.max_connections = max;
        }
        if let Some(max) = parse_override(&lookup, "STOREFRONT_MAX_CART_ITEMS")? {
            self.checkout.max_cart_items = max;
        }
        if let Some(max) = parse_override(&lookup, "STOREFRONT_MAX_ITEM_QUANTITY")? {
            self.checkout.max_item_quantity = max;
        }
        Ok(())
    }

    /// Rejects limits that would refuse every checkout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(invalid("database.max_connections", self.database.max_connections));
        }
        if self.checkout.max_cart_items == 0 {
            return Err(invalid("checkout.max_cart_items", self.checkout.max_cart_items));
        }
        if self.checkout.max_item_quantity < 1 {
            return Err(invalid("checkout.max_item_quantity", self.checkout.max_item_quantity));
        }
        Ok(())
    }

    /// Database pool settings.
    pub fn db_config(&self) -> DbConfig {
        let config = DbConfig::new(self.database.path.clone());
        if config.is_in_memory() {
            DbConfig::in_memory()
        } else {
            config.max_connections(self.database.max_connections)
        }
    }

    /// Checkout size limits.
    pub fn cart_limits(&self) -> CartLimits {
        CartLimits {
            max_cart_items: self.checkout.max_cart_items,
            max_item_quantity: self.checkout.max_item_quantity,
        }
    }
}

fn parse_override<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
    }
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.database.path, PathBuf::from("./storefront.db"));
        assert_eq!(config.cart_limits(), CartLimits::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [checkout]
            max_cart_items = 20
            "#,
        )
        .unwrap();
        assert_eq!(config.checkout.max_cart_items, 20);
        assert_eq!(config.checkout.max_item_quantity, 999);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config: AppConfig = toml::from_str("[database]\npath = \"a.db\"\n").unwrap();
        config
            .apply_overrides(env(&[
                ("STOREFRONT_DB_PATH", ":memory:"),
                ("STOREFRONT_MAX_ITEM_QUANTITY", " 10 "),
            ]))
            .unwrap();

        assert_eq!(config.checkout.max_item_quantity, 10);
        assert!(config.db_config().is_in_memory());
        assert_eq!(config.db_config().max_connections, 1);
    }

    #[test]
    fn test_bad_override_is_an_error() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(env(&[("STOREFRONT_MAX_CART_ITEMS", "lots")]))
            .unwrap_err();
        let ConfigError::InvalidValue { key, .. } = &err else {
            panic!("expected an invalid value, got {err:?}");
        };
        assert_eq!(key, "STOREFRONT_MAX_CART_ITEMS");
    }

    #[test]
    fn test_zero_limits_rejected() {
        let mut config = AppConfig::default();
        config.checkout.max_item_quantity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unreadable_file_is_an_error() {
        let err = AppConfig::from_file(Path::new("/nonexistent/storefront.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_from_file_round_trip() {
        let path = std::env::temp_dir().join(format!("storefront-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[database]\nmax_connections = 3\n").unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.database.max_connections, 3);
        assert_eq!(config.db_config().max_connections, 3);
    }
}
