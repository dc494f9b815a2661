//! Connection configuration.
//!
//! A [`Config`] maps connection aliases to the settings the driver needs.
//! Most applications use a single connection under
//! [`DEFAULT_CONNECTION_ALIAS`]; multi-database setups add more aliases.

use serde::Deserialize;
use std::collections::HashMap;

/// Alias used when no explicit one is given.
pub const DEFAULT_CONNECTION_ALIAS: &str = "default";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connections: HashMap<String, ConnectionSettings>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ConnectionSettings {
    /// MongoDB connection string, as accepted by the driver.
    pub uri: String,
    /// Database name. Falls back to the default database in the URI path.
    #[serde(default)]
    pub database: Option<String>,
}

impl Config {
    /// Single connection under the default alias. The database name is taken
    /// from the URI path.
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self::default().with_connection(
            DEFAULT_CONNECTION_ALIAS,
            ConnectionSettings {
                uri: uri.into(),
                database: None,
            },
        )
    }

    pub fn with_connection(
        mut self,
        alias: impl Into<String>,
        settings: ConnectionSettings,
    ) -> Self {
        self.connections.insert(alias.into(), settings);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

/// Effective-config resolution: explicitly passed config wins over the one
/// given at extension construction, which wins over the application's own.
/// Empty configs fall through to the next candidate.
pub(crate) fn resolve<'a>(
    passed: Option<&'a Config>,
    constructed: Option<&'a Config>,
    fallback: &'a Config,
) -> &'a Config {
    passed
        .filter(|config| !config.is_empty())
        .or_else(|| constructed.filter(|config| !config.is_empty()))
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::{Config, ConnectionSettings, DEFAULT_CONNECTION_ALIAS, resolve};

    fn config(uri: &str) -> Config {
        Config::from_uri(uri)
    }

    fn uri_of(config: &Config) -> &str {
        &config.connections[DEFAULT_CONNECTION_ALIAS].uri
    }

    #[test]
    fn passed_config_has_max_priority() {
        let passed = config("mongodb://passed/db");
        let constructed = config("mongodb://constructed/db");
        let app = config("mongodb://app/db");

        let resolved = resolve(Some(&passed), Some(&constructed), &app);
        assert_eq!(uri_of(resolved), "mongodb://passed/db");
    }

    #[test]
    fn constructed_config_wins_over_app_config() {
        let constructed = config("mongodb://constructed/db");
        let app = config("mongodb://app/db");

        let resolved = resolve(None, Some(&constructed), &app);
        assert_eq!(uri_of(resolved), "mongodb://constructed/db");
    }

    #[test]
    fn empty_configs_fall_through() {
        let app = config("mongodb://app/db");

        let default_config = Config::default();
        let resolved = resolve(Some(&default_config), None, &app);
        assert_eq!(uri_of(resolved), "mongodb://app/db");
    }

    #[test]
    fn deserializes_from_a_plain_mapping() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "connections": {
                "default": { "uri": "mongodb://localhost:27017", "database": "app" },
                "archive": { "uri": "mongodb://archive:27017/archive" },
            }
        }))
        .unwrap();

        assert_eq!(config.connections.len(), 2);
        assert_eq!(
            config.connections["default"].database.as_deref(),
            Some("app")
        );
        assert!(config.connections["archive"].database.is_none());
    }

    #[test]
    fn with_connection_adds_aliases() {
        let config = config("mongodb://localhost:27017/app").with_connection(
            "archive",
            ConnectionSettings {
                uri: "mongodb://archive:27017".into(),
                database: Some("archive".into()),
            },
        );
        assert_eq!(config.connections.len(), 2);
    }
}
