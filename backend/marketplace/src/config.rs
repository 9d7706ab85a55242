//! Application configuration loaded from a dotenv-style file and environment variables.

use std::time::Duration;

use crate::db::Namespace;
use crate::errors::{MarketError, Result};

/// File read when `CONFIG_FILE` is not set. Missing is tolerated; unreadable is not.
pub const DEFAULT_CONFIG_FILE: &str = "marketplace.env";

/// Which persistence collaborator backs the project store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

impl StoreBackend {
    fn parse(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(MarketError::Config(format!(
                "Invalid STORE_BACKEND {other:?} (expected sqlite or memory)"
            ))),
        }
    }
}

/// Logical database names plus the collection shared by all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseDetails {
    pub buyers_db_name: String,
    pub sellers_db_name: String,
    pub projects_db_name: String,
    pub collection_name: String,
}

impl DatabaseDetails {
    pub fn buyers(&self) -> Namespace {
        Namespace::new(&self.buyers_db_name, &self.collection_name)
    }

    pub fn sellers(&self) -> Namespace {
        Namespace::new(&self.sellers_db_name, &self.collection_name)
    }

    pub fn projects(&self) -> Namespace {
        Namespace::new(&self.projects_db_name, &self.collection_name)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database URL (e.g. sqlite:./marketplace.db)
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// Deadline applied to every store operation
    pub db_timeout_secs: u64,
    /// Maximum number of projects returned by a listing (0 means no limit)
    pub fetch_limit: u32,
    pub store_backend: StoreBackend,
    pub databases: DatabaseDetails,
}

impl Config {
    /// Load the configuration file, then read the process environment.
    ///
    /// An explicitly named `CONFIG_FILE` that cannot be loaded aborts startup.
    pub fn load() -> Result<Self> {
        load_file(std::env::var("CONFIG_FILE").ok().as_deref())?;
        Self::from_env()
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| MarketError::Config(format!("Missing env var: {key}")))
        };

        Ok(Config {
            database_url: var("DATABASE_URL", "sqlite:./marketplace.db"),
            api_port: var("API_PORT", "1234")
                .parse()
                .map_err(|_| MarketError::Config("Invalid API_PORT".to_string()))?,
            db_timeout_secs: var("DB_TIMEOUT_SECS", "60")
                .parse()
                .map_err(|_| MarketError::Config("Invalid DB_TIMEOUT_SECS".to_string()))?,
            fetch_limit: var("FETCH_LIMIT", "2147483647")
                .parse()
                .map_err(|_| MarketError::Config("Invalid FETCH_LIMIT".to_string()))?,
            store_backend: StoreBackend::parse(&var("STORE_BACKEND", "sqlite"))?,
            databases: DatabaseDetails {
                buyers_db_name: required("BUYERS_DB_NAME")?,
                sellers_db_name: required("SELLERS_DB_NAME")?,
                projects_db_name: required("PROJECTS_DB_NAME")?,
                collection_name: required("COLLECTION_NAME")?,
            },
        })
    }

    pub fn db_timeout(&self) -> Duration {
        Duration::from_secs(self.db_timeout_secs)
    }
}

/// Load `config_file` (the value of `CONFIG_FILE`), or the default file when unset.
fn load_file(config_file: Option<&str>) -> Result<()> {
    match config_file {
        Some(path) => dotenvy::from_path(path)
            .map_err(|e| MarketError::Config(format!("Cannot load config file {path}: {e}"))),
        None => match dotenvy::from_path(DEFAULT_CONFIG_FILE) {
            Err(e) if !e.not_found() => Err(MarketError::Config(format!(
                "Cannot load config file {DEFAULT_CONFIG_FILE}: {e}"
            ))),
            _ => Ok(()),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const NAMES: [(&str, &str); 4] = [
        ("BUYERS_DB_NAME", "buyersDB"),
        ("SELLERS_DB_NAME", "sellersDB"),
        ("PROJECTS_DB_NAME", "projectsDB"),
        ("COLLECTION_NAME", "bids"),
    ];

    #[test]
    fn defaults_apply_when_only_names_are_set() {
        let config = Config::from_lookup(lookup_from(&NAMES)).unwrap();
        assert_eq!(config.database_url, "sqlite:./marketplace.db");
        assert_eq!(config.api_port, 1234);
        assert_eq!(config.db_timeout(), Duration::from_secs(60));
        assert_eq!(config.fetch_limit, i32::MAX as u32);
        assert_eq!(config.store_backend, StoreBackend::Sqlite);
        assert_eq!(config.databases.projects(), Namespace::new("projectsDB", "bids"));
        assert_eq!(config.databases.buyers(), Namespace::new("buyersDB", "bids"));
        assert_eq!(config.databases.sellers(), Namespace::new("sellersDB", "bids"));
    }

    #[test]
    fn missing_logical_name_is_rejected() {
        let err = Config::from_lookup(lookup_from(&NAMES[..3])).unwrap_err();
        assert!(matches!(err, MarketError::Config(msg) if msg.contains("COLLECTION_NAME")));
    }

    #[test]
    fn invalid_port_is_rejected() {
        let mut pairs = NAMES.to_vec();
        pairs.push(("API_PORT", "not-a-port"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, MarketError::Config(msg) if msg == "Invalid API_PORT"));
    }

    #[test]
    fn unreadable_explicit_config_file_aborts() {
        let err = load_file(Some("/nonexistent/marketplace-test.env")).unwrap_err();
        assert!(matches!(err, MarketError::Config(msg) if msg.contains("marketplace-test.env")));
    }

    #[test]
    fn missing_default_config_file_is_tolerated() {
        assert!(!std::path::Path::new(DEFAULT_CONFIG_FILE).exists());
        load_file(None).unwrap();
    }

    #[test]
    fn zero_fetch_limit_is_accepted() {
        let mut pairs = NAMES.to_vec();
        pairs.push(("FETCH_LIMIT", "0"));
        assert_eq!(Config::from_lookup(lookup_from(&pairs)).unwrap().fetch_limit, 0);
    }

    #[test]
    fn store_backend_is_case_insensitive() {
        let mut pairs = NAMES.to_vec();
        pairs.push(("STORE_BACKEND", "Memory"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.store_backend, StoreBackend::Memory);

        pairs.push(("STORE_BACKEND", "mongo"));
        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());
    }
}
