//! Connection Configuration
//!
//! Settings used when opening a DuckDB connection. Values can be built in code,
//! deserialized with serde, or read from the environment (a `.env` file is
//! honoured through dotenv).

use crate::error::{DuckPlusError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// In-memory database path understood by DuckDB.
pub const IN_MEMORY: &str = ":memory:";

pub const ENV_DATABASE: &str = "DUCK_PLUS_DATABASE";
pub const ENV_THREADS: &str = "DUCK_PLUS_THREADS";
pub const ENV_MEMORY_LIMIT: &str = "DUCK_PLUS_MEMORY_LIMIT";

lazy_static! {
    static ref MEMORY_LIMIT: Regex =
        Regex::new(r"^\d+(\.\d+)?\s*(B|KB|MB|GB|TB|KiB|MiB|GiB|TiB)$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Database path, `:memory:` for a private in-memory database
    pub database: String,

    /// Worker threads DuckDB may use (engine default when unset)
    pub threads: Option<u32>,

    /// Memory limit such as "2GB" (engine default when unset)
    pub memory_limit: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database: IN_MEMORY.to_string(),
            threads: None,
            memory_limit: None,
        }
    }
}

impl EngineConfig {
    /// Configuration for a private in-memory database.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Read the configuration from `DUCK_PLUS_*` environment variables.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = Self::default();
        if let Ok(database) = std::env::var(ENV_DATABASE) {
            config.database = database;
        }
        if let Ok(threads) = std::env::var(ENV_THREADS) {
            let threads = threads.trim().parse::<u32>().map_err(|_| {
                DuckPlusError::InvalidConfig(format!(
                    "{} must be a positive integer, got '{}'",
                    ENV_THREADS, threads
                ))
            })?;
            config.threads = Some(threads);
        }
        if let Ok(limit) = std::env::var(ENV_MEMORY_LIMIT) {
            config.memory_limit = Some(limit.trim().to_string());
        }

        config.validate()?;
        Ok(config)
    }

    pub fn is_in_memory(&self) -> bool {
        self.database == IN_MEMORY
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(DuckPlusError::InvalidConfig("database path is empty".to_string()));
        }
        if self.threads == Some(0) {
            return Err(DuckPlusError::InvalidConfig("threads must be at least 1".to_string()));
        }
        if let Some(limit) = &self.memory_limit {
            if !MEMORY_LIMIT.is_match(limit) {
                return Err(DuckPlusError::InvalidConfig(format!(
                    "unrecognized memory limit '{}'",
                    limit
                )));
            }
        }
        Ok(())
    }

    /// Translate into DuckDB's own connection options.
    pub(crate) fn to_duckdb(&self) -> Result<duckdb::Config> {
        self.validate()?;
        let mut config = duckdb::Config::default();
        if let Some(threads) = self.threads {
            config = config.threads(i64::from(threads))?;
        }
        if let Some(limit) = &self.memory_limit {
            config = config.max_memory(limit)?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_in_memory() {
        let config = EngineConfig::default();
        assert!(config.is_in_memory());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_memory_limit_validation() {
        let mut config = EngineConfig::in_memory();
        config.memory_limit = Some("512MB".to_string());
        assert!(config.validate().is_ok());

        config.memory_limit = Some("512MB'; DROP TABLE t; --".to_string());
        assert!(matches!(config.validate(), Err(DuckPlusError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_threads_rejected() {
        let config = EngineConfig { threads: Some(0), ..EngineConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"threads": 2}"#).unwrap();
        assert_eq!(config.threads, Some(2));
        assert_eq!(config.database, IN_MEMORY);
    }

    #[test]
    fn test_from_env() {
        std::env::set_var(ENV_DATABASE, "analytics.duckdb");
        std::env::set_var(ENV_THREADS, " 3 ");
        std::env::set_var(ENV_MEMORY_LIMIT, "1GB");
        let config = EngineConfig::from_env().unwrap();
        assert_eq!(config.database, "analytics.duckdb");
        assert_eq!(config.threads, Some(3));
        assert_eq!(config.memory_limit.as_deref(), Some("1GB"));
        assert!(!config.is_in_memory());

        std::env::set_var(ENV_THREADS, "many");
        let err = EngineConfig::from_env().unwrap_err();
        assert!(matches!(err, DuckPlusError::InvalidConfig(ref m) if m.contains(ENV_THREADS)));

        std::env::set_var(ENV_THREADS, "0");
        assert!(matches!(EngineConfig::from_env(), Err(DuckPlusError::InvalidConfig(_))));

        std::env::remove_var(ENV_DATABASE);
        std::env::remove_var(ENV_THREADS);
        std::env::remove_var(ENV_MEMORY_LIMIT);
        let config = EngineConfig::from_env().unwrap();
        assert!(config.is_in_memory());
        assert_eq!(config.threads, None);
        assert_eq!(config.memory_limit, None);
    }
}
