//! Configuration management for the task planner.
//!
//! Configuration can be set via environment variables:
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `5000`.
//! - `GOAL_STORE` - Optional. `sqlite` (default) or `memory`.
//! - `DATABASE_PATH` - Optional. SQLite file. Defaults to `./data/task_planner.db`.
//! - `AI_PROVIDER` - Optional. `openai`, `groq`, or `auto` (default).
//! - `OPENAI_API_KEY` / `OPENAI_MODEL` - OpenAI credentials and model (default `gpt-3.5-turbo`).
//! - `GROQ_API_KEY` / `GROQ_MODEL` - Groq credentials and model (default `llama-3.3-70b-versatile`).
//! - `DECOMPOSE_TIMEOUT_SECS` - Optional. Provider deadline. Defaults to `60`.
//! - `ENFORCE_DEPENDENCY_GATE` - Optional. Reject status moves on blocked tasks. Defaults to `false`.
//! - `DUPLICATE_TITLES` - Optional. `last_wins` (default) or `reject`.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::ai_providers::{ProviderEnv, ProviderSelection};
use crate::store::GoalStoreType;
use crate::task::DuplicateTitles;
use crate::util::{env_var_bool, env_var_trimmed};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Server configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Goal storage backend
    pub store_type: GoalStoreType,

    /// SQLite database file (ignored for the memory backend)
    pub database_path: PathBuf,

    /// Decomposition provider, or why none is usable
    pub provider: ProviderSelection,

    /// Deadline for one decomposition call
    pub decompose_timeout: Duration,

    /// Whether blocked tasks may be moved to in_progress/completed
    pub enforce_dependency_gate: bool,

    /// Handling of repeated task titles within one decomposition
    pub duplicate_titles: DuplicateTitles,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `PORT` or `DECOMPOSE_TIMEOUT_SECS`
    /// is not a number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env_var_trimmed("HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = env_var_trimmed("PORT")
            .unwrap_or_else(|| "5000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let store_type = env_var_trimmed("GOAL_STORE")
            .map(|s| GoalStoreType::from_str(&s))
            .unwrap_or_default();

        let database_path = env_var_trimmed("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/task_planner.db"));

        let timeout_secs: u64 = env_var_trimmed("DECOMPOSE_TIMEOUT_SECS")
            .unwrap_or_else(|| "60".to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("DECOMPOSE_TIMEOUT_SECS".to_string(), format!("{}", e))
            })?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "DECOMPOSE_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let duplicate_titles = env_var_trimmed("DUPLICATE_TITLES")
            .map(|s| DuplicateTitles::from_str(&s))
            .unwrap_or_default();

        Ok(Self {
            host,
            port,
            store_type,
            database_path,
            provider: ProviderSelection::resolve(&ProviderEnv::from_env()),
            decompose_timeout: Duration::from_secs(timeout_secs),
            enforce_dependency_gate: env_var_bool("ENFORCE_DEPENDENCY_GATE", false),
            duplicate_titles,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(store_type: GoalStoreType, database_path: PathBuf, provider: ProviderSelection) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            store_type,
            database_path,
            provider,
            decompose_timeout: Duration::from_secs(60),
            enforce_dependency_gate: false,
            duplicate_titles: DuplicateTitles::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test touches the process environment so nothing races on it.
    #[test]
    fn from_env_validates_numbers() {
        std::env::set_var("PORT", "not-a-port");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidValue(name, _)) if name == "PORT"
        ));

        std::env::set_var("PORT", "8080");
        std::env::set_var("DECOMPOSE_TIMEOUT_SECS", "0");
        assert!(Config::from_env().is_err());

        std::env::set_var("DECOMPOSE_TIMEOUT_SECS", "15");
        std::env::set_var("GOAL_STORE", "memory");
        std::env::set_var("DUPLICATE_TITLES", "reject");
        let config = Config::from_env().unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.decompose_timeout, Duration::from_secs(15));
        assert_eq!(config.store_type, GoalStoreType::Memory);
        assert_eq!(config.duplicate_titles, DuplicateTitles::Reject);

        for name in ["PORT", "DECOMPOSE_TIMEOUT_SECS", "GOAL_STORE", "DUPLICATE_TITLES"] {
            std::env::remove_var(name);
        }
    }

    #[test]
    fn test_constructor_uses_defaults() {
        let config = Config::new(
            GoalStoreType::Memory,
            PathBuf::from("unused.db"),
            ProviderSelection::Unconfigured {
                reason: "none".to_string(),
            },
        );
        assert_eq!(config.port, 5000);
        assert!(!config.enforce_dependency_gate);
        assert_eq!(config.duplicate_titles, DuplicateTitles::LastWins);
    }
}
