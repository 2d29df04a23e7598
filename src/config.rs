//! Runtime configuration.
//!
//! Loaded from `config/default.toml`, then `config/local.toml`, then
//! `SOLVANITY__SECTION__KEY` environment variables, and handed to the
//! components that need it.

use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::matcher::{DEFAULT_SUFFIX, MAX_SUFFIX_LEN};
use crate::worker::{GrindCoordinator, GrindError, DEFAULT_MAX_ATTEMPTS};

/// Legacy variables consulted, in order, when `pool.encryption_key` is unset.
pub const ENCRYPTION_KEY_ENV: &str = "VANITY_POOL_ENCRYPTION_KEY";
pub const FALLBACK_ENCRYPTION_KEY_ENV: &str = "ENCRYPTION_KEY";

/// HTTP listener settings
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3030
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database settings
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    "sqlite://vanity_pool.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

/// Vanity pool settings
#[derive(Debug, Deserialize, Clone)]
pub struct PoolConfig {
    /// Secret the at-rest key is derived from. The pool is disabled when absent.
    #[serde(default)]
    pub encryption_key: Option<String>,
    #[serde(default = "default_suffix")]
    pub default_suffix: String,
    #[serde(default = "default_max_suffix_len")]
    pub max_suffix_len: usize,
}

fn default_suffix() -> String {
    DEFAULT_SUFFIX.to_string()
}

fn default_max_suffix_len() -> usize {
    MAX_SUFFIX_LEN
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            encryption_key: None,
            default_suffix: default_suffix(),
            max_suffix_len: default_max_suffix_len(),
        }
    }
}

/// Grind settings
#[derive(Debug, Deserialize, Clone)]
pub struct GrindConfig {
    /// Worker threads per search (default: number of CPU cores)
    #[serde(default)]
    pub workers: Option<usize>,
    /// Overall search deadline in seconds (0 = none)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Progress interval in attempts per worker (0 = silent)
    #[serde(default = "default_report_interval")]
    pub report_interval: u64,
    /// Attempt bound per worker
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u64,
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_report_interval() -> u64 {
    50_000
}

fn default_max_attempts() -> u64 {
    DEFAULT_MAX_ATTEMPTS
}

impl Default for GrindConfig {
    fn default() -> Self {
        Self {
            workers: None,
            timeout_secs: default_timeout_secs(),
            report_interval: default_report_interval(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl GrindConfig {
    /// Returns the number of workers, defaulting to CPU count
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get)
    }

    /// Returns the search deadline, if any.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Builds a coordinator from these settings.
    pub fn coordinator(&self) -> Result<GrindCoordinator, GrindError> {
        let coordinator = GrindCoordinator::new(self.worker_count())?
            .with_report_interval(self.report_interval)
            .with_max_attempts(self.max_attempts);
        Ok(match self.timeout() {
            Some(timeout) => coordinator.with_timeout(timeout),
            None => coordinator,
        })
    }
}

/// Root application configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub grind: GrindConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., SOLVANITY__POOL__ENCRYPTION_KEY, SOLVANITY__SERVER__PORT
            .add_source(
                Environment::with_prefix("SOLVANITY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: Self = config.try_deserialize()?;
        config.pool.encryption_key =
            resolve_encryption_key(config.pool.encryption_key.take(), |name| {
                std::env::var(name).ok()
            });

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool.max_suffix_len == 0 || self.pool.max_suffix_len > MAX_SUFFIX_LEN {
            return Err(ConfigError::Invalid(format!(
                "pool.max_suffix_len must be between 1 and {}",
                MAX_SUFFIX_LEN
            )));
        }

        if self.pool.default_suffix.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "pool.default_suffix cannot be empty".into(),
            ));
        }

        if self.grind.workers == Some(0) {
            return Err(ConfigError::Invalid(
                "grind.workers must be at least 1".into(),
            ));
        }

        if self.grind.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "grind.max_attempts must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

/// Picks the configured key, else the first non-blank legacy variable.
fn resolve_encryption_key(
    configured: Option<String>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    let present = |key: &String| !key.trim().is_empty();
    configured.filter(present).or_else(|| {
        [ENCRYPTION_KEY_ENV, FALLBACK_ENCRYPTION_KEY_ENV]
            .into_iter()
            .find_map(|name| lookup(name).filter(present))
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
