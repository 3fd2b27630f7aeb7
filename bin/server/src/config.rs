//! Centralized server configuration.
//!
//! Loaded via the `config` crate from environment variables. Nested
//! sections use `__` as separator, e.g. `SCHEDULER__WORKER_POOL_SIZE=8`.

use serde::Deserialize;
use taskhook_scheduler::SchedulerConfig;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Address the API listens on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Connection pool configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Scheduling loop configuration.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

/// Connection pool settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Upper bound on pooled connections shared by the API and the workers.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(
            config::Environment::default()
                .separator("__")
                .try_parsing(true),
        )
    }

    fn from_source<S>(source: S) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }
}
