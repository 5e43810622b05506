//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::db::{env_parse, DbConfig, DEFAULT_DATABASE_URL};

// ============================================================================
// Import Configuration Constants
// ============================================================================

/// Default root directory holding one inbox per parser.
pub const DEFAULT_INBOX_ROOT: &str = "./inbox";

/// Default time a data set's size must stay unchanged, in seconds.
pub const DEFAULT_STABILIZATION_SECS: u64 = 10;

/// Default lifetime of unused directory size samples, in seconds (10 minutes).
pub const DEFAULT_SIZE_CACHE_EXPIRY_SECS: u64 = 600;

/// Default delay between the end of one run and the start of the next, in milliseconds.
pub const DEFAULT_RUN_DELAY_MS: u64 = 1000;

/// Default number of days without an import before the pipeline counts as overdue.
pub const DEFAULT_MAX_DAYS_BETWEEN_RUNS: i64 = 1;

/// Importer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub inbox: InboxConfig,
    pub scheduler: SchedulerConfig,
    pub database: DbConfig,
}

/// Inbox configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxConfig {
    pub root: PathBuf,
    pub stabilization_secs: u64,
    pub size_cache_expiry_secs: u64,
}

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub run_delay_ms: u64,
    pub max_days_between_runs: i64,
}

impl Config {
    /// Load configuration from `.env`, the environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            inbox: InboxConfig {
                root: std::env::var("STAMDATA_INBOX_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(DEFAULT_INBOX_ROOT)),
                stabilization_secs: env_parse("STAMDATA_STABILIZATION_SECS")
                    .unwrap_or(DEFAULT_STABILIZATION_SECS),
                size_cache_expiry_secs: env_parse("STAMDATA_SIZE_CACHE_EXPIRY_SECS")
                    .unwrap_or(DEFAULT_SIZE_CACHE_EXPIRY_SECS),
            },
            scheduler: SchedulerConfig {
                run_delay_ms: env_parse("STAMDATA_RUN_DELAY_MS").unwrap_or(DEFAULT_RUN_DELAY_MS),
                max_days_between_runs: env_parse("STAMDATA_MAX_DAYS_BETWEEN_RUNS")
                    .unwrap_or(DEFAULT_MAX_DAYS_BETWEEN_RUNS),
            },
            database: DbConfig::from_env_with_url(
                std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            ),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.inbox.root.as_os_str().is_empty() {
            anyhow::bail!("Inbox root cannot be empty");
        }

        if self.inbox.size_cache_expiry_secs == 0 {
            anyhow::bail!("Size cache expiry must be greater than 0");
        }

        if self.scheduler.run_delay_ms == 0 {
            anyhow::bail!("Run delay must be greater than 0");
        }

        if self.scheduler.max_days_between_runs < 0 {
            anyhow::bail!(
                "Max days between runs cannot be negative (got {})",
                self.scheduler.max_days_between_runs
            );
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.inbox.stabilization_secs == 0 {
            tracing::warn!(
                "Stabilization period is 0, data sets are ready on the second scan that sees them"
            );
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inbox: InboxConfig {
                root: PathBuf::from(DEFAULT_INBOX_ROOT),
                stabilization_secs: DEFAULT_STABILIZATION_SECS,
                size_cache_expiry_secs: DEFAULT_SIZE_CACHE_EXPIRY_SECS,
            },
            scheduler: SchedulerConfig {
                run_delay_ms: DEFAULT_RUN_DELAY_MS,
                max_days_between_runs: DEFAULT_MAX_DAYS_BETWEEN_RUNS,
            },
            database: DbConfig::default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 4] = [
        "STAMDATA_INBOX_ROOT",
        "STAMDATA_STABILIZATION_SECS",
        "STAMDATA_RUN_DELAY_MS",
        "DATABASE_URL",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.inbox.stabilization_secs, 10);
        assert_eq!(config.inbox.size_cache_expiry_secs, 600);
    }

    #[test]
    #[serial]
    fn test_load_reads_environment() {
        clear_env();
        std::env::set_var("STAMDATA_INBOX_ROOT", "/data/inbox");
        std::env::set_var("STAMDATA_STABILIZATION_SECS", "30");
        std::env::set_var("STAMDATA_RUN_DELAY_MS", "250");

        let config = Config::load().unwrap();
        assert_eq!(config.inbox.root, PathBuf::from("/data/inbox"));
        assert_eq!(config.inbox.stabilization_secs, 30);
        assert_eq!(config.scheduler.run_delay_ms, 250);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_load_rejects_zero_delay() {
        clear_env();
        std::env::set_var("STAMDATA_RUN_DELAY_MS", "0");

        assert!(Config::load().is_err());

        clear_env();
    }

    #[test]
    fn test_validate_rejects_bad_pool_sizes() {
        let mut config = Config::default();
        config.database.min_connections = 10;
        config.database.max_connections = 2;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("min_connections"));
    }

    #[test]
    fn test_validate_rejects_negative_threshold() {
        let mut config = Config::default();
        config.scheduler.max_days_between_runs = -1;

        assert!(config.validate().is_err());
    }
}
