//! Client configuration: built-in defaults, an optional `planner.toml`, then
//! `PLANNER_*` environment variables, later sources winning.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

use crate::query::{PolicyTable, RetryPolicy, SyncPolicy};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    /// Where the session token is persisted. `None` keeps it in memory.
    pub token_file: Option<PathBuf>,
    pub request_timeout_ms: u64,
    /// Retries for a failing collection read, not counting the first attempt.
    pub retry_count: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub events_refetch_interval_ms: u64,
    pub notification_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token_file: None,
            request_timeout_ms: 30_000,
            retry_count: 3,
            retry_base_delay_ms: 1_000,
            retry_max_delay_ms: 30_000,
            events_refetch_interval_ms: 5_000,
            notification_timeout_ms: 6_000,
        }
    }
}

impl ClientConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new("planner.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix("PLANNER").try_parsing(true))
            .build()?;
        config.try_deserialize()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn notification_timeout(&self) -> Duration {
        Duration::from_millis(self.notification_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry_count,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
        }
    }

    pub fn policy_table(&self) -> PolicyTable {
        let mut table = PolicyTable::default();
        table.events = SyncPolicy {
            refetch_interval: (self.events_refetch_interval_ms > 0)
                .then(|| Duration::from_millis(self.events_refetch_interval_ms)),
            ..table.events
        };
        table
    }
}
