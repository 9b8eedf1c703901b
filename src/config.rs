// src/config.rs

use std::{env, path::PathBuf, str::FromStr, time::Duration};
use thiserror::Error;

use crate::{catalog::DatasetCatalog, error::CatalogError};

pub const ENV_TIMEOUT_SECS: &str = "VITI_TIMEOUT_SECS";
pub const ENV_CATALOG: &str = "VITI_CATALOG";
pub const ENV_RAW_DIR: &str = "VITI_RAW_DIR";
pub const ENV_MAX_RETRIES: &str = "VITI_MAX_RETRIES";
pub const ENV_RETRY_BACKOFF_MS: &str = "VITI_RETRY_BACKOFF_MS";
pub const ENV_CONCURRENCY: &str = "VITI_CONCURRENCY";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}={value:?} is not a valid value")]
    Invalid { var: &'static str, value: String },
}

/// Caller-side retry policy. Backoff doubles after every failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub const NONE: RetryPolicy = RetryPolicy {
        max_retries: 0,
        initial_backoff: Duration::from_millis(500),
    };

    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::NONE
    }
}

/// Process settings, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub timeout: Duration,
    /// YAML catalog replacing the built-in datasets.
    pub catalog_path: Option<PathBuf>,
    /// Where raw payloads are snapshotted; `None` disables snapshots.
    pub raw_dir: Option<PathBuf>,
    pub retry: RetryPolicy,
    /// In-flight fetches when running every dataset.
    pub concurrency: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            catalog_path: None,
            raw_dir: None,
            retry: RetryPolicy::default(),
            concurrency: 3,
        }
    }
}

fn parse_var<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.to_string(),
    })
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup. Unset or blank
    /// variables keep their defaults.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut settings = Settings::default();

        if let Some(v) = get(ENV_TIMEOUT_SECS) {
            let secs: u64 = parse_var(ENV_TIMEOUT_SECS, &v)?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    var: ENV_TIMEOUT_SECS,
                    value: v,
                });
            }
            settings.timeout = Duration::from_secs(secs);
        }
        settings.catalog_path = get(ENV_CATALOG).map(PathBuf::from);
        settings.raw_dir = get(ENV_RAW_DIR).map(PathBuf::from);
        if let Some(v) = get(ENV_MAX_RETRIES) {
            settings.retry.max_retries = parse_var(ENV_MAX_RETRIES, &v)?;
        }
        if let Some(v) = get(ENV_RETRY_BACKOFF_MS) {
            settings.retry.initial_backoff =
                Duration::from_millis(parse_var(ENV_RETRY_BACKOFF_MS, &v)?);
        }
        if let Some(v) = get(ENV_CONCURRENCY) {
            let n: usize = parse_var(ENV_CONCURRENCY, &v)?;
            if n == 0 {
                return Err(ConfigError::Invalid {
                    var: ENV_CONCURRENCY,
                    value: v,
                });
            }
            settings.concurrency = n;
        }

        Ok(settings)
    }

    /// The catalog file if one is configured, otherwise the built-in one.
    pub fn load_catalog(&self) -> Result<DatasetCatalog, CatalogError> {
        match &self.catalog_path {
            Some(path) => DatasetCatalog::from_yaml_file(path),
            None => Ok(DatasetCatalog::builtin()),
        }
    }
}
