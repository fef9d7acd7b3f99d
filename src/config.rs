// src/config.rs
//! Client configuration loaded from the environment (and `.env`)

use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be a non-negative integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the analysis API, without trailing slash
    pub api_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    /// Total time budget for retrying upload/analyze; `None` means a single attempt
    pub retry_max_elapsed: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            retry_max_elapsed: None,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source; unset or blank values take defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get("TENNISLENS_API_URL") {
            config.api_url = url.trim().trim_end_matches('/').to_string();
        }

        if let Some(raw) = get("TENNISLENS_POLL_INTERVAL_MS") {
            let ms = parse_number("TENNISLENS_POLL_INTERVAL_MS", &raw)?;
            if ms == 0 {
                return Err(ConfigError::Zero { name: "TENNISLENS_POLL_INTERVAL_MS" });
            }
            config.poll_interval = Duration::from_millis(ms);
        }

        if let Some(raw) = get("TENNISLENS_REQUEST_TIMEOUT_SECS") {
            let secs = parse_number("TENNISLENS_REQUEST_TIMEOUT_SECS", &raw)?;
            if secs == 0 {
                return Err(ConfigError::Zero { name: "TENNISLENS_REQUEST_TIMEOUT_SECS" });
            }
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(raw) = get("TENNISLENS_RETRY_MAX_ELAPSED_SECS") {
            let secs = parse_number("TENNISLENS_RETRY_MAX_ELAPSED_SECS", &raw)?;
            config.retry_max_elapsed = (secs > 0).then(|| Duration::from_secs(secs));
        }

        Ok(config)
    }
}

fn parse_number(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidNumber {
        name,
        value: raw.to_string(),
    })
}
