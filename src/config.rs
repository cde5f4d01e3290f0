//! Scheduler and auth-endpoint configuration.

use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::Error;
use crate::token::RefreshPolicy;

const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug, serde::Deserialize)]
pub struct Config {
    /// Base URL of the auth service, e.g. `https://api.example.com`.
    pub auth_url: String,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub min_check_interval_secs: Option<u64>,
    #[serde(default)]
    pub max_check_interval_secs: Option<u64>,
    #[serde(default)]
    pub refresh_buffer_multiplier: Option<f64>,
    #[serde(default)]
    pub min_refresh_buffer_secs: Option<u64>,
    #[serde(default)]
    pub max_refresh_buffer_secs: Option<u64>,
}

fn default_refresh_path() -> String {
    DEFAULT_REFRESH_PATH.to_string()
}

impl Config {
    /// Explicit configuration with default policy bounds.
    pub fn from_values(
        auth_url: impl Into<String>,
        refresh_path: Option<String>,
        request_timeout_secs: Option<u64>,
    ) -> Self {
        Self {
            auth_url: auth_url.into(),
            refresh_path: refresh_path.unwrap_or_else(default_refresh_path),
            request_timeout_secs,
            min_check_interval_secs: None,
            max_check_interval_secs: None,
            refresh_buffer_multiplier: None,
            min_refresh_buffer_secs: None,
            max_refresh_buffer_secs: None,
        }
    }

    /// Reads a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Reads `SESSION_REFRESH_*` environment variables. Only
    /// `SESSION_REFRESH_AUTH_URL` is required.
    pub fn from_env() -> Result<Self, Error> {
        Ok(Self {
            auth_url: std::env::var("SESSION_REFRESH_AUTH_URL").map_err(|_| {
                Error::Config("Missing SESSION_REFRESH_AUTH_URL env var".to_string())
            })?,
            refresh_path: std::env::var("SESSION_REFRESH_PATH")
                .unwrap_or_else(|_| default_refresh_path()),
            request_timeout_secs: env_parse("SESSION_REFRESH_TIMEOUT_SECS")?,
            min_check_interval_secs: env_parse("SESSION_REFRESH_MIN_CHECK_SECS")?,
            max_check_interval_secs: env_parse("SESSION_REFRESH_MAX_CHECK_SECS")?,
            refresh_buffer_multiplier: env_parse("SESSION_REFRESH_BUFFER_MULTIPLIER")?,
            min_refresh_buffer_secs: env_parse("SESSION_REFRESH_MIN_BUFFER_SECS")?,
            max_refresh_buffer_secs: env_parse("SESSION_REFRESH_MAX_BUFFER_SECS")?,
        })
    }

    /// Full URL of the refresh endpoint.
    pub fn refresh_url(&self) -> String {
        let base = if self.auth_url.starts_with("http") {
            self.auth_url.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", self.auth_url.trim_end_matches('/'))
        };
        if self.refresh_path.starts_with('/') {
            format!("{}{}", base, self.refresh_path)
        } else {
            format!("{}/{}", base, self.refresh_path)
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Validated policy; unset bounds fall back to the defaults individually.
    pub fn policy(&self) -> Result<RefreshPolicy, Error> {
        let defaults = RefreshPolicy::default();
        let secs_or = |value: Option<u64>, fallback: Duration| {
            value.map(Duration::from_secs).unwrap_or(fallback)
        };
        RefreshPolicy::new(
            secs_or(self.min_check_interval_secs, defaults.min_check_interval()),
            secs_or(self.max_check_interval_secs, defaults.max_check_interval()),
            self.refresh_buffer_multiplier
                .unwrap_or(defaults.refresh_buffer_multiplier()),
            secs_or(self.min_refresh_buffer_secs, defaults.min_refresh_buffer()),
            secs_or(self.max_refresh_buffer_secs, defaults.max_refresh_buffer()),
        )
    }
}

fn env_parse<T>(name: &str) -> Result<Option<T>, Error>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("Invalid {} '{}': {}", name, raw, e))),
        Err(_) => Ok(None),
    }
}
