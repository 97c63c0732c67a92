//! Client configuration parsed from environment variables.

use crate::client::Model;
use crate::error::ErrorCode;
use crate::model::Orientation;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("config parse failed: {0}")]
    Parse(String),
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Parse(_) => "E_CONFIG_PARSE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub license_key: String,
    pub model: Model,
    pub orientation: Orientation,
    pub timeouts: Timeouts,
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `FLOWSKETCH_BASE_URL`: default `http://127.0.0.1:3000`
    /// - `FLOWSKETCH_LICENSE_KEY`: default empty
    /// - `FLOWSKETCH_MODEL`: `gpt3` (default) or `gpt4`
    /// - `FLOWSKETCH_ORIENTATION`: `TB`, `TD`, `BT`, `LR` (default) or `RL`
    /// - `FLOWSKETCH_REQUEST_TIMEOUT_SECS`: default 120
    /// - `FLOWSKETCH_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for an unknown model or orientation.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`], reading values through `lookup`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for an unknown model or orientation.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup("FLOWSKETCH_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let license_key = lookup("FLOWSKETCH_LICENSE_KEY").unwrap_or_default();
        let model = match lookup("FLOWSKETCH_MODEL") {
            Some(raw) => raw.parse::<Model>().map_err(ConfigError::Parse)?,
            None => Model::default(),
        };
        let orientation = match lookup("FLOWSKETCH_ORIENTATION") {
            Some(raw) => raw
                .parse::<Orientation>()
                .map_err(|e| ConfigError::Parse(e.to_string()))?,
            None => Orientation::default(),
        };
        let timeouts = Timeouts {
            request_secs: parse_u64(&lookup, "FLOWSKETCH_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_u64(&lookup, "FLOWSKETCH_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { base_url, license_key, model, orientation, timeouts })
    }
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    lookup(key)
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
