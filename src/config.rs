//! Client configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 50;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid base URL '{0}' (expected http:// or https://)")]
    InvalidBaseUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub token_file: Option<PathBuf>,
    pub poll_interval: Duration,
    pub max_upload_bytes: u64,
    pub timeouts: Timeouts,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            token_file: default_token_file(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
            timeouts: Timeouts {
                request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            },
        }
    }
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `DOCDESK_BASE_URL`: default `http://127.0.0.1:5000`
    /// - `DOCDESK_TOKEN_FILE`: default `<config dir>/docdesk/token`
    /// - `DOCDESK_POLL_INTERVAL_MS`: default 2000
    /// - `DOCDESK_MAX_UPLOAD_MB`: default 50
    /// - `DOCDESK_REQUEST_TIMEOUT_SECS`: default 60
    /// - `DOCDESK_CONNECT_TIMEOUT_SECS`: default 10
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] but reads values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = normalize_base_url(lookup("DOCDESK_BASE_URL").as_deref().unwrap_or(DEFAULT_BASE_URL))?;
        let token_file = lookup("DOCDESK_TOKEN_FILE")
            .filter(|raw| !raw.trim().is_empty())
            .map(PathBuf::from)
            .or_else(default_token_file);
        let poll_ms = parse_or(&lookup, "DOCDESK_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS);
        let max_upload_mb = parse_or(&lookup, "DOCDESK_MAX_UPLOAD_MB", DEFAULT_MAX_UPLOAD_MB);
        let timeouts = Timeouts {
            request_secs: parse_or(&lookup, "DOCDESK_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_or(&lookup, "DOCDESK_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self {
            base_url,
            token_file,
            poll_interval: Duration::from_millis(poll_ms),
            max_upload_bytes: max_upload_mb.saturating_mul(1024 * 1024),
            timeouts,
        })
    }

    /// Replace the base URL, keeping the normalization rules.
    pub fn with_base_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.base_url = normalize_base_url(raw)?;
        Ok(self)
    }
}

fn parse_or<F>(lookup: &F, key: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

pub(crate) fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_owned())
    } else {
        Err(ConfigError::InvalidBaseUrl(raw.to_owned()))
    }
}

fn default_token_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("docdesk").join("token"))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
