use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::poller::PollerConfig;
use crate::reporter::OutputFormat;
use crate::{
    DEFAULT_BACKOFF_BASE, DEFAULT_MAX_ATTEMPTS, DEFAULT_RATE_LIMIT_PERIOD,
    DEFAULT_RATE_LIMIT_REQUESTS, DEFAULT_REQUEST_TIMEOUT, EVENTS_API_URL_ENV,
    default_allowed_prefixes,
};

/// Default config file path.
pub const CONFIG_PATH: &str = "config.toml";

/// Top-level application config deserialized from `config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
}

/// Where to poll.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Start URL. Usually left out in favour of `EVENTS_API_URL`, since it
    /// carries the access token.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_allowed_prefixes")]
    pub allowed_prefixes: Vec<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: None,
            allowed_prefixes: default_allowed_prefixes(),
        }
    }
}

/// Runtime settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsConfig {
    /// Requests allowed per rate-limit window.
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests: u32,
    #[serde(default = "default_rate_limit_period")]
    pub rate_limit_period_secs: u64,
    /// Attempts per page before server errors become fatal.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub output: OutputFormat,
}

fn default_rate_limit_requests() -> u32 {
    DEFAULT_RATE_LIMIT_REQUESTS
}

fn default_rate_limit_period() -> u64 {
    DEFAULT_RATE_LIMIT_PERIOD.as_secs()
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_backoff_base() -> u64 {
    DEFAULT_BACKOFF_BASE.as_millis() as u64
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            rate_limit_requests: default_rate_limit_requests(),
            rate_limit_period_secs: default_rate_limit_period(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base(),
            request_timeout_secs: default_request_timeout(),
            output: OutputFormat::default(),
        }
    }
}

impl SettingsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl AppConfig {
    /// Load config from the given TOML file path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Load config if the file exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Pick the start URL: explicit argument, then the `EVENTS_API_URL`
    /// environment variable, then `feed.url`.
    pub fn resolve_url(&self, explicit: Option<String>) -> Result<String> {
        let env_url = std::env::var(EVENTS_API_URL_ENV).ok();
        pick_url(explicit, env_url, self.feed.url.clone())
    }

    /// Build the poller settings for `start_url`.
    pub fn poller_config(&self, start_url: String) -> PollerConfig {
        PollerConfig {
            start_url,
            allowed_prefixes: self.feed.allowed_prefixes.clone(),
            max_attempts: self.settings.max_attempts,
            backoff_base: Duration::from_millis(self.settings.backoff_base_ms),
            rate_limit_requests: self.settings.rate_limit_requests,
            rate_limit_period: Duration::from_secs(self.settings.rate_limit_period_secs),
        }
    }
}

fn pick_url(
    explicit: Option<String>,
    env_url: Option<String>,
    file_url: Option<String>,
) -> Result<String> {
    [explicit, env_url, file_url]
        .into_iter()
        .flatten()
        .map(|u| u.trim().to_string())
        .find(|u| !u.is_empty())
        .with_context(|| {
            format!("no events URL: pass --url, set {EVENTS_API_URL_ENV}, or set feed.url")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.settings.rate_limit_requests, DEFAULT_RATE_LIMIT_REQUESTS);
        assert_eq!(config.settings.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(config.settings.output, OutputFormat::Text);
        assert_eq!(config.feed.allowed_prefixes, default_allowed_prefixes());
        assert!(config.feed.url.is_none());
    }

    #[test]
    fn partial_settings_override_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [feed]
            allowed_prefixes = ["http://localhost:8000/events/"]

            [settings]
            rate_limit_requests = 1000
            max_attempts = 3
            output = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.settings.rate_limit_requests, 1000);
        assert_eq!(config.settings.rate_limit_period_secs, 60);
        assert_eq!(config.settings.max_attempts, 3);
        assert_eq!(config.settings.output, OutputFormat::Json);

        let poller = config.poller_config("http://localhost:8000/events/x/".into());
        assert_eq!(poller.allowed_prefixes, vec!["http://localhost:8000/events/"]);
        assert_eq!(poller.max_attempts, 3);
        assert_eq!(poller.rate_limit_period, Duration::from_secs(60));
        assert_eq!(poller.backoff_base, DEFAULT_BACKOFF_BASE);
    }

    #[test]
    fn url_precedence() {
        let url = pick_url(
            Some("https://a".into()),
            Some("https://b".into()),
            Some("https://c".into()),
        )
        .unwrap();
        assert_eq!(url, "https://a");

        let url = pick_url(None, Some(" https://b ".into()), Some("https://c".into())).unwrap();
        assert_eq!(url, "https://b");

        let url = pick_url(Some("".into()), None, Some("https://c".into())).unwrap();
        assert_eq!(url, "https://c");
    }

    #[test]
    fn missing_url_is_an_error() {
        let err = pick_url(None, None, None).unwrap_err();
        assert!(err.to_string().contains(EVENTS_API_URL_ENV));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_or_default(Path::new("does/not/exist.toml")).unwrap();
        assert_eq!(config.settings.request_timeout(), DEFAULT_REQUEST_TIMEOUT);
    }
}
