use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::notification::RetryPolicy;

/// Default number of delivery attempts per channel
pub const DEFAULT_RETRY_COUNT: u32 = 3;
/// Default pause between attempts
pub const DEFAULT_RETRY_DELAY_SECONDS: u64 = 2;
/// Default pause between two reads of the auth log
pub const DEFAULT_LOG_POLL_INTERVAL_MS: u64 = 200;
/// Default bot API endpoint
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";
/// Default generic webhook method
pub const DEFAULT_WEBHOOK_METHOD: &str = "POST";

/// Application configuration
///
/// Loaded once at startup and shared read-only afterwards.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub telegram: TelegramConfig,
    pub slack: SlackConfig,
    pub webhook: WebhookConfig,
}

/// `[general]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Auth log to watch (e.g. `/var/log/auth.log`)
    pub log_path: PathBuf,
    /// Hosting provider label shown in alerts
    pub provider: String,
    /// Free-form server description shown in alerts
    pub description: String,
    /// Attempts per channel, values <= 0 fall back to the default
    pub retry_count: i64,
    /// Seconds between attempts, values <= 0 fall back to the default
    pub retry_delay_seconds: i64,
    /// Milliseconds between log polls, values <= 0 fall back to the default
    pub log_poll_interval_ms: i64,
}

/// `[telegram]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub channel_id: String,
    /// Bot API base URL, empty means the public endpoint
    pub api_base: String,
}

/// `[slack]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    pub webhook_url: String,
    /// Optional channel override
    pub channel: String,
}

/// `[webhook]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub url: String,
    /// `GET` or `POST` (case-insensitive), anything else is sent as `POST`
    pub method: String,
    pub bearer_token: String,
}

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        !self.bot_token.is_empty() && !self.channel_id.is_empty()
    }

    pub fn api_base(&self) -> &str {
        if self.api_base.is_empty() {
            DEFAULT_TELEGRAM_API_BASE
        } else {
            self.api_base.trim_end_matches('/')
        }
    }
}

impl SlackConfig {
    pub fn is_configured(&self) -> bool {
        !self.webhook_url.is_empty()
    }

    pub fn channel_override(&self) -> Option<&str> {
        (!self.channel.is_empty()).then_some(self.channel.as_str())
    }
}

impl WebhookConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty()
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    pub fn bearer_token(&self) -> Option<&str> {
        (!self.bearer_token.is_empty()).then_some(self.bearer_token.as_str())
    }
}

impl GeneralConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        let attempts = u32::try_from(self.retry_count)
            .ok()
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_RETRY_COUNT);
        let delay = u64::try_from(self.retry_delay_seconds)
            .ok()
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_RETRY_DELAY_SECONDS);
        RetryPolicy::new(attempts, Duration::from_secs(delay))
    }

    pub fn poll_interval(&self) -> Duration {
        let ms = u64::try_from(self.log_poll_interval_ms)
            .ok()
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_LOG_POLL_INTERVAL_MS);
        Duration::from_millis(ms)
    }
}

impl AppConfig {
    /// Load configuration from a file
    ///
    /// Reads TOML, applies `PAMSIGNAL_*` environment overrides, fills in
    /// defaults and validates.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::parse(&content)?;
        config.apply_overrides(|key| env::var(key).ok());
        config.finish()
    }

    /// Parse, default and validate a TOML document without touching the environment
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content)?.finish()
    }

    fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    fn finish(mut self) -> Result<Self, ConfigError> {
        self.apply_defaults();
        self.validate()?;
        Ok(self)
    }

    /// Secrets may come from the environment instead of the file
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let targets: [(&str, &mut String); 5] = [
            ("PAMSIGNAL_TELEGRAM_BOT_TOKEN", &mut self.telegram.bot_token),
            ("PAMSIGNAL_TELEGRAM_CHANNEL_ID", &mut self.telegram.channel_id),
            ("PAMSIGNAL_SLACK_WEBHOOK_URL", &mut self.slack.webhook_url),
            ("PAMSIGNAL_WEBHOOK_URL", &mut self.webhook.url),
            ("PAMSIGNAL_WEBHOOK_BEARER_TOKEN", &mut self.webhook.bearer_token),
        ];

        for (key, slot) in targets {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                tracing::debug!(key = key, "Applying environment override");
                *slot = value.trim().to_string();
            }
        }
    }

    fn apply_defaults(&mut self) {
        if self.webhook.is_configured() && self.webhook.method.trim().is_empty() {
            self.webhook.method = DEFAULT_WEBHOOK_METHOD.to_string();
        }
        if self.general.retry_count <= 0 {
            self.general.retry_count = i64::from(DEFAULT_RETRY_COUNT);
        }
        if self.general.retry_delay_seconds <= 0 {
            self.general.retry_delay_seconds = DEFAULT_RETRY_DELAY_SECONDS as i64;
        }
        if self.general.log_poll_interval_ms <= 0 {
            self.general.log_poll_interval_ms = DEFAULT_LOG_POLL_INTERVAL_MS as i64;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.general.log_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("log_path"));
        }
        if self.general.description.is_empty() {
            return Err(ConfigError::MissingField("description"));
        }
        if self.general.provider.is_empty() {
            return Err(ConfigError::MissingField("provider"));
        }
        if !self.has_any_channel() {
            return Err(ConfigError::NoChannelConfigured);
        }
        Ok(())
    }

    pub fn has_any_channel(&self) -> bool {
        self.telegram.is_configured() || self.slack.is_configured() || self.webhook.is_configured()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("'{0}' is required in [general] section")]
    MissingField(&'static str),
    #[error(
        "At least one notification service must be configured: \
         [telegram] bot_token and channel_id, [slack] webhook_url, or [webhook] url"
    )]
    NoChannelConfigured,
}
