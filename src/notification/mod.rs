//! Alert delivery channels
//!
//! Each channel turns one message into one outbound HTTP request and applies
//! the shared retry policy:
//! - Telegram bot API
//! - Slack-style incoming webhook
//! - Generic HTTP webhook (GET or POST)
//!
//! [`AlertDispatcher`] fans a message out to every configured channel.

pub mod dispatcher;
pub mod slack;
pub mod telegram;
pub mod webhook;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use thiserror::Error;
use tracing::{error, info, warn};

pub use dispatcher::{AlertDispatcher, DispatchReport, DispatchResult};
pub use slack::SlackChannel;
pub use telegram::TelegramChannel;
pub use webhook::WebhookChannel;

/// Timeout for a single HTTP attempt, independent of the retry budget
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Escaped message bodies never grow past this many bytes
pub const MAX_ESCAPED_LEN: usize = 4095;

/// Identifies a delivery channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Telegram,
    Slack,
    Webhook,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Telegram => "telegram",
            ChannelKind::Slack => "slack",
            ChannelKind::Webhook => "webhook",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single way of getting a message to operators
#[async_trait]
pub trait AlertChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// Whether all required fields for this channel are set
    fn is_configured(&self) -> bool;

    /// Deliver `message`, retrying per policy
    ///
    /// Returns `false` without any network activity when the channel is not
    /// configured.
    async fn send(&self, message: &str) -> bool;
}

/// Fixed-delay retry budget shared by all channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// `attempts` is clamped to at least 1
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// Why one delivery attempt failed
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("endpoint returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// HTTP client shared by every channel
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder().timeout(REQUEST_TIMEOUT).build()
}

/// Minimal JSON string escaping
///
/// Only `"` and `\` are escaped. The result is truncated to
/// [`MAX_ESCAPED_LEN`] bytes without splitting an escape pair or a char.
pub fn escape_json_string(input: &str) -> String {
    let mut out = String::with_capacity(input.len().min(MAX_ESCAPED_LEN));
    for c in input.chars() {
        let needs_escape = c == '"' || c == '\\';
        let width = c.len_utf8() + usize::from(needs_escape);
        if out.len() + width > MAX_ESCAPED_LEN {
            break;
        }
        if needs_escape {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Turn a response into `Ok` when `accept` likes its status
///
/// The body of a rejected response is kept for the log.
pub(crate) async fn check_response(
    response: Response,
    accept: impl Fn(StatusCode) -> bool,
) -> Result<StatusCode, DeliveryError> {
    let status = response.status();
    if accept(status) {
        return Ok(status);
    }
    let body = response.text().await.unwrap_or_default();
    Err(DeliveryError::Status { status, body })
}

/// Run `attempt` until it succeeds or the policy is exhausted
pub(crate) async fn send_with_retry<F, Fut>(
    kind: ChannelKind,
    policy: RetryPolicy,
    mut attempt: F,
) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<StatusCode, DeliveryError>>,
{
    let max_attempts = policy.attempts();

    for n in 1..=max_attempts {
        if n > 1 {
            info!(
                channel = %kind,
                attempt = n,
                max_attempts = max_attempts,
                delay_secs = policy.delay().as_secs_f64(),
                "Retrying alert delivery"
            );
            tokio::time::sleep(policy.delay()).await;
        }

        match attempt().await {
            Ok(status) => {
                info!(channel = %kind, attempt = n, status = %status, "Alert sent successfully");
                return true;
            }
            Err(DeliveryError::Status { status, body }) => {
                warn!(
                    channel = %kind,
                    attempt = n,
                    status = %status,
                    body = %body,
                    "Alert endpoint returned error status"
                );
            }
            Err(e) => {
                warn!(channel = %kind, attempt = n, error = %e, "Alert request failed");
            }
        }
    }

    error!(channel = %kind, attempts = max_attempts, "Failed to deliver alert after all attempts");
    false
}
