//! Parallel fan-out of one alert to every configured channel

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};

use super::{
    build_http_client, AlertChannel, ChannelKind, SlackChannel, TelegramChannel, WebhookChannel,
};
use crate::config::AppConfig;
use crate::utils::AppError;

/// Outcome for one attempted channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchResult {
    pub channel: ChannelKind,
    pub success: bool,
}

/// Outcomes of one dispatch, in channel registration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub results: Vec<DispatchResult>,
}

impl DispatchReport {
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn attempted(&self) -> usize {
        self.results.len()
    }

    pub fn failed_channels(&self) -> Vec<ChannelKind> {
        self.results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.channel)
            .collect()
    }
}

/// Sends a message to all configured channels concurrently
#[derive(Clone)]
pub struct AlertDispatcher {
    channels: Vec<Arc<dyn AlertChannel>>,
}

impl AlertDispatcher {
    pub fn new(channels: Vec<Arc<dyn AlertChannel>>) -> Self {
        Self { channels }
    }

    /// Telegram, Slack and webhook channels sharing one HTTP client
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let client = build_http_client()?;
        let policy = config.general.retry_policy();

        let channels: Vec<Arc<dyn AlertChannel>> = vec![
            Arc::new(TelegramChannel::new(
                config.telegram.clone(),
                policy,
                client.clone(),
            )),
            Arc::new(SlackChannel::new(config.slack.clone(), policy, client.clone())),
            Arc::new(WebhookChannel::new(config.webhook.clone(), policy, client)),
        ];

        let dispatcher = Self::new(channels);
        info!(
            channels = ?dispatcher.configured_channels(),
            attempts = policy.attempts(),
            delay_secs = policy.delay().as_secs(),
            "Alert dispatcher initialized"
        );
        Ok(dispatcher)
    }

    pub fn configured_channels(&self) -> Vec<ChannelKind> {
        self.channels
            .iter()
            .filter(|c| c.is_configured())
            .map(|c| c.kind())
            .collect()
    }

    /// Deliver `message` through every configured channel in parallel
    ///
    /// Waits for all channels to finish. An empty message is rejected before
    /// any channel is touched. One channel failing (or panicking) never
    /// affects the others.
    #[instrument(skip_all, fields(message_len = message.len()))]
    pub async fn dispatch(&self, message: &str) -> DispatchReport {
        if message.is_empty() {
            error!("Cannot send empty message");
            return DispatchReport::default();
        }

        let message: Arc<str> = Arc::from(message);
        let mut tasks = JoinSet::new();
        let mut slots = Vec::new();

        for channel in self.channels.iter().filter(|c| c.is_configured()) {
            let slot = slots.len();
            slots.push(DispatchResult {
                channel: channel.kind(),
                success: false,
            });

            let channel = Arc::clone(channel);
            let message = Arc::clone(&message);
            tasks.spawn(async move { (slot, channel.send(&message).await) });
        }

        if slots.is_empty() {
            warn!("No alert channel configured, nothing sent");
            return DispatchReport::default();
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, success)) => slots[slot].success = success,
                Err(e) => error!(error = %e, "Alert channel task aborted"),
            }
        }

        for result in slots.iter().filter(|r| !r.success) {
            error!(channel = %result.channel, "Failed to send alert");
        }

        let report = DispatchReport { results: slots };
        info!(
            succeeded = report.success_count(),
            attempted = report.attempted(),
            "Alerts sent to {}/{} service(s)",
            report.success_count(),
            report.attempted()
        );
        report
    }
}
