//! Slack-style incoming webhook channel

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use tracing::{debug, info};

use super::{check_response, escape_json_string, send_with_retry, AlertChannel, ChannelKind, RetryPolicy};
use crate::config::SlackConfig;

#[derive(Debug, Clone)]
pub struct SlackChannel {
    config: SlackConfig,
    policy: RetryPolicy,
    client: Client,
}

impl SlackChannel {
    pub fn new(config: SlackConfig, policy: RetryPolicy, client: Client) -> Self {
        Self {
            config,
            policy,
            client,
        }
    }

    /// `{"text": ...}` plus `"channel"` when overridden
    pub fn payload(&self, message: &str) -> String {
        let text = escape_json_string(message);
        match self.config.channel_override() {
            Some(channel) => format!(
                "{{\"text\":\"{}\",\"channel\":\"{}\"}}",
                text,
                escape_json_string(channel)
            ),
            None => format!("{{\"text\":\"{}\"}}", text),
        }
    }
}

#[async_trait]
impl AlertChannel for SlackChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Slack
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn send(&self, message: &str) -> bool {
        if !self.is_configured() {
            debug!("Slack not configured, skipping");
            return false;
        }

        info!(channel_override = ?self.config.channel_override(), "Sending Slack alert");

        let payload = self.payload(message);

        send_with_retry(self.kind(), self.policy, || {
            let request = self
                .client
                .post(&self.config.webhook_url)
                .header(CONTENT_TYPE, "application/json")
                .body(payload.clone());
            async move {
                let response = request.send().await?;
                check_response(response, |status| status == StatusCode::OK).await
            }
        })
        .await
    }
}
