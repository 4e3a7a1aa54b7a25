//! Telegram bot API channel

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use tracing::{debug, info};

use super::{check_response, escape_json_string, send_with_retry, AlertChannel, ChannelKind, RetryPolicy};
use crate::config::TelegramConfig;

/// Posts alerts to a chat through `sendMessage`
#[derive(Debug, Clone)]
pub struct TelegramChannel {
    config: TelegramConfig,
    policy: RetryPolicy,
    client: Client,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig, policy: RetryPolicy, client: Client) -> Self {
        Self {
            config,
            policy,
            client,
        }
    }

    /// `{api_base}/bot{token}/sendMessage`
    pub fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_base(),
            self.config.bot_token
        )
    }

    /// JSON body for `message`
    pub fn payload(&self, message: &str) -> String {
        format!(
            "{{\"chat_id\":\"{}\",\"text\":\"{}\"}}",
            escape_json_string(&self.config.channel_id),
            escape_json_string(message)
        )
    }
}

#[async_trait]
impl AlertChannel for TelegramChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Telegram
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn send(&self, message: &str) -> bool {
        if !self.is_configured() {
            debug!("Telegram not configured, skipping");
            return false;
        }

        info!(channel_id = %self.config.channel_id, "Sending Telegram alert");

        let url = self.endpoint();
        let payload = self.payload(message);

        send_with_retry(self.kind(), self.policy, || {
            let request = self
                .client
                .post(&url)
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
