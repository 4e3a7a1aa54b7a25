//! Generic HTTP webhook channel

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder};
use tracing::{debug, info};

use super::{check_response, escape_json_string, send_with_retry, AlertChannel, ChannelKind, RetryPolicy};
use crate::config::WebhookConfig;

/// Sends alerts to an arbitrary endpoint
///
/// `GET` puts the message in the `message` query parameter, anything else
/// posts `{"message": ...}`. Any 2xx status counts as delivered.
#[derive(Debug, Clone)]
pub struct WebhookChannel {
    config: WebhookConfig,
    policy: RetryPolicy,
    client: Client,
}

impl WebhookChannel {
    pub fn new(config: WebhookConfig, policy: RetryPolicy, client: Client) -> Self {
        Self {
            config,
            policy,
            client,
        }
    }

    pub fn payload(&self, message: &str) -> String {
        format!("{{\"message\":\"{}\"}}", escape_json_string(message))
    }

    /// `url` with `message=` appended, percent-encoded per RFC 3986
    ///
    /// Only unreserved characters stay literal, so a space is `%20`, not `+`.
    pub fn query_url(&self, message: &str) -> String {
        let separator = if self.config.url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}message={}",
            self.config.url,
            separator,
            urlencoding::encode(message)
        )
    }

    fn request(&self, message: &str, payload: &str) -> RequestBuilder {
        let builder = if self.config.is_get() {
            self.client.get(self.query_url(message))
        } else {
            self.client
                .post(&self.config.url)
                .header(CONTENT_TYPE, "application/json")
                .body(payload.to_string())
        };

        match self.config.bearer_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl AlertChannel for WebhookChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Webhook
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn send(&self, message: &str) -> bool {
        if !self.is_configured() {
            debug!("Webhook not configured, skipping");
            return false;
        }

        let method = if self.config.is_get() { "GET" } else { "POST" };
        info!(method = method, url = %self.config.url, "Sending webhook alert");

        let payload = self.payload(message);

        send_with_retry(self.kind(), self.policy, || {
            let request = self.request(message, &payload);
            async move {
                let response = request.send().await?;
                check_response(response, |status| status.is_success()).await
            }
        })
        .await
    }
}
