/// Alert channel integration tests
/// Telegram sendMessage, Slack incoming webhook, generic webhook (GET/POST),
/// retries and parallel dispatch

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pamsignal::config::{AppConfig, SlackConfig, TelegramConfig, WebhookConfig};
use pamsignal::notification::{
    AlertChannel, AlertDispatcher, ChannelKind, RetryPolicy, SlackChannel, TelegramChannel,
    WebhookChannel,
};

/// Retry policy with a short delay
fn fast_policy(attempts: u32) -> RetryPolicy {
    RetryPolicy::new(attempts, Duration::from_millis(10))
}

fn telegram(server: &MockServer, attempts: u32) -> TelegramChannel {
    TelegramChannel::new(
        TelegramConfig {
            bot_token: "123:abc".to_string(),
            channel_id: "-1001".to_string(),
            api_base: server.uri(),
        },
        fast_policy(attempts),
        Client::new(),
    )
}

fn slack(server: &MockServer, channel: &str) -> SlackChannel {
    SlackChannel::new(
        SlackConfig {
            webhook_url: format!("{}/services/T000/B000", server.uri()),
            channel: channel.to_string(),
        },
        fast_policy(1),
        Client::new(),
    )
}

fn webhook(server: &MockServer, http_method: &str, token: &str) -> WebhookChannel {
    WebhookChannel::new(
        WebhookConfig {
            url: format!("{}/hook", server.uri()),
            method: http_method.to_string(),
            bearer_token: token.to_string(),
        },
        fast_policy(1),
        Client::new(),
    )
}

// ============================================
// Telegram
// ============================================

#[tokio::test]
async fn should_post_message_to_telegram_bot_api() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "chat_id": "-1001", "text": "say \"hi\"" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    // Act
    let sent = telegram(&server, 3).send("say \"hi\"").await;

    // Assert
    assert!(sent);
}

#[tokio::test]
async fn should_retry_telegram_until_success() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    // Act
    let sent = telegram(&server, 3).send("hello").await;

    // Assert
    assert!(sent);
}

#[tokio::test]
async fn should_give_up_after_retry_count_attempts() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    // Act
    let sent = telegram(&server, 3).send("hello").await;

    // Assert
    assert!(!sent);
}

#[tokio::test]
async fn should_treat_non_200_success_as_failure_for_telegram() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&server)
        .await;

    assert!(!telegram(&server, 2).send("hello").await);
}

#[tokio::test]
async fn should_not_contact_server_when_telegram_not_configured() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let channel = TelegramChannel::new(
        TelegramConfig {
            bot_token: "123:abc".to_string(),
            channel_id: String::new(),
            api_base: server.uri(),
        },
        fast_policy(3),
        Client::new(),
    );

    // Act & Assert
    assert!(!channel.send("hello").await);
}

// ============================================
// Slack
// ============================================

#[tokio::test]
async fn should_post_text_to_slack_webhook() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/services/T000/B000"))
        .and(body_json(json!({ "text": "login detected" })))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    assert!(slack(&server, "").send("login detected").await);
}

#[tokio::test]
async fn should_include_channel_override_for_slack() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(json!({ "text": "login detected", "channel": "#security" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    assert!(slack(&server, "#security").send("login detected").await);
}

// ============================================
// Webhook
// ============================================

#[tokio::test]
async fn should_send_message_as_query_for_get_webhook() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hook"))
        .and(query_param("message", "root@10.0.0.1 logged in"))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    // Act
    let sent = webhook(&server, "GET", "s3cret")
        .send("root@10.0.0.1 logged in")
        .await;

    // Assert
    assert!(sent);
    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(
        requests[0].url.query(),
        Some("message=root%4010.0.0.1%20logged%20in")
    );
}

#[tokio::test]
async fn should_post_json_message_for_post_webhook() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    // Act
    let sent = webhook(&server, "POST", "s3cret").send("path C:\\tmp").await;

    // Assert
    assert!(sent);
    let requests = server.received_requests().await.expect("recording enabled");
    let body: Value = serde_json::from_slice(&requests[0].body).expect("valid json");
    assert_eq!(body, json!({ "message": "path C:\\tmp" }));
}

#[tokio::test]
async fn should_fail_webhook_on_client_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    assert!(!webhook(&server, "POST", "").send("hello").await);
}

// ============================================
// Dispatcher
// ============================================

#[tokio::test]
async fn should_dispatch_to_all_channels_in_parallel() {
    // Arrange
    let server = MockServer::start().await;
    let delay = Duration::from_millis(300);
    Mock::given(path("/bot123:abc/sendMessage"))
        .respond_with(ResponseTemplate::new(200).set_delay(delay))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/services/T000/B000"))
        .respond_with(ResponseTemplate::new(200).set_delay(delay))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/hook"))
        .respond_with(ResponseTemplate::new(500).set_delay(delay))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = AppConfig::default();
    config.general.retry_count = 1;
    config.telegram = TelegramConfig {
        bot_token: "123:abc".to_string(),
        channel_id: "-1001".to_string(),
        api_base: server.uri(),
    };
    config.slack.webhook_url = format!("{}/services/T000/B000", server.uri());
    config.webhook.url = format!("{}/hook", server.uri());
    config.webhook.method = "POST".to_string();
    let dispatcher = AlertDispatcher::from_config(&config).expect("dispatcher");
    let start = Instant::now();

    // Act
    let report = dispatcher.dispatch("hello").await;

    // Assert
    assert_eq!(report.success_count(), 2);
    assert_eq!(report.attempted(), 3);
    assert_eq!(report.failed_channels(), vec![ChannelKind::Webhook]);
    assert!(
        start.elapsed() < Duration::from_millis(800),
        "took {:?}",
        start.elapsed()
    );
}

#[tokio::test]
async fn should_report_zero_when_every_channel_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut config = AppConfig::default();
    config.general.retry_count = 1;
    config.slack.webhook_url = format!("{}/slack", server.uri());
    config.webhook.url = format!("{}/hook", server.uri());
    let dispatcher = AlertDispatcher::from_config(&config).expect("dispatcher");

    let report = dispatcher.dispatch("hello").await;

    assert_eq!(report.success_count(), 0);
    assert_eq!(report.attempted(), 2);
}

#[tokio::test]
async fn should_bound_dispatch_time_by_slowest_retry_sequence() {
    // Arrange
    let server = MockServer::start().await;
    let delay = Duration::from_millis(400);
    Mock::given(path("/bot123:abc/sendMessage"))
        .respond_with(ResponseTemplate::new(200).set_delay(delay))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/services/T000/B000"))
        .respond_with(ResponseTemplate::new(200).set_delay(delay))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/hook"))
        .respond_with(ResponseTemplate::new(500).set_delay(Duration::from_millis(100)))
        .expect(3)
        .mount(&server)
        .await;

    // Webhook: 3 x 100 ms responses + 2 x 100 ms pauses = ~500 ms
    let failing = WebhookChannel::new(
        WebhookConfig {
            url: format!("{}/hook", server.uri()),
            method: "POST".to_string(),
            bearer_token: String::new(),
        },
        RetryPolicy::new(3, Duration::from_millis(100)),
        Client::new(),
    );
    let dispatcher = AlertDispatcher::new(vec![
        Arc::new(telegram(&server, 3)) as Arc<dyn AlertChannel>,
        Arc::new(slack(&server, "")),
        Arc::new(failing),
    ]);
    let start = Instant::now();

    // Act
    let report = dispatcher.dispatch("hello").await;
    let elapsed = start.elapsed();

    // Assert
    assert_eq!(report.success_count(), 2);
    assert_eq!(report.failed_channels(), vec![ChannelKind::Webhook]);
    assert!(elapsed >= Duration::from_millis(500), "took {:?}", elapsed);
    // Sequential delivery would need ~1300 ms
    assert!(elapsed < Duration::from_millis(950), "took {:?}", elapsed);
}
