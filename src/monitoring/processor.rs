//! Watch loop: tail the auth log and alert on every new login

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::GeneralConfig;
use crate::monitoring::alert_message::format_login_alert;
use crate::monitoring::log_watcher::AuthLogWatcher;
use crate::notification::AlertDispatcher;
use crate::utils::{AppError, HostInfo};

/// Connects the log watcher to the alert dispatcher
pub struct EventProcessor {
    /// Auth log tailer
    watcher: AuthLogWatcher,
    /// Fan-out to alert channels
    dispatcher: AlertDispatcher,
    /// Provider and description shown in each alert
    general: GeneralConfig,
    /// This machine, as shown in each alert
    host: HostInfo,
    poll_interval: Duration,
}

impl EventProcessor {
    pub fn new(
        watcher: AuthLogWatcher,
        dispatcher: AlertDispatcher,
        general: GeneralConfig,
        host: HostInfo,
    ) -> Self {
        let poll_interval = general.poll_interval();
        Self {
            watcher,
            dispatcher,
            general,
            host,
            poll_interval,
        }
    }

    /// Set the poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Poll the log once and alert for each login found
    ///
    /// Returns the number of logins handled. Events are dispatched one after
    /// another in log order.
    #[instrument(skip(self), level = "debug")]
    pub async fn process_once(&mut self) -> Result<usize, AppError> {
        let events = self.watcher.poll()?;
        if events.is_empty() {
            debug!("No new logins");
            return Ok(0);
        }

        for event in &events {
            info!(
                username = %event.username,
                source = %event.source_address,
                method = %event.method,
                "SSH login detected"
            );

            let message = format_login_alert(event, &self.general, &self.host);
            let report = self.dispatcher.dispatch(&message).await;

            if report.attempted() > 0 && report.success_count() == 0 {
                warn!(
                    username = %event.username,
                    failed = ?report.failed_channels(),
                    "Login alert was not delivered to any channel"
                );
            }
        }

        Ok(events.len())
    }

    /// Run until `cancel` fires
    ///
    /// Errors from a single poll are logged and the loop keeps going. An
    /// in-flight dispatch finishes before cancellation is observed.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            path = %self.watcher.path().display(),
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Starting auth log watch loop"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Auth log watch loop stopped");
                    break;
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            if let Err(e) = self.process_once().await {
                error!(
                    error = %e,
                    error_code = e.error_code(),
                    "Failed to process auth log"
                );
            }
        }
    }
}
