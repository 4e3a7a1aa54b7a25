//! Operator-facing text for a login alert
//!
//! Messages are a single line: the channel payloads only escape quotes and
//! backslashes, so control characters (newlines included) must never reach
//! them.

use chrono::Local;

use crate::config::GeneralConfig;
use crate::monitoring::auth_log::LoginEvent;
use crate::utils::HostInfo;

/// Build the alert text for one login
pub fn format_login_alert(event: &LoginEvent, general: &GeneralConfig, host: &HostInfo) -> String {
    let time = if event.timestamp.is_empty() {
        Local::now().format("%Y-%m-%d %H:%M:%S %z").to_string()
    } else {
        event.timestamp.clone()
    };

    let text = format!(
        "[PAMSignal] SSH login: user={} from={} method={} time={} | host={} ({}) | provider={} | {}",
        event.username,
        event.source_address,
        event.method,
        time,
        host.hostname,
        host.addresses_display(),
        general.provider,
        general.description,
    );
    sanitize(&text)
}

/// Test message sent by `--test-alert`
pub fn format_test_alert(general: &GeneralConfig, host: &HostInfo) -> String {
    sanitize(&format!(
        "[PAMSignal] Test alert from host={} ({}) | provider={} | {}",
        host.hostname,
        host.addresses_display(),
        general.provider,
        general.description,
    ))
}

fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}
