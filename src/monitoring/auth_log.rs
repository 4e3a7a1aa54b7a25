//! SSH login extraction from auth log lines
//!
//! Recognizes successful `sshd` logins in both classic syslog
//! (`Dec 22 10:30:45 host sshd[1]: ...`) and ISO-8601
//! (`2025-12-22T09:23:25.920453+07:00 host sshd[1]: ...`) layouts.
//! Anything that does not look like a complete successful login is skipped
//! without error.

use std::collections::TryReserveError;
use std::fmt;
use std::io::BufRead;

use thiserror::Error;
use tracing::{debug, trace};

/// Longest accepted username, in bytes
pub const MAX_USERNAME_LEN: usize = 255;
/// Longest accepted source address, in bytes
pub const MAX_ADDRESS_LEN: usize = 63;
/// Longest kept timestamp, in bytes
pub const MAX_TIMESTAMP_LEN: usize = 63;
/// Longest kept raw line, in bytes
pub const MAX_RAW_LINE_LEN: usize = 1023;

const PASSWORD_MARKER: &str = "Accepted password";
const PUBLICKEY_MARKER: &str = "Accepted publickey";
const FOR_MARKER: &str = " for ";
const FROM_MARKER: &str = " from ";

/// How the user authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMethod {
    Password,
    PublicKey,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Password => "password",
            AuthMethod::PublicKey => "publickey",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One successful SSH authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginEvent {
    pub username: String,
    pub source_address: String,
    pub method: AuthMethod,
    /// Verbatim prefix of the line; empty only when it was too long to keep
    pub timestamp: String,
    /// The original line without its terminator, truncated to [`MAX_RAW_LINE_LEN`]
    pub raw_line: String,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("out of memory while collecting login events: {0}")]
    OutOfMemory(#[from] TryReserveError),
    #[error("failed to read log input: {0}")]
    Io(#[from] std::io::Error),
}

/// Parse a single log line
///
/// Returns `None` for every line that is not a complete successful login.
pub fn parse_line(line: &str) -> Option<LoginEvent> {
    let line = line.trim_end_matches(['\n', '\r']);

    let method = if line.contains(PASSWORD_MARKER) {
        AuthMethod::Password
    } else if line.contains(PUBLICKEY_MARKER) {
        AuthMethod::PublicKey
    } else {
        return None;
    };

    let after_for = &line[line.find(FOR_MARKER)? + FOR_MARKER.len()..];
    let from_idx = after_for.find(FROM_MARKER)?;
    let username = &after_for[..from_idx];
    if username.is_empty() || username.len() > MAX_USERNAME_LEN {
        trace!(len = username.len(), "Rejecting line with bad username length");
        return None;
    }

    // IPv6 literals contain no spaces, so the next space ends the address
    let after_from = &after_for[from_idx + FROM_MARKER.len()..];
    let address = &after_from[..after_from.find(' ')?];
    if address.is_empty() || address.len() > MAX_ADDRESS_LEN {
        trace!(len = address.len(), "Rejecting line with bad address length");
        return None;
    }

    Some(LoginEvent {
        username: username.to_string(),
        source_address: address.to_string(),
        method,
        timestamp: extract_timestamp(line).to_string(),
        raw_line: truncate_at_char_boundary(line, MAX_RAW_LINE_LEN).to_string(),
    })
}

/// Timestamp prefix of a line
///
/// A leading digit means ISO-8601 (up to the first space); otherwise the
/// syslog `Mon dd hh:mm:ss` layout is assumed (up to the third space).
/// An overlength result yields `""` instead of rejecting the line.
pub fn extract_timestamp(line: &str) -> &str {
    let spaces = if line.starts_with(|c: char| c.is_ascii_digit()) {
        1
    } else {
        3
    };

    let end = line
        .match_indices(' ')
        .nth(spaces - 1)
        .map(|(idx, _)| idx)
        .unwrap_or(line.len());
    let timestamp = &line[..end];
    let timestamp = timestamp.strip_suffix(' ').unwrap_or(timestamp);

    if timestamp.len() > MAX_TIMESTAMP_LEN {
        debug!(len = timestamp.len(), "Dropping overlength timestamp");
        ""
    } else {
        timestamp
    }
}

/// Extract login events from a sequence of lines, preserving input order
pub fn extract<I, S>(lines: I) -> Result<Vec<LoginEvent>, ExtractError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut events = Vec::new();
    for line in lines {
        if let Some(event) = parse_line(line.as_ref()) {
            push_event(&mut events, event)?;
        }
    }
    Ok(events)
}

/// Extract login events from a reader, one line at a time
///
/// Invalid UTF-8 is replaced rather than treated as an error; auth logs
/// routinely carry garbage usernames from scanners.
pub fn extract_from_reader<R: BufRead>(mut reader: R) -> Result<Vec<LoginEvent>, ExtractError> {
    let mut events = Vec::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        if let Some(event) = parse_line(&line) {
            push_event(&mut events, event)?;
        }
    }

    Ok(events)
}

fn push_event(events: &mut Vec<LoginEvent>, event: LoginEvent) -> Result<(), ExtractError> {
    events.try_reserve(1)?;
    events.push(event);
    Ok(())
}

pub(crate) fn truncate_at_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
