//! SSH login monitoring
//!
//! This module turns auth log lines into operator alerts:
//! - Login extraction from sshd log lines
//! - Auth log tailing
//! - Alert message formatting
//! - Watch loop

pub mod alert_message;
pub mod auth_log;
pub mod log_watcher;
pub mod processor;

pub use auth_log::{extract, extract_from_reader, parse_line, AuthMethod, ExtractError, LoginEvent};
pub use log_watcher::AuthLogWatcher;
pub use processor::EventProcessor;
