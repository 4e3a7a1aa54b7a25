use thiserror::Error;

use crate::config::ConfigError;
use crate::monitoring::auth_log::ExtractError;

/// Crate-wide error type
///
/// Channel delivery failures never show up here: a sender reports them as a
/// `false` result after logging the detail.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("log extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("internal error: {0}")]
    InternalError(String),
}

/// Convenience constructors
impl AppError {
    pub fn internal_error(msg: impl Into<String>) -> Self {
        AppError::InternalError(msg.into())
    }

    /// Short, stable code used in structured log fields
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG",
            AppError::Io(_) => "IO",
            AppError::HttpClient(_) => "HTTP_CLIENT",
            AppError::Extract(_) => "EXTRACT",
            AppError::InternalError(_) => "INTERNAL",
        }
    }
}
