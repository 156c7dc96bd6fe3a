use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("request to {url} returned status {status}")]
    UnexpectedStatus { url: String, status: u16 },
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
    #[error("request deadline of {0:?} exceeded")]
    Timeout(Duration),
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl ExporterError {
    /// Short, stable label used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::UnexpectedStatus { .. } => "unexpected_status",
            Self::Decode { .. } => "decode",
            Self::Timeout(_) => "timeout",
            Self::Authentication(_) => "authentication",
            Self::InvalidConfig(_) => "invalid_config",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::InternalError(_) => "internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, ExporterError>;
