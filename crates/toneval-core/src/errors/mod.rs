//! Error types for the LLM client, call executor and experiment driver.

use serde::{Deserialize, Serialize};

/// Errors raised while obtaining a completion.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Required credential is not configured. Fatal, never retried.
    #[error("missing required environment variable: {var}")]
    MissingCredential { var: String },

    /// Provider answered 429.
    #[error("rate limited by provider (status {status}): {message}")]
    RateLimited { status: u16, message: String },

    /// Request timed out (client side or 408 from the provider).
    #[error("provider timeout: {message}")]
    Timeout { message: String },

    /// Provider answered 5xx.
    #[error("provider error (status {status}): {message}")]
    Server { status: u16, message: String },

    /// Connection, DNS or body transfer failure.
    #[error("network error: {message}")]
    Network { message: String },

    /// Provider rejected the request (4xx other than 408/429).
    #[error("provider rejected request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The durable cache log could not be written.
    #[error("cache error: {message}")]
    Cache { message: String },
}

impl LlmError {
    /// Whether the call executor may retry this error.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout { .. } | Self::Server { .. } | Self::Network { .. }
        )
    }

    /// Whether no request can ever succeed after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingCredential { .. })
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCredential { .. } => ErrorKind::MissingConfig,
            Self::RateLimited { .. } => ErrorKind::ProviderRateLimit,
            Self::Timeout { .. } => ErrorKind::ProviderTimeout,
            Self::Server { .. } => ErrorKind::ProviderServer,
            Self::Network { .. } => ErrorKind::Network,
            Self::Rejected { .. } => ErrorKind::ProviderRejected,
            Self::Cache { .. } => ErrorKind::CacheIo,
        }
    }

    /// Map an HTTP status (non-2xx) to an error.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            408 => Self::Timeout { message },
            429 => Self::RateLimited { status, message },
            500..=599 => Self::Server { status, message },
            _ => Self::Rejected { status, message },
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                message: err.to_string(),
            }
        } else {
            Self::Network {
                message: err.to_string(),
            }
        }
    }
}

/// Stable classification written into failed condition records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingConfig,
    ProviderRateLimit,
    ProviderTimeout,
    ProviderServer,
    Network,
    ProviderRejected,
    CacheIo,
    Other,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingConfig => "missing_config",
            Self::ProviderRateLimit => "provider_rate_limit",
            Self::ProviderTimeout => "provider_timeout",
            Self::ProviderServer => "provider_server",
            Self::Network => "network",
            Self::ProviderRejected => "provider_rejected",
            Self::CacheIo => "cache_io",
            Self::Other => "other",
        }
    }

    /// Classify an error that crossed an `anyhow` boundary.
    pub fn of(err: &anyhow::Error) -> Self {
        err.downcast_ref::<LlmError>()
            .map(LlmError::kind)
            .unwrap_or(Self::Other)
    }
}

/// Resolve a required credential from the environment.
pub fn require_env(var: &str) -> Result<String, LlmError> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(LlmError::MissingCredential {
            var: var.to_string(),
        }),
    }
}
