//! Error taxonomy shared by the configuration store, provider client,
//! scanner, and sync engine.
//!
//! The command layer wraps these in `anyhow` for reporting; library code
//! returns them unchanged so callers can match on the kind (for example to
//! show the rate-limit reset time).

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// No usable session key stored for the provider.
    #[error("no session key for provider '{provider}' ({reason}); run 'claudesync auth login' first")]
    MissingCredential { provider: String, reason: String },

    /// HTTP 403 from the service.
    #[error("received a 403 Forbidden error; check your session key, it may have expired")]
    Forbidden,

    /// HTTP 429 from the service. `resets_at` is present when the body
    /// carried a parseable reset time.
    #[error("{}", rate_limit_message(.resets_at))]
    RateLimited { resets_at: Option<DateTime<Utc>> },

    /// Any other non-2xx response.
    #[error("API request failed with status code {status}: {body}")]
    RequestFailed { status: u16, body: String },

    /// Response body could not be decoded as expected.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Network-level failure before a response was received.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Local filesystem failure.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Missing or invalid configuration for the requested operation.
    #[error("configuration error: {0}")]
    Config(String),

    /// A lookup by identifier found nothing.
    #[error("{entity} with UUID {id} not found")]
    NotFound { entity: &'static str, id: String },
}

fn rate_limit_message(resets_at: &Option<DateTime<Utc>>) -> String {
    match resets_at {
        Some(at) => format!(
            "message limit exceeded; try again after {}",
            at.to_rfc2822()
        ),
        None => "HTTP 429: Too Many Requests; failed to parse error response".to_string(),
    }
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn missing_credential(provider: &str, reason: impl Into<String>) -> Self {
        Self::MissingCredential {
            provider: provider.to_string(),
            reason: reason.into(),
        }
    }

    /// Reset instant carried by a rate-limit error, if any.
    pub fn rate_limit_reset(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::RateLimited { resets_at } => *resets_at,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}
