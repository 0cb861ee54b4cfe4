//! Transport error types

use reqwest::StatusCode;
use thiserror::Error;

/// Transport failure with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Auth, message)
    }

    pub fn status(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Status, message)
    }

    pub fn stream(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Stream, message)
    }

    /// Classify a failure to send the request or receive the response head
    #[must_use]
    pub fn from_request(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::timeout(format!("Request timeout: {e}"))
        } else if e.is_connect() {
            Self::network(format!("Connection failed: {e}"))
        } else {
            Self::network(format!("Request failed: {e}"))
        }
    }

    /// Classify a failure while reading the streamed body
    #[must_use]
    pub fn from_body(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::timeout(format!("Stream timeout: {e}"))
        } else {
            Self::stream(format!("Stream interrupted: {e}"))
        }
    }

    /// Classify a non-2xx response
    #[must_use]
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let body = body.trim();
        let detail = if body.is_empty() {
            status.to_string()
        } else {
            format!("{status}: {body}")
        };
        match status.as_u16() {
            401 | 403 => Self::auth(format!("Authentication failed: {detail}")),
            _ => Self::status(format!("Backend returned {detail}")),
        }
    }
}

/// Error classification for logging and display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection refused/reset, DNS failure
    Network,
    /// Connect or read timeout reported by the HTTP client
    Timeout,
    /// Credential rejected (401, 403)
    Auth,
    /// Any other non-2xx response
    Status,
    /// The response body broke off mid-stream
    Stream,
}
