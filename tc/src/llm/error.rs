//! Transport error taxonomy
//!
//! Every failure a transport can produce is a distinct variant, so the
//! channel controller can pattern-match instead of inspecting exception
//! shapes. Rate limiting and cancellation are deliberately separate from
//! the generic failures: neither is surfaced to the user as an error.

use std::time::Duration;
use thiserror::Error;

/// Errors produced by the streaming and webhook transports
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("API key is not configured")]
    MissingCredential,

    #[error("API key was rejected (401)")]
    InvalidCredential,

    #[error("rate limited (429)")]
    RateLimited,

    #[error("service unavailable ({status})")]
    ServiceUnavailable { status: u16 },

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("malformed response: {0}")]
    Protocol(String),

    #[error("server returned an empty response")]
    EmptyResponse,

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("could not reach the server")]
    NetworkUnreachable,

    #[error("request was cancelled")]
    Cancelled,

    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
}

impl ChatError {
    /// Rate limiting is recoverable and triggers backoff, never an error flag
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ChatError::RateLimited)
    }

    /// User-initiated cancellation is a clean outcome, not a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ChatError::Cancelled)
    }

    /// Classify a non-2xx chat-completions status
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => ChatError::InvalidCredential,
            429 => ChatError::RateLimited,
            s if s >= 500 => ChatError::ServiceUnavailable { status: s },
            s => ChatError::Http { status: s, body },
        }
    }

    /// Classify a fetch-level reqwest failure
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_connect() {
            ChatError::NetworkUnreachable
        } else {
            ChatError::Network(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classification() {
        assert!(matches!(ChatError::from_status(401, String::new()), ChatError::InvalidCredential));
        assert!(matches!(ChatError::from_status(429, String::new()), ChatError::RateLimited));
        assert!(matches!(
            ChatError::from_status(500, String::new()),
            ChatError::ServiceUnavailable { status: 500 }
        ));
        assert!(matches!(
            ChatError::from_status(503, String::new()),
            ChatError::ServiceUnavailable { status: 503 }
        ));

        match ChatError::from_status(418, "teapot".to_string()) {
            ChatError::Http { status, body } => {
                assert_eq!(status, 418);
                assert_eq!(body, "teapot");
            }
            other => panic!("Expected Http, got {other:?}"),
        }
    }

    #[test]
    fn test_rate_limit_predicate() {
        assert!(ChatError::RateLimited.is_rate_limited());
        assert!(!ChatError::EmptyResponse.is_rate_limited());
        assert!(!ChatError::ServiceUnavailable { status: 500 }.is_rate_limited());
    }

    #[test]
    fn test_cancelled_predicate() {
        assert!(ChatError::Cancelled.is_cancelled());
        assert!(!ChatError::Timeout(Duration::from_secs(60)).is_cancelled());
    }
}
