// src/core/error.rs

//! Error types shared by the orchestrator and the probe units.

use thiserror::Error;

/// Rejection of a batch request. Raised before any probe runs.
///
/// The `Display` strings are part of the wire contract: callers tell the two
/// cases apart by message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("No domains provided")]
    NoTargets,

    #[error("Maximum 5 domains allowed per batch")]
    TooManyTargets { count: usize },

    /// `position` is 1-based.
    #[error("Domain #{position} is empty")]
    BlankTarget { position: usize },
}

/// Failure raised by a single probe unit.
///
/// Never escapes the invoker; it is turned into a failed outcome in place.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("TCP Connection Error: {0}")]
    Connection(String),

    #[error("TLS Handshake Error: {0}")]
    Tls(String),

    #[error("Certificate Error: {0}")]
    Certificate(String),

    #[error("DNS Error: {0}")]
    Dns(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Could not encode probe payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Task panicked: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_are_stable() {
        assert_eq!(ValidationError::NoTargets.to_string(), "No domains provided");
        assert_eq!(
            ValidationError::TooManyTargets { count: 6 }.to_string(),
            "Maximum 5 domains allowed per batch"
        );
        assert_eq!(ValidationError::BlankTarget { position: 2 }.to_string(), "Domain #2 is empty");
    }

    #[test]
    fn probe_error_keeps_context() {
        let err = ProbeError::Connection("connection refused".into());
        assert_eq!(err.to_string(), "TCP Connection Error: connection refused");
    }
}
