//! Error types for the KYC onboarding service.
//!
//! These are the errors that cross component boundaries (configuration,
//! gateway transport, session hand-off). The orchestrator itself never
//! returns them to its callers: it normalizes them into
//! [`ErrorInfo`](crate::onboarding::ErrorInfo) values held in state.

use std::time::Duration;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures talking to the verification backend.
///
/// A well-formed "rejected" answer is not an error; see
/// [`GatewayAck`](crate::onboarding::GatewayAck).
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Gateway {operation} request failed: {reason}")]
    RequestFailed { operation: String, reason: String },

    #[error("Gateway {operation} timed out after {timeout:?}")]
    Timeout {
        operation: String,
        timeout: Duration,
    },

    #[error("Invalid response from gateway {operation}: {reason}")]
    InvalidResponse { operation: String, reason: String },

    #[error("Gateway {operation} returned HTTP {status}")]
    Http { operation: String, status: u16 },
}

impl GatewayError {
    /// The gateway operation this error came from.
    pub fn operation(&self) -> &str {
        match self {
            Self::RequestFailed { operation, .. }
            | Self::Timeout { operation, .. }
            | Self::InvalidResponse { operation, .. }
            | Self::Http { operation, .. } => operation,
        }
    }
}

/// Session hand-off errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("A session has already been issued for this onboarding")]
    AlreadyIssued,
}
