//! Identity, gateway result and error types shared across onboarding.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identity details read off the user's ID document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedIdentity {
    pub name: String,
    pub national_id: String,
    pub date_of_birth: NaiveDate,
}

impl ExtractedIdentity {
    /// The canned identity used by the demo path.
    pub fn demo() -> Self {
        Self {
            name: "Amina Wanjiru".to_string(),
            national_id: "31234567".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1994, 3, 17).unwrap_or_default(),
        }
    }
}

/// Result of an identity/selfie verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityVerification {
    pub identity: ExtractedIdentity,
    /// Match confidence reported by the backend, 0–100.
    pub confidence_score: i32,
    /// Whether the backend approved without manual review.
    pub auto_approved: bool,
}

/// Well-formed answer from an OTP or PIN call.
///
/// `success = false` is a normal result (e.g. wrong code), not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayAck {
    pub success: bool,
    pub message: String,
}

impl GatewayAck {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Category of a failed onboarding action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Rejected locally before any gateway call.
    ValidationError,
    /// The gateway answered with a well-formed failure.
    GatewayRejection,
    /// Network failure, timeout, or a malformed gateway answer.
    TransportError,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ValidationError => write!(f, "validation_error"),
            Self::GatewayRejection => write!(f, "gateway_rejection"),
            Self::TransportError => write!(f, "transport_error"),
        }
    }
}

/// The error shown to the user for the last failed action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorKind,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, message)
    }

    /// A rejection carrying the gateway's own message, with a fallback when
    /// the gateway sent none.
    pub fn rejection(message: &str, fallback: &str) -> Self {
        let message = if message.trim().is_empty() {
            fallback
        } else {
            message
        };
        Self::new(ErrorKind::GatewayRejection, message)
    }
}

impl From<crate::error::GatewayError> for ErrorInfo {
    fn from(err: crate::error::GatewayError) -> Self {
        Self::new(ErrorKind::TransportError, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::GatewayError;

    #[test]
    fn demo_identity_is_complete() {
        let identity = ExtractedIdentity::demo();
        assert!(!identity.name.is_empty());
        assert!(!identity.national_id.is_empty());
        assert_eq!(identity.date_of_birth, NaiveDate::from_ymd_opt(1994, 3, 17).unwrap());
    }

    #[test]
    fn identity_serde_uses_iso_dates() {
        let json = serde_json::to_value(ExtractedIdentity::demo()).unwrap();
        assert_eq!(json["date_of_birth"], "1994-03-17");
    }

    #[test]
    fn error_kind_serde() {
        let kind: ErrorKind = serde_json::from_str("\"gateway_rejection\"").unwrap();
        assert_eq!(kind, ErrorKind::GatewayRejection);
        assert_eq!(
            serde_json::to_string(&ErrorKind::TransportError).unwrap(),
            format!("\"{}\"", ErrorKind::TransportError)
        );
    }

    #[test]
    fn rejection_falls_back_on_blank_message() {
        let info = ErrorInfo::rejection("  ", "Could not send code");
        assert_eq!(info.code, ErrorKind::GatewayRejection);
        assert_eq!(info.message, "Could not send code");

        let info = ErrorInfo::rejection("blocked", "Could not send code");
        assert_eq!(info.message, "blocked");
    }

    #[test]
    fn gateway_errors_normalize_to_transport() {
        let info: ErrorInfo = GatewayError::Timeout {
            operation: "verify_otp".to_string(),
            timeout: Duration::from_secs(2),
        }
        .into();
        assert_eq!(info.code, ErrorKind::TransportError);
        assert!(info.message.contains("verify_otp"));
    }
}
