//! Verification gateway — the backend boundary for identity, OTP and PIN
//! checks.
//!
//! The orchestrator only sees [`VerificationGateway`]. Concrete backends:
//! - [`DemoGateway`]: canned answers for demos and local development
//! - [`HttpGateway`]: JSON/multipart client for the real backend
//!
//! [`TimeoutGateway`] wraps either one with an explicit per-call deadline.

mod demo;
mod http;

pub use demo::DemoGateway;
pub use http::HttpGateway;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;

use super::model::{GatewayAck, IdentityVerification};
use crate::config::{GatewayConfig, GatewayMode};
use crate::error::{ConfigError, GatewayError};

/// Remote verification operations used during onboarding.
///
/// A returned `Err` means the call itself failed (transport, timeout,
/// undecodable answer). A well-formed refusal comes back as
/// `Ok(GatewayAck { success: false, .. })`.
#[async_trait]
pub trait VerificationGateway: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Verify an ID document against a selfie and extract the identity.
    async fn verify_identity(
        &self,
        id_image: &[u8],
        selfie_image: &[u8],
    ) -> Result<IdentityVerification, GatewayError>;

    /// Send a one-time passcode to `phone_number`.
    async fn send_otp(
        &self,
        phone_number: &str,
        display_name: &str,
    ) -> Result<GatewayAck, GatewayError>;

    /// Check a one-time passcode for `phone_number`.
    async fn verify_otp(&self, phone_number: &str, code: &str)
    -> Result<GatewayAck, GatewayError>;

    /// Register the confirmed PIN.
    async fn register_pin(&self, pin: &SecretString) -> Result<GatewayAck, GatewayError>;
}

/// Runs every call of the inner gateway under a fixed deadline.
pub struct TimeoutGateway<G> {
    inner: G,
    timeout: Duration,
}

impl<G: VerificationGateway> TimeoutGateway<G> {
    pub fn new(inner: G, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, GatewayError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    gateway = self.inner.name(),
                    operation,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Gateway call timed out"
                );
                Err(GatewayError::Timeout {
                    operation: operation.to_string(),
                    timeout: self.timeout,
                })
            }
        }
    }
}

#[async_trait]
impl<G: VerificationGateway> VerificationGateway for TimeoutGateway<G> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn verify_identity(
        &self,
        id_image: &[u8],
        selfie_image: &[u8],
    ) -> Result<IdentityVerification, GatewayError> {
        self.bounded(
            "verify_identity",
            self.inner.verify_identity(id_image, selfie_image),
        )
        .await
    }

    async fn send_otp(
        &self,
        phone_number: &str,
        display_name: &str,
    ) -> Result<GatewayAck, GatewayError> {
        self.bounded("send_otp", self.inner.send_otp(phone_number, display_name))
            .await
    }

    async fn verify_otp(
        &self,
        phone_number: &str,
        code: &str,
    ) -> Result<GatewayAck, GatewayError> {
        self.bounded("verify_otp", self.inner.verify_otp(phone_number, code))
            .await
    }

    async fn register_pin(&self, pin: &SecretString) -> Result<GatewayAck, GatewayError> {
        self.bounded("register_pin", self.inner.register_pin(pin))
            .await
    }
}

/// Build the configured gateway, wrapped in its timeout policy.
pub fn create_gateway(config: &GatewayConfig) -> Result<Arc<dyn VerificationGateway>, ConfigError> {
    match config.mode {
        GatewayMode::Demo => {
            tracing::info!(
                pin_delay_ms = config.demo_pin_delay.as_millis() as u64,
                "Using demo verification gateway"
            );
            Ok(Arc::new(with_timeout(
                DemoGateway::new(config.demo_pin_delay),
                config.timeout,
            )))
        }
        GatewayMode::Http => {
            let base_url = config
                .base_url
                .as_deref()
                .ok_or_else(|| ConfigError::MissingRequired {
                    key: "KYC_GATEWAY_URL".to_string(),
                    hint: "HTTP gateway mode needs a backend base URL".to_string(),
                })?;
            let gateway = HttpGateway::new(base_url, config.timeout).map_err(|e| {
                ConfigError::InvalidValue {
                    key: "KYC_GATEWAY_URL".to_string(),
                    message: e.to_string(),
                }
            })?;
            tracing::info!(base_url, "Using HTTP verification gateway");
            Ok(Arc::new(with_timeout(gateway, config.timeout)))
        }
    }
}

fn with_timeout<G: VerificationGateway>(inner: G, timeout: Duration) -> TimeoutGateway<G> {
    let gateway = TimeoutGateway::new(inner, timeout);
    tracing::debug!(
        gateway = gateway.name(),
        timeout_secs = gateway.timeout().as_secs(),
        "Gateway calls are time-bounded"
    );
    gateway
}
