//! Demo gateway — answers every call locally so the full flow can run
//! without a verification backend.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;

use super::VerificationGateway;
use crate::error::GatewayError;
use crate::onboarding::model::{ExtractedIdentity, GatewayAck, IdentityVerification};

/// Length of the codes the demo gateway accepts.
const DEMO_OTP_LEN: usize = 6;

/// Always-cooperative gateway.
///
/// Identity checks return [`ExtractedIdentity::demo`], OTPs are "sent"
/// instantly, any six-digit code verifies, and PIN registration succeeds
/// after a fixed delay.
#[derive(Debug, Clone)]
pub struct DemoGateway {
    pin_delay: Duration,
}

impl DemoGateway {
    pub fn new(pin_delay: Duration) -> Self {
        Self { pin_delay }
    }
}

impl Default for DemoGateway {
    fn default() -> Self {
        Self::new(Duration::from_millis(1500))
    }
}

#[async_trait]
impl VerificationGateway for DemoGateway {
    fn name(&self) -> &str {
        "demo"
    }

    async fn verify_identity(
        &self,
        _id_image: &[u8],
        _selfie_image: &[u8],
    ) -> Result<IdentityVerification, GatewayError> {
        Ok(IdentityVerification {
            identity: ExtractedIdentity::demo(),
            confidence_score: 100,
            auto_approved: true,
        })
    }

    async fn send_otp(
        &self,
        phone_number: &str,
        display_name: &str,
    ) -> Result<GatewayAck, GatewayError> {
        tracing::debug!(phone_number, display_name, "Demo OTP dispatched");
        Ok(GatewayAck::ok(format!("Code sent to {phone_number}")))
    }

    async fn verify_otp(
        &self,
        _phone_number: &str,
        code: &str,
    ) -> Result<GatewayAck, GatewayError> {
        if code.len() == DEMO_OTP_LEN && code.chars().all(|c| c.is_ascii_digit()) {
            Ok(GatewayAck::ok("Phone number verified"))
        } else {
            Ok(GatewayAck::rejected("Invalid verification code"))
        }
    }

    async fn register_pin(&self, _pin: &SecretString) -> Result<GatewayAck, GatewayError> {
        tokio::time::sleep(self.pin_delay).await;
        Ok(GatewayAck::ok("PIN created"))
    }
}
