//! HTTP gateway — talks to the verification backend over JSON/multipart.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::VerificationGateway;
use crate::error::GatewayError;
use crate::onboarding::model::{GatewayAck, IdentityVerification};

#[derive(Serialize)]
struct SendOtpBody<'a> {
    phone_number: &'a str,
    display_name: &'a str,
}

#[derive(Serialize)]
struct VerifyOtpBody<'a> {
    phone_number: &'a str,
    code: &'a str,
}

#[derive(Serialize)]
struct RegisterPinBody<'a> {
    pin: &'a str,
}

/// Verification backend client.
///
/// Endpoints, relative to the base URL:
/// - `POST /identity/verify` (multipart `id_image`, `selfie_image`)
/// - `POST /otp/send`
/// - `POST /otp/verify`
/// - `POST /pin/register`
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::RequestFailed {
                operation: "client_init".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a JSON body to an OTP/PIN endpoint.
    ///
    /// An error status whose body is a well-formed refusal is returned as that
    /// refusal, so the backend's message reaches the user.
    async fn post_ack<B>(
        &self,
        operation: &str,
        path: &str,
        body: &B,
    ) -> Result<GatewayAck, GatewayError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let response = self
            .execute(operation, self.client.post(self.url(path)).json(body))
            .await?;

        let status = response.status();
        if status.is_success() {
            return decode(operation, response).await;
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<GatewayAck>(&body) {
            Ok(ack) if !ack.success => {
                tracing::warn!(
                    operation,
                    status = status.as_u16(),
                    message = %ack.message,
                    "Gateway refused with error status"
                );
                Ok(ack)
            }
            _ => Err(status_error(operation, status)),
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GatewayError> {
        let response = self.execute(operation, request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(operation, status));
        }
        decode(operation, response).await
    }

    async fn execute(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, GatewayError> {
        request.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout {
                    operation: operation.to_string(),
                    timeout: self.timeout,
                }
            } else {
                GatewayError::RequestFailed {
                    operation: operation.to_string(),
                    reason: e.to_string(),
                }
            }
        })
    }
}

fn status_error(operation: &str, status: reqwest::StatusCode) -> GatewayError {
    tracing::warn!(operation, status = status.as_u16(), "Gateway returned error status");
    GatewayError::Http {
        operation: operation.to_string(),
        status: status.as_u16(),
    }
}

async fn decode<T: DeserializeOwned>(
    operation: &str,
    response: reqwest::Response,
) -> Result<T, GatewayError> {
    response
        .json::<T>()
        .await
        .map_err(|e| GatewayError::InvalidResponse {
            operation: operation.to_string(),
            reason: e.to_string(),
        })
}

#[async_trait]
impl VerificationGateway for HttpGateway {
    fn name(&self) -> &str {
        "http"
    }

    async fn verify_identity(
        &self,
        id_image: &[u8],
        selfie_image: &[u8],
    ) -> Result<IdentityVerification, GatewayError> {
        let form = Form::new()
            .part("id_image", Part::bytes(id_image.to_vec()).file_name("id.jpg"))
            .part(
                "selfie_image",
                Part::bytes(selfie_image.to_vec()).file_name("selfie.jpg"),
            );
        let request = self
            .client
            .post(self.url("/identity/verify"))
            .multipart(form);
        self.send("verify_identity", request).await
    }

    async fn send_otp(
        &self,
        phone_number: &str,
        display_name: &str,
    ) -> Result<GatewayAck, GatewayError> {
        let body = SendOtpBody {
            phone_number,
            display_name,
        };
        self.post_ack("send_otp", "/otp/send", &body).await
    }

    async fn verify_otp(
        &self,
        phone_number: &str,
        code: &str,
    ) -> Result<GatewayAck, GatewayError> {
        let body = VerifyOtpBody { phone_number, code };
        self.post_ack("verify_otp", "/otp/verify", &body).await
    }

    async fn register_pin(&self, pin: &SecretString) -> Result<GatewayAck, GatewayError> {
        let body = RegisterPinBody {
            pin: pin.expose_secret(),
        };
        self.post_ack("register_pin", "/pin/register", &body).await
    }
}
