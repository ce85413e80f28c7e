//! OnboardingOrchestrator — the only component allowed to advance, rewind or
//! fail the onboarding state.
//!
//! Each user action maps to one method. A method:
//! 1. Checks that the flow is on the step the action belongs to.
//! 2. Validates input locally.
//! 3. Publishes a loading snapshot and awaits the gateway, if needed.
//! 4. Publishes the next snapshot (whole, never field by field).
//! 5. Emits events for the presentation layer.
//!
//! Failures never escape a method. They land in `last_error` and are emitted
//! as [`OnboardingEvent::ErrorOccurred`].

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::events::{EventChannel, OnboardingEvent};
use super::gateway::VerificationGateway;
use super::model::{ErrorInfo, ExtractedIdentity};
use super::session::SessionBridge;
use super::state::{OnboardingState, Step};
use super::validation::{validate_documents, validate_otp, validate_phone, validate_pin};

/// Message emitted when the confirming PIN differs from the first entry.
pub const PIN_MISMATCH_MESSAGE: &str = "PINs do not match";

/// A user action, as sent by a presentation client.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OnboardingAction {
    StartVerification,
    StartDemo,
    SubmitIdentityDocuments {
        id_image: Vec<u8>,
        selfie_image: Vec<u8>,
    },
    SubmitPhoneNumber {
        phone: String,
    },
    SubmitOtp {
        code: String,
    },
    SubmitPin {
        pin: String,
    },
    ConfirmPin {
        pin: String,
    },
    GoBack,
}

impl OnboardingAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartVerification => "start_verification",
            Self::StartDemo => "start_demo",
            Self::SubmitIdentityDocuments { .. } => "submit_identity_documents",
            Self::SubmitPhoneNumber { .. } => "submit_phone_number",
            Self::SubmitOtp { .. } => "submit_otp",
            Self::SubmitPin { .. } => "submit_pin",
            Self::ConfirmPin { .. } => "confirm_pin",
            Self::GoBack => "go_back",
        }
    }
}

// Payloads may carry a PIN or document bytes; only the name is printed.
impl std::fmt::Debug for OnboardingAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnboardingAction")
            .field("action", &self.name())
            .finish_non_exhaustive()
    }
}

/// Drives one user through KYC onboarding.
///
/// Operations take `&mut self`: one action at a time per instance. Observers
/// use [`subscribe_state`](Self::subscribe_state) and
/// [`events`](Self::events), which need no access to the orchestrator.
pub struct OnboardingOrchestrator {
    onboarding_id: Uuid,
    gateway: Arc<dyn VerificationGateway>,
    session: Arc<dyn SessionBridge>,
    events: EventChannel,
    state_tx: watch::Sender<OnboardingState>,
}

impl OnboardingOrchestrator {
    /// Start a fresh onboarding at `Welcome`.
    pub fn new(
        gateway: Arc<dyn VerificationGateway>,
        session: Arc<dyn SessionBridge>,
        events: EventChannel,
    ) -> Self {
        let (state_tx, _rx) = watch::channel(OnboardingState::default());
        let onboarding_id = Uuid::new_v4();
        info!(%onboarding_id, gateway = gateway.name(), "Onboarding started");
        Self {
            onboarding_id,
            gateway,
            session,
            events,
            state_tx,
        }
    }

    pub fn onboarding_id(&self) -> Uuid {
        self.onboarding_id
    }

    /// The current snapshot.
    pub fn state(&self) -> OnboardingState {
        self.state_tx.borrow().clone()
    }

    /// Receive every published snapshot from now on.
    pub fn subscribe_state(&self) -> watch::Receiver<OnboardingState> {
        self.state_tx.subscribe()
    }

    pub fn events(&self) -> &EventChannel {
        &self.events
    }

    /// Run the operation matching `action`.
    pub async fn dispatch(&mut self, action: OnboardingAction) {
        debug!(onboarding_id = %self.onboarding_id, action = action.name(), "Dispatching action");
        match action {
            OnboardingAction::StartVerification => self.start_verification().await,
            OnboardingAction::StartDemo => self.start_demo().await,
            OnboardingAction::SubmitIdentityDocuments {
                id_image,
                selfie_image,
            } => {
                self.submit_identity_documents(&id_image, &selfie_image)
                    .await
            }
            OnboardingAction::SubmitPhoneNumber { phone } => self.submit_phone_number(&phone).await,
            OnboardingAction::SubmitOtp { code } => self.submit_otp(&code).await,
            OnboardingAction::SubmitPin { pin } => self.submit_pin(&pin).await,
            OnboardingAction::ConfirmPin { pin } => self.confirm_pin(&pin).await,
            OnboardingAction::GoBack => self.go_back().await,
        }
    }

    // ── Operations ──────────────────────────────────────────────────────

    /// Leave the welcome screen for document capture.
    pub async fn start_verification(&mut self) {
        let Some(current) = self.require_step("start_verification", Step::Welcome) else {
            return;
        };
        let next = current.at_step(Step::UploadId);
        self.advance(&current, next, None);
    }

    /// Skip document capture with a canned identity.
    pub async fn start_demo(&mut self) {
        let Some(current) = self.require_step("start_demo", Step::Welcome) else {
            return;
        };
        let next = OnboardingState {
            identity: Some(ExtractedIdentity::demo()),
            ..current.at_step(Step::AddPhone)
        };
        self.advance(&current, next, Some("Demo identity loaded".to_string()));
    }

    pub async fn submit_identity_documents(&mut self, id_image: &[u8], selfie_image: &[u8]) {
        let Some(current) = self.require_step("submit_identity_documents", Step::UploadId) else {
            return;
        };
        if let Err(error) = validate_documents(id_image, selfie_image) {
            self.reject(&current, error);
            return;
        }

        self.begin_call(&current, "verify_identity");
        match self.gateway.verify_identity(id_image, selfie_image).await {
            Ok(verification) => {
                info!(
                    onboarding_id = %self.onboarding_id,
                    confidence = verification.confidence_score,
                    auto_approved = verification.auto_approved,
                    "Identity verified"
                );
                let next = OnboardingState {
                    identity: Some(verification.identity),
                    ..current.at_step(Step::AddPhone)
                };
                self.advance(&current, next, Some("Identity verified".to_string()));
            }
            Err(e) => self.reject(&current, e.into()),
        }
    }

    pub async fn submit_phone_number(&mut self, phone: &str) {
        let Some(current) = self.require_step("submit_phone_number", Step::AddPhone) else {
            return;
        };
        let phone = match validate_phone(phone) {
            Ok(phone) => phone,
            Err(error) => {
                self.reject(&current, error);
                return;
            }
        };
        let Some(display_name) = current.identity.as_ref().map(|i| i.name.clone()) else {
            self.reject(&current, ErrorInfo::validation("Verify your identity first"));
            return;
        };

        self.begin_call(&current, "send_otp");
        match self.gateway.send_otp(phone, &display_name).await {
            Ok(ack) if ack.success => {
                let same_number = current.phone_number.as_deref() == Some(phone);
                let next = OnboardingState {
                    phone_number: Some(phone.to_string()),
                    is_phone_verified: current.is_phone_verified && same_number,
                    ..current.at_step(Step::VerifyPhone)
                };
                let notice = non_blank_or(&ack.message, "Verification code sent");
                self.advance(&current, next, Some(notice));
            }
            Ok(ack) => self.reject(
                &current,
                ErrorInfo::rejection(&ack.message, "Could not send verification code"),
            ),
            Err(e) => self.reject(&current, e.into()),
        }
    }

    pub async fn submit_otp(&mut self, code: &str) {
        let Some(current) = self.require_step("submit_otp", Step::VerifyPhone) else {
            return;
        };
        let Some(phone) = current.phone_number.clone() else {
            self.reject(&current, ErrorInfo::validation("Add your phone number first"));
            return;
        };
        let code = match validate_otp(code) {
            Ok(code) => code,
            Err(error) => {
                self.reject(&current, error);
                return;
            }
        };

        self.begin_call(&current, "verify_otp");
        match self.gateway.verify_otp(&phone, code).await {
            Ok(ack) if ack.success => {
                let next = OnboardingState {
                    is_phone_verified: true,
                    ..current.at_step(Step::CreatePin)
                };
                let notice = non_blank_or(&ack.message, "Phone number verified");
                self.advance(&current, next, Some(notice));
            }
            Ok(ack) => self.reject(
                &current,
                ErrorInfo::rejection(&ack.message, "Invalid verification code"),
            ),
            Err(e) => self.reject(&current, e.into()),
        }
    }

    pub async fn submit_pin(&mut self, pin: &str) {
        let Some(current) = self.require_step("submit_pin", Step::CreatePin) else {
            return;
        };
        if let Err(error) = validate_pin(pin) {
            self.reject(&current, error);
            return;
        }
        let next = OnboardingState {
            pending_pin: Some(SecretString::from(pin)),
            ..current.at_step(Step::ConfirmPin)
        };
        self.advance(&current, next, None);
    }

    /// Confirm the PIN and, if it matches, register it and finish.
    ///
    /// A mismatch drops the pending PIN and returns to `CreatePin`, since
    /// there is nothing left to confirm against.
    pub async fn confirm_pin(&mut self, pin: &str) {
        let Some(current) = self.require_step("confirm_pin", Step::ConfirmPin) else {
            return;
        };

        let Some(pending) = current.pending_pin.clone() else {
            let next = current.at_step(Step::CreatePin);
            self.reject(&next, ErrorInfo::validation("Create your PIN first"));
            return;
        };

        if pin != pending.expose_secret() {
            warn!(onboarding_id = %self.onboarding_id, "PIN confirmation mismatch");
            let next = OnboardingState {
                pending_pin: None,
                ..current.at_step(Step::CreatePin)
            };
            self.reject(&next, ErrorInfo::validation(PIN_MISMATCH_MESSAGE));
            return;
        }

        let identity = match (&current.identity, current.is_phone_verified) {
            (Some(identity), true) => identity.clone(),
            _ => {
                warn!(
                    onboarding_id = %self.onboarding_id,
                    has_identity = current.identity.is_some(),
                    phone_verified = current.is_phone_verified,
                    "Refusing to complete onboarding with unmet gates"
                );
                self.reject(
                    &current,
                    ErrorInfo::validation("Identity and phone verification are required"),
                );
                return;
            }
        };

        self.begin_call(&current, "register_pin");
        match self.gateway.register_pin(&pending).await {
            Ok(ack) if ack.success => {
                let next = OnboardingState {
                    pending_pin: None,
                    ..current.at_step(Step::Complete)
                };
                self.advance(&current, next, None);
                self.session.on_onboarding_complete(&identity).await;
            }
            Ok(ack) => self.reject(
                &current,
                ErrorInfo::rejection(&ack.message, "Could not create your PIN"),
            ),
            Err(e) => self.reject(&current, e.into()),
        }
    }

    /// Step back per [`Step::previous`]. No-op on `Welcome` and `Complete`.
    pub async fn go_back(&mut self) {
        let current = self.state();
        let Some(previous) = current.current_step.previous() else {
            debug!(
                onboarding_id = %self.onboarding_id,
                step = %current.current_step,
                "No previous step"
            );
            return;
        };

        let mut next = current.at_step(previous);
        if current.current_step == Step::ConfirmPin {
            next.pending_pin = None;
        }

        info!(
            onboarding_id = %self.onboarding_id,
            from = %current.current_step,
            to = %previous,
            "Onboarding went back"
        );
        self.publish(next);
        self.events.emit(OnboardingEvent::WentBack);
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn require_step(&self, operation: &str, expected: Step) -> Option<OnboardingState> {
        let current = self.state();
        if current.current_step == expected {
            Some(current)
        } else {
            warn!(
                onboarding_id = %self.onboarding_id,
                operation,
                step = %current.current_step,
                expected = %expected,
                "Ignoring action for a different step"
            );
            None
        }
    }

    fn begin_call(&self, current: &OnboardingState, operation: &str) {
        debug!(
            onboarding_id = %self.onboarding_id,
            gateway = self.gateway.name(),
            operation,
            "Calling verification gateway"
        );
        self.publish(current.loading());
    }

    fn advance(&self, current: &OnboardingState, next: OnboardingState, notice: Option<String>) {
        let to = next.current_step;
        info!(
            onboarding_id = %self.onboarding_id,
            from = %current.current_step,
            to = %to,
            progress = next.progress_fraction,
            "Onboarding advanced"
        );
        self.publish(next);

        if let Some(message) = notice {
            self.events.emit(OnboardingEvent::success(message));
        }
        if to.is_terminal() {
            self.events.emit(OnboardingEvent::Completed);
        } else {
            self.events.emit(OnboardingEvent::Advanced);
        }
    }

    fn reject(&self, state: &OnboardingState, error: ErrorInfo) {
        warn!(
            onboarding_id = %self.onboarding_id,
            step = %state.current_step,
            code = %error.code,
            message = %error.message,
            "Onboarding action failed"
        );
        let message = error.message.clone();
        self.publish(state.failed(error));
        self.events.emit(OnboardingEvent::error(message));
    }

    fn publish(&self, next: OnboardingState) {
        debug!(
            onboarding_id = %self.onboarding_id,
            step = %next.current_step,
            loading = next.is_loading,
            "Publishing onboarding state"
        );
        self.state_tx.send_replace(next);
    }
}

fn non_blank_or(message: &str, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message.to_string()
    }
}
