//! Onboarding state machine — the step table and the state snapshot.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use super::model::{ErrorInfo, ExtractedIdentity};
use super::progress::{progress_fraction, step_label};

/// The steps of KYC onboarding.
///
/// Forward order: Welcome → UploadId → AddPhone → VerifyPhone → CreatePin →
/// ConfirmPin → Complete. The demo path jumps Welcome → AddPhone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Welcome,
    UploadId,
    AddPhone,
    VerifyPhone,
    CreatePin,
    ConfirmPin,
    Complete,
}

impl Step {
    /// Every step in forward order.
    pub const ALL: [Step; 7] = [
        Step::Welcome,
        Step::UploadId,
        Step::AddPhone,
        Step::VerifyPhone,
        Step::CreatePin,
        Step::ConfirmPin,
        Step::Complete,
    ];

    /// Zero-based position in the forward order.
    pub fn ordinal(&self) -> usize {
        *self as usize
    }

    /// Whether this step is terminal (onboarding is done).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// The next step in the canonical forward order, if any.
    pub fn next(&self) -> Option<Step> {
        use Step::*;
        match self {
            Welcome => Some(UploadId),
            UploadId => Some(AddPhone),
            AddPhone => Some(VerifyPhone),
            VerifyPhone => Some(CreatePin),
            CreatePin => Some(ConfirmPin),
            ConfirmPin => Some(Complete),
            Complete => None,
        }
    }

    /// Where "back" leads from this step.
    ///
    /// AddPhone returns to Welcome, not UploadId: the demo path never visits
    /// UploadId, so both entry routes share one predecessor.
    pub fn previous(&self) -> Option<Step> {
        use Step::*;
        match self {
            UploadId => Some(Welcome),
            AddPhone => Some(Welcome),
            VerifyPhone => Some(AddPhone),
            CreatePin => Some(VerifyPhone),
            ConfirmPin => Some(CreatePin),
            Welcome | Complete => None,
        }
    }
}

impl Default for Step {
    fn default() -> Self {
        Self::Welcome
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Welcome => "welcome",
            Self::UploadId => "upload_id",
            Self::AddPhone => "add_phone",
            Self::VerifyPhone => "verify_phone",
            Self::CreatePin => "create_pin",
            Self::ConfirmPin => "confirm_pin",
            Self::Complete => "complete",
        };
        write!(f, "{s}")
    }
}

/// Snapshot of everything collected so far.
///
/// Owned by the orchestrator and replaced wholesale on every transition.
/// Serializes without the pending PIN.
#[derive(Debug, Clone, Serialize)]
pub struct OnboardingState {
    pub current_step: Step,
    pub is_loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<ErrorInfo>,
    pub progress_fraction: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<ExtractedIdentity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub is_phone_verified: bool,
    #[serde(skip_serializing)]
    pub pending_pin: Option<SecretString>,
    pub is_complete: bool,
}

impl Default for OnboardingState {
    fn default() -> Self {
        Self {
            current_step: Step::Welcome,
            is_loading: false,
            last_error: None,
            progress_fraction: progress_fraction(Step::Welcome),
            identity: None,
            phone_number: None,
            is_phone_verified: false,
            pending_pin: None,
            is_complete: false,
        }
    }
}

impl OnboardingState {
    /// A copy of this state positioned at `step`, with progress and the
    /// completion flag recomputed and any error cleared.
    pub fn at_step(&self, step: Step) -> Self {
        Self {
            current_step: step,
            is_loading: false,
            last_error: None,
            progress_fraction: progress_fraction(step),
            is_complete: step.is_terminal(),
            ..self.clone()
        }
    }

    /// A copy of this state with the loading flag set and any earlier error
    /// dropped.
    pub fn loading(&self) -> Self {
        Self {
            is_loading: true,
            last_error: None,
            ..self.clone()
        }
    }

    /// A copy of this state on the same step carrying `error`.
    pub fn failed(&self, error: ErrorInfo) -> Self {
        Self {
            is_loading: false,
            last_error: Some(error),
            ..self.clone()
        }
    }

    /// Whether a PIN is waiting to be confirmed.
    pub fn has_pending_pin(&self) -> bool {
        self.pending_pin.is_some()
    }

    /// Human-readable label for the current step.
    pub fn step_label(&self) -> String {
        step_label(self.current_step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::model::ErrorKind;

    #[test]
    fn next_walks_all_steps() {
        let mut current = Step::Welcome;
        for expected in &Step::ALL[1..] {
            let next = current.next().unwrap();
            assert_eq!(next, *expected);
            current = next;
        }
        assert!(current.next().is_none());
    }

    #[test]
    fn predecessor_table_is_exact() {
        use Step::*;
        assert_eq!(UploadId.previous(), Some(Welcome));
        assert_eq!(AddPhone.previous(), Some(Welcome));
        assert_eq!(VerifyPhone.previous(), Some(AddPhone));
        assert_eq!(CreatePin.previous(), Some(VerifyPhone));
        assert_eq!(ConfirmPin.previous(), Some(CreatePin));
        assert_eq!(Welcome.previous(), None);
        assert_eq!(Complete.previous(), None);
    }

    #[test]
    fn only_complete_is_terminal() {
        for step in Step::ALL {
            assert_eq!(step.is_terminal(), step == Step::Complete, "{step}");
        }
    }

    #[test]
    fn ordinal_follows_forward_order() {
        for (i, step) in Step::ALL.iter().enumerate() {
            assert_eq!(step.ordinal(), i);
        }
    }

    #[test]
    fn display_matches_serde() {
        for step in Step::ALL {
            let display = format!("{step}");
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(format!("\"{display}\""), json, "Display and serde should match for {step:?}");
        }
    }

    #[test]
    fn default_state() {
        let state = OnboardingState::default();
        assert_eq!(state.current_step, Step::Welcome);
        assert_eq!(state.progress_fraction, 0.0);
        assert!(!state.is_loading);
        assert!(!state.is_complete);
        assert!(state.identity.is_none());
        assert!(!state.has_pending_pin());
    }

    #[test]
    fn loading_clears_previous_error() {
        let state = OnboardingState::default()
            .at_step(Step::AddPhone)
            .failed(ErrorInfo::validation("too short"));
        let loading = state.loading();
        assert!(loading.is_loading);
        assert!(loading.last_error.is_none());
        assert_eq!(loading.current_step, Step::AddPhone);
    }

    #[test]
    fn at_step_recomputes_progress_and_clears_error() {
        let state = OnboardingState {
            is_loading: true,
            ..OnboardingState::default().failed(ErrorInfo::new(ErrorKind::ValidationError, "bad"))
        };
        let moved = state.at_step(Step::VerifyPhone);
        assert_eq!(moved.current_step, Step::VerifyPhone);
        assert_eq!(moved.progress_fraction, progress_fraction(Step::VerifyPhone));
        assert!(moved.last_error.is_none());
        assert!(!moved.is_loading);
        assert!(!moved.is_complete);

        let done = moved.at_step(Step::Complete);
        assert!(done.is_complete);
        assert_eq!(done.progress_fraction, 1.0);
    }

    #[test]
    fn serialized_state_never_contains_pin() {
        let state = OnboardingState {
            pending_pin: Some(SecretString::from("4821")),
            ..OnboardingState::default().at_step(Step::ConfirmPin)
        };
        let json = serde_json::to_string(&state).unwrap();
        assert!(!json.contains("4821"));
        assert!(!json.contains("pending_pin"));
        assert!(json.contains("\"current_step\":\"confirm_pin\""));
    }
}
