//! Event channel — ordered, in-memory fan-out of onboarding events to the
//! presentation layer.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Default broadcast channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Outward-facing notification produced by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OnboardingEvent {
    /// Moved forward to a new step.
    Advanced,
    /// Moved back to the previous step.
    WentBack,
    /// An action failed; show an error toast.
    ErrorOccurred { message: String },
    /// An action succeeded; show a success toast.
    SuccessNotice { message: String },
    /// Reached the terminal step.
    Completed,
}

impl OnboardingEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::ErrorOccurred {
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::SuccessNotice {
            message: message.into(),
        }
    }
}

/// Broadcast channel for onboarding events.
///
/// Events emitted while nobody is subscribed are dropped.
#[derive(Debug, Clone)]
pub struct EventChannel {
    tx: broadcast::Sender<OnboardingEvent>,
}

impl EventChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<OnboardingEvent> {
        self.tx.subscribe()
    }

    /// Number of attached listeners.
    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub(crate) fn emit(&self, event: OnboardingEvent) {
        debug!(?event, listeners = self.tx.receiver_count(), "Emitting onboarding event");
        // Ok if no receivers are listening
        let _ = self.tx.send(event);
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
