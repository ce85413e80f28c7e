//! KYC onboarding — identity capture, phone verification and PIN setup.
//!
//! The [`OnboardingOrchestrator`] owns an [`OnboardingState`] and moves it
//! through the [`Step`]s one user action at a time. Remote checks go through a
//! [`VerificationGateway`]; once the flow completes, the verified identity is
//! handed to a [`SessionBridge`]. Presentation clients watch state snapshots
//! and the [`EventChannel`], either in-process or through [`onboarding_routes`].

pub mod events;
pub mod gateway;
pub mod model;
pub mod orchestrator;
pub mod progress;
pub mod routes;
pub mod session;
pub mod state;
pub mod validation;

pub use events::{EventChannel, OnboardingEvent};
pub use gateway::{DemoGateway, HttpGateway, TimeoutGateway, VerificationGateway, create_gateway};
pub use model::{ErrorInfo, ErrorKind, ExtractedIdentity, GatewayAck, IdentityVerification};
pub use orchestrator::{OnboardingAction, OnboardingOrchestrator, PIN_MISMATCH_MESSAGE};
pub use progress::{progress_fraction, step_label};
pub use routes::{OnboardingRouteState, StateView, WsMessage, onboarding_routes};
pub use session::{AuthSession, InMemorySessionBridge, SessionBridge};
pub use state::{OnboardingState, Step};
