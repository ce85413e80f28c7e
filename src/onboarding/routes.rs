//! REST + WebSocket endpoints driving an onboarding session.

use std::future::Future;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, broadcast, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::events::{EventChannel, OnboardingEvent};
use super::orchestrator::{OnboardingAction, OnboardingOrchestrator};
use super::state::OnboardingState;

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    onboarding_id: Uuid,
    orchestrator: Arc<Mutex<OnboardingOrchestrator>>,
    states: watch::Receiver<OnboardingState>,
    events: EventChannel,
}

impl OnboardingRouteState {
    pub fn new(orchestrator: OnboardingOrchestrator) -> Self {
        let states = orchestrator.subscribe_state();
        let events = orchestrator.events().clone();
        Self {
            onboarding_id: orchestrator.onboarding_id(),
            orchestrator: Arc::new(Mutex::new(orchestrator)),
            states,
            events,
        }
    }
}

/// Snapshot as sent to clients.
#[derive(Debug, Clone, Serialize)]
pub struct StateView {
    #[serde(flatten)]
    pub state: OnboardingState,
    pub step_label: String,
    pub has_pending_pin: bool,
}

impl From<OnboardingState> for StateView {
    fn from(state: OnboardingState) -> Self {
        Self {
            step_label: state.step_label(),
            has_pending_pin: state.has_pending_pin(),
            state,
        }
    }
}

/// Server → client WebSocket frames.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    State { state: StateView },
    Event { event: OnboardingEvent },
    Busy,
}

#[derive(Deserialize)]
struct IdentityBody {
    id_image: Vec<u8>,
    selfie_image: Vec<u8>,
}

#[derive(Deserialize)]
struct PhoneBody {
    phone: String,
}

#[derive(Deserialize)]
struct OtpBody {
    code: String,
}

#[derive(Deserialize)]
struct PinBody {
    pin: String,
}

/// Build the onboarding router.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/onboarding/state", get(get_state))
        .route("/api/onboarding/start", post(start))
        .route("/api/onboarding/demo", post(start_demo))
        .route("/api/onboarding/identity", post(submit_identity))
        .route("/api/onboarding/phone", post(submit_phone))
        .route("/api/onboarding/otp", post(submit_otp))
        .route("/api/onboarding/pin", post(submit_pin))
        .route("/api/onboarding/pin/confirm", post(confirm_pin))
        .route("/api/onboarding/back", post(go_back))
        .route("/ws/onboarding", get(ws_handler))
        .with_state(state)
}

// ── REST ────────────────────────────────────────────────────────────────

async fn health(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "kyc-onboarding",
        "onboarding_id": state.onboarding_id,
    }))
}

/// GET /api/onboarding/state
async fn get_state(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    let snapshot = state.states.borrow().clone();
    Json(StateView::from(snapshot))
}

async fn start(State(state): State<OnboardingRouteState>) -> Response {
    perform(&state, OnboardingAction::StartVerification).await
}

async fn start_demo(State(state): State<OnboardingRouteState>) -> Response {
    perform(&state, OnboardingAction::StartDemo).await
}

async fn submit_identity(
    State(state): State<OnboardingRouteState>,
    Json(body): Json<IdentityBody>,
) -> Response {
    let action = OnboardingAction::SubmitIdentityDocuments {
        id_image: body.id_image,
        selfie_image: body.selfie_image,
    };
    perform(&state, action).await
}

async fn submit_phone(
    State(state): State<OnboardingRouteState>,
    Json(body): Json<PhoneBody>,
) -> Response {
    perform(&state, OnboardingAction::SubmitPhoneNumber { phone: body.phone }).await
}

async fn submit_otp(
    State(state): State<OnboardingRouteState>,
    Json(body): Json<OtpBody>,
) -> Response {
    perform(&state, OnboardingAction::SubmitOtp { code: body.code }).await
}

async fn submit_pin(
    State(state): State<OnboardingRouteState>,
    Json(body): Json<PinBody>,
) -> Response {
    perform(&state, OnboardingAction::SubmitPin { pin: body.pin }).await
}

async fn confirm_pin(
    State(state): State<OnboardingRouteState>,
    Json(body): Json<PinBody>,
) -> Response {
    perform(&state, OnboardingAction::ConfirmPin { pin: body.pin }).await
}

async fn go_back(State(state): State<OnboardingRouteState>) -> Response {
    perform(&state, OnboardingAction::GoBack).await
}

/// Run one action and answer with the resulting snapshot.
///
/// A second action while one is in flight gets `409 Conflict`.
async fn perform(state: &OnboardingRouteState, action: OnboardingAction) -> Response {
    let name = action.name();
    match run_action(state, action).await {
        Some(snapshot) => Json(StateView::from(snapshot)).into_response(),
        None => {
            warn!(action = name, "Rejected concurrent onboarding action");
            (
                StatusCode::CONFLICT,
                Json(serde_json::json!({"error": "Another onboarding action is in progress"})),
            )
                .into_response()
        }
    }
}

async fn run_action(
    state: &OnboardingRouteState,
    action: OnboardingAction,
) -> Option<OnboardingState> {
    let mut orchestrator = state.orchestrator.try_lock().ok()?;
    orchestrator.dispatch(action).await;
    Some(orchestrator.state())
}

// ── WebSocket ───────────────────────────────────────────────────────────

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<OnboardingRouteState>,
) -> impl IntoResponse {
    info!("Onboarding WebSocket client connecting");
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: OnboardingRouteState) {
    let mut states = state.states.clone();
    let mut events = state.events.subscribe();
    info!(
        onboarding_id = %state.onboarding_id,
        listeners = state.events.listener_count(),
        "Onboarding WebSocket client subscribed"
    );

    let initial = states.borrow_and_update().clone();
    if send_json(&mut socket, &WsMessage::State { state: initial.into() })
        .await
        .is_err()
    {
        warn!("Failed to send initial state, client disconnected");
        return;
    }

    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    debug!("Onboarding state channel closed");
                    break;
                }
                let snapshot = states.borrow_and_update().clone();
                if send_json(&mut socket, &WsMessage::State { state: snapshot.into() }).await.is_err() {
                    break;
                }
            }

            result = events.recv() => {
                match result {
                    Ok(event) => {
                        if send_json(&mut socket, &WsMessage::Event { event }).await.is_err() {
                            debug!("Client disconnected during send");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(missed = n, "WS client lagged behind onboarding events");
                        // Re-sync the current state
                        let snapshot = states.borrow().clone();
                        if send_json(&mut socket, &WsMessage::State { state: snapshot.into() }).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Event channel closed");
                        break;
                    }
                }
            }

            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<OnboardingAction>(&text) {
                            Ok(action) => {
                                let outcome = forward_states_during(
                                    &mut socket,
                                    &mut states,
                                    run_action(&state, action),
                                )
                                .await;
                                let sent = match outcome {
                                    Ok(Some(_)) => Ok(()),
                                    Ok(None) => send_json(&mut socket, &WsMessage::Busy).await,
                                    Err(e) => Err(e),
                                };
                                if sent.is_err() {
                                    break;
                                }
                            }
                            Err(e) => debug!(error = %e, "Unrecognized WS message from client"),
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Onboarding WebSocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!("Onboarding WebSocket connection closed");
}

/// Drive `action` to completion while still forwarding state snapshots, so
/// the acting client sees the loading state too.
async fn forward_states_during<F>(
    socket: &mut WebSocket,
    states: &mut watch::Receiver<OnboardingState>,
    action: F,
) -> Result<Option<OnboardingState>, axum::Error>
where
    F: Future<Output = Option<OnboardingState>>,
{
    tokio::pin!(action);
    loop {
        tokio::select! {
            biased;
            outcome = &mut action => return Ok(outcome),
            Ok(()) = states.changed() => {
                let snapshot = states.borrow_and_update().clone();
                send_json(socket, &WsMessage::State { state: snapshot.into() }).await?;
            }
        }
    }
}

async fn send_json(socket: &mut WebSocket, msg: &WsMessage) -> Result<(), axum::Error> {
    match serde_json::to_string(msg) {
        Ok(json) => socket.send(Message::Text(json.into())).await,
        Err(e) => {
            warn!(error = %e, "Failed to serialize WS message");
            Ok(())
        }
    }
}
