//! Integration tests for the onboarding WebSocket + REST surface.
//!
//! Each test spins up an Axum server on a random port backed by the demo
//! gateway, then drives it via reqwest and tokio-tungstenite.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use kyc_onboarding::onboarding::{
    DemoGateway, EventChannel, InMemorySessionBridge, OnboardingOrchestrator,
    OnboardingRouteState, onboarding_routes,
};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Start an Axum server on a random port, return (port, session bridge).
async fn start_server() -> (u16, Arc<InMemorySessionBridge>) {
    start_server_with_pin_delay(Duration::from_millis(10)).await
}

async fn start_server_with_pin_delay(pin_delay: Duration) -> (u16, Arc<InMemorySessionBridge>) {
    let session = Arc::new(InMemorySessionBridge::new());
    let orchestrator = OnboardingOrchestrator::new(
        Arc::new(DemoGateway::new(pin_delay)),
        session.clone(),
        EventChannel::default(),
    );
    let app = onboarding_routes(OnboardingRouteState::new(orchestrator));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (port, session)
}

/// POST to an onboarding endpoint and return (status, JSON body).
async fn post(port: u16, path: &str, body: Option<Value>) -> (u16, Value) {
    let client = reqwest::Client::new();
    let mut request = client.post(format!("http://127.0.0.1:{port}/api/onboarding/{path}"));
    if let Some(body) = body {
        request = request.json(&body);
    }
    let resp = request.send().await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

/// Parse a WS text frame into a serde_json::Value.
fn parse_ws_json(msg: &Message) -> Value {
    match msg {
        Message::Text(txt) => serde_json::from_str(txt).expect("invalid JSON from server"),
        other => panic!("expected Text frame, got {:?}", other),
    }
}

/// Read frames until one satisfies `pred`, returning it.
async fn next_matching<S>(ws: &mut S, pred: impl Fn(&Value) -> bool) -> Value
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = ws.next().await.unwrap().unwrap();
        let json = parse_ws_json(&msg);
        if pred(&json) {
            return json;
        }
    }
}

// ── REST Tests ───────────────────────────────────────────────────────

#[tokio::test]
async fn rest_health_endpoint() {
    timeout(TEST_TIMEOUT, async {
        let (port, _) = start_server().await;

        let resp = reqwest::get(format!("http://127.0.0.1:{port}/health"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["status"], "ok");
        assert!(json["onboarding_id"].is_string());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rest_demo_flow_reaches_complete() {
    timeout(TEST_TIMEOUT, async {
        let (port, session) = start_server().await;

        let (status, json) = post(port, "demo", None).await;
        assert_eq!(status, 200);
        assert_eq!(json["current_step"], "add_phone");

        let (_, json) = post(port, "phone", Some(json!({"phone": "+254700000000"}))).await;
        assert_eq!(json["current_step"], "verify_phone");
        assert_eq!(json["phone_number"], "+254700000000");

        let (_, json) = post(port, "otp", Some(json!({"code": "445566"}))).await;
        assert_eq!(json["current_step"], "create_pin");
        assert_eq!(json["is_phone_verified"], true);

        let (_, json) = post(port, "pin", Some(json!({"pin": "4821"}))).await;
        assert_eq!(json["current_step"], "confirm_pin");
        assert_eq!(json["has_pending_pin"], true);
        assert!(json.get("pending_pin").is_none());

        let (_, json) = post(port, "pin/confirm", Some(json!({"pin": "4821"}))).await;
        assert_eq!(json["current_step"], "complete");
        assert_eq!(json["is_complete"], true);
        assert_eq!(json["is_loading"], false);
        assert_eq!(json["progress_fraction"], 1.0);

        let issued = session.session().await.expect("session should be issued");
        assert_eq!(issued.national_id, "31234567");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rest_short_phone_is_a_validation_error() {
    timeout(TEST_TIMEOUT, async {
        let (port, _) = start_server().await;
        post(port, "demo", None).await;

        let (status, json) = post(port, "phone", Some(json!({"phone": "123"}))).await;
        assert_eq!(status, 200);
        assert_eq!(json["current_step"], "add_phone");
        assert_eq!(json["last_error"]["code"], "validation_error");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rest_back_from_add_phone_returns_to_welcome() {
    timeout(TEST_TIMEOUT, async {
        let (port, _) = start_server().await;
        post(port, "demo", None).await;

        let (_, json) = post(port, "back", None).await;
        assert_eq!(json["current_step"], "welcome");
        assert_eq!(json["progress_fraction"], 0.0);
        // Identity collected on the demo path survives going back.
        assert_eq!(json["identity"]["national_id"], "31234567");

        let resp = reqwest::get(format!("http://127.0.0.1:{port}/api/onboarding/state"))
            .await
            .unwrap();
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["current_step"], "welcome");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rest_document_upload_path() {
    timeout(TEST_TIMEOUT, async {
        let (port, _) = start_server().await;

        let (_, json) = post(port, "start", None).await;
        assert_eq!(json["current_step"], "upload_id");
        assert_eq!(json["step_label"], "Step 1 of 6");

        let (_, json) = post(
            port,
            "identity",
            Some(json!({"id_image": [], "selfie_image": [1, 2, 3]})),
        )
        .await;
        assert_eq!(json["current_step"], "upload_id");
        assert_eq!(json["last_error"]["code"], "validation_error");

        let (_, json) = post(
            port,
            "identity",
            Some(json!({"id_image": [255, 216, 255], "selfie_image": [1, 2, 3]})),
        )
        .await;
        assert_eq!(json["current_step"], "add_phone");
        assert!(json.get("last_error").is_none());
    })
    .await
    .expect("test timed out");
}

// ── WebSocket Tests ──────────────────────────────────────────────────

#[tokio::test]
async fn ws_connect_receives_initial_state() {
    timeout(TEST_TIMEOUT, async {
        let (port, _) = start_server().await;

        let (mut ws, _resp) = connect_async(format!("ws://127.0.0.1:{port}/ws/onboarding"))
            .await
            .expect("WS connect failed");

        let msg = ws.next().await.unwrap().unwrap();
        let json = parse_ws_json(&msg);

        assert_eq!(json["type"], "state");
        assert_eq!(json["state"]["current_step"], "welcome");
        assert_eq!(json["state"]["is_complete"], false);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn ws_action_emits_events_and_state() {
    timeout(TEST_TIMEOUT, async {
        let (port, _) = start_server().await;

        let (mut ws, _) = connect_async(format!("ws://127.0.0.1:{port}/ws/onboarding"))
            .await
            .unwrap();
        let _ = ws.next().await.unwrap().unwrap();

        ws.send(Message::Text(json!({"action": "start_demo"}).to_string().into()))
            .await
            .unwrap();

        let notice = next_matching(&mut ws, |j| j["type"] == "event").await;
        assert_eq!(notice["event"]["kind"], "success_notice");

        let advanced = next_matching(&mut ws, |j| j["type"] == "event").await;
        assert_eq!(advanced["event"]["kind"], "advanced");

        let resp = reqwest::get(format!("http://127.0.0.1:{port}/api/onboarding/state"))
            .await
            .unwrap();
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["current_step"], "add_phone");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn ws_receives_events_for_rest_actions() {
    timeout(TEST_TIMEOUT, async {
        let (port, _) = start_server().await;

        let (mut ws, _) = connect_async(format!("ws://127.0.0.1:{port}/ws/onboarding"))
            .await
            .unwrap();
        let _ = ws.next().await.unwrap().unwrap();

        post(port, "demo", None).await;
        post(port, "phone", Some(json!({"phone": "+254700000000"}))).await;
        post(port, "otp", Some(json!({"code": "445566"}))).await;
        post(port, "pin", Some(json!({"pin": "1234"}))).await;
        post(port, "pin/confirm", Some(json!({"pin": "5678"}))).await;

        let error = next_matching(&mut ws, |j| {
            j["type"] == "event" && j["event"]["kind"] == "error_occurred"
        })
        .await;
        assert_eq!(error["event"]["message"], "PINs do not match");

        let resp = reqwest::get(format!("http://127.0.0.1:{port}/api/onboarding/state"))
            .await
            .unwrap();
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["current_step"], "create_pin");
        assert_eq!(json["has_pending_pin"], false);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn ws_completion_event() {
    timeout(TEST_TIMEOUT, async {
        let (port, _) = start_server().await;

        let (mut ws, _) = connect_async(format!("ws://127.0.0.1:{port}/ws/onboarding"))
            .await
            .unwrap();
        let _ = ws.next().await.unwrap().unwrap();

        for action in [
            json!({"action": "start_demo"}),
            json!({"action": "submit_phone_number", "phone": "+254700000000"}),
            json!({"action": "submit_otp", "code": "445566"}),
            json!({"action": "submit_pin", "pin": "4821"}),
            json!({"action": "confirm_pin", "pin": "4821"}),
        ] {
            ws.send(Message::Text(action.to_string().into())).await.unwrap();
        }

        let completed = next_matching(&mut ws, |j| {
            j["type"] == "event" && j["event"]["kind"] == "completed"
        })
        .await;
        assert_eq!(completed["event"]["kind"], "completed");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn multiple_ws_clients_receive_events() {
    timeout(TEST_TIMEOUT, async {
        let (port, _) = start_server().await;

        let (mut ws1, _) = connect_async(format!("ws://127.0.0.1:{port}/ws/onboarding"))
            .await
            .unwrap();
        let (mut ws2, _) = connect_async(format!("ws://127.0.0.1:{port}/ws/onboarding"))
            .await
            .unwrap();
        let _ = ws1.next().await.unwrap().unwrap();
        let _ = ws2.next().await.unwrap().unwrap();

        post(port, "start", None).await;

        for ws in [&mut ws1, &mut ws2] {
            let event = next_matching(ws, |j| j["type"] == "event").await;
            assert_eq!(event["event"]["kind"], "advanced");
        }
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn ws_acting_client_sees_loading_state() {
    timeout(TEST_TIMEOUT, async {
        let (port, _) = start_server_with_pin_delay(Duration::from_millis(300)).await;

        let (mut ws, _) = connect_async(format!("ws://127.0.0.1:{port}/ws/onboarding"))
            .await
            .unwrap();
        let _ = ws.next().await.unwrap().unwrap();

        for action in [
            json!({"action": "start_demo"}),
            json!({"action": "submit_phone_number", "phone": "+254700000000"}),
            json!({"action": "submit_otp", "code": "445566"}),
            json!({"action": "submit_pin", "pin": "4821"}),
            json!({"action": "confirm_pin", "pin": "4821"}),
        ] {
            ws.send(Message::Text(action.to_string().into())).await.unwrap();
        }

        let loading = next_matching(&mut ws, |j| {
            j["type"] == "state"
                && j["state"]["current_step"] == "confirm_pin"
                && j["state"]["is_loading"] == true
        })
        .await;
        assert!(loading["state"].get("last_error").is_none());

        let done = next_matching(&mut ws, |j| {
            j["type"] == "state" && j["state"]["current_step"] == "complete"
        })
        .await;
        assert_eq!(done["state"]["is_loading"], false);
    })
    .await
    .expect("test timed out");
}
