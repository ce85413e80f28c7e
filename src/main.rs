use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;

use kyc_onboarding::config::{GatewayMode, ServiceConfig};
use kyc_onboarding::onboarding::{
    EventChannel, InMemorySessionBridge, OnboardingOrchestrator, OnboardingRouteState,
    create_gateway, onboarding_routes,
};
use kyc_onboarding::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env().context("Failed to load configuration")?;

    config
        .prepare_log_dir()
        .context("Failed to create log directory")?;
    let _log_guard = telemetry::init(config.log_dir.as_deref())
        .context("Failed to initialize tracing")?;

    eprintln!("🪪 KYC Onboarding v{}", env!("CARGO_PKG_VERSION"));
    match config.gateway.mode {
        GatewayMode::Demo => eprintln!(
            "   Gateway: demo (PIN delay {}ms)",
            config.gateway.demo_pin_delay.as_millis()
        ),
        GatewayMode::Http => eprintln!(
            "   Gateway: {}",
            config.gateway.base_url.as_deref().unwrap_or_default()
        ),
    }
    eprintln!("   Gateway timeout: {}s", config.gateway.timeout.as_secs());
    eprintln!("   API: http://0.0.0.0:{}/api/onboarding/state", config.port);
    eprintln!("   WS:  ws://0.0.0.0:{}/ws/onboarding", config.port);
    if let Some(ref dir) = config.log_dir {
        eprintln!("   Logs: {}", dir.display());
    }

    // ── Onboarding ──────────────────────────────────────────────────────
    let gateway = create_gateway(&config.gateway)?;
    let session = Arc::new(InMemorySessionBridge::new());
    let orchestrator = OnboardingOrchestrator::new(
        gateway,
        session.clone(),
        EventChannel::new(config.event_capacity),
    );

    // ── Server ──────────────────────────────────────────────────────────
    let app = onboarding_routes(OnboardingRouteState::new(orchestrator))
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "Onboarding server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    if let Some(issued) = session.session().await {
        tracing::info!(session_id = %issued.session_id, "Shutting down with an issued session");
    }

    Ok(())
}
