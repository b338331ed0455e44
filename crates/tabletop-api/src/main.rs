//! Tabletop API server entry point.

use std::sync::Arc;

use tabletop_api::config::Settings;
use tabletop_api::error::AppError;
use tabletop_api::state::AppState;
use tabletop_api::telemetry;
use tabletop_core::clock::SystemClock;
use tabletop_voting::application::expiry::ExpirySweeper;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let settings = Settings::from_env()?;
    let telemetry = telemetry::init(settings.otlp_endpoint.as_deref())?;

    tracing::info!("Starting Tabletop API server");

    let state = AppState::in_memory(settings.voting.clone(), Arc::new(SystemClock));

    let shutdown = CancellationToken::new();
    let sweeper = tokio::spawn(
        ExpirySweeper::new(state.coordinator.clone(), settings.sweep_interval)
            .run(shutdown.clone()),
    );

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = tabletop_api::app(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let address = settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(%address, "listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        tracing::warn!(error = %e, "expiry sweeper did not stop cleanly");
    }
    tracing::info!("Tabletop API server stopped");
    telemetry.shutdown();

    served.map_err(AppError::from)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
