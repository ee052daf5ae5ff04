//! Local server entrypoint.
//!
//! Reads configuration from the environment (and `.env` when present),
//! loads the session signing key, and serves the router on `PORT`.

use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt};

use sis_token_handler::config::{Config, LogFormat};
use sis_token_handler::{AppState, create_app};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let config = Config::from_env().expect("Failed to load configuration");

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => fmt().json().with_env_filter(filter).init(),
        LogFormat::Pretty => fmt().with_env_filter(filter).init(),
    }

    let port = config.port;
    let state = AppState::from_config(config).expect("Failed to initialise session store");
    tracing::info!(
        provider = state.provider.name(),
        algorithm = state.config.jwt_session_algorithm.as_str(),
        redeem_url = %state.provider.endpoints().redeem(),
        "Session store ready"
    );

    let app = create_app(Arc::new(state));

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");
    axum::serve(listener, app).await.expect("Server error");
}
