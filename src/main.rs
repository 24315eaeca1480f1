use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod constants;
mod error;
mod models;
mod services;
mod tron;
mod utils;

use config::Config;
use constants::API_VERSION;
use services::{TokenTransferService, TronNodeClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tron_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!("Starting TRON gateway backend");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("API Version: {}", API_VERSION);
    tracing::info!("TRON node: {}", config.tron_host);

    // Wire the chain client and the transfer service
    let client = Arc::new(TronNodeClient::from_config(&config)?);
    let tron = Arc::new(TokenTransferService::from_config(client, &config));

    let app_state = api::AppState {
        config: config.clone(),
        tron,
    };

    // Build router
    let app = build_router(app_state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: api::AppState) -> Router {
    // CORS configuration
    let cors = cors_from_config(&state.config);

    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Accounts
        .route("/api/v1/account/activate", post(api::tron::activate_account))
        .route("/api/v1/account/{address}", get(api::tron::get_account))
        .route(
            "/api/v1/account/{address}/transfers",
            get(api::tron::get_transfer_history),
        )
        // TRC-20
        .route("/api/v1/trc20/meta", post(api::tron::get_token_meta))
        .route("/api/v1/trc20/balance", post(api::tron::get_token_balance))
        .route("/api/v1/trc20/allowance", post(api::tron::get_allowance))
        .route("/api/v1/trc20/transfer", post(api::tron::transfer))
        .route("/api/v1/trc20/approve", post(api::tron::approve))
        .route(
            "/api/v1/trc20/transfer-from",
            post(api::tron::transfer_from),
        )
        .layer(cors)
        .with_state(state)
}

fn cors_from_config(config: &Config) -> CorsLayer {
    let raw = config.cors_allowed_origins.trim();
    if raw.is_empty() || raw == "*" {
        return CorsLayer::very_permissive();
    }

    let allowed: Vec<HeaderValue> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    if allowed.is_empty() {
        tracing::warn!("No valid CORS origins parsed; falling back to permissive");
        return CorsLayer::very_permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
