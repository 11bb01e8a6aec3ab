//! TradeQuest REST API
//!
//! HTTP API layer, built with Axum. Player routes take
//! `Authorization: Bearer <token>`; admin and job routes take the
//! service-role key the same way.
//!
//! # Endpoints
//!
//! ## Trades
//! - `GET /api/v1/credits/check?count=n` - Credit check
//! - `POST /api/v1/trades` - Log one trade
//! - `POST /api/v1/trades/batch` - Credit-gated batch upload
//! - `POST /api/v1/trades/import` - CSV import (Pro)
//! - `GET /api/v1/trades`, `GET|PATCH|DELETE /api/v1/trades/:id`
//! - `GET /api/v1/analytics` - Statistics
//!
//! ## Game
//! - `GET /api/v1/profile`, `POST /api/v1/activity`
//! - `GET /api/v1/challenges/today`, `POST /api/v1/challenges/:id/progress`
//! - `GET /api/v1/leaderboard?limit=n`
//! - `GET|PUT /api/v1/layout`
//! - `GET /api/v1/notifications`, `POST /api/v1/notifications/:id/read`
//!
//! ## Plans and payments
//! - `GET /api/v1/pricing`, `GET /api/v1/fx`
//! - `GET /api/v1/checkout/sessions/:id`
//! - `GET|POST /api/v1/credentials`, `DELETE /api/v1/credentials/:id` (Elite)
//!
//! ## Service role
//! - `POST /api/v1/admin/users|credits|boosts`, `PUT /api/v1/admin/subscriptions`
//! - `GET /api/v1/jobs`, `POST /api/v1/jobs/:name/run`
//!
//! ## Health
//! - `GET /health/live`, `GET /health/ready`, `GET /health`
//!
//! ## WebSocket
//! - `GET /api/v1/ws?token=...` - Real-time game events

pub mod auth;
pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    http::{HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ApiConfig;
use crate::websocket::{websocket_handler, ConnectionHub, WsEvent};

/// CORS from configured origins; an empty list or `*` allows any origin
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(parsed)
}

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    use routes::{admin, analytics, challenges, credentials, health, layout, market, profile, trades};

    let api_routes = Router::new()
        // Credits and trades
        .route("/credits/check", get(analytics::check))
        .route("/trades", get(trades::list_trades).post(trades::create_trade))
        .route("/trades/batch", post(trades::upload_trades))
        .route("/trades/import", post(trades::import_csv))
        .route(
            "/trades/:id",
            get(trades::get_trade)
                .patch(trades::update_trade)
                .delete(trades::delete_trade),
        )
        .route("/analytics", get(analytics::get_analytics))
        // Game
        .route("/profile", get(profile::get_profile))
        .route("/activity", post(profile::record_activity))
        .route("/challenges/today", get(challenges::todays_challenges))
        .route("/challenges/:id/progress", post(challenges::progress_challenge))
        .route("/leaderboard", get(challenges::leaderboard))
        .route("/layout", get(layout::get_layout).put(layout::put_layout))
        .route("/notifications", get(layout::list_notifications))
        .route("/notifications/:id/read", post(layout::mark_read))
        // Plans, payments and credentials
        .route("/pricing", get(market::pricing))
        .route("/fx", get(market::convert))
        .route("/checkout/sessions/:id", get(market::checkout_session))
        .route(
            "/credentials",
            get(credentials::list_credentials).post(credentials::create_credential),
        )
        .route("/credentials/:id", delete(credentials::delete_credential))
        // Service role
        .route("/admin/users", post(admin::create_user))
        .route("/admin/credits", post(admin::grant_credits))
        .route("/admin/boosts", post(admin::create_boost))
        .route("/admin/subscriptions", put(admin::upsert_subscription))
        .route("/jobs", get(admin::list_jobs))
        .route("/jobs/:name/run", post(admin::run_job))
        .layer(TimeoutLayer::new(Duration::from_secs(
            state.config.api.request_timeout_secs.max(1),
        )))
        // WebSocket route, outside the request timeout
        .route("/ws", get(websocket_handler));

    let health_routes = Router::new()
        .route("/live", get(health::liveness))
        .route("/ready", get(health::readiness))
        .route("/", get(health::full_health));

    let cors = cors_layer(&state.config.api.cors_origins);
    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let hub = Arc::clone(&state.ws_hub);
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("TradeQuest API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(hub))
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("TradeQuest API shut down gracefully");
    Ok(())
}

/// Wait for a shutdown signal, then tell connected clients
async fn shutdown_signal(hub: Arc<ConnectionHub>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
    hub.broadcast(&WsEvent::system("Server is shutting down")).await;
}
