//! HTTP API for the shield server.

use crate::error::Result;
use crate::store::ClaimStore;
use crate::ws::ws_display_handler;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use shield_protocol::{ClaimRequest, ClaimState, CLAIM_PATH, PUSH_PATH, RESET_PATH, STATUS_PATH};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared handler state.
pub type AppState = Arc<ClaimStore>;

/// Build the API router.
pub fn build_router(store: Arc<ClaimStore>) -> Router {
    // CORS layer for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route(STATUS_PATH, get(status))
        .route(CLAIM_PATH, post(claim))
        .route(RESET_PATH, post(reset))
        .route(PUSH_PATH, get(ws_display_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(store)
}

async fn health() -> &'static str {
    "OK"
}

async fn status(State(store): State<AppState>) -> Json<ClaimState> {
    Json(store.state().await)
}

async fn claim(
    State(store): State<AppState>,
    Json(req): Json<ClaimRequest>,
) -> Result<Json<ClaimState>> {
    Ok(Json(store.claim(&req.name).await?))
}

async fn reset(State(store): State<AppState>) -> Json<ClaimState> {
    Json(store.reset().await)
}
