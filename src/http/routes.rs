//! HTTP route definitions

use axum::{
    extract::State,
    http::{header, Method},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::app::AppState;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - "*" is permissive, otherwise a comma-separated
    // origin list
    let cors = if state.config.client_origin.trim() == "*" {
        CorsLayer::permissive()
    } else {
        let allowed_origins: Vec<header::HeaderValue> = state
            .config
            .client_origin
            .split(',')
            .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(allowed_origins)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    };

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    connections: usize,
    players: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        connections: state.registry.len(),
        players: state.directory.len(),
    })
}
