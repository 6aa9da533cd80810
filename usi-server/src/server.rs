use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;
use usi_client::EnginePool;

use crate::handler;

/// Shared state of the HTTP application.
#[derive(Clone)]
pub struct AppState {
    pub pool: EnginePool,
}

impl AppState {
    pub fn new(pool: EnginePool) -> Self {
        Self { pool }
    }
}

/// Build the router serving the engine API.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handler::root))
        .route("/health", get(handler::health))
        .route("/engine/info", get(handler::engine_info))
        .route("/analyze", post(handler::analyze))
        .route("/mate", post(handler::mate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
