use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::{debug, info, warn};
use usi_client::{AnalysisResult, EngineInfo, MateResult};

use crate::error::{ApiError, Result};
use crate::extract::ApiJson;
use crate::message::{AnalyzeRequest, HealthResponse, MateRequest, RootResponse};
use crate::server::AppState;

/// `GET /`
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse::default())
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    if state.pool.is_healthy() {
        (StatusCode::OK, Json(HealthResponse::healthy()))
    } else {
        warn!("Health check failed: engine pool not ready");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse::unhealthy()),
        )
    }
}

/// `GET /engine/info`
pub async fn engine_info(State(state): State<AppState>) -> Result<Json<EngineInfo>> {
    if state.pool.is_closed() {
        return Err(ApiError::Unavailable);
    }
    Ok(Json(state.pool.engine_info()))
}

/// `POST /analyze`
pub async fn analyze(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<AnalyzeRequest>,
) -> Result<Json<AnalysisResult>> {
    body.validate()?;
    debug!(
        "Analyze request: sfen={:?} moves={:?} time_ms={} depth={:?} multipv={}",
        body.sfen, body.moves, body.time_ms, body.depth, body.multipv
    );

    let request = body.into_request();
    let result = state
        .pool
        .analyze(&request)
        .await
        .map_err(ApiError::analysis)?;

    info!(
        "Analysis finished: bestmove={} variations={} in {}ms",
        result.bestmove,
        result.variations.len(),
        result.time_ms
    );
    Ok(Json(result))
}

/// `POST /mate`
pub async fn mate(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<MateRequest>,
) -> Result<Json<MateResult>> {
    body.validate()?;
    debug!(
        "Mate request: sfen={:?} moves={:?} time_ms={}",
        body.sfen, body.moves, body.time_ms
    );

    let outcome = state
        .pool
        .search_mate(&body.position(), body.time_ms)
        .await
        .map_err(ApiError::mate_search)?;

    info!("Mate search finished: found={}", outcome.is_found());
    Ok(Json(MateResult::from(outcome)))
}
