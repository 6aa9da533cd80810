use serde::{Deserialize, Serialize};
use usi_client::{AnalysisRequest, Position};

use crate::error::ApiError;

pub const DEFAULT_ANALYSIS_TIME_MS: u64 = 1000;
pub const MIN_ANALYSIS_TIME_MS: u64 = 100;
pub const MAX_ANALYSIS_TIME_MS: u64 = 60_000;
pub const MAX_DEPTH: u32 = 30;
pub const MAX_MULTIPV: u32 = 10;

pub const DEFAULT_MATE_TIME_MS: u64 = 5000;
pub const MIN_MATE_TIME_MS: u64 = 1000;
pub const MAX_MATE_TIME_MS: u64 = 30_000;

fn default_analysis_time_ms() -> u64 {
    DEFAULT_ANALYSIS_TIME_MS
}

fn default_mate_time_ms() -> u64 {
    DEFAULT_MATE_TIME_MS
}

fn default_multipv() -> u32 {
    1
}

/// Body of `POST /analyze`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalyzeRequest {
    /// Position in SFEN; the starting position when absent
    #[serde(default)]
    pub sfen: Option<String>,
    /// Moves played from the position
    #[serde(default)]
    pub moves: Option<Vec<String>>,
    /// Thinking time in milliseconds
    #[serde(default = "default_analysis_time_ms")]
    pub time_ms: u64,
    /// Fixed search depth; overrides the time budget
    #[serde(default)]
    pub depth: Option<u32>,
    /// Number of candidate lines
    #[serde(default = "default_multipv")]
    pub multipv: u32,
}

impl AnalyzeRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        check_range("time_ms", self.time_ms, MIN_ANALYSIS_TIME_MS, MAX_ANALYSIS_TIME_MS)?;
        if let Some(depth) = self.depth {
            check_range("depth", depth.into(), 1, MAX_DEPTH.into())?;
        }
        check_range("multipv", self.multipv.into(), 1, MAX_MULTIPV.into())
    }

    pub fn into_request(self) -> AnalysisRequest {
        let mut request = AnalysisRequest::new(position_of(self.sfen, self.moves))
            .with_time_ms(self.time_ms)
            .with_multipv(self.multipv);
        if let Some(depth) = self.depth {
            request = request.with_depth(depth);
        }
        request
    }
}

/// Body of `POST /mate`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MateRequest {
    #[serde(default)]
    pub sfen: Option<String>,
    #[serde(default)]
    pub moves: Option<Vec<String>>,
    /// Mate search budget in milliseconds
    #[serde(default = "default_mate_time_ms")]
    pub time_ms: u64,
}

impl MateRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        check_range("time_ms", self.time_ms, MIN_MATE_TIME_MS, MAX_MATE_TIME_MS)
    }

    pub fn position(&self) -> Position {
        position_of(self.sfen.clone(), self.moves.clone())
    }
}

fn position_of(sfen: Option<String>, moves: Option<Vec<String>>) -> Position {
    let position = match sfen {
        Some(sfen) => Position::from_sfen(sfen),
        None => Position::startpos(),
    };
    position.with_moves(moves.unwrap_or_default())
}

fn check_range(field: &str, value: u64, min: u64, max: u64) -> Result<(), ApiError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ApiError::Validation(format!(
            "{} must be between {} and {}, got {}",
            field, min, max, value
        )))
    }
}

/// Response of `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub docs: String,
    pub health: String,
}

impl Default for RootResponse {
    fn default() -> Self {
        Self {
            message: "USI Engine API".to_string(),
            docs: "/docs".to_string(),
            health: "/health".to_string(),
        }
    }
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub engine: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            engine: "ready".to_string(),
        }
    }

    pub fn unhealthy() -> Self {
        Self {
            status: "unhealthy".to_string(),
            engine: "not ready".to_string(),
        }
    }
}

/// Error body shared by all failing responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}
