//! Type definitions for the USI client.

pub mod config;
pub mod error;
pub mod search;

pub use config::{DEFAULT_ENGINE_PATH, DEFAULT_POOL_SIZE, PoolConfig};
pub use error::{Error, Result};
pub use search::{
    AnalysisRequest, AnalysisResult, DEFAULT_ENGINE_AUTHOR, DEFAULT_ENGINE_NAME, EngineIdentity,
    EngineInfo, MateOutcome, MateResult, Position, ProgressInfo, RESIGN, SearchOutcome, Variation,
};
