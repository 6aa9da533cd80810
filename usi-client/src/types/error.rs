//! Error types for the USI client.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by engine sessions and the engine pool.
///
/// Timeouts are deliberately absent: a slow or silent engine degrades the
/// result (see [`SearchOutcome::timed_out`](crate::SearchOutcome) and
/// [`MateOutcome`](crate::MateOutcome)) instead of failing the request.
#[derive(Debug, Error)]
pub enum Error {
    /// The engine process could not be spawned.
    #[error("failed to launch engine {path:?}: {source}")]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The engine binary does not exist and could not be resolved on PATH.
    #[error("engine not found: {0}")]
    EngineNotFound(String),

    /// Writing a command to the engine's stdin failed.
    #[error("failed to write command to engine: {0}")]
    CommandWrite(#[source] std::io::Error),

    /// Process management failure (missing pipes, wait/kill errors).
    #[error("process error: {0}")]
    Process(String),

    /// The pool has been shut down.
    #[error("engine pool has been shut down")]
    PoolClosed,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for USI client operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this error happened while starting an engine process.
    pub fn is_launch_error(&self) -> bool {
        matches!(self, Error::Launch { .. } | Error::EngineNotFound(_))
    }
}
