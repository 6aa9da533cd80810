//! USI engine client and process pool.
//!
//! This crate drives external board-game engines that speak the line-oriented
//! USI protocol over stdin/stdout, and multiplexes many concurrent analysis
//! requests over a small, fixed set of engine processes.
//!
//! # Example
//!
//! ```rust,no_run
//! use usi_client::{AnalysisRequest, EnginePool, PoolConfig, Position};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PoolConfig::new()
//!     .with_engine_path("/engine/YaneuraOu")
//!     .with_pool_size(4);
//! let pool = EnginePool::initialize(config).await?;
//!
//! let request = AnalysisRequest::new(Position::startpos().with_moves(["7g7f"]))
//!     .with_time_ms(3000)
//!     .with_multipv(3);
//! let result = pool.analyze(&request).await?;
//! println!("bestmove {}", result.bestmove);
//!
//! pool.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`types`] - Configuration, results and errors
//! - [`session`] - One engine process and its protocol state
//! - [`pool`] - Fixed-size pool with FIFO borrowing
//! - [`internal`] - Process transport, output queue and line parsers

pub mod internal;
pub mod pool;
pub mod session;
pub mod types;

// Re-export all public types at the crate root for convenience
pub use pool::{EngineLauncher, EnginePool, PoolStats, PooledSession, ProcessLauncher};
pub use session::{EngineSession, SessionStatus};
pub use types::*;
