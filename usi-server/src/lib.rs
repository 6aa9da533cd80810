//! HTTP API over a pool of USI engines.

pub mod config;
pub mod error;
pub mod extract;
pub mod handler;
pub mod message;
pub mod server;

pub use config::ServerConfig;
pub use error::ApiError;
pub use extract::ApiJson;
pub use server::{AppState, create_app};
