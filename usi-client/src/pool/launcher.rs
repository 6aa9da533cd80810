//! Launchers create the engine sessions a pool is built from.

use async_trait::async_trait;

use crate::session::EngineSession;
use crate::types::{PoolConfig, Result};

/// Abstract source of engine sessions.
///
/// The pool only needs "give me a fresh, started session"; how the engine is
/// reached (a child process, an in-process engine for tests) is up to the
/// launcher.
#[async_trait]
pub trait EngineLauncher: Send + Sync {
    /// Start one engine and return its session. The handshake is left to the pool.
    async fn launch(&self) -> Result<EngineSession>;
}

/// Launches engines as child processes.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    config: PoolConfig,
}

impl ProcessLauncher {
    pub fn new(config: PoolConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }
}

#[async_trait]
impl EngineLauncher for ProcessLauncher {
    async fn launch(&self) -> Result<EngineSession> {
        EngineSession::start(&self.config).await
    }
}
