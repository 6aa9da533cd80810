//! Pool and process launch configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::error::{Error, Result};

/// Default number of engine processes kept in a pool.
pub const DEFAULT_POOL_SIZE: usize = 4;

/// Default location of the engine binary.
pub const DEFAULT_ENGINE_PATH: &str = "/engine/YaneuraOu";

/// Configuration for an [`EnginePool`](crate::EnginePool).
///
/// # Example
///
/// ```rust
/// use usi_client::PoolConfig;
///
/// let config = PoolConfig::new()
///     .with_engine_path("/opt/engine/YaneuraOu")
///     .with_pool_size(2)
///     .with_option("Threads", "4");
/// assert_eq!(config.pool_size, 2);
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Path to the engine executable.
    pub engine_path: PathBuf,
    /// Extra command-line arguments for the engine.
    pub engine_args: Vec<String>,
    /// Working directory of the engine process (where its evaluation files live).
    /// Defaults to the directory containing the executable.
    pub working_dir: Option<PathBuf>,
    /// Number of engine processes.
    pub pool_size: usize,
    /// USI options applied to every engine after the handshake.
    pub options: BTreeMap<String, String>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let options = [("USI_Hash", "256"), ("USI_Ponder", "false"), ("Threads", "2")]
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        Self {
            engine_path: PathBuf::from(DEFAULT_ENGINE_PATH),
            engine_args: Vec::new(),
            working_dir: None,
            pool_size: DEFAULT_POOL_SIZE,
            options,
        }
    }
}

impl PoolConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_engine_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.engine_path = path.into();
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.engine_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    /// Replace all engine options.
    pub fn with_options(mut self, options: BTreeMap<String, String>) -> Self {
        self.options = options;
        self
    }

    /// Working directory the engine is started in.
    pub fn resolved_working_dir(&self) -> Option<&Path> {
        self.working_dir
            .as_deref()
            .or_else(|| self.engine_path.parent().filter(|p| !p.as_os_str().is_empty()))
    }

    /// Check that the configuration describes a usable pool.
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(Error::InvalidConfig("pool_size must be at least 1".to_string()));
        }
        if self.engine_path.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("engine_path is empty".to_string()));
        }
        Ok(())
    }
}
