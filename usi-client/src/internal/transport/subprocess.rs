//! Subprocess transport for a USI engine executable.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::{debug, info};

use super::{ProcessHandle, ReadHalf, StderrHalf, WriteHalf};
use crate::types::{Error, PoolConfig, Result};

/// Type alias for the split subprocess components
type SplitSubprocess = (
    ReadHalf<ChildStdout>,
    WriteHalf<ChildStdin>,
    StderrHalf<ChildStderr>,
    ProcessHandle,
);

/// Subprocess transport for one engine process.
pub struct SubprocessTransport {
    engine_path: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    process: Option<Child>,
}

impl SubprocessTransport {
    /// Create a new subprocess transport from a pool configuration.
    pub fn new(config: &PoolConfig) -> Result<Self> {
        let engine_path = Self::find_engine(&config.engine_path)?;

        Ok(Self {
            engine_path,
            args: config.engine_args.clone(),
            working_dir: config.resolved_working_dir().map(Path::to_path_buf),
            process: None,
        })
    }

    /// Resolve the engine executable.
    ///
    /// An existing path is used as is; a bare program name is looked up on PATH.
    fn find_engine(path: &Path) -> Result<PathBuf> {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }

        which::which(path).map_err(|e| {
            Error::EngineNotFound(format!("{}: {}", path.display(), e))
        })
    }

    /// Path of the resolved engine executable.
    pub fn engine_path(&self) -> &Path {
        &self.engine_path
    }

    /// Split the transport into independent read/write/stderr halves and process handle.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The process has not been started (call `connect()` first)
    /// - stdin, stdout, or stderr are not available
    pub fn split(mut self) -> Result<SplitSubprocess> {
        let mut child = self.process.take().ok_or_else(|| {
            Error::Process("Process not started. Call connect() first.".to_string())
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Process("stdin not available".to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Process("stdout not available".to_string()))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Process("stderr not available".to_string()))?;

        Ok((
            ReadHalf::new(stdout),
            WriteHalf::new(stdin),
            StderrHalf::new(stderr),
            ProcessHandle::new(child),
        ))
    }

    /// Start the engine process with piped stdio.
    ///
    /// The child is killed if its handle is dropped, so an engine never
    /// outlives the session that owns it.
    pub async fn connect(&mut self) -> Result<()> {
        if self.process.is_some() {
            return Ok(());
        }

        debug!("Starting engine: {:?} {:?}", self.engine_path, self.args);

        let mut command = Command::new(&self.engine_path);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref cwd) = self.working_dir {
            command.current_dir(cwd);
        }

        let child = command.spawn().map_err(|source| Error::Launch {
            path: self.engine_path.clone(),
            source,
        })?;

        info!(
            "Engine process started: {} (pid {:?})",
            self.engine_path.display(),
            child.id()
        );
        self.process = Some(child);
        Ok(())
    }

    /// Check if the process has been started.
    pub fn is_ready(&self) -> bool {
        self.process.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_engine_is_not_found() {
        let config = PoolConfig::new().with_engine_path("/nonexistent/dir/no-such-engine");
        let result = SubprocessTransport::new(&config);
        assert!(matches!(result, Err(Error::EngineNotFound(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_split_without_connect() {
        let config = PoolConfig::new().with_engine_path("/bin/sh");
        let transport = SubprocessTransport::new(&config).unwrap();
        assert!(!transport.is_ready());

        let result = transport.split();
        assert!(result.is_err());
        if let Err(Error::Process(msg)) = result {
            assert!(msg.contains("Process not started"));
        } else {
            panic!("Expected Process error");
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launch_error_for_bad_working_dir() {
        let config = PoolConfig::new()
            .with_engine_path("/bin/sh")
            .with_working_dir("/nonexistent/engine/data");
        let mut transport = SubprocessTransport::new(&config).unwrap();

        let result = transport.connect().await;
        assert!(matches!(result, Err(Error::Launch { .. })));
    }
}
