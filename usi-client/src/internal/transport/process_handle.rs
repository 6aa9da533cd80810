//! Owned engine child process.

use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;

use crate::types::{Error, Result};

/// The engine's child process, kept apart from its stdio pipes.
pub struct ProcessHandle {
    child: Child,
}

impl ProcessHandle {
    pub fn new(child: Child) -> Self {
        Self { child }
    }

    /// Force-kill the engine and reap it.
    pub async fn kill(&mut self) -> Result<()> {
        self.child
            .kill()
            .await
            .map_err(|e| Error::Process(format!("kill failed: {}", e)))
    }

    /// Give the engine `grace` to exit on its own.
    ///
    /// `Ok(None)` means it is still running.
    pub async fn wait_timeout(&mut self, grace: Duration) -> Result<Option<ExitStatus>> {
        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => Ok(Some(status)),
            Ok(Err(e)) => Err(Error::Process(format!("wait failed: {}", e))),
            Err(_) => Ok(None),
        }
    }

    /// Exit status, if the engine has already exited.
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        self.child
            .try_wait()
            .map_err(|e| Error::Process(format!("status check failed: {}", e)))
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tokio::process::Command;

    #[tokio::test]
    async fn test_wait_timeout_then_kill() {
        let child = Command::new("/bin/sh")
            .args(["-c", "sleep 30"])
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        let mut handle = ProcessHandle::new(child);
        assert!(handle.id().is_some());

        let status = handle.wait_timeout(Duration::from_millis(50)).await.unwrap();
        assert!(status.is_none());

        handle.kill().await.unwrap();
        assert!(handle.try_wait().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_wait_timeout_reports_exit() {
        let child = Command::new("/bin/sh").args(["-c", "exit 3"]).spawn().unwrap();
        let mut handle = ProcessHandle::new(child);

        let status = handle.wait_timeout(Duration::from_secs(5)).await.unwrap();
        assert_eq!(status.and_then(|s| s.code()), Some(3));
    }
}
