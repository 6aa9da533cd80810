//! Stderr half for engine stderr.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::debug;

/// Stderr half for engine stderr.
///
/// The protocol never uses stderr; it is drained so the engine cannot block
/// on a full pipe, and logged for diagnostics.
pub struct StderrHalf<R: AsyncRead + Unpin + Send> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin + Send + 'static> StderrHalf<R> {
    /// Create a new stderr half from an AsyncRead.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// Consume self and spawn a task that logs every stderr line.
    pub fn spawn_logger(self, label: String) -> JoinHandle<()> {
        let reader = self.reader;

        tokio::spawn(async move {
            let mut lines = reader.lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("[{}] stderr: {}", label, line);
            }
        })
    }
}
