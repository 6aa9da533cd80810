//! Read half for engine stdout.
//!
//! A background task reads the engine's stdout one line at a time and feeds the
//! session's [`OutputQueue`](crate::internal::OutputQueue).

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::session::SessionStatus;

/// Read half for engine stdout.
pub struct ReadHalf<R: AsyncRead + Unpin + Send> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin + Send + 'static> ReadHalf<R> {
    /// Create a new read half from an AsyncRead.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// Consume self and spawn the line reader.
    ///
    /// Each line is decoded lossily (invalid UTF-8 is replaced, never fatal),
    /// trimmed, and forwarded if non-empty. The task ends when the stream
    /// closes, a read fails, or the receiving queue is dropped. On exit it
    /// marks the session as exited.
    pub fn spawn_reader(
        self,
        label: String,
        status: Arc<SessionStatus>,
    ) -> (mpsc::UnboundedReceiver<String>, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut reader = self.reader;

        let handle = tokio::spawn(async move {
            let mut buf = Vec::with_capacity(256);
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => {
                        debug!("[{}] stdout closed", label);
                        break;
                    }
                    Ok(_) => {
                        let decoded = String::from_utf8_lossy(&buf);
                        let line = decoded.trim();
                        if line.is_empty() {
                            continue;
                        }
                        debug!("[{}] << {}", label, line);
                        if tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("[{}] error reading engine output: {}", label, e);
                        break;
                    }
                }
            }
            status.mark_exited();
        });

        (rx, handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_reader_skips_blank_lines_and_replaces_invalid_utf8() {
        let (mut engine, client) = tokio::io::duplex(256);
        let status = Arc::new(SessionStatus::new());
        let (mut rx, handle) = ReadHalf::new(client).spawn_reader("test".into(), status.clone());

        engine.write_all(b"id name Test\r\n\n   \nbad \xff byte\n").await.unwrap();
        drop(engine);

        assert_eq!(rx.recv().await.as_deref(), Some("id name Test"));
        assert_eq!(rx.recv().await.as_deref(), Some("bad \u{fffd} byte"));
        assert_eq!(rx.recv().await, None);

        handle.await.unwrap();
        assert!(!status.is_alive());
    }
}
