//! Write half for engine stdin.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::types::{Error, Result};

/// Line delimiter used by the USI protocol.
pub const LINE_DELIMITER: &str = "\n";

/// Write half for engine stdin.
///
/// Every command is written as one delimited line and flushed immediately,
/// the protocol has no pipelining so nothing is gained by batching.
pub struct WriteHalf<W: AsyncWrite + Unpin + Send> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> WriteHalf<W> {
    /// Create a new write half from an AsyncWrite.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Unwrap the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Write one command line and flush.
    pub async fn write_line(&mut self, command: &str) -> Result<()> {
        let mut line = String::with_capacity(command.len() + LINE_DELIMITER.len());
        line.push_str(command);
        line.push_str(LINE_DELIMITER);

        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(Error::CommandWrite)?;
        self.writer.flush().await.map_err(Error::CommandWrite)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_write_line_appends_delimiter() {
        let (client, mut engine) = tokio::io::duplex(64);
        let mut half = WriteHalf::new(client);
        half.write_line("isready").await.unwrap();

        let mut buf = vec![0u8; 8];
        engine.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, b"isready\n");
    }

    #[tokio::test]
    async fn test_write_to_closed_stream_fails() {
        let (client, engine) = tokio::io::duplex(64);
        drop(engine);
        let mut half = WriteHalf::new(client);
        let result = half.write_line("usi").await;
        assert!(matches!(result, Err(Error::CommandWrite(_))));
    }
}
