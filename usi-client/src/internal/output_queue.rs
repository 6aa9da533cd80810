//! Per-session queue of engine output lines.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, timeout_at};

/// FIFO of decoded engine output lines.
///
/// Lines arrive from the session's background reader. Consumers may put
/// lines back at the front with [`restore`](Self::restore); those are
/// replayed, in order, before anything else is received.
///
/// The queue has a single consumer at a time: the session that owns it,
/// which in turn is held by at most one caller.
pub struct OutputQueue {
    rx: mpsc::UnboundedReceiver<String>,
    replay: VecDeque<String>,
    closed: bool,
}

impl OutputQueue {
    pub fn new(rx: mpsc::UnboundedReceiver<String>) -> Self {
        Self {
            rx,
            replay: VecDeque::new(),
            closed: false,
        }
    }

    /// Wait at most `wait` for the next line.
    pub async fn next_line(&mut self, wait: Duration) -> Option<String> {
        self.next_line_until(Instant::now() + wait).await
    }

    /// Wait until `deadline` for the next line.
    ///
    /// Returns `None` on timeout, or immediately once the reader has finished
    /// and nothing is left to replay.
    pub async fn next_line_until(&mut self, deadline: Instant) -> Option<String> {
        if let Some(line) = self.replay.pop_front() {
            return Some(line);
        }
        if self.closed {
            return None;
        }

        match timeout_at(deadline, self.rx.recv()).await {
            Ok(Some(line)) => Some(line),
            Ok(None) => {
                self.closed = true;
                None
            }
            Err(_) => None,
        }
    }

    /// Next line if one is already available.
    pub fn try_next(&mut self) -> Option<String> {
        if let Some(line) = self.replay.pop_front() {
            return Some(line);
        }
        match self.rx.try_recv() {
            Ok(line) => Some(line),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                self.closed = true;
                None
            }
        }
    }

    /// Push `lines` back onto the front of the queue, keeping their order.
    pub fn restore(&mut self, lines: Vec<String>) {
        for line in lines.into_iter().rev() {
            self.replay.push_front(line);
        }
    }

    /// Discard every line currently available. Returns how many were dropped.
    pub fn drain(&mut self) -> usize {
        let mut dropped = 0;
        while self.try_next().is_some() {
            dropped += 1;
        }
        dropped
    }

    /// The reader has finished and no more lines will arrive.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_with(lines: &[&str]) -> (mpsc::UnboundedSender<String>, OutputQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        for line in lines {
            tx.send(line.to_string()).unwrap();
        }
        (tx, OutputQueue::new(rx))
    }

    #[tokio::test]
    async fn test_restore_replays_before_new_lines() {
        let (_tx, mut queue) = queue_with(&["a", "b", "c"]);

        let first = queue.try_next().unwrap();
        let second = queue.try_next().unwrap();
        queue.restore(vec![first, second]);

        let mut seen = Vec::new();
        while let Some(line) = queue.try_next() {
            seen.push(line);
        }
        assert_eq!(seen, vec!["a", "b", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_line_times_out() {
        let (_tx, mut queue) = queue_with(&[]);
        assert_eq!(queue.next_line(Duration::from_millis(500)).await, None);
        assert!(!queue.is_closed());
    }

    #[tokio::test]
    async fn test_closed_queue_returns_immediately() {
        let (tx, mut queue) = queue_with(&["last"]);
        drop(tx);

        assert_eq!(queue.next_line(Duration::from_secs(60)).await.as_deref(), Some("last"));
        assert_eq!(queue.next_line(Duration::from_secs(60)).await, None);
        assert!(queue.is_closed());
    }

    #[tokio::test]
    async fn test_drain_counts_replayed_and_pending() {
        let (_tx, mut queue) = queue_with(&["x", "y"]);
        queue.restore(vec!["w".to_string()]);
        assert_eq!(queue.drain(), 3);
        assert_eq!(queue.try_next(), None);
    }
}
