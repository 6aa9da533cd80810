//! A single USI engine session.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::internal::info_parser::{
    BESTMOVE_TAG, INFO_TAG, IdField, line_tag, parse_bestmove_line, parse_checkmate_line,
    parse_id_line, parse_progress_line,
};
use crate::internal::OutputQueue;
use crate::internal::transport::{ProcessHandle, ReadHalf, StderrHalf, SubprocessTransport, WriteHalf};
use crate::types::{EngineIdentity, MateOutcome, PoolConfig, Position, ProgressInfo, Result, SearchOutcome};

/// Upper bound for the `usi` → `usiok` exchange.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
/// Upper bound for `readyok` during the initial handshake.
const READY_TIMEOUT: Duration = Duration::from_secs(10);
/// Upper bound for `readyok` when a session is reset before going back to the pool.
const RESET_READY_TIMEOUT: Duration = Duration::from_secs(5);
/// The protocol does not acknowledge `setoption`; give the engine this long to apply it.
const OPTION_SETTLE_DELAY: Duration = Duration::from_millis(50);
/// How long `quit` is given before the process is killed.
const QUIT_GRACE_PERIOD: Duration = Duration::from_secs(3);
/// Minimum wait for each line during a search.
const MIN_SEARCH_LINE_TIMEOUT: Duration = Duration::from_secs(30);
/// Added to the search budget for each line wait, and to the mate budget.
const SEARCH_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);
/// Byoyomi used when no time limit and no depth is given.
pub const DEFAULT_SEARCH_TIME_MS: u64 = 1000;

const MULTIPV_OPTION: &str = "MultiPV";

type BoxedWriter = Box<dyn AsyncWrite + Unpin + Send>;

/// Liveness flags of a session, shared with the pool for health checks.
#[derive(Debug)]
pub struct SessionStatus {
    running: AtomicBool,
    exited: AtomicBool,
}

impl SessionStatus {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            exited: AtomicBool::new(false),
        }
    }

    /// Running and the engine's output stream is still open.
    pub fn is_alive(&self) -> bool {
        self.running.load(Ordering::SeqCst) && !self.exited.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_exited(&self) {
        self.exited.store(true, Ordering::SeqCst);
    }

    /// Clear the running flag, returning its previous value.
    fn stop(&self) -> bool {
        self.running.swap(false, Ordering::SeqCst)
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-line read bound while waiting for `bestmove`.
fn search_line_timeout(budget_ms: u64) -> Duration {
    (Duration::from_millis(budget_ms) + SEARCH_TIMEOUT_MARGIN).max(MIN_SEARCH_LINE_TIMEOUT)
}

/// One engine process and its protocol state.
///
/// A session is used by one caller at a time: every command takes `&mut self`,
/// and the protocol carries no request identifiers, so the output that follows
/// a command always belongs to whoever holds the session.
///
/// # Example
///
/// ```rust,no_run
/// use usi_client::{EngineSession, PoolConfig, Position};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = PoolConfig::new().with_engine_path("/engine/YaneuraOu");
/// let mut session = EngineSession::start(&config).await?;
/// session.handshake().await?;
///
/// session.set_position(&Position::startpos()).await?;
/// let outcome = session.run_search(Some(1000), None, 1).await?;
/// println!("bestmove {}", outcome.bestmove);
///
/// session.terminate().await;
/// # Ok(())
/// # }
/// ```
pub struct EngineSession {
    id: Uuid,
    writer: WriteHalf<BoxedWriter>,
    output: OutputQueue,
    status: Arc<SessionStatus>,
    reader_task: Option<JoinHandle<()>>,
    stderr_task: Option<JoinHandle<()>>,
    process: Option<ProcessHandle>,
    identity: EngineIdentity,
    multipv: u32,
}

impl EngineSession {
    /// Launch the engine process described by `config` and start reading its output.
    pub async fn start(config: &PoolConfig) -> Result<Self> {
        let mut transport = SubprocessTransport::new(config)?;
        transport.connect().await?;

        let (read_half, write_half, stderr_half, process) = transport.split()?;
        let id = Uuid::new_v4();
        let stderr_task = stderr_half.spawn_logger(id.to_string());

        let mut session = Self::assemble(id, read_half, Box::new(write_half.into_inner()));
        session.stderr_task = Some(stderr_task);
        session.process = Some(process);
        Ok(session)
    }

    /// Attach a session to already-connected streams, e.g. an in-process engine.
    pub fn from_io<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Self::assemble(Uuid::new_v4(), ReadHalf::new(reader), Box::new(writer))
    }

    fn assemble<R>(id: Uuid, read_half: ReadHalf<R>, writer: BoxedWriter) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let status = Arc::new(SessionStatus::new());
        let (rx, reader_task) = read_half.spawn_reader(id.to_string(), status.clone());

        debug!("Engine session {} started", id);
        Self {
            id,
            writer: WriteHalf::new(writer),
            output: OutputQueue::new(rx),
            status,
            reader_task: Some(reader_task),
            stderr_task: None,
            process: None,
            identity: EngineIdentity::default(),
            multipv: 1,
        }
    }

    /// Session ID.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Identity reported during the handshake.
    pub fn identity(&self) -> &EngineIdentity {
        &self.identity
    }

    /// Shared liveness flags.
    pub fn status(&self) -> Arc<SessionStatus> {
        Arc::clone(&self.status)
    }

    pub fn is_running(&self) -> bool {
        self.status.is_running()
    }

    /// Running and the engine process has not exited.
    pub fn is_alive(&mut self) -> bool {
        if let Some(process) = self.process.as_mut() {
            if let Ok(Some(_)) = process.try_wait() {
                self.status.mark_exited();
            }
        }
        self.status.is_alive()
    }

    /// Operating system process ID, if this session owns a process.
    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(ProcessHandle::id)
    }

    /// Direct access to the output queue.
    pub fn output_mut(&mut self) -> &mut OutputQueue {
        &mut self.output
    }

    /// Send one command line to the engine.
    ///
    /// # Errors
    /// Returns [`Error::CommandWrite`](crate::Error::CommandWrite) if stdin is closed.
    pub async fn send_command(&mut self, command: &str) -> Result<()> {
        debug!("[{}] >> {}", self.id, command);
        self.writer.write_line(command).await
    }

    /// Wait for a line exactly equal to `expected`.
    ///
    /// Lines read along the way are put back at the front of the queue in their
    /// original order, whether or not the expected line shows up, so the next
    /// reader still sees them.
    pub async fn wait_for_line(&mut self, expected: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut skipped = Vec::new();

        let found = loop {
            match self.output.next_line_until(deadline).await {
                Some(line) if line == expected => break true,
                Some(line) => skipped.push(line),
                None => break false,
            }
        };

        self.output.restore(skipped);
        found
    }

    /// Run the `usi` / `isready` handshake and record the engine identity.
    ///
    /// A slow or non-conforming engine only produces a warning; the identity
    /// may then be partial.
    pub async fn handshake(&mut self) -> Result<EngineIdentity> {
        self.send_command("usi").await?;

        let deadline = Instant::now() + HANDSHAKE_TIMEOUT;
        let mut completed = false;
        while let Some(line) = self.output.next_line_until(deadline).await {
            match parse_id_line(&line) {
                Some(IdField::Name(name)) => self.identity.name = Some(name),
                Some(IdField::Author(author)) => self.identity.author = Some(author),
                None if line == "usiok" => {
                    completed = true;
                    break;
                }
                None => trace!("[{}] handshake: {}", self.id, line),
            }
        }

        if !completed {
            warn!("[{}] engine did not send usiok within {:?}", self.id, HANDSHAKE_TIMEOUT);
        }

        self.send_command("isready").await?;
        if !self.wait_for_line("readyok", READY_TIMEOUT).await {
            warn!("[{}] engine did not send readyok within {:?}", self.id, READY_TIMEOUT);
        }

        info!(
            "[{}] engine initialized: {}",
            self.id,
            self.identity.name.as_deref().unwrap_or("unknown")
        );
        Ok(self.identity.clone())
    }

    /// Set an engine option.
    ///
    /// There is no acknowledgement for `setoption`, so this pauses briefly
    /// before returning; no command is sent until the pause has elapsed.
    pub async fn set_option(&mut self, name: &str, value: &str) -> Result<()> {
        self.send_command(&format!("setoption name {} value {}", name, value))
            .await?;
        tokio::time::sleep(OPTION_SETTLE_DELAY).await;

        if name == MULTIPV_OPTION {
            if let Ok(count) = value.trim().parse() {
                self.multipv = count;
            }
        }
        Ok(())
    }

    /// Set the position to search.
    pub async fn set_position(&mut self, position: &Position) -> Result<()> {
        self.send_command(&position.to_command()).await
    }

    /// Run a search and collect its result.
    ///
    /// Searches to `depth` if given, otherwise for `time_ms` of byoyomi
    /// (default [`DEFAULT_SEARCH_TIME_MS`]). Each line wait is bounded by
    /// `max(30s, time + 5s)`; if that expires before `bestmove`, `stop` is sent
    /// and whatever was collected is returned with `bestmove` = `resign`.
    pub async fn run_search(
        &mut self,
        time_ms: Option<u64>,
        depth: Option<u32>,
        multipv: u32,
    ) -> Result<SearchOutcome> {
        let multipv = multipv.max(1);
        if multipv != self.multipv {
            self.set_option(MULTIPV_OPTION, &multipv.to_string()).await?;
        }

        let budget_ms = time_ms.unwrap_or(DEFAULT_SEARCH_TIME_MS);
        let command = match depth.filter(|d| *d > 0) {
            Some(depth) => format!("go depth {}", depth),
            None => format!("go byoyomi {}", budget_ms),
        };
        let line_timeout = search_line_timeout(budget_ms);

        let started = Instant::now();
        self.send_command(&command).await?;

        let mut variations: BTreeMap<u32, ProgressInfo> = BTreeMap::new();
        let mut bestmove = None;
        let mut timed_out = false;

        loop {
            let Some(line) = self.output.next_line(line_timeout).await else {
                timed_out = true;
                break;
            };

            match line_tag(&line) {
                Some(INFO_TAG) => {
                    if let Some(info) = parse_progress_line(&line) {
                        if let Some(index) = info.variation_index(multipv) {
                            variations.insert(index, info);
                        }
                    }
                }
                Some(BESTMOVE_TAG) => {
                    bestmove = parse_bestmove_line(&line).flatten();
                    break;
                }
                _ => trace!("[{}] search: ignoring {}", self.id, line),
            }
        }

        if timed_out {
            warn!(
                "[{}] no bestmove within {:?}, returning partial result",
                self.id, line_timeout
            );
            self.interrupt().await;
        }

        Ok(SearchOutcome::new(bestmove, variations, started.elapsed(), timed_out))
    }

    /// Run a mate search for at most `time_ms`.
    ///
    /// Waits up to `time_ms + 5s` in total for the `checkmate` line.
    pub async fn run_mate_search(&mut self, time_ms: u64) -> Result<MateOutcome> {
        self.send_command(&format!("go mate {}", time_ms)).await?;

        let deadline = Instant::now() + Duration::from_millis(time_ms) + SEARCH_TIMEOUT_MARGIN;
        while let Some(line) = self.output.next_line_until(deadline).await {
            if let Some(outcome) = parse_checkmate_line(&line) {
                return Ok(outcome);
            }
            trace!("[{}] mate: ignoring {}", self.id, line);
        }

        warn!("[{}] no checkmate line before the deadline", self.id);
        self.interrupt().await;
        Ok(MateOutcome::NoResponse)
    }

    /// Ask the engine to stop searching. Failures are only logged.
    async fn interrupt(&mut self) {
        if self.output.is_closed() {
            return;
        }
        if let Err(e) = self.send_command("stop").await {
            debug!("[{}] could not send stop: {}", self.id, e);
        }
    }

    /// Prepare the session for its next user.
    ///
    /// Sends `usinewgame` and `isready`, waits up to 5s for `readyok`, then
    /// discards whatever output is still queued so nothing from this request
    /// reaches the next one. Returns whether `readyok` was seen.
    pub async fn reset(&mut self) -> bool {
        let sent = match self.send_command("usinewgame").await {
            Ok(()) => self.send_command("isready").await,
            Err(e) => Err(e),
        };

        let ready = match sent {
            Ok(()) => self.wait_for_line("readyok", RESET_READY_TIMEOUT).await,
            Err(e) => {
                warn!("[{}] reset failed: {}", self.id, e);
                false
            }
        };

        let stale = self.output.drain();
        if stale > 0 {
            debug!("[{}] discarded {} stale output lines", self.id, stale);
        }
        ready
    }

    /// Stop the engine.
    ///
    /// Sends `quit`, waits up to 3s for the process to exit and kills it
    /// otherwise, then stops the background readers. Calling it again is a
    /// no-op.
    pub async fn terminate(&mut self) {
        if !self.status.stop() {
            return;
        }

        if let Err(e) = self.send_command("quit").await {
            debug!("[{}] could not send quit: {}", self.id, e);
        }

        if let Some(process) = self.process.as_mut() {
            match process.wait_timeout(QUIT_GRACE_PERIOD).await {
                Ok(Some(status)) => debug!("[{}] engine exited: {}", self.id, status),
                Ok(None) => {
                    warn!("[{}] engine ignored quit, killing it", self.id);
                    if let Err(e) = process.kill().await {
                        warn!("[{}] {}", self.id, e);
                    }
                }
                Err(e) => warn!("[{}] {}", self.id, e),
            }
        }

        for task in [self.reader_task.take(), self.stderr_task.take()]
            .into_iter()
            .flatten()
        {
            task.abort();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!("[{}] reader task failed: {}", self.id, e);
                }
            }
        }

        info!("[{}] engine terminated", self.id);
    }
}

// Implement Drop to ensure cleanup
impl Drop for EngineSession {
    fn drop(&mut self) {
        // Async cleanup is impossible here; the process itself is killed on drop.
        if self.status.is_running() {
            warn!("Engine session {} dropped without calling terminate()", self.id);
        }
        self.status.mark_exited();
        for task in [self.reader_task.take(), self.stderr_task.take()]
            .into_iter()
            .flatten()
        {
            task.abort();
        }
    }
}
