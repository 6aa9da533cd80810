//! Fixed-size pool of engine sessions.

mod launcher;

pub use launcher::{EngineLauncher, ProcessLauncher};

use std::collections::{BTreeMap, VecDeque};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, error, info, warn};

use crate::session::{EngineSession, SessionStatus};
use crate::types::{
    AnalysisRequest, AnalysisResult, DEFAULT_ENGINE_AUTHOR, DEFAULT_ENGINE_NAME, EngineIdentity,
    EngineInfo, Error, MateOutcome, PoolConfig, Position, Result, SearchOutcome, Variation,
};

/// Version string reported by [`EnginePool::engine_info`].
const ENGINE_VERSION: &str = "latest";

/// Pool of engine sessions.
///
/// Each session is used by at most one caller at a time. Callers beyond the
/// pool size wait in FIFO order until a session is released. Cloning the pool
/// is cheap and every clone refers to the same sessions.
///
/// # Example
///
/// ```rust,no_run
/// use usi_client::{AnalysisRequest, EnginePool, PoolConfig, Position};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = EnginePool::initialize(PoolConfig::new().with_pool_size(2)).await?;
///
/// let request = AnalysisRequest::new(Position::startpos()).with_multipv(3);
/// let result = pool.analyze(&request).await?;
/// println!("{} ({} candidates)", result.bestmove, result.variations.len());
///
/// pool.shutdown().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct EnginePool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    idle: Mutex<VecDeque<EngineSession>>,
    /// One permit per idle session.
    available: Semaphore,
    sessions: Vec<Arc<SessionStatus>>,
    identity: EngineIdentity,
    options: BTreeMap<String, String>,
    closed: AtomicBool,
}

impl EnginePool {
    /// Start `config.pool_size` engine processes and make them available.
    ///
    /// # Errors
    /// Fails if the configuration is invalid or any engine fails to launch.
    /// Engines already started are terminated before returning the error.
    pub async fn initialize(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        let size = config.pool_size;
        let options = config.options.clone();
        let launcher = ProcessLauncher::new(config);
        Self::with_launcher(&launcher, size, options).await
    }

    /// Build a pool of `size` sessions obtained from `launcher`.
    ///
    /// Sessions are started one after another; each is handshaken and then
    /// configured with `options`. The first session's identity becomes the
    /// pool's reported identity.
    pub async fn with_launcher(
        launcher: &dyn EngineLauncher,
        size: usize,
        options: BTreeMap<String, String>,
    ) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidConfig("pool_size must be at least 1".to_string()));
        }
        info!("Creating engine pool with size={}", size);

        let mut started: Vec<EngineSession> = Vec::with_capacity(size);
        for index in 0..size {
            debug!("Starting engine {}/{}", index + 1, size);
            match Self::prepare_session(launcher, &options).await {
                Ok(session) => started.push(session),
                Err(e) => {
                    error!("Failed to start engine {}/{}: {}", index + 1, size, e);
                    for mut session in started {
                        session.terminate().await;
                    }
                    return Err(e);
                }
            }
        }

        let identity = started
            .first()
            .map(|session| session.identity().clone())
            .unwrap_or_default();
        if !identity.is_complete() {
            warn!("Engine identity is incomplete: {:?}", identity);
        }

        let sessions = started.iter().map(EngineSession::status).collect();
        let inner = PoolInner {
            idle: Mutex::new(started.into_iter().collect()),
            available: Semaphore::new(size),
            sessions,
            identity,
            options,
            closed: AtomicBool::new(false),
        };

        info!("Engine pool initialized with {} engines", size);
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    async fn prepare_session(
        launcher: &dyn EngineLauncher,
        options: &BTreeMap<String, String>,
    ) -> Result<EngineSession> {
        let mut session = launcher.launch().await?;

        match Self::configure(&mut session, options).await {
            Ok(()) => Ok(session),
            Err(e) => {
                session.terminate().await;
                Err(e)
            }
        }
    }

    async fn configure(session: &mut EngineSession, options: &BTreeMap<String, String>) -> Result<()> {
        session.handshake().await?;
        for (name, value) in options {
            session.set_option(name, value).await?;
        }
        Ok(())
    }

    /// Take a session out of the pool, waiting for one to become idle.
    ///
    /// Waiters are served in arrival order.
    ///
    /// # Errors
    /// Returns [`Error::PoolClosed`] if the pool is shut down.
    pub async fn acquire(&self) -> Result<PooledSession> {
        let permit = self
            .inner
            .available
            .acquire()
            .await
            .map_err(|_| Error::PoolClosed)?;
        permit.forget();

        let session = self
            .inner
            .idle
            .lock()
            .await
            .pop_front()
            .ok_or(Error::PoolClosed)?;
        debug!("Acquired engine session {}", session.id());

        Ok(PooledSession {
            session: Some(session),
            pool: Arc::clone(&self.inner),
        })
    }

    /// Reset a session and put it back into the pool.
    pub async fn release(&self, session: PooledSession) {
        session.release().await;
    }

    /// Analyze a position on any idle engine.
    ///
    /// The session is reset and returned to the pool whether or not the
    /// search succeeded.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        let mut session = self.acquire().await?;
        let outcome = Self::search_on(&mut session, request).await;
        session.release().await;

        let outcome = outcome?;
        Ok(AnalysisResult {
            bestmove: outcome.bestmove,
            variations: outcome.variations.into_iter().map(Variation::from).collect(),
            time_ms: u64::try_from(outcome.elapsed.as_millis()).unwrap_or(u64::MAX),
            engine_name: self.engine_name().to_string(),
        })
    }

    async fn search_on(session: &mut EngineSession, request: &AnalysisRequest) -> Result<SearchOutcome> {
        session.set_position(&request.position).await?;
        session
            .run_search(Some(request.time_ms), request.depth, request.multipv)
            .await
    }

    /// Run a mate search on any idle engine.
    pub async fn search_mate(&self, position: &Position, time_ms: u64) -> Result<MateOutcome> {
        let mut session = self.acquire().await?;
        let outcome = match session.set_position(position).await {
            Ok(()) => session.run_mate_search(time_ms).await,
            Err(e) => Err(e),
        };
        session.release().await;
        outcome
    }

    /// True if the pool has sessions and every engine is still running.
    pub fn is_healthy(&self) -> bool {
        !self.inner.sessions.is_empty() && self.inner.sessions.iter().all(|s| s.is_alive())
    }

    /// Identity reported by the first engine.
    pub fn identity(&self) -> &EngineIdentity {
        &self.inner.identity
    }

    fn engine_name(&self) -> &str {
        self.inner
            .identity
            .name
            .as_deref()
            .unwrap_or(DEFAULT_ENGINE_NAME)
    }

    /// Engine name, author and the options applied to every engine.
    pub fn engine_info(&self) -> EngineInfo {
        EngineInfo {
            name: self.engine_name().to_string(),
            author: self
                .inner
                .identity
                .author
                .clone()
                .unwrap_or_else(|| DEFAULT_ENGINE_AUTHOR.to_string()),
            version: ENGINE_VERSION.to_string(),
            options: self.inner.options.clone(),
        }
    }

    /// Get pool statistics.
    pub async fn stats(&self) -> PoolStats {
        let idle_count = self.inner.idle.lock().await.len();
        let total_count = self.inner.sessions.len();

        PoolStats {
            total_count,
            idle_count,
            active_count: total_count.saturating_sub(idle_count),
        }
    }

    /// Terminate every idle engine and close the pool.
    ///
    /// Waiting and future [`acquire`](Self::acquire) calls fail with
    /// [`Error::PoolClosed`]; sessions still in use are terminated when they
    /// are released. Calling this more than once is harmless.
    pub async fn shutdown(&self) {
        let sessions: Vec<EngineSession> = {
            let mut idle = self.inner.idle.lock().await;
            self.inner.closed.store(true, Ordering::SeqCst);
            self.inner.available.close();
            idle.drain(..).collect()
        };

        if sessions.is_empty() {
            debug!("Engine pool already drained");
            return;
        }

        for mut session in sessions {
            session.terminate().await;
        }
        info!("Engine pool shutdown complete");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl PoolInner {
    async fn release(&self, mut session: EngineSession) {
        if !self.closed.load(Ordering::SeqCst) && !session.reset().await {
            warn!(
                "Engine session {} did not acknowledge reset, returning it anyway",
                session.id()
            );
        }

        let mut idle = self.idle.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            drop(idle);
            debug!("Pool closed, terminating released session {}", session.id());
            session.terminate().await;
            return;
        }

        debug!("Releasing engine session {} back to pool", session.id());
        idle.push_back(session);
        self.available.add_permits(1);
    }
}

/// A session taken from an [`EnginePool`].
///
/// Dereferences to [`EngineSession`]. Call [`release`](Self::release) when
/// done; a guard dropped without it (e.g. a cancelled request) releases the
/// session in a background task.
pub struct PooledSession {
    session: Option<EngineSession>,
    pool: Arc<PoolInner>,
}

impl PooledSession {
    /// Reset the session and return it to its pool.
    ///
    /// The reset runs in its own task, so the session still reaches the pool
    /// if the caller is cancelled while waiting here.
    pub async fn release(mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let pool = Arc::clone(&self.pool);
        let task = tokio::spawn(async move { pool.release(session).await });
        if let Err(e) = task.await {
            error!("Engine session release task failed: {}", e);
        }
    }
}

impl Deref for PooledSession {
    type Target = EngineSession;

    fn deref(&self) -> &EngineSession {
        self.session
            .as_ref()
            .expect("pooled session is present until released")
    }
}

impl DerefMut for PooledSession {
    fn deref_mut(&mut self) -> &mut EngineSession {
        self.session
            .as_mut()
            .expect("pooled session is present until released")
    }
}

impl Drop for PooledSession {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let pool = Arc::clone(&self.pool);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { pool.release(session).await });
            }
            Err(_) => warn!(
                "Engine session {} dropped outside a runtime and lost from the pool",
                session.id()
            ),
        }
    }
}

/// Pool statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub total_count: usize,
    pub idle_count: usize,
    pub active_count: usize,
}
