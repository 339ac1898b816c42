//! # Lifecycle State Machine
//!
//! [`HttpController`] owns the transport server handle and the background
//! worker, and drives the STOPPED → STARTING → RUNNING → STOPPING → STOPPED
//! cycle. All shared mutable state sits behind one mutex; blocking waits
//! (readiness, worker exit) always happen with the lock released.
//!
//! The RUNNING transition is made by the worker task, not by `start()`: once
//! the worker is scheduled it flips STARTING → RUNNING and sets the
//! readiness bit in the same critical section, so any caller that observes
//! readiness also observes a valid server handle. `start()` itself is
//! fire-and-forget — transient bring-up failures are retried with
//! exponential backoff and the final outcome is observed through
//! [`HttpController::is_running`] / [`HttpController::wait_until_running`].

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use http::Method;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::engine::{Engine, EngineServer, RequestHandler};
use crate::error::{RegisterError, WaitError};
use crate::handlers::{FaviconHandler, RootHandler};
use crate::static_files::StaticFiles;
use crate::worker;

/// Startup attempts before giving up and forcing STOPPED.
const MAX_START_ATTEMPTS: u32 = 5;

/// Seed for the exponentially doubling retry backoff.
const INITIAL_BACKOFF: Duration = Duration::from_millis(50);

/// How long one startup attempt waits for the worker to commit readiness.
const WORKER_READY_TIMEOUT: Duration = Duration::from_millis(500);

/// Bounded wait for worker exit during stop: iterations x poll interval.
const WORKER_STOP_ITERATIONS: u32 = 50;
const WORKER_STOP_POLL: Duration = Duration::from_millis(20);

/// Lifecycle state of the server module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Settable/clearable readiness bit with a timed wait.
pub(crate) struct ReadySignal {
    bit: Mutex<bool>,
    cond: Condvar,
}

impl ReadySignal {
    fn new() -> Self {
        Self {
            bit: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    pub(crate) fn set(&self) {
        *self.bit.lock().unwrap() = true;
        self.cond.notify_all();
    }

    pub(crate) fn clear(&self) {
        *self.bit.lock().unwrap() = false;
    }

    /// Wait for the bit with a timeout. A zero timeout is a poll.
    fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut bit = self.bit.lock().unwrap();
        loop {
            if *bit {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            bit = self.cond.wait_timeout(bit, deadline - now).unwrap().0;
        }
    }
}

/// One-shot wake notification for the worker task. Counting, so a notify
/// that lands before the worker blocks is not lost.
pub(crate) struct WakeSignal {
    pending: Mutex<u32>,
    cond: Condvar,
}

impl WakeSignal {
    fn new() -> Self {
        Self {
            pending: Mutex::new(0),
            cond: Condvar::new(),
        }
    }

    pub(crate) fn notify(&self) {
        *self.pending.lock().unwrap() += 1;
        self.cond.notify_one();
    }

    /// Block until a notification arrives. This is the only unbounded wait
    /// in the module; `stop()` always pairs an exit request with a notify.
    pub(crate) fn wait(&self) {
        let mut pending = self.pending.lock().unwrap();
        while *pending == 0 {
            pending = self.cond.wait(pending).unwrap();
        }
        *pending -= 1;
    }
}

/// Mutable state guarded by the controller lock.
pub(crate) struct Inner<S> {
    pub(crate) state: ServerState,
    pub(crate) server: Option<Arc<S>>,
    pub(crate) worker_alive: bool,
    pub(crate) exit_requested: bool,
    pub(crate) max_open_sockets: usize,
}

/// State shared between the controller and the worker task.
pub(crate) struct Shared<S> {
    pub(crate) inner: Mutex<Inner<S>>,
    pub(crate) ready: ReadySignal,
    pub(crate) wake: WakeSignal,
}

/// Owned lifecycle context for one server instance.
///
/// All operations are thread-safe and callable from any task; the
/// controller is usually wrapped in an `Arc` and shared.
pub struct HttpController<E: Engine> {
    engine: E,
    config: ServerConfig,
    shared: Arc<Shared<E::Server>>,
    root_handler: Arc<dyn RequestHandler>,
    favicon_handler: Arc<dyn RequestHandler>,
}

impl<E: Engine> HttpController<E> {
    /// Build a controller in the STOPPED state.
    ///
    /// If the configuration enables static serving, the mount is validated
    /// here, once. A failed mount is logged and the module degrades to the
    /// embedded fallback pages; it does not prevent construction.
    pub fn new(engine: E, config: ServerConfig) -> Self {
        let statics = config.static_mount.as_ref().and_then(|mount| {
            match StaticFiles::mount(mount) {
                Ok(sf) => Some(Arc::new(sf)),
                Err(e) => {
                    warn!(
                        "static mount '{}' unavailable, serving embedded pages only: {e}",
                        mount.base_path
                    );
                    None
                }
            }
        });

        Self {
            engine,
            config,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: ServerState::Stopped,
                    server: None,
                    worker_alive: false,
                    exit_requested: false,
                    max_open_sockets: 0,
                }),
                ready: ReadySignal::new(),
                wake: WakeSignal::new(),
            }),
            root_handler: Arc::new(RootHandler::new(statics.clone())),
            favicon_handler: Arc::new(FaviconHandler::new(statics)),
        }
    }

    /// Start the server and worker task.
    ///
    /// Idempotent and thread-safe; a no-op while the module is running,
    /// starting, or stopping. Performs up to five attempts with an
    /// exponentially doubling backoff; each attempt brings up the transport,
    /// registers the default URIs, spawns the worker, and waits for it to
    /// commit readiness. Failures are absorbed: after the last attempt the
    /// state is forced back to STOPPED and nothing is returned — use
    /// [`wait_until_running`](Self::wait_until_running) to observe the
    /// outcome.
    pub fn start(&self) {
        {
            let mut inner = self.shared.inner.lock().unwrap();
            match inner.state {
                ServerState::Running | ServerState::Starting | ServerState::Stopping => return,
                ServerState::Stopped => {}
            }
            inner.state = ServerState::Starting;
            inner.exit_requested = false;
            self.shared.ready.clear();
        }

        let mut backoff = INITIAL_BACKOFF;
        for attempt in 1..=MAX_START_ATTEMPTS {
            if let Err(e) = self.bring_up_server() {
                warn!("server bring-up failed (attempt {attempt}/{MAX_START_ATTEMPTS}): {e}");
                thread::sleep(backoff);
                backoff *= 2;
                continue;
            }

            if !worker::start_worker(&self.shared) {
                warn!("worker task creation failed (attempt {attempt}/{MAX_START_ATTEMPTS})");
                self.tear_down_server();
                thread::sleep(backoff);
                backoff *= 2;
                continue;
            }

            if self.shared.ready.wait(WORKER_READY_TIMEOUT) {
                info!("server running (attempt {attempt})");
                return;
            }

            warn!("worker readiness timed out (attempt {attempt}/{MAX_START_ATTEMPTS})");
            self.stop_worker();
            self.tear_down_server();
            {
                // A slow worker may have committed RUNNING after the timeout
                // fired; rewind so the next attempt's worker commits again.
                // A concurrent stop() has already settled the module: leave
                // its STOPPED in place and abandon the retry loop.
                let mut inner = self.shared.inner.lock().unwrap();
                match inner.state {
                    ServerState::Starting | ServerState::Running => {
                        inner.state = ServerState::Starting;
                    }
                    ServerState::Stopping | ServerState::Stopped => return,
                }
            }
            thread::sleep(backoff);
            backoff *= 2;
        }

        error!("server failed to start after {MAX_START_ATTEMPTS} attempts");
        let mut inner = self.shared.inner.lock().unwrap();
        inner.state = ServerState::Stopped;
        self.shared.ready.clear();
    }

    /// Stop the server and worker task.
    ///
    /// Idempotent and thread-safe; a no-op when already stopped. The wait
    /// for worker exit is bounded (about one second); if it trips, teardown
    /// proceeds anyway with a warning. `stop()` never blocks indefinitely
    /// and never fails.
    pub fn stop(&self) {
        {
            let mut inner = self.shared.inner.lock().unwrap();
            if inner.state == ServerState::Stopped {
                return;
            }
            inner.state = ServerState::Stopping;
            inner.exit_requested = true;
            self.shared.ready.clear();
        }
        self.shared.wake.notify();

        self.stop_worker();
        self.tear_down_server();

        let mut inner = self.shared.inner.lock().unwrap();
        inner.state = ServerState::Stopped;
        self.shared.ready.clear();
        info!("server stopped");
    }

    /// True iff the module is fully running.
    pub fn is_running(&self) -> bool {
        self.shared.inner.lock().unwrap().state == ServerState::Running
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ServerState {
        self.shared.inner.lock().unwrap().state
    }

    /// Block until the module is running.
    ///
    /// Returns immediately when already running. A zero timeout is a
    /// non-blocking poll.
    ///
    /// # Errors
    ///
    /// [`WaitError::InvalidState`] when the module is stopped or stopping
    /// (no transition is in flight to wait for), [`WaitError::Timeout`] when
    /// the timeout expires first.
    pub fn wait_until_running(&self, timeout: Duration) -> Result<(), WaitError> {
        {
            let inner = self.shared.inner.lock().unwrap();
            match inner.state {
                ServerState::Running => return Ok(()),
                ServerState::Stopped | ServerState::Stopping => {
                    return Err(WaitError::InvalidState)
                }
                ServerState::Starting => {}
            }
        }

        if self.shared.ready.wait(timeout) {
            Ok(())
        } else {
            Err(WaitError::Timeout)
        }
    }

    /// Register a URI handler on the running server.
    ///
    /// Safe to race against a concurrent `stop()`: the state check and the
    /// engine call happen under the same lock scope that the teardown path
    /// uses to take the handle.
    ///
    /// # Errors
    ///
    /// [`RegisterError::InvalidState`] when not running, plus whatever the
    /// engine reports (invalid pattern, duplicate, capacity).
    pub fn register_uri(
        &self,
        path: &str,
        method: Method,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<(), RegisterError> {
        if path.is_empty() {
            return Err(RegisterError::InvalidArg);
        }
        let inner = self.shared.inner.lock().unwrap();
        if inner.state != ServerState::Running {
            return Err(RegisterError::InvalidState);
        }
        let Some(server) = inner.server.as_ref() else {
            return Err(RegisterError::InvalidState);
        };
        server.register(path, method, handler)
    }

    /// Remove a URI handler from the running server.
    ///
    /// # Errors
    ///
    /// Same state requirements as [`register_uri`](Self::register_uri).
    pub fn unregister_uri(&self, path: &str, method: &Method) -> Result<(), RegisterError> {
        if path.is_empty() {
            return Err(RegisterError::InvalidArg);
        }
        let inner = self.shared.inner.lock().unwrap();
        if inner.state != ServerState::Running {
            return Err(RegisterError::InvalidState);
        }
        let Some(server) = inner.server.as_ref() else {
            return Err(RegisterError::InvalidState);
        };
        server.unregister(path, method)
    }

    /// Force-close active client sessions. Best-effort; a no-op when the
    /// server is not up or the configured socket ceiling is zero.
    pub fn close_all_sessions(&self) {
        let (server, max_socks) = {
            let inner = self.shared.inner.lock().unwrap();
            let Some(server) = inner.server.as_ref() else {
                return;
            };
            (Arc::clone(server), inner.max_open_sockets)
        };
        if max_socks == 0 {
            return;
        }

        let sessions = server.client_sessions(max_socks);
        debug!("closing {} client session(s)", sessions.len());
        for id in sessions {
            server.close_session(id);
        }
    }

    /// The transport's bound address, when up. Mostly useful with an
    /// OS-assigned port.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        let inner = self.shared.inner.lock().unwrap();
        inner.server.as_ref().and_then(|s| s.local_addr())
    }

    /// One startup attempt of the transport: bring the engine up and install
    /// the default URI handlers, rolling the engine back if any registration
    /// fails.
    fn bring_up_server(&self) -> io::Result<()> {
        if self.shared.inner.lock().unwrap().server.is_some() {
            return Ok(());
        }

        let server = self.engine.bring_up(&self.config)?;
        {
            let mut inner = self.shared.inner.lock().unwrap();
            if inner.server.is_some() {
                // Another caller won the race; discard the duplicate.
                drop(inner);
                server.shut_down();
                return Ok(());
            }
            inner.max_open_sockets = self.config.max_open_sockets;
            inner.server = Some(Arc::new(server));
        }

        let defaults: [(&str, Arc<dyn RequestHandler>); 4] = [
            ("/", Arc::clone(&self.root_handler)),
            ("/index.html", Arc::clone(&self.root_handler)),
            ("/index.htm", Arc::clone(&self.root_handler)),
            ("/favicon.ico", Arc::clone(&self.favicon_handler)),
        ];
        for (path, handler) in defaults {
            if let Err(e) = self.register_internal(path, Method::GET, handler) {
                error!("default URI registration failed for {path}: {e}");
                self.tear_down_server();
                return Err(io::Error::other(e));
            }
        }
        Ok(())
    }

    /// Registration path used during startup: accepts STARTING as well as
    /// RUNNING, since the default URIs go in before readiness is committed.
    fn register_internal(
        &self,
        path: &str,
        method: Method,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<(), RegisterError> {
        let inner = self.shared.inner.lock().unwrap();
        if !matches!(inner.state, ServerState::Starting | ServerState::Running) {
            return Err(RegisterError::InvalidState);
        }
        let Some(server) = inner.server.as_ref() else {
            return Err(RegisterError::InvalidState);
        };
        server.register(path, method, handler)
    }

    /// Take the server handle out under the lock, then shut it down outside.
    fn tear_down_server(&self) {
        let server = self.shared.inner.lock().unwrap().server.take();
        if let Some(server) = server {
            server.shut_down();
        }
    }

    /// Request worker exit and wait, bounded, for it to clear its liveness
    /// flag. Returns false (with a warning) if the bound trips.
    fn stop_worker(&self) -> bool {
        {
            let mut inner = self.shared.inner.lock().unwrap();
            if !inner.worker_alive {
                return true;
            }
            inner.exit_requested = true;
        }
        self.shared.wake.notify();

        for _ in 0..WORKER_STOP_ITERATIONS {
            if !self.shared.inner.lock().unwrap().worker_alive {
                return true;
            }
            thread::sleep(WORKER_STOP_POLL);
        }

        warn!("worker task did not stop within timeout");
        false
    }
}
