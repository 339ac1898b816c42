#![allow(dead_code)]

/// Scriptable fake transport engine for lifecycle tests.
///
/// Records bring-up attempts, registrations, and session closes, and can be
/// told to fail the next N bring-ups to exercise the retry path.
pub mod fake {
    use std::io;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use http::Method;
    use littleserve::{
        Engine, EngineServer, RegisterError, RequestHandler, ServerConfig, SessionId,
    };

    #[derive(Default)]
    pub struct FakeState {
        /// Number of upcoming bring_up calls that should fail.
        pub fail_bring_ups: AtomicUsize,
        pub bring_up_calls: AtomicUsize,
        /// Servers brought up and not yet shut down.
        pub live_servers: AtomicUsize,
        pub last_server: Mutex<Option<Arc<FakeServerState>>>,
        /// Stall the Nth register call (1-based, per server) for the given
        /// duration, to widen startup/shutdown race windows.
        pub slow_register: Mutex<Option<(usize, Duration)>>,
    }

    impl FakeState {
        pub fn last_server(&self) -> Arc<FakeServerState> {
            self.last_server
                .lock()
                .unwrap()
                .clone()
                .expect("no server was brought up")
        }
    }

    #[derive(Default)]
    pub struct FakeServerState {
        pub routes: Mutex<Vec<(String, Method)>>,
        pub sessions: Mutex<Vec<u64>>,
        pub closed: Mutex<Vec<u64>>,
        pub is_shut_down: AtomicBool,
        pub capacity: AtomicUsize,
        pub register_calls: AtomicUsize,
    }

    impl FakeServerState {
        pub fn registered_paths(&self) -> Vec<String> {
            self.routes
                .lock()
                .unwrap()
                .iter()
                .map(|(p, _)| p.clone())
                .collect()
        }

        pub fn add_session(&self, id: u64) {
            self.sessions.lock().unwrap().push(id);
        }
    }

    #[derive(Clone, Default)]
    pub struct FakeEngine {
        pub state: Arc<FakeState>,
    }

    impl FakeEngine {
        pub fn failing_first(n: usize) -> Self {
            let engine = Self::default();
            engine.state.fail_bring_ups.store(n, Ordering::SeqCst);
            engine
        }
    }

    pub struct FakeServer {
        engine: Arc<FakeState>,
        pub state: Arc<FakeServerState>,
    }

    impl Engine for FakeEngine {
        type Server = FakeServer;

        fn bring_up(&self, config: &ServerConfig) -> io::Result<FakeServer> {
            self.state.bring_up_calls.fetch_add(1, Ordering::SeqCst);

            let remaining = self.state.fail_bring_ups.load(Ordering::SeqCst);
            if remaining > 0 {
                self.state
                    .fail_bring_ups
                    .store(remaining - 1, Ordering::SeqCst);
                return Err(io::Error::other("simulated bring-up failure"));
            }

            let server_state = Arc::new(FakeServerState::default());
            server_state
                .capacity
                .store(config.max_uri_handlers, Ordering::SeqCst);
            *self.state.last_server.lock().unwrap() = Some(Arc::clone(&server_state));
            self.state.live_servers.fetch_add(1, Ordering::SeqCst);

            Ok(FakeServer {
                engine: Arc::clone(&self.state),
                state: server_state,
            })
        }
    }

    impl EngineServer for FakeServer {
        fn register(
            &self,
            path: &str,
            method: Method,
            _handler: Arc<dyn RequestHandler>,
        ) -> Result<(), RegisterError> {
            if path.is_empty() || !path.starts_with('/') {
                return Err(RegisterError::InvalidArg);
            }
            let call = self.state.register_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some((at, delay)) = *self.engine.slow_register.lock().unwrap() {
                if call == at {
                    std::thread::sleep(delay);
                }
            }
            let mut routes = self.state.routes.lock().unwrap();
            if routes.iter().any(|(p, m)| p == path && *m == method) {
                return Err(RegisterError::AlreadyRegistered);
            }
            if routes.len() >= self.state.capacity.load(Ordering::SeqCst) {
                return Err(RegisterError::CapacityExceeded);
            }
            routes.push((path.to_string(), method));
            Ok(())
        }

        fn unregister(&self, path: &str, method: &Method) -> Result<(), RegisterError> {
            let mut routes = self.state.routes.lock().unwrap();
            let before = routes.len();
            routes.retain(|(p, m)| !(p == path && m == method));
            if routes.len() == before {
                return Err(RegisterError::NotFound);
            }
            Ok(())
        }

        fn client_sessions(&self, max: usize) -> Vec<SessionId> {
            self.state
                .sessions
                .lock()
                .unwrap()
                .iter()
                .take(max)
                .map(|&id| SessionId(id))
                .collect()
        }

        fn close_session(&self, id: SessionId) {
            self.state.closed.lock().unwrap().push(id.0);
        }

        fn local_addr(&self) -> Option<SocketAddr> {
            None
        }

        fn shut_down(&self) {
            if !self.state.is_shut_down.swap(true, Ordering::SeqCst) {
                self.engine.live_servers.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }
}

pub mod test_server {
    use std::sync::Once;

    /// Ensures May coroutines are configured only once across tests.
    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }
}
