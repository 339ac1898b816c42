//! Lifecycle state machine tests against a scriptable fake engine.
//!
//! Covers the start/stop contract: idempotence, the readiness handshake,
//! bounded retries with eventual STOPPED on exhaustion, registration state
//! requirements, and session control.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use http::Method;
use littleserve::{
    HttpController, HttpRequest, RegisterError, RequestHandler, ResponseWriter, ServerConfig,
    ServerState, WaitError,
};

mod common;
use common::fake::FakeEngine;

struct NoopHandler;

impl RequestHandler for NoopHandler {
    fn handle(&self, _req: &HttpRequest, res: &mut ResponseWriter<'_>) -> std::io::Result<()> {
        res.send(b"ok")
    }
}

fn test_config() -> ServerConfig {
    ServerConfig {
        port: 0,
        ..ServerConfig::default()
    }
}

fn controller_with(engine: FakeEngine) -> HttpController<FakeEngine> {
    HttpController::new(engine, test_config())
}

#[test]
fn test_start_reaches_running_and_registers_defaults() {
    let engine = FakeEngine::default();
    let state = Arc::clone(&engine.state);
    let controller = controller_with(engine);

    controller.start();
    assert!(controller.is_running());
    assert_eq!(controller.state(), ServerState::Running);
    assert_eq!(state.bring_up_calls.load(Ordering::SeqCst), 1);

    let paths = state.last_server().registered_paths();
    assert_eq!(paths, ["/", "/index.html", "/index.htm", "/favicon.ico"]);

    controller.stop();
    assert_eq!(controller.state(), ServerState::Stopped);
    assert_eq!(state.live_servers.load(Ordering::SeqCst), 0);
}

#[test]
fn test_start_is_idempotent_while_running() {
    let engine = FakeEngine::default();
    let state = Arc::clone(&engine.state);
    let controller = controller_with(engine);

    controller.start();
    controller.start();
    controller.start();
    assert_eq!(state.bring_up_calls.load(Ordering::SeqCst), 1);

    controller.stop();
}

#[test]
fn test_stop_on_stopped_instance_is_a_noop() {
    let engine = FakeEngine::default();
    let state = Arc::clone(&engine.state);
    let controller = controller_with(engine);

    controller.stop();
    controller.stop();

    assert_eq!(controller.state(), ServerState::Stopped);
    assert_eq!(state.bring_up_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_wait_until_running_zero_timeout_polls() {
    let controller = controller_with(FakeEngine::default());

    // STOPPED: no transition in flight, fail fast.
    assert_eq!(
        controller.wait_until_running(Duration::ZERO),
        Err(WaitError::InvalidState)
    );

    controller.start();
    assert_eq!(controller.wait_until_running(Duration::ZERO), Ok(()));
    assert!(controller.is_running());

    controller.stop();
    assert_eq!(
        controller.wait_until_running(Duration::from_millis(50)),
        Err(WaitError::InvalidState)
    );
}

#[test]
fn test_transient_bring_up_failures_are_retried() {
    let engine = FakeEngine::failing_first(2);
    let state = Arc::clone(&engine.state);
    let controller = controller_with(engine);

    controller.start();
    assert!(controller.is_running());
    // Two failed attempts plus the successful third.
    assert_eq!(state.bring_up_calls.load(Ordering::SeqCst), 3);

    controller.stop();
}

#[test]
fn test_exhausted_retries_leave_stopped_with_no_leaks() {
    let engine = FakeEngine::failing_first(5);
    let state = Arc::clone(&engine.state);
    let controller = controller_with(engine);

    controller.start();

    assert!(!controller.is_running());
    assert_eq!(controller.state(), ServerState::Stopped);
    assert_eq!(state.bring_up_calls.load(Ordering::SeqCst), 5);
    assert_eq!(state.live_servers.load(Ordering::SeqCst), 0);
    assert_eq!(
        controller.wait_until_running(Duration::ZERO),
        Err(WaitError::InvalidState)
    );

    // The instance is reusable once the transient condition clears.
    controller.start();
    assert!(controller.is_running());
    controller.stop();
    assert_eq!(state.live_servers.load(Ordering::SeqCst), 0);
}

#[test]
fn test_register_requires_running_state() {
    let controller = controller_with(FakeEngine::default());

    assert_eq!(
        controller.register_uri("/api", Method::GET, Arc::new(NoopHandler)),
        Err(RegisterError::InvalidState)
    );

    controller.start();
    assert_eq!(
        controller.register_uri("/api", Method::GET, Arc::new(NoopHandler)),
        Ok(())
    );

    controller.stop();
    assert_eq!(
        controller.register_uri("/other", Method::GET, Arc::new(NoopHandler)),
        Err(RegisterError::InvalidState)
    );
}

#[test]
fn test_duplicate_registration_surfaces_engine_error() {
    let controller = controller_with(FakeEngine::default());
    controller.start();

    assert_eq!(
        controller.register_uri("/api", Method::GET, Arc::new(NoopHandler)),
        Ok(())
    );
    assert_eq!(
        controller.register_uri("/api", Method::GET, Arc::new(NoopHandler)),
        Err(RegisterError::AlreadyRegistered)
    );
    // Same path, different method is a distinct registration.
    assert_eq!(
        controller.register_uri("/api", Method::POST, Arc::new(NoopHandler)),
        Ok(())
    );

    controller.stop();
}

#[test]
fn test_empty_path_is_invalid_argument() {
    let controller = controller_with(FakeEngine::default());
    controller.start();

    assert_eq!(
        controller.register_uri("", Method::GET, Arc::new(NoopHandler)),
        Err(RegisterError::InvalidArg)
    );
    assert_eq!(
        controller.unregister_uri("", &Method::GET),
        Err(RegisterError::InvalidArg)
    );

    controller.stop();
}

#[test]
fn test_unregister_round_trip() {
    let controller = controller_with(FakeEngine::default());
    controller.start();

    controller
        .register_uri("/api", Method::GET, Arc::new(NoopHandler))
        .unwrap();
    assert_eq!(controller.unregister_uri("/api", &Method::GET), Ok(()));
    assert_eq!(
        controller.unregister_uri("/api", &Method::GET),
        Err(RegisterError::NotFound)
    );

    controller.stop();
}

#[test]
fn test_close_all_sessions_is_bounded_by_socket_ceiling() {
    let engine = FakeEngine::default();
    let state = Arc::clone(&engine.state);
    let controller = HttpController::new(
        engine,
        ServerConfig {
            port: 0,
            max_open_sockets: 2,
            ..ServerConfig::default()
        },
    );

    controller.start();
    let server = state.last_server();
    server.add_session(10);
    server.add_session(11);
    server.add_session(12);

    controller.close_all_sessions();
    assert_eq!(*server.closed.lock().unwrap(), [10, 11]);

    controller.stop();
}

#[test]
fn test_close_all_sessions_noop_when_ceiling_is_zero() {
    let engine = FakeEngine::default();
    let state = Arc::clone(&engine.state);
    let controller = HttpController::new(
        engine,
        ServerConfig {
            port: 0,
            max_open_sockets: 0,
            ..ServerConfig::default()
        },
    );

    controller.start();
    let server = state.last_server();
    server.add_session(10);

    controller.close_all_sessions();
    assert!(server.closed.lock().unwrap().is_empty());

    controller.stop();
}

#[test]
fn test_close_all_sessions_noop_when_not_running() {
    let engine = FakeEngine::default();
    let state = Arc::clone(&engine.state);
    let controller = controller_with(engine);

    // Never started: nothing to snapshot, nothing to close.
    controller.close_all_sessions();
    assert!(state.last_server.lock().unwrap().is_none());
}

#[test]
fn test_restart_cycle() {
    let engine = FakeEngine::default();
    let state = Arc::clone(&engine.state);
    let controller = controller_with(engine);

    for _ in 0..3 {
        controller.start();
        assert!(controller.is_running());
        controller.stop();
        assert_eq!(controller.state(), ServerState::Stopped);
    }
    assert_eq!(state.bring_up_calls.load(Ordering::SeqCst), 3);
    assert_eq!(state.live_servers.load(Ordering::SeqCst), 0);
}

#[test]
fn test_interleaved_start_stop_from_many_threads() {
    let engine = FakeEngine::default();
    let state = Arc::clone(&engine.state);
    let controller = Arc::new(controller_with(engine));

    let mut workers = Vec::new();
    for i in 0..6 {
        let controller = Arc::clone(&controller);
        workers.push(thread::spawn(move || {
            for round in 0..6 {
                if (i + round) % 2 == 0 {
                    controller.start();
                } else {
                    controller.stop();
                }
                // The state is always a legal point on the lifecycle path.
                let observed = controller.state();
                assert!(matches!(
                    observed,
                    ServerState::Stopped
                        | ServerState::Starting
                        | ServerState::Running
                        | ServerState::Stopping
                ));
            }
        }));
    }
    for worker in workers {
        // A panicking worker means a call blocked or an invariant broke.
        worker.join().expect("lifecycle worker panicked");
    }

    controller.stop();
    assert_eq!(controller.state(), ServerState::Stopped);
    assert!(!controller.is_running());
    assert_eq!(state.live_servers.load(Ordering::SeqCst), 0);
}

#[test]
fn test_stop_during_slow_startup_stays_stopped() {
    // Stall the last default registration so stop() lands mid-attempt;
    // the lingering start() must not bring the server back afterwards.
    let engine = FakeEngine::default();
    *engine.state.slow_register.lock().unwrap() = Some((4, Duration::from_millis(300)));
    let state = Arc::clone(&engine.state);
    let controller = Arc::new(controller_with(engine));

    let starter = {
        let controller = Arc::clone(&controller);
        thread::spawn(move || controller.start())
    };
    thread::sleep(Duration::from_millis(50));
    controller.stop();
    assert!(!controller.is_running());

    starter.join().expect("start() panicked");
    assert!(!controller.is_running());
    assert_eq!(controller.state(), ServerState::Stopped);
    assert_eq!(state.live_servers.load(Ordering::SeqCst), 0);
}
