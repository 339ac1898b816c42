//! Background worker task.
//!
//! One long-lived thread per running server instance. The worker commits
//! the RUNNING transition and the readiness bit together, under the lock —
//! the single place in the module that sets RUNNING — then parks on the
//! wake notification, checking the exit flag on each wake. The loop body is
//! a hook point for deferred actions requested by handlers.

use std::sync::Arc;
use std::thread;

use tracing::{debug, warn};

use crate::engine::EngineServer;
use crate::lifecycle::{ServerState, Shared};

/// Spawn the worker if it is not already alive. Returns false when the
/// thread cannot be created, which the caller treats as attempt failure.
pub(crate) fn start_worker<S: EngineServer>(shared: &Arc<Shared<S>>) -> bool {
    {
        let mut inner = shared.inner.lock().unwrap();
        if inner.worker_alive {
            return true;
        }
        inner.exit_requested = false;
        // Marked alive before spawn so a racing start() does not double-spawn.
        inner.worker_alive = true;
    }

    let worker_shared = Arc::clone(shared);
    let spawned = thread::Builder::new()
        .name("http-srv-worker".into())
        .spawn(move || worker_main(worker_shared));

    match spawned {
        Ok(_) => true,
        Err(e) => {
            warn!("failed to create worker task: {e}");
            shared.inner.lock().unwrap().worker_alive = false;
            false
        }
    }
}

fn worker_main<S: EngineServer>(shared: Arc<Shared<S>>) {
    {
        let mut inner = shared.inner.lock().unwrap();
        if inner.state == ServerState::Starting {
            inner.state = ServerState::Running;
            shared.ready.set();
        }
    }
    debug!("worker task scheduled");

    loop {
        shared.wake.wait();

        let exit_now = shared.inner.lock().unwrap().exit_requested;
        if exit_now {
            break;
        }

        // Deferred work would run here.
    }

    let mut inner = shared.inner.lock().unwrap();
    shared.ready.clear();
    inner.worker_alive = false;
    debug!("worker task exited");
}
