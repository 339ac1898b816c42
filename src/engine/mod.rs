//! Transport engine boundary.
//!
//! The lifecycle state machine never talks to sockets directly; it drives an
//! [`Engine`] that brings up an [`EngineServer`], and request handling flows
//! through [`RequestHandler`] capability objects registered per
//! (path, method). The production engine lives in [`minihttp`] and runs on
//! `may` coroutines; tests substitute a scriptable fake behind the same
//! traits.

pub mod minihttp;
pub mod response;

pub use minihttp::{MiniHttpEngine, MiniHttpServer};
pub use response::ResponseWriter;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use http::Method;

use crate::config::ServerConfig;
use crate::error::RegisterError;

/// Parsed request data handed to a [`RequestHandler`].
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Request path with the query string stripped.
    pub uri: String,
    /// Raw query string, if present.
    pub query: Option<String>,
    /// Header (name, value) pairs; names are lowercased by the engine.
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// Look up a header by lowercase name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Opaque identifier for an active client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

/// Capability object invoked by the engine for a matched URI.
///
/// Handlers must do only short, bounded work; anything longer belongs on the
/// worker task. A handler must leave the connection with a terminated
/// response: either complete a send through the writer or return an error,
/// in which case the engine terminates the response itself.
pub trait RequestHandler: Send + Sync {
    fn handle(&self, req: &HttpRequest, res: &mut ResponseWriter<'_>) -> io::Result<()>;
}

/// A running transport server, owned by the lifecycle component.
pub trait EngineServer: Send + Sync + 'static {
    /// Install a handler for a URI pattern and method.
    ///
    /// Patterns may end in `*` to match any suffix. One registration per
    /// (path, method); a duplicate fails with
    /// [`RegisterError::AlreadyRegistered`].
    fn register(
        &self,
        path: &str,
        method: Method,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<(), RegisterError>;

    /// Remove a previously installed handler.
    fn unregister(&self, path: &str, method: &Method) -> Result<(), RegisterError>;

    /// Enumerate up to `max` active client sessions.
    fn client_sessions(&self, max: usize) -> Vec<SessionId>;

    /// Request that a client session be closed. Best-effort.
    fn close_session(&self, id: SessionId);

    /// The address the engine is bound to.
    fn local_addr(&self) -> Option<SocketAddr>;

    /// Tear the server down: stop accepting, drop the listener, and close
    /// any remaining sessions. Idempotent.
    fn shut_down(&self);
}

/// Factory for [`EngineServer`] instances.
///
/// `bring_up` is one attempt of the lifecycle start sequence; transient
/// failures are reported as `io::Error` and retried by the caller with
/// backoff.
pub trait Engine: Send + Sync + 'static {
    type Server: EngineServer;

    fn bring_up(&self, config: &ServerConfig) -> io::Result<Self::Server>;
}
