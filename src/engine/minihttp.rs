//! Production transport engine on `may` coroutines.
//!
//! One coroutine runs the accept loop; each connection gets its own
//! coroutine that parses the request with `httparse`, looks up a registered
//! handler, and writes exactly one terminated response before the connection
//! closes. Every live connection is tracked in a session registry so the
//! lifecycle layer can enumerate and force-close clients.
//!
//! URI patterns support a trailing-`*` wildcard; patterns are compiled to
//! anchored regexes at registration time and matched in registration order.

use std::collections::HashMap;
use std::io::{self, BufWriter, Read, Write};
use std::net::{Shutdown, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use http::Method;
use may::coroutine::JoinHandle;
use may::net::{TcpListener, TcpStream};
use regex::Regex;
use tracing::{debug, warn};

use super::{Engine, EngineServer, HttpRequest, RequestHandler, SessionId};
use crate::config::ServerConfig;
use crate::error::RegisterError;

/// Upper bound on the request head (request line + headers).
const MAX_HEAD_BYTES: usize = 16 * 1024;

/// Header slots handed to httparse. 32 covers gateway/proxy traffic.
const MAX_HEADERS: usize = 32;

struct RouteEntry {
    pattern: String,
    method: Method,
    matcher: Regex,
    handler: Arc<dyn RequestHandler>,
}

struct RouteTable {
    entries: Vec<RouteEntry>,
    capacity: usize,
}

struct EngineShared {
    routes: RwLock<RouteTable>,
    sessions: Mutex<HashMap<u64, TcpStream>>,
    next_session: AtomicU64,
    shutting_down: AtomicBool,
}

/// Factory for the `may`-based transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct MiniHttpEngine;

/// A bound, accepting transport server.
pub struct MiniHttpServer {
    shared: Arc<EngineShared>,
    accept: Mutex<Option<JoinHandle<()>>>,
    addr: SocketAddr,
}

/// Compile a URI pattern into an anchored regex. `*` matches any suffix
/// (or infix) of the path; everything else is literal.
fn compile_pattern(pattern: &str) -> Result<Regex, RegisterError> {
    if pattern.is_empty() || !pattern.starts_with('/') {
        return Err(RegisterError::InvalidArg);
    }
    let escaped: Vec<String> = pattern.split('*').map(regex::escape).collect();
    let source = format!("^{}$", escaped.join(".*"));
    Regex::new(&source).map_err(|_| RegisterError::InvalidArg)
}

impl Engine for MiniHttpEngine {
    type Server = MiniHttpServer;

    fn bring_up(&self, config: &ServerConfig) -> io::Result<MiniHttpServer> {
        let listener = TcpListener::bind(("0.0.0.0", config.port))?;
        let addr = listener.local_addr()?;

        let shared = Arc::new(EngineShared {
            routes: RwLock::new(RouteTable {
                entries: Vec::new(),
                capacity: config.max_uri_handlers,
            }),
            sessions: Mutex::new(HashMap::new()),
            next_session: AtomicU64::new(1),
            shutting_down: AtomicBool::new(false),
        });

        let loop_shared = Arc::clone(&shared);
        let accept = may::go!(move || accept_loop(listener, loop_shared));

        debug!("transport engine listening on {addr}");
        Ok(MiniHttpServer {
            shared,
            accept: Mutex::new(Some(accept)),
            addr,
        })
    }
}

fn accept_loop(listener: TcpListener, shared: Arc<EngineShared>) {
    for stream in listener.incoming() {
        if shared.shutting_down.load(Ordering::SeqCst) {
            break;
        }
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                warn!("accept failed: {e}");
                continue;
            }
        };

        let id = shared.next_session.fetch_add(1, Ordering::SeqCst);
        if let Ok(clone) = stream.try_clone() {
            shared.sessions.lock().unwrap().insert(id, clone);
        }

        let conn_shared = Arc::clone(&shared);
        may::go!(move || {
            serve_connection(stream, &conn_shared);
            conn_shared.sessions.lock().unwrap().remove(&id);
        });
    }
}

/// Read the request head, growing the buffer until httparse reports a
/// complete request or the size cap trips.
fn read_request(stream: &mut TcpStream) -> io::Result<Option<HttpRequest>> {
    let mut data = Vec::with_capacity(1024);
    let mut buf = [0u8; 1024];

    loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            // Client went away before sending a full request head.
            return Ok(None);
        }
        data.extend_from_slice(&buf[..n]);

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut parsed = httparse::Request::new(&mut headers);
        match parsed.parse(&data) {
            Ok(httparse::Status::Complete(_)) => {
                let method = parsed
                    .method
                    .and_then(|m| m.parse::<Method>().ok())
                    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "bad method"))?;
                let raw_path = parsed.path.unwrap_or("/");
                let (uri, query) = match raw_path.split_once('?') {
                    Some((p, q)) => (p.to_string(), Some(q.to_string())),
                    None => (raw_path.to_string(), None),
                };
                let headers = parsed
                    .headers
                    .iter()
                    .map(|h| {
                        (
                            h.name.to_ascii_lowercase(),
                            String::from_utf8_lossy(h.value).to_string(),
                        )
                    })
                    .collect();
                return Ok(Some(HttpRequest {
                    method,
                    uri,
                    query,
                    headers,
                }));
            }
            Ok(httparse::Status::Partial) => {
                if data.len() > MAX_HEAD_BYTES {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "request head too large",
                    ));
                }
            }
            Err(e) => {
                return Err(io::Error::new(io::ErrorKind::InvalidData, e));
            }
        }
    }
}

fn write_json_error(
    res: &mut super::ResponseWriter<'_>,
    status: u16,
    body: serde_json::Value,
) -> io::Result<()> {
    res.set_status(status);
    res.set_header("Content-Type", "application/json");
    res.send(body.to_string().as_bytes())
}

fn serve_connection(mut stream: TcpStream, shared: &EngineShared) {
    let request = match read_request(&mut stream) {
        Ok(Some(req)) => req,
        Ok(None) => return,
        Err(e) => {
            debug!("request parse failed: {e}");
            let mut sink = BufWriter::new(&mut stream);
            let mut res = super::ResponseWriter::new(&mut sink);
            let _ = write_json_error(
                &mut res,
                400,
                serde_json::json!({ "error": "Bad Request" }),
            );
            let _ = sink.flush();
            return;
        }
    };

    let handler = {
        let routes = shared.routes.read().unwrap();
        routes
            .entries
            .iter()
            .find(|e| e.method == request.method && e.matcher.is_match(&request.uri))
            .map(|e| Arc::clone(&e.handler))
    };

    let mut sink = BufWriter::new(&mut stream);
    let mut res = super::ResponseWriter::new(&mut sink);

    let outcome = match handler {
        Some(handler) => handler.handle(&request, &mut res),
        None => write_json_error(
            &mut res,
            404,
            serde_json::json!({
                "error": "Not Found",
                "method": request.method.as_str(),
                "path": request.uri,
            }),
        ),
    };

    match outcome {
        Ok(()) if !res.is_started() => {
            // A handler must terminate every request it accepts.
            let _ = write_json_error(
                &mut res,
                500,
                serde_json::json!({
                    "error": "Handler produced no response",
                    "method": request.method.as_str(),
                    "path": request.uri,
                }),
            );
        }
        Ok(()) => {}
        Err(e) => {
            warn!(
                "handler failed: method={} path={} err={e}",
                request.method, request.uri
            );
            if !res.is_started() {
                let _ = write_json_error(
                    &mut res,
                    500,
                    serde_json::json!({
                        "error": "Internal Server Error",
                        "method": request.method.as_str(),
                        "path": request.uri,
                    }),
                );
            }
        }
    }
    drop(res);
    let _ = sink.flush();
    drop(sink);
    let _ = stream.shutdown(Shutdown::Both);
}

impl EngineServer for MiniHttpServer {
    fn register(
        &self,
        path: &str,
        method: Method,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<(), RegisterError> {
        let matcher = compile_pattern(path)?;
        let mut routes = self.shared.routes.write().unwrap();
        if routes
            .entries
            .iter()
            .any(|e| e.pattern == path && e.method == method)
        {
            return Err(RegisterError::AlreadyRegistered);
        }
        if routes.entries.len() >= routes.capacity {
            return Err(RegisterError::CapacityExceeded);
        }
        debug!("registered URI handler: {method} {path}");
        routes.entries.push(RouteEntry {
            pattern: path.to_string(),
            method,
            matcher,
            handler,
        });
        Ok(())
    }

    fn unregister(&self, path: &str, method: &Method) -> Result<(), RegisterError> {
        if path.is_empty() {
            return Err(RegisterError::InvalidArg);
        }
        let mut routes = self.shared.routes.write().unwrap();
        let before = routes.entries.len();
        routes
            .entries
            .retain(|e| !(e.pattern == path && e.method == *method));
        if routes.entries.len() == before {
            return Err(RegisterError::NotFound);
        }
        debug!("unregistered URI handler: {method} {path}");
        Ok(())
    }

    fn client_sessions(&self, max: usize) -> Vec<SessionId> {
        self.shared
            .sessions
            .lock()
            .unwrap()
            .keys()
            .take(max)
            .map(|&id| SessionId(id))
            .collect()
    }

    fn close_session(&self, id: SessionId) {
        if let Some(stream) = self.shared.sessions.lock().unwrap().get(&id.0) {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        Some(self.addr)
    }

    fn shut_down(&self) {
        self.shared.shutting_down.store(true, Ordering::SeqCst);

        if let Some(handle) = self.accept.lock().unwrap().take() {
            // SAFETY: may marks coroutine cancellation unsafe. The accept
            // loop holds no locks across yields and the listener is owned by
            // the coroutine, so cancelling at a yield point only drops the
            // listener.
            unsafe {
                handle.coroutine().cancel();
            }
            let _ = handle.join();
        }

        let mut sessions = self.shared.sessions.lock().unwrap();
        for (_, stream) in sessions.iter() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        sessions.clear();
        debug!("transport engine shut down");
    }
}
