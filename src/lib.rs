//! # littleserve
//!
//! **littleserve** is an embedded-style HTTP server module: a
//! concurrency-safe start/stop lifecycle around a coroutine transport
//! engine, plus deterministic static asset serving from a mounted
//! directory, in the manner of the HTTP component of a small appliance
//! firmware.
//!
//! ## Architecture
//!
//! - **[`lifecycle`]** - the [`HttpController`] state machine: bounded-retry
//!   startup with a readiness handshake, idempotent stop, URI registration,
//!   session control; a background worker task commits the RUNNING
//!   transition and parks for deferred work
//! - **[`engine`]** - the transport boundary ([`Engine`] / [`EngineServer`] /
//!   [`RequestHandler`]) and the production `may`-coroutine implementation
//! - **[`static_files`]** - request-path to asset resolution: traversal
//!   guard, `index.html` defaulting, `.gz` sibling preference,
//!   `.html`/`.htm` aliasing, MIME inference
//! - **[`stream`]** - chunked asset streaming with cache-disabling headers
//! - **[`handlers`]** - default root/favicon handlers with embedded
//!   fallback payloads
//! - **[`config`]** - construction-time configuration with environment
//!   overrides
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use littleserve::{HttpController, MiniHttpEngine, ServerConfig};
//!
//! let controller = HttpController::new(MiniHttpEngine, ServerConfig::default());
//! controller.start();
//! controller
//!     .wait_until_running(Duration::from_secs(2))
//!     .expect("server did not become ready");
//! // ... serve ...
//! controller.stop();
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod lifecycle;
mod pages;
pub mod static_files;
pub mod stream;
mod worker;

pub use config::{MountConfig, ServerConfig};
pub use engine::{
    Engine, EngineServer, HttpRequest, MiniHttpEngine, RequestHandler, ResponseWriter, SessionId,
};
pub use error::{RegisterError, ServeError, WaitError};
pub use lifecycle::{HttpController, ServerState};
pub use static_files::{ResolvedAsset, StaticFiles};
