//! Error taxonomy for the server module.
//!
//! Three families, matching how failures surface at the API:
//!
//! - [`WaitError`] — readiness waits (`wait_until_running`)
//! - [`RegisterError`] — URI handler registration against the engine
//! - [`ServeError`] — static asset resolution and streaming
//!
//! Transient startup failures are deliberately *not* represented here:
//! `start()` absorbs them into its retry loop and the caller observes the
//! outcome through `is_running()` / `wait_until_running()`.

use std::fmt;
use std::io;

/// Outcome of a bounded wait for server readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    /// The timeout expired before the readiness bit was set.
    Timeout,
    /// The module is stopped or stopping; there is no transition in flight
    /// to wait for.
    InvalidState,
}

impl fmt::Display for WaitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitError::Timeout => write!(f, "timed out waiting for the server to become ready"),
            WaitError::InvalidState => write!(f, "server is stopped or stopping"),
        }
    }
}

impl std::error::Error for WaitError {}

/// Failure registering or unregistering a URI handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterError {
    /// The module is not running (or, for internal startup registration,
    /// not starting) or the server handle is gone.
    InvalidState,
    /// Empty or malformed URI pattern.
    InvalidArg,
    /// A handler for this (path, method) pair is already installed.
    AlreadyRegistered,
    /// The registration table is at its configured capacity.
    CapacityExceeded,
    /// Unregistration did not find a matching entry.
    NotFound,
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterError::InvalidState => write!(f, "server is not running"),
            RegisterError::InvalidArg => write!(f, "invalid URI pattern"),
            RegisterError::AlreadyRegistered => {
                write!(f, "a handler is already registered for this path and method")
            }
            RegisterError::CapacityExceeded => write!(f, "URI handler table is full"),
            RegisterError::NotFound => write!(f, "no handler registered for this path and method"),
        }
    }
}

impl std::error::Error for RegisterError {}

/// Failure resolving or streaming a static asset.
#[derive(Debug)]
pub enum ServeError {
    /// Empty or malformed request path.
    InvalidRequest,
    /// No candidate resolved under the mount root. Not a hard error; the
    /// handlers fall back to the embedded pages.
    NotFound,
    /// Static serving is disabled or the mount is unavailable.
    NotSupported,
    /// I/O failure opening or streaming the asset.
    Io(io::Error),
}

impl ServeError {
    /// True for the outcomes that route to the embedded fallback payloads
    /// rather than an error response.
    pub fn is_fallback(&self) -> bool {
        matches!(self, ServeError::NotFound | ServeError::NotSupported)
    }
}

impl fmt::Display for ServeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServeError::InvalidRequest => write!(f, "invalid request path"),
            ServeError::NotFound => write!(f, "asset not found"),
            ServeError::NotSupported => write!(f, "static file serving is unavailable"),
            ServeError::Io(e) => write!(f, "asset I/O failed: {e}"),
        }
    }
}

impl std::error::Error for ServeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ServeError {
    fn from(e: io::Error) -> Self {
        ServeError::Io(e)
    }
}
