//! # Server Configuration Module
//!
//! Build-time style configuration for the server module, resolved once and
//! passed to [`crate::HttpController`] at construction.
//!
//! ## Environment Variables
//!
//! - `LITTLESERVE_PORT` — listen port (default `80`)
//! - `LITTLESERVE_MAX_OPEN_SOCKETS` — session ceiling used by
//!   `close_all_sessions` (default `7`)
//! - `LITTLESERVE_STATIC_DIR` — mount base path; setting it enables static
//!   file serving
//! - `LITTLESERVE_STATIC_LABEL` — storage volume label, used for logging only
//!
//! Values that fail to parse fall back to the defaults, mirroring how the
//! rest of the configuration surface behaves: a bad value never aborts
//! startup, it is corrected with a warning.

use std::env;

use tracing::warn;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 80;

/// Maximum number of concurrently registered URI handlers.
pub const DEFAULT_MAX_URI_HANDLERS: usize = 40;

/// Default ceiling on concurrently open client sockets.
pub const DEFAULT_MAX_OPEN_SOCKETS: usize = 7;

/// Default mount base path for static serving.
pub const DEFAULT_MOUNT_BASE: &str = "/littlefs";

/// Default storage volume label.
pub const DEFAULT_MOUNT_LABEL: &str = "littlefs";

/// Static-serving mount configuration.
///
/// Construct through [`MountConfig::new`], which sanitizes the base path:
/// an empty path falls back to [`DEFAULT_MOUNT_BASE`], and a path missing
/// its leading separator is auto-corrected. Both cases log a warning rather
/// than failing.
#[derive(Debug, Clone)]
pub struct MountConfig {
    /// Sanitized base path the resolver probes under.
    pub base_path: String,
    /// Volume label, carried for log output.
    pub label: String,
}

impl MountConfig {
    pub fn new(base_path: &str, label: &str) -> Self {
        let base_path = if base_path.is_empty() {
            warn!(
                "static mount base path is empty, using default '{}'",
                DEFAULT_MOUNT_BASE
            );
            DEFAULT_MOUNT_BASE.to_string()
        } else if !base_path.starts_with('/') {
            warn!(
                "static mount base path '{}' is missing leading '/', using '/{}'",
                base_path, base_path
            );
            format!("/{base_path}")
        } else {
            base_path.to_string()
        };

        let label = if label.is_empty() {
            warn!(
                "static mount label is empty, using default '{}'",
                DEFAULT_MOUNT_LABEL
            );
            DEFAULT_MOUNT_LABEL.to_string()
        } else {
            label.to_string()
        };

        Self { base_path, label }
    }
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_MOUNT_BASE.to_string(),
            label: DEFAULT_MOUNT_LABEL.to_string(),
        }
    }
}

/// Configuration for the HTTP server module.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port the transport engine listens on. `0` asks the OS for an
    /// ephemeral port, which the integration tests rely on.
    pub port: u16,
    /// Registration table capacity enforced by the engine.
    pub max_uri_handlers: usize,
    /// Session ceiling snapshotted by `close_all_sessions`.
    pub max_open_sockets: usize,
    /// Static file serving; `None` disables the feature entirely and the
    /// handlers fall back to the embedded pages.
    pub static_mount: Option<MountConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_uri_handlers: DEFAULT_MAX_URI_HANDLERS,
            max_open_sockets: DEFAULT_MAX_OPEN_SOCKETS,
            static_mount: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let port = match env::var("LITTLESERVE_PORT") {
            Ok(val) => val.parse().unwrap_or(DEFAULT_PORT),
            Err(_) => DEFAULT_PORT,
        };

        let max_open_sockets = match env::var("LITTLESERVE_MAX_OPEN_SOCKETS") {
            Ok(val) => val.parse().unwrap_or(DEFAULT_MAX_OPEN_SOCKETS),
            Err(_) => DEFAULT_MAX_OPEN_SOCKETS,
        };

        let static_mount = env::var("LITTLESERVE_STATIC_DIR").ok().map(|base| {
            let label =
                env::var("LITTLESERVE_STATIC_LABEL").unwrap_or_else(|_| DEFAULT_MOUNT_LABEL.into());
            MountConfig::new(&base, &label)
        });

        Self {
            port,
            max_uri_handlers: DEFAULT_MAX_URI_HANDLERS,
            max_open_sockets,
            static_mount,
        }
    }
}
