//! Static asset resolution under a mounted directory.
//!
//! [`StaticFiles::mount`] validates the mount root once, at construction;
//! there is no lazy first-request mount. [`StaticFiles::resolve`] then maps
//! request paths to on-disk artifacts:
//!
//! 1. parent-directory traversal (`..`) is rejected outright, never probed;
//! 2. the bare root and trailing-separator paths default to `index.html`;
//! 3. a `.gz` request suffix is stripped to obtain the logical identity used
//!    for content-type inference;
//! 4. `.html` and `.htm` are aliases of each other, tried in request order;
//! 5. for each candidate, a pre-compressed `.gz` sibling wins over the plain
//!    file; the first hit across the whole candidate list is served.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::MountConfig;
use crate::error::ServeError;

/// Suffix marking a pre-compressed variant on disk.
const GZIP_SUFFIX: &str = ".gz";

/// A resolved request: the concrete file to stream and how to label it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    /// Full on-disk path, compressed variant if one was selected.
    pub full_path: PathBuf,
    /// Content type inferred from the uncompressed candidate name.
    pub content_type: &'static str,
    /// Whether `full_path` points at the `.gz` sibling.
    pub is_gzip: bool,
}

/// Handle to a validated mount root.
#[derive(Debug)]
pub struct StaticFiles {
    base: PathBuf,
}

fn ends_with(s: &str, suffix: &str) -> bool {
    s.len() >= suffix.len() && s[s.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

/// Fixed suffix-to-MIME table with a plain-text fallback. Suffix matching
/// is case-insensitive here only; resolution itself is case-sensitive.
fn content_type_for(logical_path: &str) -> &'static str {
    if ends_with(logical_path, ".htm") || ends_with(logical_path, ".html") {
        "text/html; charset=utf-8"
    } else if ends_with(logical_path, ".css") {
        "text/css; charset=utf-8"
    } else if ends_with(logical_path, ".js") {
        "application/javascript; charset=utf-8"
    } else if ends_with(logical_path, ".json") || ends_with(logical_path, ".map") {
        "application/json; charset=utf-8"
    } else if ends_with(logical_path, ".svg") {
        "image/svg+xml"
    } else if ends_with(logical_path, ".png") {
        "image/png"
    } else if ends_with(logical_path, ".jpg") || ends_with(logical_path, ".jpeg") {
        "image/jpeg"
    } else if ends_with(logical_path, ".gif") {
        "image/gif"
    } else if ends_with(logical_path, ".ico") {
        "image/x-icon"
    } else if ends_with(logical_path, ".woff2") {
        "font/woff2"
    } else if ends_with(logical_path, ".woff") {
        "font/woff"
    } else if ends_with(logical_path, ".ttf") {
        "font/ttf"
    } else {
        "text/plain; charset=utf-8"
    }
}

fn file_exists(path: &Path) -> bool {
    path.is_file()
}

impl StaticFiles {
    /// Validate the mount root and return a serving handle.
    ///
    /// # Errors
    ///
    /// [`ServeError::Io`] if the base path cannot be read, or
    /// [`ServeError::NotSupported`] if it exists but is not a directory.
    /// The caller decides whether a failed mount is fatal; the controller
    /// degrades to the embedded fallback pages.
    pub fn mount(config: &MountConfig) -> Result<Self, ServeError> {
        let base = PathBuf::from(&config.base_path);
        let meta = fs::metadata(&base)?;
        if !meta.is_dir() {
            return Err(ServeError::NotSupported);
        }
        info!(
            "static mount ready: label='{}' base='{}'",
            config.label,
            base.display()
        );
        Ok(Self { base })
    }

    fn full_path(&self, logical: &str) -> PathBuf {
        self.base.join(logical.trim_start_matches('/'))
    }

    /// Map a request path to a concrete asset.
    ///
    /// # Errors
    ///
    /// [`ServeError::InvalidRequest`] for an empty or non-rooted path,
    /// [`ServeError::NotFound`] when traversal is rejected or no candidate
    /// exists on disk.
    pub fn resolve(&self, uri: &str) -> Result<ResolvedAsset, ServeError> {
        if uri.is_empty() || !uri.starts_with('/') {
            return Err(ServeError::InvalidRequest);
        }

        // Traversal tokens are rejected outright, before any probe.
        if uri.contains("..") {
            debug!("rejected traversal path: {uri}");
            return Err(ServeError::NotFound);
        }

        let mut logical = uri.to_string();
        if logical.ends_with('/') {
            logical.push_str("index.html");
        }

        // A .gz request addresses the compressed variant directly, but
        // content type and aliasing follow the uncompressed identity.
        // Suffix checks are case-sensitive: "/DATA.GZ" names a literal file.
        if logical.ends_with(GZIP_SUFFIX) && logical.len() > GZIP_SUFFIX.len() {
            logical.truncate(logical.len() - GZIP_SUFFIX.len());
        }

        let mut candidates = Vec::with_capacity(2);
        candidates.push(logical.clone());
        if logical.ends_with(".html") {
            let mut alt = logical.clone();
            alt.truncate(alt.len() - ".html".len());
            alt.push_str(".htm");
            candidates.push(alt);
        } else if logical.ends_with(".htm") {
            let mut alt = logical.clone();
            alt.truncate(alt.len() - ".htm".len());
            alt.push_str(".html");
            candidates.push(alt);
        }

        for candidate in &candidates {
            let gz_path = self.full_path(&format!("{candidate}{GZIP_SUFFIX}"));
            if file_exists(&gz_path) {
                return Ok(ResolvedAsset {
                    full_path: gz_path,
                    content_type: content_type_for(candidate),
                    is_gzip: true,
                });
            }

            let plain_path = self.full_path(candidate);
            if file_exists(&plain_path) {
                return Ok(ResolvedAsset {
                    full_path: plain_path,
                    content_type: content_type_for(candidate),
                    is_gzip: false,
                });
            }
        }

        Err(ServeError::NotFound)
    }
}
