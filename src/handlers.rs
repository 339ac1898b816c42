//! Default request handlers for the root and favicon paths.
//!
//! Both try the static resolver first and fall back to an embedded payload
//! when the asset is missing or static serving is unavailable. Any other
//! failure becomes a generic 500 — a request never leaves without a
//! terminated response.

use std::io;
use std::sync::Arc;

use tracing::warn;

use crate::engine::response::{send_text, set_no_cache_headers};
use crate::engine::{HttpRequest, RequestHandler, ResponseWriter};
use crate::error::ServeError;
use crate::pages;
use crate::static_files::StaticFiles;
use crate::stream::stream_asset;

/// Resolve and stream `req.uri` from the mount, if one is available.
fn try_serve_static(
    statics: Option<&StaticFiles>,
    req: &HttpRequest,
    res: &mut ResponseWriter<'_>,
) -> Result<(), ServeError> {
    let Some(statics) = statics else {
        return Err(ServeError::NotSupported);
    };
    if req.uri.is_empty() {
        return Err(ServeError::InvalidRequest);
    }
    let asset = statics.resolve(&req.uri)?;
    stream_asset(&asset, res).map_err(ServeError::Io)
}

/// Shared fallback plumbing for the default handlers.
fn serve_with_fallback(
    statics: Option<&StaticFiles>,
    req: &HttpRequest,
    res: &mut ResponseWriter<'_>,
    fallback_type: &str,
    fallback_body: &[u8],
) -> io::Result<()> {
    match try_serve_static(statics, req, res) {
        Ok(()) => Ok(()),
        Err(e) if e.is_fallback() => {
            set_no_cache_headers(res);
            res.set_status(200);
            res.set_header("Content-Type", fallback_type);
            res.send(fallback_body)
        }
        Err(ServeError::Io(e)) if res.is_started() => {
            // Mid-stream transport failure; the engine drops the connection.
            Err(e)
        }
        Err(e) => {
            warn!("static serving failed for {}: {e}", req.uri);
            send_text(res, 500, "Internal file server error\n")
        }
    }
}

/// Handler for `/`, `/index.html` and `/index.htm`.
pub struct RootHandler {
    statics: Option<Arc<StaticFiles>>,
}

impl RootHandler {
    pub fn new(statics: Option<Arc<StaticFiles>>) -> Self {
        Self { statics }
    }
}

impl RequestHandler for RootHandler {
    fn handle(&self, req: &HttpRequest, res: &mut ResponseWriter<'_>) -> io::Result<()> {
        serve_with_fallback(
            self.statics.as_deref(),
            req,
            res,
            "text/html; charset=utf-8",
            pages::ROOT_PAGE.as_bytes(),
        )
    }
}

/// Handler for `/favicon.ico`.
pub struct FaviconHandler {
    statics: Option<Arc<StaticFiles>>,
}

impl FaviconHandler {
    pub fn new(statics: Option<Arc<StaticFiles>>) -> Self {
        Self { statics }
    }
}

impl RequestHandler for FaviconHandler {
    fn handle(&self, req: &HttpRequest, res: &mut ResponseWriter<'_>) -> io::Result<()> {
        serve_with_fallback(
            self.statics.as_deref(),
            req,
            res,
            "image/x-icon",
            pages::FAVICON_ICO,
        )
    }
}
