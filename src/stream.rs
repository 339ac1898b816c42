//! Chunked streaming of resolved assets to the response channel.

use std::fs::File;
use std::io::{self, Read};

use tracing::warn;

use crate::engine::response::{send_text, set_no_cache_headers};
use crate::engine::ResponseWriter;
use crate::static_files::ResolvedAsset;

/// Fixed chunk size for asset streaming.
pub const CHUNK_SIZE: usize = 1024;

/// Stream a resolved asset as a chunked response.
///
/// An open failure is absorbed into a plain 500 response; the request always
/// receives a terminated reply. A transport failure mid-stream is propagated
/// immediately — the partial chunked body is the terminated form the
/// transport contract allows for that case.
pub fn stream_asset(asset: &ResolvedAsset, res: &mut ResponseWriter<'_>) -> io::Result<()> {
    let mut file = match File::open(&asset.full_path) {
        Ok(f) => f,
        Err(e) => {
            warn!("file open failed: {} ({e})", asset.full_path.display());
            return send_text(res, 500, "File open failed\n");
        }
    };

    res.set_header("Content-Type", asset.content_type);
    if asset.is_gzip {
        res.set_header("Content-Encoding", "gzip");
    }
    set_no_cache_headers(res);

    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = match file.read(&mut buf) {
            Ok(n) => n,
            Err(e) => {
                warn!("file read failed: {} ({e})", asset.full_path.display());
                if res.is_started() {
                    // Chunks are already on the wire; all that is left is to
                    // drop the connection without the final chunk.
                    return Err(e);
                }
                return send_text(res, 500, "File read failed\n");
            }
        };
        if n == 0 {
            break;
        }
        res.send_chunk(&buf[..n])?;
    }

    res.send_chunk(&[])
}
