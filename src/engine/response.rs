//! Response writing over a raw byte sink.
//!
//! [`ResponseWriter`] supports two send modes: a single-shot
//! [`send`](ResponseWriter::send) with `Content-Length`, and chunked
//! transfer via [`send_chunk`](ResponseWriter::send_chunk) for streamed
//! bodies. Headers are flushed lazily on the first send, so handlers can set
//! status and headers in any order before committing.

use std::io::{self, Write};

/// Reason phrase for the status codes the module emits.
fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        202 => "Accepted",
        204 => "No Content",
        302 => "Found",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        413 => "Payload Too Large",
        415 => "Unsupported Media Type",
        _ => "Internal Server Error",
    }
}

/// Writes one HTTP/1.1 response to an underlying sink.
pub struct ResponseWriter<'a> {
    sink: &'a mut dyn Write,
    status: u16,
    headers: Vec<(String, String)>,
    headers_sent: bool,
    chunked: bool,
    finished: bool,
}

impl<'a> ResponseWriter<'a> {
    pub fn new(sink: &'a mut dyn Write) -> Self {
        Self {
            sink,
            status: 200,
            headers: Vec::new(),
            headers_sent: false,
            chunked: false,
            finished: false,
        }
    }

    /// Set the response status. Ignored once headers have been sent.
    pub fn set_status(&mut self, status: u16) {
        if !self.headers_sent {
            self.status = status;
        }
    }

    /// Set a header, replacing any previous value for the same name.
    pub fn set_header(&mut self, name: &str, value: &str) {
        if self.headers_sent {
            return;
        }
        if let Some(slot) = self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            slot.1 = value.to_string();
        } else {
            self.headers.push((name.to_string(), value.to_string()));
        }
    }

    /// True once any part of the response has hit the wire. After this point
    /// the status and headers can no longer change.
    pub fn is_started(&self) -> bool {
        self.headers_sent
    }

    /// True once a response has been terminated (single-shot send or the
    /// zero-length final chunk).
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn write_head(&mut self, framing: &str) -> io::Result<()> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status, status_reason(self.status));
        for (name, value) in &self.headers {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str(framing);
        head.push_str("Connection: close\r\n\r\n");
        self.sink.write_all(head.as_bytes())?;
        self.headers_sent = true;
        Ok(())
    }

    /// Send a complete response with a `Content-Length` body.
    pub fn send(&mut self, body: &[u8]) -> io::Result<()> {
        let framing = format!("Content-Length: {}\r\n", body.len());
        self.write_head(&framing)?;
        self.sink.write_all(body)?;
        self.finished = true;
        self.sink.flush()
    }

    /// Send one chunk of a chunked-encoded body.
    ///
    /// The first call flushes the head with `Transfer-Encoding: chunked`.
    /// An empty `data` terminates the body; further sends are errors at the
    /// transport level and are not attempted here.
    pub fn send_chunk(&mut self, data: &[u8]) -> io::Result<()> {
        if !self.headers_sent {
            self.write_head("Transfer-Encoding: chunked\r\n")?;
            self.chunked = true;
        }
        if data.is_empty() {
            self.sink.write_all(b"0\r\n\r\n")?;
            self.finished = true;
            return self.sink.flush();
        }
        write!(self.sink, "{:x}\r\n", data.len())?;
        self.sink.write_all(data)?;
        self.sink.write_all(b"\r\n")
    }
}

/// Send a plain-text response with the given status.
pub fn send_text(res: &mut ResponseWriter<'_>, status: u16, body: &str) -> io::Result<()> {
    res.set_status(status);
    res.set_header("Content-Type", "text/plain; charset=utf-8");
    res.send(body.as_bytes())
}

/// Cache-disabling header block applied to every asset response.
pub fn set_no_cache_headers(res: &mut ResponseWriter<'_>) {
    res.set_header("Cache-Control", "no-cache, no-store, must-revalidate");
    res.set_header("Pragma", "no-cache");
    res.set_header("Expires", "0");
    res.set_header("Vary", "Accept-Encoding");
}
