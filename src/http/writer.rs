use bytes::{BufMut, Bytes, BytesMut};
use tracing::warn;

use crate::http::response::StatusCode;

pub const HTTP_VERSION: &str = "HTTP/1.0";

/// Content type of [`ResponseWriter::write_html_success`].
pub const DEFAULT_CONTENT_TYPE: &str = "text/html";

/// Builds one HTTP/1.0 response in memory.
///
/// The writer only frames bytes; it never touches the socket. The connection
/// worker drains it with [`take`](Self::take), writes the bytes out and
/// flushes once the exchange is over.
///
/// The header block always ends with exactly one blank line: `end_headers`
/// is idempotent, a body write ends the headers implicitly, and headers
/// written after that point are dropped.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    buffer: BytesMut,
    status_written: bool,
    headers_ended: bool,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `HTTP/1.0 <code> <reason>`.
    pub fn write_status_line(&mut self, code: u16, reason: &str) -> &mut Self {
        self.put_line(&format!("{} {} {}", HTTP_VERSION, code, reason));
        self.status_written = true;
        self
    }

    pub fn write_status(&mut self, status: StatusCode) -> &mut Self {
        self.write_status_line(status.as_u16(), status.reason_phrase())
    }

    pub fn write_header(&mut self, name: &str, value: &str) -> &mut Self {
        if self.headers_ended {
            warn!(header = name, "header written after the header block ended, dropping it");
            return self;
        }
        self.put_line(&format!("{}: {}", name, value));
        self
    }

    /// Emits the blank line that separates headers from the body.
    pub fn end_headers(&mut self) -> &mut Self {
        if !self.headers_ended {
            self.buffer.put_slice(b"\r\n");
            self.headers_ended = true;
        }
        self
    }

    pub fn write_body(&mut self, body: impl AsRef<[u8]>) -> &mut Self {
        if self.status_written {
            self.end_headers();
        }
        self.buffer.put_slice(body.as_ref());
        self
    }

    /// `200 OK` with the given content type, ready for a body.
    pub fn write_success(&mut self, content_type: &str) -> &mut Self {
        self.write_status(StatusCode::Ok)
            .write_header("Content-Type", content_type)
            .write_header("Connection", "close")
            .end_headers()
    }

    /// `write_success` with the default `text/html` content type.
    pub fn write_html_success(&mut self) -> &mut Self {
        self.write_success(DEFAULT_CONTENT_TYPE)
    }

    /// `404 File not found`, the generic failure framing.
    pub fn write_failure(&mut self) -> &mut Self {
        self.write_status(StatusCode::NotFound)
            .write_header("Connection", "close")
            .end_headers()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Drains everything written so far.
    pub fn take(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }

    /// Discards a partially built response.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.status_written = false;
        self.headers_ended = false;
    }

    fn put_line(&mut self, line: &str) {
        self.buffer.put_slice(line.as_bytes());
        self.buffer.put_slice(b"\r\n");
    }
}
