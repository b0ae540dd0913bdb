use std::collections::HashMap;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use crate::http::error::HttpError;

/// Largest request body the server will buffer.
pub const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

const CHUNK_SIZE: usize = 4096;

/// Returns the declared body length, or `None` when no `Content-Length` is present.
pub fn content_length(headers: &HashMap<String, String>) -> Result<Option<u64>, HttpError> {
    let Some(raw) = headers.get("Content-Length") else {
        return Ok(None);
    };

    let value = raw.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(HttpError::InvalidContentLength(raw.clone()));
    }

    // all digits but too wide for u64 is still just "too large"
    Ok(Some(value.parse().unwrap_or(u64::MAX)))
}

/// Reads exactly `Content-Length` bytes of body from `reader`.
///
/// Without the header the body is empty. The cap is checked before anything
/// is read, and nothing past the declared length is consumed.
pub async fn read_body<R>(
    reader: &mut R,
    headers: &HashMap<String, String>,
) -> Result<Bytes, HttpError>
where
    R: AsyncRead + Unpin,
{
    let Some(declared) = content_length(headers)? else {
        return Ok(Bytes::new());
    };

    if declared > MAX_BODY_SIZE as u64 {
        return Err(HttpError::PayloadTooLarge {
            declared,
            limit: MAX_BODY_SIZE,
        });
    }

    let declared = declared as usize;
    let mut body = BytesMut::with_capacity(declared);
    let mut chunk = [0u8; CHUNK_SIZE];

    while body.len() < declared {
        let to_read = (declared - body.len()).min(CHUNK_SIZE);
        let n = reader.read(&mut chunk[..to_read]).await?;
        trace!(to_read, n, "body read");

        if n == 0 {
            return Err(HttpError::UnexpectedDisconnect("reading the request body"));
        }

        body.extend_from_slice(&chunk[..n]);
    }

    Ok(body.freeze())
}
