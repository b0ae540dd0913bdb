use std::io::ErrorKind;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::http::error::HttpError;

/// Upper bound on a single request or header line.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Reads one line from `reader`.
///
/// `\n` ends the line and is consumed; `\r` is dropped wherever it shows up.
/// The terminator is not part of the returned string. Bytes after the
/// terminator stay in the reader's buffer for the next caller.
pub async fn read_line<R>(reader: &mut R) -> Result<String, HttpError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();

    loop {
        let available = match reader.fill_buf().await {
            Ok(buf) => buf,
            Err(e) if matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock) => {
                // nothing yet, not the end of the line
                tokio::task::yield_now().await;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if available.is_empty() {
            return Err(HttpError::UnexpectedDisconnect("reading a line"));
        }

        let (consumed, done) = match available.iter().position(|&b| b == b'\n') {
            Some(end) => {
                line.extend(available[..end].iter().copied().filter(|&b| b != b'\r'));
                (end + 1, true)
            }
            None => {
                line.extend(available.iter().copied().filter(|&b| b != b'\r'));
                (available.len(), false)
            }
        };
        reader.consume(consumed);

        if line.len() > MAX_LINE_LENGTH {
            return Err(HttpError::LineTooLong {
                limit: MAX_LINE_LENGTH,
            });
        }

        if done {
            return Ok(String::from_utf8_lossy(&line).into_owned());
        }
    }
}
