use std::collections::HashMap;

use tokio::io::AsyncBufRead;
use tracing::debug;

use crate::http::error::HttpError;
use crate::http::line::read_line;
use crate::http::request::{Request, RequestLine};

/// Upper bound on the number of header lines in one request.
pub const MAX_HEADERS: usize = 128;

/// Splits a request line into method, target and version.
///
/// The line must consist of exactly three tokens separated by single spaces.
/// The method is upper-cased; target and version are kept verbatim.
pub fn parse_request_line(line: &str) -> Result<RequestLine, HttpError> {
    let tokens: Vec<&str> = line.split(' ').collect();

    let [method, target, version] = tokens.as_slice() else {
        return Err(HttpError::MalformedRequestLine(line.to_string()));
    };

    if method.is_empty() || target.is_empty() || version.is_empty() {
        return Err(HttpError::MalformedRequestLine(line.to_string()));
    }

    Ok(RequestLine {
        method: method.to_uppercase(),
        target: target.to_string(),
        version: version.to_string(),
    })
}

/// Splits a header line at its first colon.
///
/// The name is everything before the colon. The value is everything after it
/// with leading spaces removed; trailing content, including further colons,
/// is preserved.
pub fn parse_header_line(line: &str) -> Result<(String, String), HttpError> {
    let (name, value) = line
        .split_once(':')
        .ok_or_else(|| HttpError::MalformedHeader(line.to_string()))?;

    Ok((name.to_string(), value.trim_start_matches(' ').to_string()))
}

pub async fn read_request_line<R>(reader: &mut R) -> Result<RequestLine, HttpError>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_line(reader).await?;
    let parsed = parse_request_line(&line)?;
    debug!(request_line = %line, "starting");
    Ok(parsed)
}

/// Reads header lines up to and including the blank line that ends the head.
pub async fn read_headers<R>(reader: &mut R) -> Result<HashMap<String, String>, HttpError>
where
    R: AsyncBufRead + Unpin,
{
    let mut headers = HashMap::new();
    let mut count = 0;

    loop {
        let line = read_line(reader).await?;
        if line.is_empty() {
            debug!(count = headers.len(), "got headers");
            return Ok(headers);
        }

        count += 1;
        if count > MAX_HEADERS {
            return Err(HttpError::MalformedHeader(format!(
                "more than {MAX_HEADERS} header lines"
            )));
        }

        let (name, value) = parse_header_line(&line)?;
        debug!(%name, %value, "header");
        headers.insert(name, value);
    }
}

/// Reads a complete request head: request line followed by headers.
pub async fn read_request<R>(reader: &mut R) -> Result<Request, HttpError>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_request_line(reader).await?;
    let headers = read_headers(reader).await?;
    Ok(Request::new(line, headers))
}
