use thiserror::Error;

/// Everything that can go wrong while serving a single connection.
///
/// None of these are fatal to the listener: the connection worker logs the
/// condition, answers with the generic failure response when it still can,
/// and closes the connection.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid http request line: {0:?}")]
    MalformedRequestLine(String),

    #[error("invalid http header line: {0:?}")]
    MalformedHeader(String),

    #[error("line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("invalid Content-Length: {0:?}")]
    InvalidContentLength(String),

    #[error("POST Content-Length({declared}) too big for this server (limit {limit})")]
    PayloadTooLarge { declared: u64, limit: usize },

    #[error("client disconnected while {0}")]
    UnexpectedDisconnect(&'static str),

    #[error("unsupported method {0:?}")]
    UnsupportedMethod(String),

    #[error("handler failed: {0:#}")]
    HandlerFault(anyhow::Error),

    #[error("deadline elapsed while {0}")]
    Timeout(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
