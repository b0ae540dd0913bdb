use std::collections::HashMap;

/// HTTP request methods the server dispatches on.
///
/// The parser accepts any method token; only these two reach a handler.
/// Everything else is answered with the generic failure response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Submit data
    POST,
}

impl Method {
    /// Maps an already upper-cased method token to a dispatchable method.
    ///
    /// # Example
    ///
    /// ```
    /// # use webserver::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("BREW"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
        }
    }
}

/// The three tokens of a request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    /// Upper-cased method token, not validated
    pub method: String,
    /// Raw request target, e.g. "/index.html?x=1"
    pub target: String,
    /// Protocol version token, e.g. "HTTP/1.0"
    pub version: String,
}

/// A parsed request head: request line plus headers.
///
/// Header names are kept exactly as received, so lookups are case-sensitive.
/// A repeated header name keeps the last value seen.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub target: String,
    pub version: String,
    pub headers: HashMap<String, String>,
}

impl Request {
    pub fn new(line: RequestLine, headers: HashMap<String, String>) -> Self {
        Self {
            method: line.method,
            target: line.target,
            version: line.version,
            headers,
        }
    }

    /// Retrieves a header value by its exact name.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(|v| v.as_str())
    }
}
