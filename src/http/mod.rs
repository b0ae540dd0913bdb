//! HTTP/1.0 protocol implementation.
//!
//! One request per connection: the server reads a request head, reads a POST
//! body framed by `Content-Length`, hands both to the application, writes the
//! response and closes. There is no keep-alive, chunked encoding or pipelining.
//!
//! # Architecture
//!
//! - **`line`**: CRLF/LF line reader with a length cap
//! - **`parser`**: request line and header block
//! - **`body`**: length-bounded POST body reader
//! - **`request`**: parsed request head and dispatchable methods
//! - **`response`**: status codes the server emits itself
//! - **`writer`**: response framing (status line, headers, blank line, body)
//! - **`handler`**: the trait the application implements
//! - **`connection`**: the per-connection state machine
//! - **`error`**: per-connection failure taxonomy
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌──────────────────────┐
//!        │      Accepted        │
//!        └──────────┬───────────┘
//!                   ▼
//!        ┌──────────────────────┐
//!        │  ParsingRequestLine  │ ── error ──┐
//!        └──────────┬───────────┘            │
//!                   ▼                        │
//!        ┌──────────────────────┐            │
//!        │    ParsingHeaders    │ ── error ──┤
//!        └──────────┬───────────┘            │
//!                   ▼                        ▼
//!        ┌──────────────────────┐     ┌─────────────┐
//!        │     Dispatching      │ ──▶ │   Failed    │ ← generic 404, best effort
//!        └──────────┬───────────┘     └──────┬──────┘
//!                   ▼                        │
//!        ┌──────────────────────┐            │
//!        │   WritingResponse    │ ── error ──┤
//!        └──────────┬───────────┘            │
//!                   ▼                        │
//!        ┌──────────────────────┐            │
//!        │        Closed        │ ◀──────────┘
//!        └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use webserver::config::ServerConfig;
//! use webserver::server::listener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let handler = Arc::new(MyHandler::default());
//!     listener::run(&ServerConfig::default(), handler, std::future::pending()).await
//! }
//! ```

pub mod body;
pub mod connection;
pub mod error;
pub mod handler;
pub mod line;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;

pub use error::HttpError;
