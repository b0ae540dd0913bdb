//! Webserver - minimal HTTP/1.0 server
//!
//! Wire-level request/response handling over raw byte streams, with the
//! application reached through the [`http::handler::Handler`] trait.

pub mod app;
pub mod config;
pub mod http;
pub mod server;
