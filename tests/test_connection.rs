use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use webserver::config::ConnectionLimits;
use webserver::http::HttpError;
use webserver::http::connection::{Connection, ConnectionState};
use webserver::http::handler::Handler;
use webserver::http::request::Request;
use webserver::http::writer::ResponseWriter;

const FAILURE: &[u8] = b"HTTP/1.0 404 File not found\r\nConnection: close\r\n\r\n";

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Get(String),
    Post(String, Vec<u8>),
}

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<Call>>,
    fail: bool,
    silent: bool,
    body_len: Option<usize>,
}

impl Recorder {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn silent() -> Self {
        Self {
            silent: true,
            ..Self::default()
        }
    }

    fn flooding(body_len: usize) -> Self {
        Self {
            body_len: Some(body_len),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl Handler for Recorder {
    async fn handle_get(&self, request: &Request, response: &mut ResponseWriter) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Get(request.target.clone()));

        if self.silent {
            return Ok(());
        }

        response.write_html_success();
        if let Some(len) = self.body_len {
            response.write_body(vec![b'x'; len]);
            return Ok(());
        }
        if self.fail {
            response.write_body("partial");
            anyhow::bail!("settings unavailable");
        }
        response.write_body("OK");
        Ok(())
    }

    async fn handle_post(
        &self,
        request: &Request,
        body: Bytes,
        response: &mut ResponseWriter,
    ) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Post(request.target.clone(), body.to_vec()));

        response.write_success("text/plain").write_body(body);
        Ok(())
    }
}

fn peer() -> SocketAddr {
    "127.0.0.1:40000".parse().unwrap()
}

fn connection(
    handler: &Arc<Recorder>,
    limits: ConnectionLimits,
) -> (DuplexStream, Connection<DuplexStream, Recorder>) {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let conn = Connection::new(server, peer(), Arc::clone(handler), limits);
    (client, conn)
}

/// Sends `request`, optionally half-closes, runs the worker and collects the reply.
async fn exchange(
    handler: &Arc<Recorder>,
    request: &[u8],
    half_close: bool,
) -> (Vec<u8>, Result<(), HttpError>) {
    let (mut client, mut conn) = connection(handler, ConnectionLimits::default());

    client.write_all(request).await.unwrap();
    if half_close {
        client.shutdown().await.unwrap();
    }

    let result = conn.run().await;
    assert!(conn.is_closed());

    let mut received = Vec::new();
    client.read_to_end(&mut received).await.unwrap();
    (received, result)
}

#[tokio::test]
async fn test_get_invokes_handler() {
    let handler = Arc::new(Recorder::default());
    let (received, result) = exchange(&handler, b"GET /status HTTP/1.0\r\n\r\n", false).await;

    assert!(result.is_ok());
    assert_eq!(handler.calls(), vec![Call::Get("/status".to_string())]);
    assert_eq!(
        received,
        b"HTTP/1.0 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\nOK"
    );
}

#[tokio::test]
async fn test_lowercase_get_is_dispatched() {
    let handler = Arc::new(Recorder::default());
    let (_, result) = exchange(&handler, b"get /status HTTP/1.0\n\n", false).await;

    assert!(result.is_ok());
    assert_eq!(handler.calls(), vec![Call::Get("/status".to_string())]);
}

#[tokio::test]
async fn test_post_receives_exact_body() {
    let handler = Arc::new(Recorder::default());
    let (received, result) = exchange(
        &handler,
        b"POST /submit HTTP/1.0\r\nContent-Length: 5\r\n\r\nhello",
        false,
    )
    .await;

    assert!(result.is_ok());
    assert_eq!(
        handler.calls(),
        vec![Call::Post("/submit".to_string(), b"hello".to_vec())]
    );
    assert!(received.ends_with(b"\r\n\r\nhello"));
}

#[tokio::test]
async fn test_post_ignores_bytes_past_content_length() {
    let handler = Arc::new(Recorder::default());
    let (_, result) = exchange(
        &handler,
        b"POST /submit HTTP/1.0\r\nContent-Length: 2\r\n\r\nhello",
        false,
    )
    .await;

    assert!(result.is_ok());
    assert_eq!(
        handler.calls(),
        vec![Call::Post("/submit".to_string(), b"he".to_vec())]
    );
}

#[tokio::test]
async fn test_post_without_content_length_has_empty_body() {
    let handler = Arc::new(Recorder::default());
    let (_, result) = exchange(&handler, b"POST /submit HTTP/1.0\r\n\r\n", false).await;

    assert!(result.is_ok());
    assert_eq!(
        handler.calls(),
        vec![Call::Post("/submit".to_string(), Vec::new())]
    );
}

#[tokio::test]
async fn test_unsupported_method_gets_failure() {
    let handler = Arc::new(Recorder::default());
    let (received, result) = exchange(&handler, b"BREW /coffee HTTP/1.0\r\n\r\n", false).await;

    assert!(matches!(result, Err(HttpError::UnsupportedMethod(m)) if m == "BREW"));
    assert!(handler.calls().is_empty());
    assert_eq!(received, FAILURE);
}

#[tokio::test]
async fn test_malformed_request_line_gets_failure() {
    let handler = Arc::new(Recorder::default());
    let (received, result) = exchange(&handler, b"GET /\r\n\r\n", false).await;

    assert!(matches!(result, Err(HttpError::MalformedRequestLine(_))));
    assert!(handler.calls().is_empty());
    assert_eq!(received, FAILURE);
}

#[tokio::test]
async fn test_malformed_header_gets_failure() {
    let handler = Arc::new(Recorder::default());
    let (received, result) = exchange(&handler, b"GET / HTTP/1.0\r\nnocolon\r\n\r\n", false).await;

    assert!(matches!(result, Err(HttpError::MalformedHeader(_))));
    assert!(handler.calls().is_empty());
    assert_eq!(received, FAILURE);
}

#[tokio::test]
async fn test_handler_fault_discards_partial_response() {
    let handler = Arc::new(Recorder::failing());
    let (received, result) = exchange(&handler, b"GET /status HTTP/1.0\r\n\r\n", false).await;

    assert!(matches!(result, Err(HttpError::HandlerFault(_))));
    assert_eq!(received, FAILURE);
}

#[tokio::test]
async fn test_payload_too_large_skips_handler() {
    let handler = Arc::new(Recorder::default());
    let (received, result) = exchange(
        &handler,
        b"POST /submit HTTP/1.0\r\nContent-Length: 10485761\r\n\r\nabc",
        false,
    )
    .await;

    assert!(matches!(result, Err(HttpError::PayloadTooLarge { .. })));
    assert!(handler.calls().is_empty());
    assert_eq!(received, FAILURE);
}

#[tokio::test]
async fn test_truncated_body_is_unexpected_disconnect() {
    let handler = Arc::new(Recorder::default());
    let (received, result) = exchange(
        &handler,
        b"POST /submit HTTP/1.0\r\nContent-Length: 10\r\n\r\nhel",
        true,
    )
    .await;

    assert!(matches!(result, Err(HttpError::UnexpectedDisconnect(_))));
    assert!(handler.calls().is_empty());
    assert_eq!(received, FAILURE);
}

#[tokio::test]
async fn test_client_closes_without_request() {
    let handler = Arc::new(Recorder::default());
    let (_, result) = exchange(&handler, b"", true).await;

    assert!(matches!(result, Err(HttpError::UnexpectedDisconnect(_))));
    assert!(handler.calls().is_empty());
}

#[tokio::test]
async fn test_read_timeout_fails_silent_client() {
    let handler = Arc::new(Recorder::default());
    let limits = ConnectionLimits {
        read_timeout: Some(Duration::from_millis(50)),
        ..ConnectionLimits::default()
    };
    let (mut client, mut conn) = connection(&handler, limits);
    client.write_all(b"GET /status HTTP/1.0\r\n").await.unwrap();

    let result = conn.run().await;

    assert!(matches!(result, Err(HttpError::Timeout(_))));
    assert!(handler.calls().is_empty());

    let mut received = Vec::new();
    client.read_to_end(&mut received).await.unwrap();
    assert_eq!(received, FAILURE);
}

#[tokio::test]
async fn test_max_lifetime_bounds_the_exchange() {
    let handler = Arc::new(Recorder::default());
    let limits = ConnectionLimits {
        max_lifetime: Some(Duration::from_millis(50)),
        ..ConnectionLimits::default()
    };
    let (_client, mut conn) = connection(&handler, limits);

    let result = conn.run().await;

    assert!(matches!(result, Err(HttpError::Timeout(_))));
    assert!(conn.is_closed());
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let handler = Arc::new(Recorder::default());
    let (mut client, mut conn) = connection(&handler, ConnectionLimits::default());
    client.write_all(b"GET / HTTP/1.0\r\n\r\n").await.unwrap();

    conn.run().await.unwrap();
    assert!(conn.is_closed());
    assert!(matches!(conn.state(), ConnectionState::Closed));

    conn.close().await;
    conn.close().await;
    assert!(conn.is_closed());

    // a finished worker stays finished
    assert!(conn.run().await.is_ok());
    assert_eq!(handler.calls().len(), 1);
}

#[tokio::test]
async fn test_empty_handler_response_becomes_failure() {
    let handler = Arc::new(Recorder::silent());
    let (received, result) = exchange(&handler, b"GET /status HTTP/1.0\r\n\r\n", false).await;

    assert!(result.is_ok());
    assert_eq!(handler.calls(), vec![Call::Get("/status".to_string())]);
    assert_eq!(received, FAILURE);
}

#[tokio::test]
async fn test_write_timeout_bounds_a_client_that_never_reads() {
    let handler = Arc::new(Recorder::flooding(64 * 1024));
    let limits = ConnectionLimits {
        write_timeout: Some(Duration::from_millis(50)),
        ..ConnectionLimits::default()
    };
    let (mut client, server) = tokio::io::duplex(64);
    let mut conn = Connection::new(server, peer(), Arc::clone(&handler), limits);
    client.write_all(b"GET /big HTTP/1.0\r\n\r\n").await.unwrap();

    // the client stays connected and never reads, so every flush stalls
    let result = tokio::time::timeout(Duration::from_secs(3), conn.run())
        .await
        .expect("worker must finish once the write deadline passes");

    assert!(matches!(result, Err(HttpError::Timeout(_))));
    assert!(conn.is_closed());
    drop(client);
}

#[tokio::test]
async fn test_max_lifetime_bounds_a_stalled_write() {
    let handler = Arc::new(Recorder::flooding(64 * 1024));
    let limits = ConnectionLimits {
        max_lifetime: Some(Duration::from_millis(200)),
        ..ConnectionLimits::default()
    };
    let (mut client, server) = tokio::io::duplex(64);
    let mut conn = Connection::new(server, peer(), Arc::clone(&handler), limits);
    client.write_all(b"GET /big HTTP/1.0\r\n\r\n").await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(3), conn.run())
        .await
        .expect("worker must finish once its lifetime is over");

    assert!(matches!(result, Err(HttpError::Timeout(_))));
    assert!(conn.is_closed());
    drop(client);
}
