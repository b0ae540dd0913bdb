use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

use crate::config::ConnectionLimits;
use crate::http::body::read_body;
use crate::http::error::HttpError;
use crate::http::handler::Handler;
use crate::http::parser::{read_headers, read_request_line};
use crate::http::request::{Method, Request, RequestLine};
use crate::http::writer::ResponseWriter;

/// Serves exactly one request on one accepted stream, then closes it.
pub struct Connection<S, H> {
    stream: Option<BufStream<S>>,
    peer: SocketAddr,
    handler: Arc<H>,
    limits: ConnectionLimits,
    response: ResponseWriter,
    state: ConnectionState,
    accepted_at: Instant,
    read_deadline: Option<Instant>,
    request_line: Option<RequestLine>,
}

#[derive(Debug)]
pub enum ConnectionState {
    Accepted,
    ParsingRequestLine,
    ParsingHeaders(RequestLine),
    Dispatching(Request),
    WritingResponse,
    Failed(HttpError),
    Closed,
}

impl<S, H> Connection<S, H>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
    H: Handler,
{
    pub fn new(stream: S, peer: SocketAddr, handler: Arc<H>, limits: ConnectionLimits) -> Self {
        Self {
            stream: Some(BufStream::new(stream)),
            peer,
            handler,
            limits,
            response: ResponseWriter::new(),
            state: ConnectionState::Accepted,
            accepted_at: Instant::now(),
            read_deadline: None,
            request_line: None,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// Drives the exchange to completion.
    ///
    /// The stream is closed on every path. The returned error is the one that
    /// moved the connection into `Failed`; it has already been logged and
    /// answered with the generic failure response where possible.
    pub async fn run(&mut self) -> Result<(), HttpError> {
        let mut outcome = Ok(());

        loop {
            let state = std::mem::replace(&mut self.state, ConnectionState::Closed);

            self.state = match state {
                ConnectionState::Accepted => {
                    self.read_deadline = self.deadline(self.limits.read_timeout);
                    ConnectionState::ParsingRequestLine
                }

                ConnectionState::ParsingRequestLine => match self.read_request_line().await {
                    Ok(line) => {
                        self.request_line = Some(line.clone());
                        ConnectionState::ParsingHeaders(line)
                    }
                    Err(e) => ConnectionState::Failed(e),
                },

                ConnectionState::ParsingHeaders(line) => match self.read_headers().await {
                    Ok(headers) => ConnectionState::Dispatching(Request::new(line, headers)),
                    Err(e) => ConnectionState::Failed(e),
                },

                ConnectionState::Dispatching(request) => match self.dispatch(&request).await {
                    Ok(()) => ConnectionState::WritingResponse,
                    Err(e) => ConnectionState::Failed(e),
                },

                ConnectionState::WritingResponse => {
                    if self.response.is_empty() {
                        debug!(peer = %self.peer, "handler produced no response");
                        self.response.write_failure();
                    }
                    match self.flush_response().await {
                        Ok(()) => ConnectionState::Closed,
                        Err(e) => ConnectionState::Failed(e),
                    }
                }

                ConnectionState::Failed(e) => {
                    self.fail(&e).await;
                    outcome = Err(e);
                    ConnectionState::Closed
                }

                ConnectionState::Closed => {
                    self.close().await;
                    break;
                }
            };
        }

        outcome
    }

    /// Shuts the stream down. Calling it again is a no-op.
    ///
    /// Shutting down flushes whatever is still buffered, so it runs under the
    /// write deadline; past it the stream is dropped unflushed.
    pub async fn close(&mut self) {
        let deadline = self.deadline(self.limits.write_timeout);
        if let Some(mut stream) = self.stream.take() {
            let shutdown = with_deadline(deadline, "closing the connection", async {
                stream.shutdown().await?;
                Ok(())
            });
            if let Err(e) = shutdown.await {
                debug!(peer = %self.peer, error = %e, "shutdown failed");
            }
            debug!(peer = %self.peer, "connection closed");
        }
    }

    async fn read_request_line(&mut self) -> Result<RequestLine, HttpError> {
        let deadline = self.read_deadline;
        let stream = self.stream_mut()?;
        with_deadline(deadline, "reading the request line", read_request_line(stream)).await
    }

    async fn read_headers(&mut self) -> Result<std::collections::HashMap<String, String>, HttpError> {
        let deadline = self.read_deadline;
        let stream = self.stream_mut()?;
        with_deadline(deadline, "reading headers", read_headers(stream)).await
    }

    async fn dispatch(&mut self, request: &Request) -> Result<(), HttpError> {
        let method = Method::from_str(&request.method)
            .ok_or_else(|| HttpError::UnsupportedMethod(request.method.clone()))?;

        let handler_deadline = self.deadline(None);
        debug!(peer = %self.peer, method = method.as_str(), uri = %request.target, "dispatching");

        match method {
            Method::GET => {
                let handler = &self.handler;
                let response = &mut self.response;
                with_deadline(handler_deadline, "handling GET", async move {
                    handler
                        .handle_get(request, response)
                        .await
                        .map_err(HttpError::HandlerFault)
                })
                .await
            }
            Method::POST => {
                let read_deadline = self.read_deadline;
                let stream = self.stream_mut()?;
                let body = with_deadline(
                    read_deadline,
                    "reading the request body",
                    read_body(stream, &request.headers),
                )
                .await?;
                debug!(peer = %self.peer, len = body.len(), "got post data");

                let handler = &self.handler;
                let response = &mut self.response;
                with_deadline(handler_deadline, "handling POST", async move {
                    handler
                        .handle_post(request, body, response)
                        .await
                        .map_err(HttpError::HandlerFault)
                })
                .await
            }
        }
    }

    async fn flush_response(&mut self) -> Result<(), HttpError> {
        let deadline = self.deadline(self.limits.write_timeout);
        let bytes = self.response.take();
        let stream = self.stream_mut()?;
        with_deadline(deadline, "writing the response", async move {
            stream.write_all(&bytes).await?;
            stream.flush().await?;
            Ok(())
        })
        .await
    }

    /// Logs the failure and makes one attempt at the generic failure response.
    async fn fail(&mut self, error: &HttpError) {
        let (method, target) = match &self.request_line {
            Some(line) => (Some(line.method.as_str()), Some(line.target.as_str())),
            None => (None, None),
        };
        warn!(
            peer = %self.peer,
            method = ?method,
            uri = ?target,
            error = %error,
            "request failed"
        );

        self.response.clear();
        self.response.write_failure();
        if let Err(e) = self.flush_response().await {
            debug!(peer = %self.peer, error = %e, "failure response not delivered");
        }
    }

    fn stream_mut(&mut self) -> Result<&mut BufStream<S>, HttpError> {
        self.stream
            .as_mut()
            .ok_or(HttpError::UnexpectedDisconnect("using an already closed connection"))
    }

    /// The earlier of `now + phase` and the end of the connection's lifetime.
    fn deadline(&self, phase: Option<std::time::Duration>) -> Option<Instant> {
        let phase_end = phase.map(|d| Instant::now() + d);
        let lifetime_end = self.limits.max_lifetime.map(|d| self.accepted_at + d);
        match (phase_end, lifetime_end) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

async fn with_deadline<T, F>(
    deadline: Option<Instant>,
    phase: &'static str,
    fut: F,
) -> Result<T, HttpError>
where
    F: Future<Output = Result<T, HttpError>>,
{
    match deadline {
        Some(at) => timeout_at(at, fut)
            .await
            .map_err(|_| HttpError::Timeout(phase))?,
        None => fut.await,
    }
}
