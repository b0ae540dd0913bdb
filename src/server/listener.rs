use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::config::{ConnectionLimits, ServerConfig};
use crate::http::connection::Connection;
use crate::http::handler::Handler;

/// Pause after a failed accept so a persistent error does not spin the loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(10);

pub struct Listener {
    inner: TcpListener,
    limits: ConnectionLimits,
}

impl Listener {
    pub async fn bind(cfg: &ServerConfig) -> anyhow::Result<Self> {
        let addr = cfg.socket_addr();
        let inner = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        info!("Listening on {}", inner.local_addr()?);

        Ok(Self {
            inner,
            limits: cfg.limits,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// Accepts connections until `shutdown` resolves.
    ///
    /// Every accepted connection gets its own task; the only things workers
    /// share are the handler and the connection limits.
    pub async fn serve<H, F>(self, handler: Arc<H>, shutdown: F) -> anyhow::Result<()>
    where
        H: Handler,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let accepted = tokio::select! {
                _ = &mut shutdown => {
                    info!("Listener stopped");
                    return Ok(());
                }
                accepted = self.inner.accept() => accepted,
            };

            let (socket, peer) = match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };
            info!("Accepted connection from {}", peer);

            let handler = Arc::clone(&handler);
            let limits = self.limits;
            tokio::spawn(async move {
                let mut conn = Connection::new(socket, peer, handler, limits);
                if let Err(e) = conn.run().await {
                    debug!("Connection from {} ended with error: {}", peer, e);
                }
            });
        }
    }
}

/// Binds `cfg` and serves until `shutdown` resolves. Only a bind failure is an error.
pub async fn run<H, F>(cfg: &ServerConfig, handler: Arc<H>, shutdown: F) -> anyhow::Result<()>
where
    H: Handler,
    F: Future<Output = ()>,
{
    Listener::bind(cfg).await?.serve(handler, shutdown).await
}
