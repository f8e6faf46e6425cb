//! TCP server for the railmux daemon.
//!
//! The server:
//! - Listens on a TCP socket for client connections
//! - Spawns a ClientSession for each accepted socket
//! - Supports graceful shutdown via CancellationToken
//!
//! Admission control happens inside the session before any client byte
//! is read; the accept loop itself never blocks on a slow client or a
//! slow device.

mod session;

pub use session::ClientSession;

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::registry::ConnectionRegistry;
use crate::transport::TransportHandle;

/// TCP server bridging client sessions to the shared transport.
pub struct ProxyServer {
    /// Bound listener
    listener: TcpListener,

    /// Shared client set
    registry: Arc<ConnectionRegistry>,

    /// Handle to the serial transport actor
    transport: TransportHandle,

    /// Cancellation token for graceful shutdown
    cancel_token: CancellationToken,

    /// Connection counter for generating client IDs
    connection_counter: AtomicU64,
}

impl ProxyServer {
    /// Binds the listening socket.
    ///
    /// Binding is separate from `run` so callers (and tests, which bind
    /// port 0) can learn the local address before serving.
    pub async fn bind(
        addr: SocketAddr,
        registry: Arc<ConnectionRegistry>,
        transport: TransportHandle,
        cancel_token: CancellationToken,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        Ok(Self {
            listener,
            registry,
            transport,
            cancel_token,
            connection_counter: AtomicU64::new(0),
        })
    }

    /// Returns the bound local address.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener.local_addr().map_err(ServerError::LocalAddr)
    }

    /// Accepts connections until the cancellation token is triggered.
    ///
    /// This method does not return until shutdown.
    pub async fn run(&self) -> Result<(), ServerError> {
        info!(
            addr = %self.local_addr()?,
            max_clients = self.registry.max_clients(),
            "Serving clients"
        );

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("Server shutdown requested");
                    break;
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer)) => self.handle_connection(stream, peer),
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                            // Continue accepting other connections
                        }
                    }
                }
            }
        }

        self.registry.clear().await;
        info!("Server cleanup complete");
        Ok(())
    }

    /// Spawns a session task for a newly accepted socket.
    fn handle_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let id = self.connection_counter.fetch_add(1, Ordering::Relaxed);
        let session = ClientSession::new(
            id,
            peer,
            stream,
            Arc::clone(&self.registry),
            self.transport.clone(),
        );

        tokio::spawn(session.run());
    }
}

/// Errors that can occur in server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: io::Error,
    },

    #[error("listener address unavailable: {0}")]
    LocalAddr(#[source] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_display() {
        let err = ServerError::Bind {
            addr: "127.0.0.1:2560".parse().unwrap(),
            source: io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
        };
        assert!(err.to_string().contains("127.0.0.1:2560"));
        assert!(err.to_string().contains("address in use"));
    }
}
