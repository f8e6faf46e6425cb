//! Per-client session loop.
//!
//! Lifecycle: accepted → admission check → serving → closed. A session
//! that fails admission is closed immediately without any I/O beyond the
//! close; an admitted session turns each socket read into one transport
//! transaction and broadcasts the resulting frame to the whole registry,
//! requester included.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::registry::{ClientId, ClientWriter, ConnectionRegistry};
use crate::transport::TransportHandle;

/// Upper bound on one socket read; one read chunk is one command.
const READ_CHUNK: usize = 100;

/// Session for a single client connection.
pub struct ClientSession {
    /// Identifier assigned by the accept loop
    id: ClientId,

    /// Peer address, for logging
    peer: SocketAddr,

    /// Read half of the client socket
    reader: OwnedReadHalf,

    /// Write half, shared with the registry for broadcasts
    writer: ClientWriter,

    /// Shared client set
    registry: Arc<ConnectionRegistry>,

    /// Handle to the serial transport actor
    transport: TransportHandle,
}

impl ClientSession {
    /// Creates a session from a freshly accepted socket.
    pub fn new(
        id: ClientId,
        peer: SocketAddr,
        stream: TcpStream,
        registry: Arc<ConnectionRegistry>,
        transport: TransportHandle,
    ) -> Self {
        let (reader, write_half) = stream.into_split();
        Self {
            id,
            peer,
            reader,
            writer: Arc::new(Mutex::new(BufWriter::new(write_half))),
            registry,
            transport,
        }
    }

    /// Runs the session to completion.
    pub async fn run(mut self) {
        let admitted = self
            .registry
            .admit(self.id, self.peer, Arc::clone(&self.writer))
            .await;

        if admitted {
            info!(client = self.id, peer = %self.peer, "Client connected");
            self.serve().await;
        }

        // Idempotent; a no-op for sessions that were never admitted.
        self.registry.remove(self.id).await;
        self.close().await;

        if admitted {
            info!(client = self.id, peer = %self.peer, "Client disconnected");
        }
    }

    /// The serving loop: one read chunk = one command = one transaction.
    async fn serve(&mut self) {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            let n = match self.reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    debug!(client = self.id, error = %e, "Client read failed");
                    break;
                }
            };

            let command = buf[..n].to_vec();
            debug!(
                client = self.id,
                peer = %self.peer,
                command = %String::from_utf8_lossy(&command).trim(),
                "Received command"
            );

            match self.transport.execute(command).await {
                Ok(frame) => {
                    // Fan-out to every connected client, this one included:
                    // the station is shared bus state and every observer
                    // must see every change.
                    self.registry.broadcast(&frame).await;
                    debug!(client = self.id, len = frame.len(), "Frame broadcast");
                }
                Err(e) => {
                    // Degrades this transaction only; the session and all
                    // other clients keep going.
                    warn!(client = self.id, error = %e, "Transaction failed");
                }
            }
        }
    }

    /// Drains pending writes and closes the socket.
    async fn close(&self) {
        let mut writer = self.writer.lock().await;
        let _ = writer.flush().await;
        let _ = writer.shutdown().await;
    }
}
