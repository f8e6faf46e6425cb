//! Bounded client connection set with broadcast fan-out.
//!
//! The registry is owned by the daemon and injected into the server -
//! never global state. It enforces the `max_clients` admission bound and
//! delivers every response frame to every connected client.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Unique identifier for one client connection.
pub type ClientId = u64;

/// Shared writer half of a client socket.
pub type ClientWriter = Arc<Mutex<BufWriter<OwnedWriteHalf>>>;

/// Write timeout toward one client during a broadcast.
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// A live client connection: socket writer plus peer address.
pub struct ClientConnection {
    /// Peer address, for logging
    pub peer: SocketAddr,

    /// Writer for delivering broadcast frames
    pub writer: ClientWriter,
}

/// Bounded set of live client connections.
pub struct ConnectionRegistry {
    /// Connected clients, keyed by client id
    clients: RwLock<HashMap<ClientId, ClientConnection>>,

    /// Admission bound
    max_clients: usize,
}

impl ConnectionRegistry {
    /// Creates an empty registry with the given admission bound.
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            max_clients,
        }
    }

    /// Returns the admission bound.
    pub fn max_clients(&self) -> usize {
        self.max_clients
    }

    /// Returns the number of currently connected clients.
    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Admits a connection iff the set is below the bound.
    ///
    /// On rejection the caller must close the connection immediately
    /// without serving it; nothing is ever read from a rejected client.
    pub async fn admit(&self, id: ClientId, peer: SocketAddr, writer: ClientWriter) -> bool {
        let mut clients = self.clients.write().await;

        if clients.len() >= self.max_clients {
            warn!(
                peer = %peer,
                connected = clients.len(),
                max = self.max_clients,
                "Too many clients, rejecting connection"
            );
            return false;
        }

        clients.insert(id, ClientConnection { peer, writer });
        debug!(
            client = id,
            peer = %peer,
            connected = clients.len(),
            max = self.max_clients,
            "Client admitted"
        );
        true
    }

    /// Removes a connection. Idempotent.
    pub async fn remove(&self, id: ClientId) {
        let mut clients = self.clients.write().await;
        if clients.remove(&id).is_some() {
            debug!(client = id, connected = clients.len(), "Client removed");
        }
    }

    /// Delivers one frame to every connected client.
    ///
    /// Snapshot semantics: clients admitted after the read lock is taken
    /// do not receive this particular frame. A write failure on one
    /// client is isolated - logged, the client removed - and never
    /// prevents delivery to the others.
    pub async fn broadcast(&self, frame: &[u8]) {
        let clients = self.clients.read().await;
        let mut failed = Vec::new();

        for (id, client) in clients.iter() {
            let mut writer = client.writer.lock().await;
            let send = timeout(WRITE_TIMEOUT, async {
                writer.write_all(frame).await?;
                writer.flush().await?;
                Ok::<(), std::io::Error>(())
            })
            .await;

            match send {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    debug!(client = *id, peer = %client.peer, error = %e, "Broadcast write failed");
                    failed.push(*id);
                }
                Err(_) => {
                    debug!(client = *id, peer = %client.peer, "Broadcast write timed out");
                    failed.push(*id);
                }
            }
        }

        // Remove failed clients (need to drop the read lock first)
        drop(clients);

        for id in failed {
            self.remove(id).await;
        }
    }

    /// Drains and closes every connection. Used at shutdown.
    pub async fn clear(&self) {
        let mut clients = self.clients.write().await;
        for (_, client) in clients.drain() {
            let mut writer = client.writer.lock().await;
            let _ = writer.flush().await;
            let _ = writer.shutdown().await;
        }
    }
}
