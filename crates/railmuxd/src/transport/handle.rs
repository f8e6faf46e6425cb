//! Client interface for the transport actor.
//!
//! `TransportHandle` is a cheap-to-clone handle shared by every client
//! session; all methods communicate with the actor via channels.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use super::commands::{TransportCommand, TransportError};

/// Handle for driving transactions through the transport actor.
#[derive(Clone)]
pub struct TransportHandle {
    /// Command sender to the actor
    sender: mpsc::Sender<TransportCommand>,
}

impl TransportHandle {
    /// Creates a new handle around the actor's command channel.
    pub(crate) fn new(sender: mpsc::Sender<TransportCommand>) -> Self {
        Self { sender }
    }

    /// Executes one command/response transaction.
    ///
    /// Transactions are mutually exclusive: the actor processes one at a
    /// time, so concurrent callers queue rather than interleave.
    ///
    /// # Errors
    ///
    /// - `TransportError::Io` if the device failed during the transaction
    /// - `TransportError::ChannelClosed` if the actor has shut down
    pub async fn execute(&self, command: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(TransportCommand::Execute {
                command,
                respond_to: tx,
            })
            .await
            .map_err(|_| TransportError::ChannelClosed)?;

        rx.await.map_err(|_| TransportError::ChannelClosed)?
    }

    /// Requests the board's identification string.
    ///
    /// # Errors
    ///
    /// - `TransportError::HandshakeTimeout` if the signature never appears
    /// - `TransportError::Io` if the device failed during the scan
    /// - `TransportError::ChannelClosed` if the actor has shut down
    pub async fn identify(&self, timeout: Duration) -> Result<String, TransportError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(TransportCommand::Identify {
                timeout,
                respond_to: tx,
            })
            .await
            .map_err(|_| TransportError::ChannelClosed)?;

        rx.await.map_err(|_| TransportError::ChannelClosed)?
    }

    /// Check if the actor is still running.
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}
