//! Transport actor commands and errors.
//!
//! Each command carries a oneshot `respond_to` sender, giving async
//! callers a request/response pattern over the actor's mpsc channel.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;

/// Commands sent to the transport actor.
#[derive(Debug)]
pub enum TransportCommand {
    /// Execute one command/response transaction against the station.
    ///
    /// The command bytes are written verbatim; the response is the
    /// accumulated frame (debug lines filtered, terminator consumed).
    Execute {
        /// Raw command bytes from one client
        command: Vec<u8>,
        /// Channel to send the resulting frame
        respond_to: oneshot::Sender<Result<Vec<u8>, TransportError>>,
    },

    /// Request the board's identification string.
    ///
    /// Sends the status command and scans raw device lines for the
    /// DCC-EX signature until `timeout` elapses.
    Identify {
        /// How long to wait for the signature before giving up
        timeout: Duration,
        /// Channel to send the extracted identifier
        respond_to: oneshot::Sender<Result<String, TransportError>>,
    },
}

/// Errors that can occur in transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Opening the serial port failed.
    #[error("failed to open serial port {port}: {source}")]
    Open {
        port: String,
        source: serialport::Error,
    },

    /// Device-level I/O failure during a transaction.
    ///
    /// Reported for the failing transaction only; the actor keeps
    /// serving subsequent commands.
    #[error("serial I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The station never produced its identification signature.
    #[error("command station did not identify itself within {timeout:?}")]
    HandshakeTimeout { timeout: Duration },

    /// The actor has shut down.
    #[error("transport channel closed")]
    ChannelClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TransportError::HandshakeTimeout {
            timeout: Duration::from_secs(10),
        };
        assert!(err.to_string().contains("10s"));

        let err = TransportError::ChannelClosed;
        assert_eq!(err.to_string(), "transport channel closed");
    }
}
