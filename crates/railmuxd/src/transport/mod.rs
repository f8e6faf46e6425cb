//! Serial transport - exclusive access to the command station.
//!
//! The serial handle is a single-owner resource: every transaction goes
//! through one actor that owns the open port, reached via a
//! request/response channel. Client sessions never touch the device
//! directly, which is what guarantees that at most one frame is being
//! produced at any instant.
//!
//! ```text
//! ┌───────────────┐  TransportCommand   ┌─────────────────────────┐
//! │ClientSession N│────────────────────▶│     TransportActor      │
//! └───────────────┘   (mpsc channel)    │  dedicated thread, owns │
//!         ▲                             │  the serial port        │
//!         └─────────────────────────────│                         │
//!             oneshot response          └─────────────────────────┘
//! ```

mod actor;
mod commands;
mod handle;

pub use actor::TransportActor;
pub use commands::{TransportCommand, TransportError};
pub use handle::TransportHandle;

use std::io::{Read, Write};
use std::thread;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::info;

use crate::config::SerialConfig;

/// Command channel buffer size
const COMMAND_BUFFER: usize = 32;

/// How long the startup handshake waits for the board signature.
///
/// A station that stays silent past this bound fails the daemon at
/// startup instead of hanging it forever.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens the configured serial port and spawns the transport actor.
pub fn connect(config: &SerialConfig) -> Result<TransportHandle, TransportError> {
    let port = serialport::new(config.port.as_str(), config.baudrate)
        .timeout(Duration::from_millis(config.timeout_ms))
        .open()
        .map_err(|source| TransportError::Open {
            port: config.port.clone(),
            source,
        })?;

    info!(
        port = %config.port,
        baudrate = config.baudrate,
        timeout_ms = config.timeout_ms,
        "Serial port opened"
    );

    Ok(spawn_transport(port))
}

/// Spawns the transport actor around an already-open device.
///
/// The actor runs on a dedicated thread (serial I/O blocks) and exits
/// when every handle has been dropped, closing the device with it.
/// Public so tests can drive the daemon with an in-memory device.
pub fn spawn_transport<D>(device: D) -> TransportHandle
where
    D: Read + Write + Send + 'static,
{
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);

    let actor = TransportActor::new(cmd_rx, device);
    thread::spawn(move || actor.run());

    TransportHandle::new(cmd_tx)
}
