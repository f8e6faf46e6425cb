//! Transport actor - owns the command station connection.
//!
//! The actor is the single owner of the serial device. It drains its
//! command channel on a dedicated thread, processing transactions
//! strictly one at a time - that sequencing is what keeps concurrent
//! client commands from ever interleaving on the wire.
//!
//! The loop must stay off the tokio runtime: serial reads block at the
//! OS level for up to the configured port timeout.

use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use railmux_protocol::{handshake, FrameBuffer, LineClass};

use super::commands::{TransportCommand, TransportError};

/// Status command used to coax the board into identifying itself.
const STATUS_REQUEST: &[u8] = b"<s>";

/// Transport actor - exclusive owner of the serial device.
///
/// Generic over the device so tests can substitute an in-memory mock
/// for the `serialport` handle.
pub struct TransportActor<D> {
    /// Command receiver
    receiver: mpsc::Receiver<TransportCommand>,

    /// The open device (the real port, or a mock in tests)
    device: D,
}

impl<D: Read + Write> TransportActor<D> {
    /// Creates a new transport actor around an open device.
    pub fn new(receiver: mpsc::Receiver<TransportCommand>, device: D) -> Self {
        Self { receiver, device }
    }

    /// Runs the actor loop until the channel closes (all handles dropped).
    ///
    /// Call this on a dedicated thread; it blocks.
    pub fn run(mut self) {
        info!("Serial transport starting");

        while let Some(cmd) = self.receiver.blocking_recv() {
            self.handle_command(cmd);
        }

        // Dropping `device` here closes the port on every shutdown path.
        info!("Serial transport stopped, releasing port");
    }

    /// Dispatches a command to the appropriate handler.
    fn handle_command(&mut self, cmd: TransportCommand) {
        match cmd {
            TransportCommand::Execute {
                command,
                respond_to,
            } => {
                let result = self.handle_execute(&command);
                // Ignore send error - the requester may have disconnected
                // mid-transaction; the frame is still broadcast by whoever
                // holds the result.
                let _ = respond_to.send(result);
            }
            TransportCommand::Identify {
                timeout,
                respond_to,
            } => {
                let result = self.handle_identify(timeout);
                let _ = respond_to.send(result);
            }
        }
    }

    /// Executes one command/response transaction.
    ///
    /// Writes the command, then accumulates lines into a frame until the
    /// blank terminator. A read timeout ends the frame early and returns
    /// the partial buffer - accepted behavior, not an error.
    fn handle_execute(&mut self, command: &[u8]) -> Result<Vec<u8>, TransportError> {
        self.device.write_all(command)?;
        self.device.flush()?;

        let mut frame = FrameBuffer::new();
        loop {
            let line = self.read_line()?;
            match frame.push_line(&line) {
                LineClass::Data => {}
                LineClass::Debug => {
                    debug!(
                        line = %String::from_utf8_lossy(&line).trim_end(),
                        "Device debug output"
                    );
                }
                LineClass::Terminator => break,
            }
        }

        let bytes = frame.into_bytes();
        debug!(len = bytes.len(), "Transaction complete");
        Ok(bytes)
    }

    /// Scans raw device lines for the board signature.
    ///
    /// Bypasses frame buffering: the board may emit any amount of boot
    /// noise before identifying, and there is no terminator to wait for.
    /// Bounded by `timeout` so a silent device fails startup instead of
    /// hanging the daemon forever.
    fn handle_identify(&mut self, timeout: Duration) -> Result<String, TransportError> {
        self.device.write_all(STATUS_REQUEST)?;
        self.device.flush()?;

        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            let line = self.read_line()?;
            if line.is_empty() {
                continue;
            }

            let text = String::from_utf8_lossy(&line);
            if handshake::contains_signature(&text) {
                if let Some(board) = handshake::extract_board_id(&text) {
                    return Ok(board);
                }
            }
            debug!(line = %text.trim_end(), "Waiting for board signature");
        }

        warn!(?timeout, "Command station did not identify itself");
        Err(TransportError::HandshakeTimeout { timeout })
    }

    /// Reads one line from the device.
    ///
    /// Returns the line bytes including the trailing newline. A timed-out
    /// read ends the line where it stands: mid-line it yields the partial
    /// bytes, at line start it yields an empty line (which callers treat
    /// as the frame terminator).
    fn read_line(&mut self) -> Result<Vec<u8>, TransportError> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.device.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    line.push(byte[0]);
                    if byte[0] == b'\n' {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::TimedOut => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;

    /// Scripted in-memory station: every write queues the scripted
    /// response; reads drain it one byte at a time and time out when
    /// nothing is pending, like a real port.
    struct MockStation<F> {
        script: F,
        pending: VecDeque<u8>,
        fail_next_write: bool,
    }

    impl<F: FnMut(&[u8]) -> Vec<u8>> MockStation<F> {
        fn new(script: F) -> Self {
            Self {
                script,
                pending: VecDeque::new(),
                fail_next_write: false,
            }
        }
    }

    impl<F: FnMut(&[u8]) -> Vec<u8>> Read for MockStation<F> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if buf.is_empty() {
                return Ok(0);
            }
            match self.pending.pop_front() {
                Some(b) => {
                    buf[0] = b;
                    Ok(1)
                }
                None => Err(io::Error::new(ErrorKind::TimedOut, "mock read timeout")),
            }
        }
    }

    impl<F: FnMut(&[u8]) -> Vec<u8>> Write for MockStation<F> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail_next_write {
                self.fail_next_write = false;
                return Err(io::Error::new(ErrorKind::BrokenPipe, "mock device gone"));
            }
            let response = (self.script)(buf);
            self.pending.extend(response);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn actor_with_script<F>(script: F) -> TransportActor<MockStation<F>>
    where
        F: FnMut(&[u8]) -> Vec<u8>,
    {
        let (_tx, rx) = mpsc::channel(1);
        TransportActor::new(rx, MockStation::new(script))
    }

    #[test]
    fn execute_accumulates_frame_and_filters_debug() {
        let mut actor = actor_with_script(|cmd| {
            assert_eq!(cmd, b"<s>");
            b"<* free mem 2048 *>\n<p1 MAIN>\n<iDCC-EX V-4.2.5>\n\n".to_vec()
        });

        let frame = actor.handle_execute(b"<s>").unwrap();
        assert_eq!(frame, b"<p1 MAIN>\n<iDCC-EX V-4.2.5>\n");
    }

    #[test]
    fn execute_timeout_returns_partial_frame() {
        // No terminating blank line: the frame ends at the first timed-out
        // read with whatever was accumulated.
        let mut actor = actor_with_script(|_| b"<T 1 50 1>\n".to_vec());

        let frame = actor.handle_execute(b"<t 1 3 50 1>").unwrap();
        assert_eq!(frame, b"<T 1 50 1>\n");
    }

    #[test]
    fn execute_on_silent_device_returns_empty_frame() {
        let mut actor = actor_with_script(|_| Vec::new());

        let frame = actor.handle_execute(b"<s>").unwrap();
        assert!(frame.is_empty());
    }

    #[test]
    fn execute_error_does_not_poison_later_transactions() {
        let mut actor = actor_with_script(|_| b"<ok>\n\n".to_vec());
        actor.device.fail_next_write = true;

        let err = actor.handle_execute(b"<s>").unwrap_err();
        assert!(matches!(err, TransportError::Io(_)));

        let frame = actor.handle_execute(b"<s>").unwrap();
        assert_eq!(frame, b"<ok>\n");
    }

    #[test]
    fn identify_skips_boot_noise() {
        let mut actor = actor_with_script(|cmd| {
            assert_eq!(cmd, b"<s>");
            b"<* booting *>\n<iDCC-EX V-4.2.5 / MEGA G-75ab3ab>\n\n".to_vec()
        });

        let board = actor.handle_identify(Duration::from_secs(1)).unwrap();
        assert_eq!(board, "<iDCC-EX V-4.2.5 / MEGA G-75ab3ab>");
    }

    #[test]
    fn identify_times_out_on_silent_device() {
        let mut actor = actor_with_script(|_| Vec::new());

        let err = actor
            .handle_identify(Duration::from_millis(20))
            .unwrap_err();
        assert!(matches!(err, TransportError::HandshakeTimeout { .. }));
    }

    #[test]
    fn read_line_returns_partial_on_timeout() {
        let mut actor = actor_with_script(|_| Vec::new());
        actor.device.pending.extend(b"<incompl");

        let line = actor.read_line().unwrap();
        assert_eq!(line, b"<incompl");
    }
}
