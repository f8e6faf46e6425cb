//! Railmux Protocol - framing rules for the DCC-EX serial wire format
//!
//! The command station speaks a line-oriented bracketed-ASCII protocol.
//! This crate provides the two pieces of that format the daemon needs:
//! - `frame` - accumulating a response frame and filtering debug lines
//! - `handshake` - recognizing the board's identification signature
//!
//! The daemon treats command and response *content* as opaque bytes; only
//! line boundaries, the debug-line marker, and the startup signature are
//! interpreted here.

pub mod frame;
pub mod handshake;

pub use frame::{classify_line, FrameBuffer, LineClass, DEBUG_PREFIX};
pub use handshake::{contains_signature, extract_board_id, BOARD_SIGNATURE};
