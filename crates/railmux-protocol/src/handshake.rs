//! Board identification.
//!
//! At power-up the daemon sends a status command and watches the raw
//! device output for the DCC-EX signature. The identification line looks
//! like:
//!
//! ```text
//! <iDCC-EX V-4.2.5 / MEGA / STANDARD_MOTOR_SHIELD G-75ab3ab>
//! ```
//!
//! The scan works on raw lines rather than buffered frames: the board may
//! emit any amount of boot noise before identifying itself, and there is
//! no terminator to wait for.

use std::sync::LazyLock;

use regex::Regex;

/// Marker that distinguishes the identification line.
pub const BOARD_SIGNATURE: &str = "DCC-EX";

static BOARD_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<iDCC-EX.*>").unwrap());

/// True when `line` carries the board signature.
pub fn contains_signature(line: &str) -> bool {
    line.contains(BOARD_SIGNATURE)
}

/// Extracts the bracketed identification substring from a signature line.
///
/// Returns `None` when the line mentions the signature without a
/// well-formed `<iDCC-EX ...>` bracket (e.g. a debug line referencing the
/// firmware name).
pub fn extract_board_id(line: &str) -> Option<String> {
    BOARD_ID.find(line).map(|m| m.as_str().to_string())
}
