//! Daemon configuration.
//!
//! Loaded from a TOML file:
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyACM0"
//! baudrate = 115200
//! timeout_ms = 500
//!
//! [daemon]
//! listening_ip = "127.0.0.1"
//! listening_port = 2560
//! max_clients = 5
//! log_level = "info"
//! ```
//!
//! Every key is optional; missing sections fall back to the defaults
//! above (the DCC-EX conventions: ttyACM0 at 115200 baud, the standard
//! 2560 command port).

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Top-level daemon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub serial: SerialConfig,
    pub daemon: DaemonConfig,
}

/// Serial connection to the command station.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SerialConfig {
    /// Device path of the command station
    pub port: String,

    /// Line speed in baud
    pub baudrate: u32,

    /// Per-read timeout in milliseconds; bounds each line read so a
    /// silent device yields a partial frame instead of blocking forever
    pub timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            baudrate: 115_200,
            timeout_ms: 500,
        }
    }
}

/// Network-facing daemon settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    /// Address the TCP listener binds
    pub listening_ip: IpAddr,

    /// Port the TCP listener binds
    pub listening_port: u16,

    /// Admission bound on simultaneous client connections
    pub max_clients: usize,

    /// Default log level (overridden by RUST_LOG)
    pub log_level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listening_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            listening_port: 2560,
            max_clients: 5,
            log_level: "info".to_string(),
        }
    }
}

impl DaemonConfig {
    /// The socket address the listener binds.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listening_ip, self.listening_port)
    }
}

impl Config {
    /// Loads configuration from an explicit path.
    ///
    /// An unreadable or unparsable file is a hard error - a user who
    /// named a config file wants that file used.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads configuration from the user config directory, falling back
    /// to built-in defaults when no file exists there.
    pub fn load_default() -> Result<Self, ConfigError> {
        match default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// Default config file location (`<config dir>/railmux/config.toml`).
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("railmux").join("config.toml"))
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
