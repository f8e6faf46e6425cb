//! Railmux Daemon - DCC-EX command-station proxy and broadcast server
//!
//! This crate provides the core infrastructure for the railmux daemon:
//! - `transport` - single-owner access to the serial command station
//! - `registry` - bounded client connection set with broadcast fan-out
//! - `server` - TCP listener and per-client session loops
//! - `config` - TOML configuration
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      railmuxd daemon                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  ┌────────────────┐      ┌──────────────────────────────┐    │
//! │  │  ProxyServer   │      │      TransportActor          │    │
//! │  │ (TcpListener)  │      │ (owns the serial port, one   │    │
//! │  └───────┬────────┘      │  transaction at a time)      │    │
//! │          │ accept()      └──────────────┬───────────────┘    │
//! │          ▼                              │ mpsc + oneshot     │
//! │  ┌────────────────┐   execute()         │                    │
//! │  │ ClientSession  │─────────────────────┘                    │
//! │  │  (per client)  │                                          │
//! │  └───────┬────────┘                                          │
//! │          │ broadcast                                         │
//! │          ▼                                                   │
//! │  ┌────────────────────┐                                      │
//! │  │ ConnectionRegistry │──▶ every connected client            │
//! │  └────────────────────┘                                      │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every response frame produced by the station is fanned out to every
//! connected client, not only the one that issued the command: the device
//! represents shared layout state, and every observer of the bus must see
//! every state change.

pub mod config;
pub mod registry;
pub mod server;
pub mod transport;
