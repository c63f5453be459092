//! # Connect Four Client
//!
//! Client for networked two-player Connect Four. A match server pairs
//! players over a WebSocket session channel and is the authority on every
//! move; this crate mirrors its board, tracks the session lifecycle, and
//! forwards the local player's column choices. A terminal UI built with
//! Ratatui sits on top.
//!
//! ## Modules
//!
//! - [`game`]: board model and player seats
//! - [`protocol`]: JSON wire messages
//! - [`net`]: transports and the connection manager
//! - [`session`]: session state machine, move intents, elapsed-time display
//! - [`client`]: the machine wired to a connection
//! - [`services`]: account and rankings HTTP clients
//! - [`logging`]: tracing setup and the exportable debug log
//! - [`ui`]: terminal screens
//! - [`config`]: TOML configuration loading and validation
//! - [`error`]: structured error types

pub mod client;
pub mod config;
pub mod error;
pub mod game;
pub mod logging;
pub mod net;
pub mod protocol;
pub mod services;
pub mod session;
pub mod ui;
