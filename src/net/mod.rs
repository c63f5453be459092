//! Session channel plumbing.
//!
//! - `transport`: the [`Transport`]/[`Connector`] seam and its WebSocket implementation
//! - `memory`: an in-process channel pair for tests and offline runs
//! - `manager`: [`ConnectionManager`], which owns the channel and classifies closes

mod manager;
pub mod memory;
mod transport;

pub use manager::{session_url, AttemptId, CloseKind, ConnectionManager, ConnectionNotice};
pub use memory::{MemoryConnector, MemoryPeer};
pub use transport::{Connector, Frame, Transport, WebSocketConnector, WebSocketTransport, NORMAL_CLOSURE};
