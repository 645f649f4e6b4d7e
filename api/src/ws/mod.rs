//! WebSocket surface.
//!
//! Upgrades `GET /ws` and hands the socket to a `tickcast_hub::Connection`.
//! Clients control delivery with
//! `{"action": "subscribe" | "unsubscribe", "channel": "<topic>"}` frames and
//! receive `{"type", "timestamp", "payload"}` frames.

pub mod frames;
pub mod handler;

pub use handler::{ws_handler, ConnectParams};
