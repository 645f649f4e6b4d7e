//! Hub error types.
//!
//! Producer-visible errors and per-connection transport errors.

/// Errors returned to callers of the [`Hub`](crate::Hub) API.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// The event payload could not be encoded. Nothing was delivered.
    #[error("failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The hub control loop is no longer running.
    #[error("hub is closed")]
    Closed,
}

/// Errors on a single connection's transport.
///
/// Contained within that connection's pumps; never surfaced to producers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Reading from the peer failed.
    #[error("read failed: {0}")]
    Read(String),

    /// Writing to the peer failed.
    #[error("write failed: {0}")]
    Write(String),

    /// No keep-alive response arrived before the read deadline.
    #[error("read deadline exceeded")]
    ReadTimeout,

    /// A frame could not be written before the write deadline.
    #[error("write deadline exceeded")]
    WriteTimeout,
}
