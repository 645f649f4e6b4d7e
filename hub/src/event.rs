//! Events and their wire encoding.
//!
//! Server-to-client frames have the shape
//! `{"type": string, "timestamp": RFC3339, "payload": <event JSON>}`.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::topic::Topic;

/// An immutable event ready to be broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<P> {
    kind: String,
    topic: Option<Topic>,
    timestamp: DateTime<Utc>,
    payload: P,
}

/// Borrowed view serialized onto the wire.
#[derive(Serialize)]
struct WireFrame<'a, P> {
    #[serde(rename = "type")]
    kind: &'a str,
    timestamp: &'a DateTime<Utc>,
    payload: &'a P,
}

impl<P: Serialize> Event<P> {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(kind: impl Into<String>, payload: P) -> Self {
        Self::at(kind, Utc::now(), payload)
    }

    /// Creates an event with an explicit timestamp.
    #[must_use]
    pub fn at(kind: impl Into<String>, timestamp: DateTime<Utc>, payload: P) -> Self {
        Self {
            kind: kind.into(),
            topic: None,
            timestamp,
            payload,
        }
    }

    /// Tags the event with the topic it belongs to.
    #[must_use]
    pub fn with_topic(mut self, topic: Topic) -> Self {
        self.topic = Some(topic);
        self
    }

    /// Returns the wire type tag.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the topic, if any.
    #[must_use]
    pub const fn topic(&self) -> Option<&Topic> {
        self.topic.as_ref()
    }

    /// Returns the creation time.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the payload.
    #[must_use]
    pub const fn payload(&self) -> &P {
        &self.payload
    }

    /// Encodes the wire frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn encode(&self) -> Result<Bytes, serde_json::Error> {
        let frame = WireFrame {
            kind: &self.kind,
            timestamp: &self.timestamp,
            payload: &self.payload,
        };
        serde_json::to_vec(&frame).map(Bytes::from)
    }
}
