//! Inbound control frames.
//!
//! Clients send `{"action": "subscribe" | "unsubscribe", "channel": string}`.
//! Unknown actions and malformed frames are ignored rather than treated as
//! errors.

use serde::{Deserialize, Serialize};

use crate::client::Subscriptions;
use crate::topic::Topic;

/// Action requested by a control frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    /// Add the channel to the client's subscriptions.
    Subscribe,

    /// Remove the channel from the client's subscriptions.
    Unsubscribe,

    /// Any other action. Ignored.
    #[serde(other)]
    Unknown,
}

/// Control frame sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFrame {
    /// Requested action.
    pub action: ControlAction,

    /// Topic the action applies to.
    pub channel: String,
}

impl ControlFrame {
    /// Creates a subscribe frame.
    #[must_use]
    pub fn subscribe(channel: impl Into<String>) -> Self {
        Self {
            action: ControlAction::Subscribe,
            channel: channel.into(),
        }
    }

    /// Creates an unsubscribe frame.
    #[must_use]
    pub fn unsubscribe(channel: impl Into<String>) -> Self {
        Self {
            action: ControlAction::Unsubscribe,
            channel: channel.into(),
        }
    }

    /// Parses a control frame from raw text.
    ///
    /// Returns None if the text is not a control frame.
    #[must_use]
    pub fn parse(text: &[u8]) -> Option<Self> {
        serde_json::from_slice(text).ok()
    }

    /// Applies the frame to a subscription set.
    ///
    /// Returns true if the set changed.
    pub fn apply(&self, subscriptions: &Subscriptions) -> bool {
        match self.action {
            ControlAction::Subscribe => match Topic::parse(&self.channel) {
                Some(topic) => subscriptions.subscribe(topic),
                None => false,
            },
            ControlAction::Unsubscribe => subscriptions.unsubscribe(&self.channel),
            ControlAction::Unknown => false,
        }
    }
}
