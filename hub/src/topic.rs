//! Topic names for subscriptions.
//!
//! A topic is a plain string key. Broadcasts either target every client or
//! only the subscribers of one topic.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum topic length in characters.
pub const MAX_TOPIC_LEN: usize = 128;

/// A validated topic name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Topic(String);

impl Topic {
    /// Parses a topic name.
    ///
    /// Accepts 1 to [`MAX_TOPIC_LEN`] characters with no whitespace or
    /// control characters. Returns None otherwise.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        if name.is_empty() || name.chars().count() > MAX_TOPIC_LEN {
            return None;
        }

        if name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            return None;
        }

        Some(Self(name.to_string()))
    }

    /// Builds a topic from a name known to be valid.
    pub(crate) fn from_static(name: &'static str) -> Self {
        debug_assert!(Self::parse(name).is_some(), "invalid topic {name}");
        Self(name.to_string())
    }

    /// Returns the topic name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Topic {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Topic {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid topic: {value:?}"))
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.0
    }
}
