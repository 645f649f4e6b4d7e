//! Client session state.
//!
//! A [`Client`] pairs an identity with its subscription set and the sending
//! half of its mailbox. Once registered it is owned by the hub; the read pump
//! keeps a [`Subscriptions`] handle to apply control frames.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use bytes::Bytes;
use uuid::Uuid;

use crate::connection::CloseReason;
use crate::mailbox::{self, Mailbox, MailboxReceiver};
use crate::topic::Topic;

/// Opaque client identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(String);

impl ClientId {
    /// Creates a new random client ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for ClientId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A client's topic subscriptions.
///
/// Cheap to clone; clones share the same set. Written by the client's read
/// pump and read by the hub during broadcast.
#[derive(Debug, Clone, Default)]
pub struct Subscriptions {
    topics: Arc<RwLock<HashSet<Topic>>>,
}

impl Subscriptions {
    /// Adds a topic. Returns false if it was already present.
    pub fn subscribe(&self, topic: Topic) -> bool {
        self.topics
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(topic)
    }

    /// Removes a topic. Returns false if it was not present.
    pub fn unsubscribe(&self, topic: &str) -> bool {
        self.topics
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(topic)
    }

    /// Returns true if subscribed to the topic.
    #[must_use]
    pub fn contains(&self, topic: &str) -> bool {
        self.topics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(topic)
    }

    /// Returns the number of subscribed topics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.topics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if there are no subscriptions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a sorted copy of the subscribed topics.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Topic> {
        let mut topics: Vec<Topic> = self
            .topics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        topics.sort();
        topics
    }
}

/// A connected client session.
#[derive(Debug)]
pub struct Client {
    id: ClientId,
    user_id: Option<String>,
    subscriptions: Subscriptions,
    mailbox: Mailbox,
}

impl Client {
    /// Creates a client with a fresh ID, no subscriptions and an empty
    /// mailbox of the given capacity.
    #[must_use]
    pub fn new(user_id: Option<String>, mailbox_capacity: usize) -> (Self, MailboxReceiver) {
        Self::with_id(ClientId::new(), user_id, mailbox_capacity)
    }

    /// Creates a client with a caller-supplied ID.
    #[must_use]
    pub fn with_id(
        id: ClientId,
        user_id: Option<String>,
        mailbox_capacity: usize,
    ) -> (Self, MailboxReceiver) {
        let (mailbox, receiver) = mailbox::channel(mailbox_capacity);
        let client = Self {
            id,
            user_id,
            subscriptions: Subscriptions::default(),
            mailbox,
        };
        (client, receiver)
    }

    /// Returns the client ID.
    #[must_use]
    pub const fn id(&self) -> &ClientId {
        &self.id
    }

    /// Returns the user this session belongs to, if known.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Returns a handle to the subscription set.
    #[must_use]
    pub fn subscriptions(&self) -> Subscriptions {
        self.subscriptions.clone()
    }

    /// Subscribes to a topic. Subscribing twice is a no-op.
    pub fn subscribe(&self, topic: Topic) -> bool {
        self.subscriptions.subscribe(topic)
    }

    /// Unsubscribes from a topic. Unknown topics are a no-op.
    pub fn unsubscribe(&self, topic: &str) -> bool {
        self.subscriptions.unsubscribe(topic)
    }

    /// Returns true if subscribed to the topic.
    #[must_use]
    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.subscriptions.contains(topic)
    }

    /// Returns true if a broadcast scoped to `topic` should reach this
    /// client. Unscoped broadcasts reach everyone.
    #[must_use]
    pub fn accepts(&self, topic: Option<&str>) -> bool {
        match topic {
            Some(topic) => self.is_subscribed(topic),
            None => true,
        }
    }

    /// Enqueues a frame without waiting. False signals backpressure.
    #[must_use]
    pub fn send(&self, frame: Bytes) -> bool {
        self.mailbox.send(frame)
    }

    /// Returns true if the mailbox reader (the write pump) has gone away.
    #[must_use]
    pub(crate) fn is_reader_gone(&self) -> bool {
        self.mailbox.is_reader_gone()
    }

    /// Consumes the client and closes its mailbox.
    pub(crate) fn close(self, reason: CloseReason) {
        self.mailbox.close(reason);
    }
}
