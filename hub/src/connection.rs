//! Connection lifecycle.
//!
//! A [`Connection`] owns one live transport and walks it through
//! `Connecting → Active → Closing → Closed`. The transport itself is any
//! [`Sink`] and [`Stream`] of [`Frame`]s, so the hub never depends on a
//! particular WebSocket implementation.

use std::fmt::Display;
use std::sync::Arc;

use bytes::Bytes;
use futures::{Sink, Stream};
use tokio::sync::watch;
use tracing::{error, info};

use crate::client::{Client, ClientId, Subscriptions};
use crate::config::ConnectionConfig;
use crate::error::HubError;
use crate::hub::Hub;
use crate::mailbox::MailboxReceiver;
use crate::pumps::{self, PumpContext};

/// A transport-level frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text, carrying JSON in both directions.
    Text(Bytes),

    /// Binary data. Ignored by the read pump.
    Binary(Bytes),

    /// Keep-alive probe.
    Ping(Bytes),

    /// Keep-alive response.
    Pong(Bytes),

    /// Close handshake, with the reason when the server initiates it.
    Close(Option<CloseReason>),
}

/// Why the server closed a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseReason {
    /// Ordinary teardown.
    Normal,

    /// The client's mailbox overflowed and it was evicted.
    SlowConsumer,

    /// The hub is shutting down.
    Shutdown,
}

impl CloseReason {
    /// Returns the WebSocket close code.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Normal => 1000,
            Self::Shutdown => 1001,
            Self::SlowConsumer => 1013,
        }
    }

    /// Returns the human-readable close reason.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Normal => "",
            Self::Shutdown => "server shutting down",
            Self::SlowConsumer => "slow consumer",
        }
    }

    pub(crate) const fn as_u8(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::SlowConsumer => 1,
            Self::Shutdown => 2,
        }
    }

    pub(crate) const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::SlowConsumer,
            2 => Self::Shutdown,
            _ => Self::Normal,
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Created, not yet registered with the hub.
    Connecting,

    /// Registered; both pumps running.
    Active,

    /// A pump failed or the hub evicted the client; pumps are winding down.
    Closing,

    /// Both pumps have exited. Terminal.
    Closed,
}

impl ConnectionState {
    /// Returns true if moving to `next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Connecting, Self::Active)
                | (Self::Connecting, Self::Closing)
                | (Self::Active, Self::Closing)
                | (Self::Closing, Self::Closed)
        )
    }
}

/// Shared, observable connection state.
#[derive(Debug, Clone)]
pub(crate) struct Lifecycle {
    tx: Arc<watch::Sender<ConnectionState>>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(ConnectionState::Connecting);
        Self { tx: Arc::new(tx) }
    }

    /// Moves to `next` if the transition is legal. Returns true if it moved.
    pub(crate) fn transition(&self, next: ConnectionState) -> bool {
        self.tx.send_if_modified(|state| {
            if state.can_transition_to(next) {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    pub(crate) fn current(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }
}

/// One live client connection.
#[derive(Debug)]
pub struct Connection {
    client: Client,
    mailbox: MailboxReceiver,
    hub: Hub,
    config: ConnectionConfig,
    lifecycle: Lifecycle,
}

impl Connection {
    /// Creates a connection for an authenticated peer.
    ///
    /// The client starts with no subscriptions and an empty mailbox sized by
    /// the hub's configuration.
    #[must_use]
    pub fn new(hub: Hub, user_id: Option<String>, config: ConnectionConfig) -> Self {
        let (client, mailbox) = hub.new_client(user_id);
        Self {
            client,
            mailbox,
            hub,
            config,
            lifecycle: Lifecycle::new(),
        }
    }

    /// Returns the client ID.
    #[must_use]
    pub const fn id(&self) -> &ClientId {
        self.client.id()
    }

    /// Returns a handle to the client's subscriptions.
    #[must_use]
    pub fn subscriptions(&self) -> Subscriptions {
        self.client.subscriptions()
    }

    /// Returns the current state.
    #[must_use]
    pub fn current_state(&self) -> ConnectionState {
        self.lifecycle.current()
    }

    /// Returns a receiver that observes state changes.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.lifecycle.subscribe()
    }

    /// Registers the client and runs both pumps until the connection ends.
    ///
    /// The write pump runs on its own task; the read pump runs on the
    /// caller's. Returns once both have exited.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Closed`] if the hub is no longer running.
    pub async fn run<K, S, E>(self, sink: K, stream: S) -> Result<(), HubError>
    where
        K: Sink<Frame> + Unpin + Send + 'static,
        K::Error: Display + Send,
        S: Stream<Item = Result<Frame, E>> + Unpin,
        E: Display,
    {
        let Self {
            client,
            mailbox,
            hub,
            config,
            lifecycle,
        } = self;

        let id = client.id().clone();
        let subscriptions = client.subscriptions();
        let user_id = client.user_id().map(str::to_string);

        if let Err(e) = hub.register(client) {
            lifecycle.transition(ConnectionState::Closing);
            lifecycle.transition(ConnectionState::Closed);
            return Err(e);
        }
        lifecycle.transition(ConnectionState::Active);
        info!(
            client_id = %id,
            user_id = user_id.as_deref().unwrap_or("-"),
            "Connection active"
        );

        let ctx = PumpContext {
            id: id.clone(),
            metrics: hub.metrics(),
            hub,
            config,
            lifecycle: lifecycle.clone(),
        };

        let writer = tokio::spawn(pumps::write_pump(sink, mailbox, ctx.clone()));
        let _ = pumps::read_pump(stream, subscriptions, ctx).await;

        if let Err(e) = writer.await {
            error!("Write pump task for {} failed: {}", id, e);
        }

        lifecycle.transition(ConnectionState::Closed);
        info!(client_id = %id, "Connection closed");
        Ok(())
    }
}
