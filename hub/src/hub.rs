//! Hub control loop and client registry.
//!
//! The [`HubLoop`] is the only code that touches the registry. It multiplexes
//! three request streams:
//!
//! - `register` (unbounded): clients handed over by the transport handler
//! - `unregister` (unbounded): teardown requests from pumps, idempotent
//! - `dispatch` (bounded): broadcasts and introspection queries
//!
//! Producers wait on `dispatch` when it is full. That is the only place a
//! producer can be slowed down by the hub; per-client mailboxes never block it.
//!
//! Before handling any dispatch request the loop applies every registration
//! and unregistration already queued, so membership changes enqueued before a
//! broadcast are always visible to it.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::client::{Client, ClientId};
use crate::config::{ConfigError, HubConfig};
use crate::connection::CloseReason;
use crate::error::HubError;
use crate::event::Event;
use crate::mailbox::MailboxReceiver;
use crate::metrics::HubMetrics;
use crate::topic::Topic;

/// An encoded broadcast travelling to the control loop.
#[derive(Debug)]
struct Envelope {
    topic: Option<Topic>,
    frame: Bytes,
}

/// Requests carried on the dispatch channel.
#[derive(Debug)]
enum Dispatch {
    Broadcast(Envelope),
    ClientCount(oneshot::Sender<usize>),
    SubscriberCount(String, oneshot::Sender<usize>),
    Shutdown(oneshot::Sender<()>),
}

/// Handle to the broadcast hub.
///
/// Cheap to clone. Every clone talks to the same control loop.
#[derive(Debug, Clone)]
pub struct Hub {
    register_tx: mpsc::UnboundedSender<Client>,
    unregister_tx: mpsc::UnboundedSender<ClientId>,
    dispatch_tx: mpsc::Sender<Dispatch>,
    config: HubConfig,
    metrics: Arc<HubMetrics>,
}

impl Hub {
    /// Creates a hub handle and the control loop that serves it.
    ///
    /// The loop does nothing until [`HubLoop::run`] is awaited.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: HubConfig) -> Result<(Self, HubLoop), ConfigError> {
        config.validate()?;

        let (register_tx, register_rx) = mpsc::unbounded_channel();
        let (unregister_tx, unregister_rx) = mpsc::unbounded_channel();
        let (dispatch_tx, dispatch_rx) = mpsc::channel(config.dispatch_buffer);
        let metrics = Arc::new(HubMetrics::new());

        let hub = Self {
            register_tx,
            unregister_tx,
            dispatch_tx,
            config,
            metrics: Arc::clone(&metrics),
        };

        let control = HubLoop {
            clients: HashMap::new(),
            register_rx,
            unregister_rx,
            dispatch_rx,
            metrics,
        };

        Ok((hub, control))
    }

    /// Creates a hub and runs its control loop on a new task.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn spawn(config: HubConfig) -> Result<(Self, JoinHandle<()>), ConfigError> {
        let (hub, control) = Self::new(config)?;
        let handle = tokio::spawn(control.run());
        Ok((hub, handle))
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Returns the metrics.
    #[must_use]
    pub fn metrics(&self) -> Arc<HubMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Returns true once the control loop has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.dispatch_tx.is_closed()
    }

    /// Creates an unregistered client using this hub's mailbox capacity.
    #[must_use]
    pub fn new_client(&self, user_id: Option<String>) -> (Client, MailboxReceiver) {
        Client::new(user_id, self.config.mailbox_capacity)
    }

    /// Hands a client to the hub. Never waits.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Closed`] if the control loop has stopped.
    pub fn register(&self, client: Client) -> Result<(), HubError> {
        self.register_tx.send(client).map_err(|_| HubError::Closed)
    }

    /// Asks the hub to drop a client. Unknown IDs are ignored.
    pub fn unregister(&self, id: &ClientId) {
        // After shutdown the registry is already empty.
        let _ = self.unregister_tx.send(id.clone());
    }

    /// Delivers an event on its own topic.
    ///
    /// An event tagged with [`Event::with_topic`] reaches that topic's
    /// subscribers only. An untagged event reaches every registered client.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be encoded or the hub is closed.
    pub async fn broadcast<P: Serialize>(&self, event: &Event<P>) -> Result<(), HubError> {
        let frame = self.encode(event)?;
        self.broadcast_frame(event.topic().cloned(), frame).await
    }

    /// Delivers an event to the clients subscribed to `topic`, whatever
    /// topic the event itself carries.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be encoded or the hub is closed.
    pub async fn broadcast_to_topic<P: Serialize>(
        &self,
        topic: &Topic,
        event: &Event<P>,
    ) -> Result<(), HubError> {
        let frame = self.encode(event)?;
        self.broadcast_frame(Some(topic.clone()), frame).await
    }

    /// Delivers an already encoded frame.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Closed`] if the control loop has stopped.
    pub async fn broadcast_frame(&self, topic: Option<Topic>, frame: Bytes) -> Result<(), HubError> {
        self.dispatch(Dispatch::Broadcast(Envelope { topic, frame }))
            .await
    }

    /// Returns the number of registered clients.
    ///
    /// Reflects every request this caller issued before the call.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Closed`] if the control loop has stopped.
    pub async fn client_count(&self) -> Result<usize, HubError> {
        let (tx, rx) = oneshot::channel();
        self.dispatch(Dispatch::ClientCount(tx)).await?;
        rx.await.map_err(|_| HubError::Closed)
    }

    /// Returns the number of registered clients subscribed to `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Closed`] if the control loop has stopped.
    pub async fn subscriber_count(&self, topic: &str) -> Result<usize, HubError> {
        let (tx, rx) = oneshot::channel();
        self.dispatch(Dispatch::SubscriberCount(topic.to_string(), tx))
            .await?;
        rx.await.map_err(|_| HubError::Closed)
    }

    /// Stops the control loop and closes every mailbox.
    ///
    /// Returns once the loop has closed the mailboxes and stopped accepting
    /// requests. Calling it on a hub that has already stopped is a no-op.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self.dispatch(Dispatch::Shutdown(tx)).await.is_ok() {
            let _ = rx.await;
        }
        self.dispatch_tx.closed().await;
    }

    async fn dispatch(&self, request: Dispatch) -> Result<(), HubError> {
        self.dispatch_tx
            .send(request)
            .await
            .map_err(|_| HubError::Closed)
    }

    fn encode<P: Serialize>(&self, event: &Event<P>) -> Result<Bytes, HubError> {
        event.encode().map_err(|e| {
            self.metrics.record_serialization_error();
            warn!("Failed to serialize {} event: {}", event.kind(), e);
            HubError::Serialization(e)
        })
    }
}

/// Result of one fan-out pass.
#[derive(Debug, Default)]
struct Delivery {
    delivered: u64,
    evicted: Vec<(ClientId, CloseReason)>,
}

/// The hub's control loop. Sole owner of the client registry.
#[derive(Debug)]
pub struct HubLoop {
    clients: HashMap<ClientId, Client>,
    register_rx: mpsc::UnboundedReceiver<Client>,
    unregister_rx: mpsc::UnboundedReceiver<ClientId>,
    dispatch_rx: mpsc::Receiver<Dispatch>,
    metrics: Arc<HubMetrics>,
}

impl HubLoop {
    /// Runs until [`Hub::shutdown`] is called or every [`Hub`] handle is
    /// dropped, then closes all remaining mailboxes.
    pub async fn run(mut self) {
        info!("Hub control loop started");

        loop {
            tokio::select! {
                Some(client) = self.register_rx.recv() => self.add(client),
                Some(id) = self.unregister_rx.recv() => {
                    self.apply_pending_registrations();
                    self.remove(&id, CloseReason::Normal);
                }
                request = self.dispatch_rx.recv() => {
                    let Some(request) = request else {
                        break;
                    };
                    self.apply_pending_membership();
                    if !self.handle(request) {
                        break;
                    }
                }
            }
        }

        self.register_rx.close();
        self.unregister_rx.close();
        self.dispatch_rx.close();
        self.apply_pending_registrations();
        self.close_all(CloseReason::Shutdown);
        info!("Hub control loop stopped");
    }

    /// Handles one dispatch request. Returns false when the loop should stop.
    fn handle(&mut self, request: Dispatch) -> bool {
        match request {
            Dispatch::Broadcast(envelope) => self.deliver(&envelope),
            Dispatch::ClientCount(reply) => {
                let _ = reply.send(self.clients.len());
            }
            Dispatch::SubscriberCount(topic, reply) => {
                let count = self
                    .clients
                    .values()
                    .filter(|client| client.is_subscribed(&topic))
                    .count();
                let _ = reply.send(count);
            }
            Dispatch::Shutdown(reply) => {
                self.close_all(CloseReason::Shutdown);
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    fn apply_pending_registrations(&mut self) {
        while let Ok(client) = self.register_rx.try_recv() {
            self.add(client);
        }
    }

    fn apply_pending_membership(&mut self) {
        self.apply_pending_registrations();
        while let Ok(id) = self.unregister_rx.try_recv() {
            self.remove(&id, CloseReason::Normal);
        }
    }

    fn add(&mut self, client: Client) {
        if self.clients.contains_key(client.id()) {
            warn!("Rejecting duplicate client id {}", client.id());
            client.close(CloseReason::Normal);
            return;
        }

        debug!(
            client_id = %client.id(),
            user_id = client.user_id().unwrap_or("-"),
            "Client registered"
        );
        self.metrics.record_registered();
        self.clients.insert(client.id().clone(), client);
    }

    /// Removes a client and closes its mailbox in the same step.
    fn remove(&mut self, id: &ClientId, reason: CloseReason) -> bool {
        let Some(client) = self.clients.remove(id) else {
            return false;
        };

        if reason == CloseReason::SlowConsumer {
            self.metrics.record_evicted();
            warn!(
                client_id = %id,
                user_id = client.user_id().unwrap_or("-"),
                "Evicting slow consumer"
            );
        } else {
            debug!(client_id = %id, "Client unregistered");
        }

        client.close(reason);
        self.metrics.record_unregistered();
        true
    }

    fn close_all(&mut self, reason: CloseReason) {
        let count = self.clients.len();
        for (_, client) in self.clients.drain() {
            client.close(reason);
            self.metrics.record_unregistered();
        }
        if count > 0 {
            info!("Closed {} client mailboxes", count);
        }
    }

    /// Fans one broadcast out, then evicts the clients that could not take it.
    fn deliver(&mut self, envelope: &Envelope) {
        self.deliver_with(envelope, Client::accepts);
    }

    /// Resolves the recipients with `accepts`, then offers them the frame.
    ///
    /// Recipients are collected before any mailbox is touched. A panic while
    /// matching drops the broadcast for everyone instead of leaving it half
    /// delivered.
    fn deliver_with<F>(&mut self, envelope: &Envelope, accepts: F)
    where
        F: Fn(&Client, Option<&str>) -> bool,
    {
        let topic = envelope.topic.as_ref().map(Topic::as_str);
        let clients = &self.clients;
        let matched = panic::catch_unwind(AssertUnwindSafe(|| {
            clients
                .iter()
                .filter(|&(_, client)| accepts(client, topic))
                .map(|(id, _)| id.clone())
                .collect::<Vec<_>>()
        }));

        let Ok(recipients) = matched else {
            self.metrics.record_broadcast_failed();
            error!("Broadcast dropped: recipient matching panicked");
            return;
        };

        let delivery = fan_out(&self.clients, &recipients, &envelope.frame);
        self.metrics.record_broadcast(delivery.delivered);
        for (id, reason) in delivery.evicted {
            self.remove(&id, reason);
        }
    }
}

/// Offers the frame to each recipient without waiting.
fn fan_out(
    clients: &HashMap<ClientId, Client>,
    recipients: &[ClientId],
    frame: &Bytes,
) -> Delivery {
    let mut delivery = Delivery::default();

    for id in recipients {
        let Some(client) = clients.get(id) else {
            continue;
        };

        if client.send(frame.clone()) {
            delivery.delivered += 1;
        } else {
            let reason = if client.is_reader_gone() {
                CloseReason::Normal
            } else {
                CloseReason::SlowConsumer
            };
            delivery.evicted.push((id.clone(), reason));
        }
    }

    delivery
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn spawn_hub(mailbox_capacity: usize) -> Hub {
        let config = HubConfig::default().with_mailbox_capacity(mailbox_capacity);
        let (hub, _handle) = Hub::spawn(config).expect("hub");
        hub
    }

    fn topic(name: &str) -> Topic {
        Topic::parse(name).expect("topic")
    }

    #[test]
    fn test_hub_new_invalid_config() {
        let config = HubConfig::default().with_mailbox_capacity(0);
        assert!(Hub::new(config).is_err());
    }

    #[tokio::test]
    async fn test_register_and_count() {
        let hub = spawn_hub(8);

        let (a, _rx_a) = hub.new_client(None);
        let (b, _rx_b) = hub.new_client(Some("user-b".to_string()));
        hub.register(a).expect("register");
        hub.register(b).expect("register");

        assert_eq!(hub.client_count().await.expect("count"), 2);
        assert_eq!(hub.metrics().clients_registered(), 2);
    }

    #[tokio::test]
    async fn test_unregister_closes_mailbox() {
        let hub = spawn_hub(8);
        let (client, mut rx) = hub.new_client(None);
        let id = client.id().clone();

        hub.register(client).expect("register");
        hub.unregister(&id);

        assert_eq!(hub.client_count().await.expect("count"), 0);
        assert_eq!(rx.recv().await, None);
        assert_eq!(rx.close_reason(), CloseReason::Normal);
    }

    #[tokio::test]
    async fn test_unregister_twice_is_noop() {
        let hub = spawn_hub(8);
        let (client, _rx) = hub.new_client(None);
        let id = client.id().clone();

        hub.register(client).expect("register");
        hub.unregister(&id);
        hub.unregister(&id);
        hub.unregister(&ClientId::from("never-registered"));

        assert_eq!(hub.client_count().await.expect("count"), 0);
        assert_eq!(hub.metrics().clients_unregistered(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let hub = spawn_hub(8);
        let (first, _rx1) = Client::with_id(ClientId::from("same"), None, 8);
        let (second, mut rx2) = Client::with_id(ClientId::from("same"), None, 8);

        hub.register(first).expect("register");
        hub.register(second).expect("register");

        assert_eq!(hub.client_count().await.expect("count"), 1);
        assert_eq!(rx2.recv().await, None);
    }

    #[tokio::test]
    async fn test_broadcast_to_topic_filters() {
        let hub = spawn_hub(8);
        let (a, rx_a) = hub.new_client(None);
        let (b, rx_b) = hub.new_client(None);
        a.subscribe(topic("stocks"));
        b.subscribe(topic("alerts"));
        hub.register(a).expect("register");
        hub.register(b).expect("register");

        let event = Event::new("price_update", json!({"symbol": "AAPL"}));
        hub.broadcast_to_topic(&topic("stocks"), &event)
            .await
            .expect("broadcast");
        hub.client_count().await.expect("settle");

        assert_eq!(rx_a.len(), 1);
        assert!(rx_b.is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_everyone() {
        let hub = spawn_hub(8);
        let (a, mut rx_a) = hub.new_client(None);
        let (b, mut rx_b) = hub.new_client(None);
        a.subscribe(topic("stocks"));
        hub.register(a).expect("register");
        hub.register(b).expect("register");

        hub.broadcast(&Event::new("notification", json!({"title": "hi"})))
            .await
            .expect("broadcast");
        hub.client_count().await.expect("settle");

        assert_eq!(rx_a.drain().len(), 1);
        assert_eq!(rx_b.drain().len(), 1);
        assert_eq!(hub.metrics().deliveries(), 2);
    }

    #[tokio::test]
    async fn test_broadcast_routes_on_event_topic() {
        let hub = spawn_hub(8);
        let (a, mut rx_a) = hub.new_client(None);
        let (b, mut rx_b) = hub.new_client(None);
        a.subscribe(topic("alerts"));
        hub.register(a).expect("register");
        hub.register(b).expect("register");

        let event = Event::new("alert", json!({"level": 2})).with_topic(topic("alerts"));
        hub.broadcast(&event).await.expect("broadcast");
        hub.client_count().await.expect("settle");

        assert_eq!(rx_a.drain().len(), 1);
        assert!(rx_b.drain().is_empty());
        assert_eq!(hub.metrics().deliveries(), 1);
    }

    #[tokio::test]
    async fn test_full_mailbox_evicts_client() {
        let hub = spawn_hub(2);
        let (slow, mut rx_slow) = hub.new_client(None);
        let (fast, mut rx_fast) = hub.new_client(None);
        hub.register(slow).expect("register");
        hub.register(fast).expect("register");

        for i in 0..2 {
            hub.broadcast(&Event::new("tick", i)).await.expect("broadcast");
            hub.client_count().await.expect("settle");
            rx_fast.drain();
        }
        hub.broadcast(&Event::new("tick", 2)).await.expect("broadcast");

        assert_eq!(hub.client_count().await.expect("count"), 1);
        assert_eq!(hub.metrics().clients_evicted(), 1);
        assert_eq!(rx_fast.drain().len(), 1);

        assert_eq!(rx_slow.drain().len(), 2);
        assert_eq!(rx_slow.recv().await, None);
        assert_eq!(rx_slow.close_reason(), CloseReason::SlowConsumer);
    }

    #[tokio::test]
    async fn test_serialization_error_returned() {
        let hub = spawn_hub(8);
        let mut payload = HashMap::new();
        payload.insert((1, 2), 3);

        let result = hub.broadcast(&Event::new("broken", payload)).await;

        assert!(matches!(result, Err(HubError::Serialization(_))));
        assert_eq!(hub.metrics().serialization_errors(), 1);
        assert_eq!(hub.metrics().broadcasts(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_count() {
        let hub = spawn_hub(8);
        let (a, _rx_a) = hub.new_client(None);
        let (b, _rx_b) = hub.new_client(None);
        let subs_b = b.subscriptions();
        a.subscribe(topic("odds"));
        hub.register(a).expect("register");
        hub.register(b).expect("register");

        assert_eq!(hub.subscriber_count("odds").await.expect("count"), 1);

        subs_b.subscribe(topic("odds"));
        assert_eq!(hub.subscriber_count("odds").await.expect("count"), 2);
    }

    #[tokio::test]
    async fn test_panicking_match_drops_whole_broadcast() {
        let (hub, mut control) = Hub::new(HubConfig::default()).expect("hub");
        let (a, mut rx_a) = hub.new_client(None);
        let (b, mut rx_b) = hub.new_client(None);
        control.add(a);
        control.add(b);

        let envelope = Envelope {
            topic: None,
            frame: Bytes::from_static(b"{\"type\":\"tick\"}"),
        };
        control.deliver_with(&envelope, |_, _| panic!("matcher blew up"));

        assert_eq!(hub.metrics().broadcasts_failed(), 1);
        assert_eq!(hub.metrics().broadcasts(), 0);
        assert!(rx_a.is_empty());
        assert!(rx_b.is_empty());
        assert_eq!(control.clients.len(), 2);

        // The loop keeps serving and the next broadcast reaches everyone.
        let task = tokio::spawn(control.run());
        hub.broadcast(&Event::new("tick", 1)).await.expect("broadcast");
        hub.client_count().await.expect("settle");

        assert_eq!(rx_a.drain().len(), 1);
        assert_eq!(rx_b.drain().len(), 1);
        assert_eq!(hub.metrics().broadcasts(), 1);
        assert_eq!(hub.metrics().broadcasts_failed(), 1);

        hub.shutdown().await;
        tokio_test::assert_ok!(task.await);
    }

    #[tokio::test]
    async fn test_shutdown_closes_everything() {
        let hub = spawn_hub(8);
        let (client, mut rx) = hub.new_client(None);
        hub.register(client).expect("register");

        hub.shutdown().await;

        assert_eq!(rx.recv().await, None);
        assert_eq!(rx.close_reason(), CloseReason::Shutdown);
        assert!(matches!(hub.client_count().await, Err(HubError::Closed)));

        let (late, _rx) = hub.new_client(None);
        assert!(matches!(hub.register(late), Err(HubError::Closed)));

        // Second shutdown is harmless.
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn test_loop_exits_when_handles_dropped() {
        let (hub, handle) = Hub::spawn(HubConfig::default()).expect("hub");
        let (client, mut rx) = hub.new_client(None);
        hub.register(client).expect("register");
        hub.client_count().await.expect("count");

        drop(hub);

        tokio_test::assert_ok!(handle.await);
        assert_eq!(rx.recv().await, None);
    }
}
