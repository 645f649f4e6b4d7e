//! Typed publishing facade over the hub.

use tracing::debug;

use crate::domain::{
    Alert, DomainEvent, MatchUpdate, Notification, OddsUpdate, PriceUpdate,
};
use crate::error::HubError;
use crate::event::Event;
use crate::hub::Hub;

/// Publishes domain events to their topics.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    hub: Hub,
}

impl Broadcaster {
    /// Creates a broadcaster for the given hub.
    #[must_use]
    pub const fn new(hub: Hub) -> Self {
        Self { hub }
    }

    /// Returns the underlying hub.
    #[must_use]
    pub const fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Publishes an event on its kind's topic, stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be encoded or the hub is closed.
    pub async fn publish(&self, event: impl Into<DomainEvent>) -> Result<(), HubError> {
        let event = event.into();
        let kind = event.kind();
        let topic = kind.topic();

        debug!("Publishing {} on {}", kind, topic);
        let event = Event::new(kind.as_str(), event).with_topic(topic.clone());
        self.hub.broadcast_to_topic(&topic, &event).await
    }

    /// Publishes a price tick on `stocks`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Serialization`] if the payload cannot be encoded,
    /// or [`HubError::Closed`] if the hub has stopped.
    pub async fn price_update(&self, update: PriceUpdate) -> Result<(), HubError> {
        self.publish(update).await
    }

    /// Publishes an odds change on `odds`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Serialization`] if the payload cannot be encoded,
    /// or [`HubError::Closed`] if the hub has stopped.
    pub async fn odds_update(&self, update: OddsUpdate) -> Result<(), HubError> {
        self.publish(update).await
    }

    /// Publishes a match update on `matches`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Serialization`] if the payload cannot be encoded,
    /// or [`HubError::Closed`] if the hub has stopped.
    pub async fn match_update(&self, update: MatchUpdate) -> Result<(), HubError> {
        self.publish(update).await
    }

    /// Publishes an alert on `alerts`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Serialization`] if the payload cannot be encoded,
    /// or [`HubError::Closed`] if the hub has stopped.
    pub async fn alert(&self, alert: Alert) -> Result<(), HubError> {
        self.publish(alert).await
    }

    /// Publishes a notification on `notifications`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Serialization`] if the payload cannot be encoded,
    /// or [`HubError::Closed`] if the hub has stopped.
    pub async fn notification(&self, notification: Notification) -> Result<(), HubError> {
        self.publish(notification).await
    }
}
