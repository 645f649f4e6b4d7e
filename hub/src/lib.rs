//! Tickcast Hub - in-process real-time event broadcast.
//!
//! Fans out live updates (price ticks, odds changes, match events, alerts,
//! notifications) from backend producers to many concurrently connected
//! client sessions.
//!
//! # Components
//!
//! - [`hub`]: Control loop and client registry
//! - [`client`]: Client session with subscriptions and a bounded mailbox
//! - [`mailbox`]: Bounded per-client outbound queue
//! - [`topic`]: Topic names and validation
//! - [`connection`]: Connection lifecycle and transport frames
//! - `pumps`: Read and write pumps for one live connection
//! - [`event`]: Events and their wire encoding
//! - [`messages`]: Inbound control frames
//! - [`broadcaster`]: Typed producer API over the hub
//! - [`domain`]: Domain event payloads
//! - [`config`]: Hub and connection configuration
//! - [`metrics`]: Hub metrics
//!
//! # Concurrency
//!
//! The registry is owned by a single control loop ([`HubLoop`]). Everything
//! else talks to it through a cloneable [`Hub`] handle. Each client's
//! subscription set sits behind its own lock so subscription churn never
//! goes through the loop.

pub mod broadcaster;
pub mod client;
pub mod config;
pub mod connection;
pub mod domain;
pub mod error;
pub mod event;
pub mod hub;
pub mod mailbox;
pub mod messages;
pub mod metrics;
mod pumps;
pub mod topic;

pub use broadcaster::Broadcaster;
pub use client::{Client, ClientId};
pub use config::{ConfigError, ConnectionConfig, HubConfig};
pub use connection::{CloseReason, Connection, ConnectionState, Frame};
pub use domain::{Alert, AlertSeverity, DomainEvent, EventKind, MatchStatus, MatchUpdate};
pub use domain::{Notification, OddsUpdate, PriceUpdate};
pub use error::{HubError, TransportError};
pub use event::Event;
pub use hub::{Hub, HubLoop};
pub use mailbox::{Mailbox, MailboxReceiver};
pub use messages::{ControlAction, ControlFrame};
pub use metrics::{HubMetrics, HubMetricsSnapshot};
pub use topic::Topic;
