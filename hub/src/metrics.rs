//! Hub metrics tracking.
//!
//! Provides atomic counters for monitoring the hub and its connections.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Metrics for the broadcast hub.
#[derive(Debug)]
pub struct HubMetrics {
    /// Clients added to the registry.
    clients_registered: AtomicU64,

    /// Clients removed from the registry, evictions included.
    clients_unregistered: AtomicU64,

    /// Clients removed for a full mailbox.
    clients_evicted: AtomicU64,

    /// Broadcasts processed by the control loop.
    broadcasts: AtomicU64,

    /// Frames placed into client mailboxes.
    deliveries: AtomicU64,

    /// Broadcasts dropped because fan-out panicked.
    broadcasts_failed: AtomicU64,

    /// Broadcasts rejected before dispatch because encoding failed.
    serialization_errors: AtomicU64,

    /// Control frames applied by read pumps.
    control_frames: AtomicU64,

    /// Frames written to peers by write pumps.
    frames_sent: AtomicU64,

    /// Transport failures on any connection.
    transport_errors: AtomicU64,

    /// Start time for uptime.
    start_time: Instant,
}

impl Default for HubMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl HubMetrics {
    /// Creates a new metrics instance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clients_registered: AtomicU64::new(0),
            clients_unregistered: AtomicU64::new(0),
            clients_evicted: AtomicU64::new(0),
            broadcasts: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            broadcasts_failed: AtomicU64::new(0),
            serialization_errors: AtomicU64::new(0),
            control_frames: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            transport_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Records a registration.
    pub fn record_registered(&self) {
        self.clients_registered.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a removal from the registry.
    pub fn record_unregistered(&self) {
        self.clients_unregistered.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a backpressure eviction.
    pub fn record_evicted(&self) {
        self.clients_evicted.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a processed broadcast and how many mailboxes it reached.
    pub fn record_broadcast(&self, delivered: u64) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.deliveries.fetch_add(delivered, Ordering::Relaxed);
    }

    /// Records a broadcast dropped by the control loop.
    pub fn record_broadcast_failed(&self) {
        self.broadcasts_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an event that failed to encode.
    pub fn record_serialization_error(&self) {
        self.serialization_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an applied control frame.
    pub fn record_control_frame(&self) {
        self.control_frames.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a frame written to a peer.
    pub fn record_frame_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a transport failure.
    pub fn record_transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns total registrations.
    #[must_use]
    pub fn clients_registered(&self) -> u64 {
        self.clients_registered.load(Ordering::Relaxed)
    }

    /// Returns total removals.
    #[must_use]
    pub fn clients_unregistered(&self) -> u64 {
        self.clients_unregistered.load(Ordering::Relaxed)
    }

    /// Returns total evictions.
    #[must_use]
    pub fn clients_evicted(&self) -> u64 {
        self.clients_evicted.load(Ordering::Relaxed)
    }

    /// Returns the number of clients currently registered.
    #[must_use]
    pub fn active_clients(&self) -> u64 {
        self.clients_registered()
            .saturating_sub(self.clients_unregistered())
    }

    /// Returns total broadcasts processed.
    #[must_use]
    pub fn broadcasts(&self) -> u64 {
        self.broadcasts.load(Ordering::Relaxed)
    }

    /// Returns total mailbox deliveries.
    #[must_use]
    pub fn deliveries(&self) -> u64 {
        self.deliveries.load(Ordering::Relaxed)
    }

    /// Returns broadcasts dropped by the control loop.
    #[must_use]
    pub fn broadcasts_failed(&self) -> u64 {
        self.broadcasts_failed.load(Ordering::Relaxed)
    }

    /// Returns events that failed to encode.
    #[must_use]
    pub fn serialization_errors(&self) -> u64 {
        self.serialization_errors.load(Ordering::Relaxed)
    }

    /// Returns applied control frames.
    #[must_use]
    pub fn control_frames(&self) -> u64 {
        self.control_frames.load(Ordering::Relaxed)
    }

    /// Returns frames written to peers.
    #[must_use]
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    /// Returns transport failures.
    #[must_use]
    pub fn transport_errors(&self) -> u64 {
        self.transport_errors.load(Ordering::Relaxed)
    }

    /// Returns the uptime.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns a snapshot of all metrics.
    #[must_use]
    pub fn snapshot(&self) -> HubMetricsSnapshot {
        HubMetricsSnapshot {
            clients_registered: self.clients_registered(),
            clients_unregistered: self.clients_unregistered(),
            clients_evicted: self.clients_evicted(),
            active_clients: self.active_clients(),
            broadcasts: self.broadcasts(),
            deliveries: self.deliveries(),
            broadcasts_failed: self.broadcasts_failed(),
            serialization_errors: self.serialization_errors(),
            control_frames: self.control_frames(),
            frames_sent: self.frames_sent(),
            transport_errors: self.transport_errors(),
            uptime_secs: self.uptime().as_secs(),
        }
    }
}

/// A point-in-time snapshot of hub metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HubMetricsSnapshot {
    /// Total registrations.
    pub clients_registered: u64,
    /// Total removals.
    pub clients_unregistered: u64,
    /// Total evictions.
    pub clients_evicted: u64,
    /// Currently registered clients.
    pub active_clients: u64,
    /// Broadcasts processed.
    pub broadcasts: u64,
    /// Mailbox deliveries.
    pub deliveries: u64,
    /// Broadcasts dropped by the control loop.
    pub broadcasts_failed: u64,
    /// Events that failed to encode.
    pub serialization_errors: u64,
    /// Control frames applied.
    pub control_frames: u64,
    /// Frames written to peers.
    pub frames_sent: u64,
    /// Transport failures.
    pub transport_errors: u64,
    /// Uptime in seconds.
    pub uptime_secs: u64,
}
