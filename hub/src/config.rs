//! Hub and connection configuration.
//!
//! Provides tuning knobs for mailboxes, the dispatch channel and keep-alive.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default per-client mailbox capacity.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 256;

/// Default capacity of the hub's dispatch channel.
pub const DEFAULT_DISPATCH_BUFFER: usize = 1024;

/// Default time allowed to write one frame to the peer.
pub const DEFAULT_WRITE_WAIT: Duration = Duration::from_secs(10);

/// Default time allowed between keep-alive responses from the peer.
pub const DEFAULT_PONG_WAIT: Duration = Duration::from_secs(60);

/// Default interval between keep-alive probes (90% of the pong wait).
pub const DEFAULT_PING_PERIOD: Duration = Duration::from_secs(54);

/// Configuration for the hub control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubConfig {
    /// Capacity of each client's mailbox.
    pub mailbox_capacity: usize,

    /// Capacity of the broadcast/query channel feeding the control loop.
    ///
    /// Producers wait when it is full.
    pub dispatch_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            dispatch_buffer: DEFAULT_DISPATCH_BUFFER,
        }
    }
}

impl HubConfig {
    /// Sets the mailbox capacity.
    #[must_use]
    pub const fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    /// Sets the dispatch channel capacity.
    #[must_use]
    pub const fn with_dispatch_buffer(mut self, capacity: usize) -> Self {
        self.dispatch_buffer = capacity;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a capacity is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mailbox_capacity == 0 {
            return Err(ConfigError::InvalidMailboxCapacity);
        }

        if self.dispatch_buffer == 0 {
            return Err(ConfigError::InvalidDispatchBuffer);
        }

        Ok(())
    }
}

/// Keep-alive and deadline settings for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Deadline for writing a single frame.
    pub write_wait: Duration,

    /// Read deadline, refreshed by every keep-alive response.
    pub pong_wait: Duration,

    /// Interval between keep-alive probes. Must be shorter than `pong_wait`.
    pub ping_period: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            write_wait: DEFAULT_WRITE_WAIT,
            pong_wait: DEFAULT_PONG_WAIT,
            ping_period: DEFAULT_PING_PERIOD,
        }
    }
}

impl ConnectionConfig {
    /// Sets the write deadline.
    #[must_use]
    pub const fn with_write_wait(mut self, wait: Duration) -> Self {
        self.write_wait = wait;
        self
    }

    /// Sets the read deadline.
    ///
    /// The ping period follows at 90% of the deadline unless it was set to
    /// something else with [`with_ping_period`](Self::with_ping_period).
    #[must_use]
    pub fn with_pong_wait(mut self, wait: Duration) -> Self {
        if self.ping_period == derived_ping_period(self.pong_wait) {
            self.ping_period = derived_ping_period(wait);
        }
        self.pong_wait = wait;
        self
    }

    /// Sets the ping period.
    #[must_use]
    pub const fn with_ping_period(mut self, period: Duration) -> Self {
        self.ping_period = period;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a duration is zero or the ping period is not
    /// shorter than the pong wait.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.write_wait.is_zero() {
            return Err(ConfigError::InvalidWriteWait);
        }

        if self.ping_period.is_zero() || self.ping_period >= self.pong_wait {
            return Err(ConfigError::InvalidPingPeriod);
        }

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Mailbox capacity is zero.
    #[error("mailbox_capacity must be > 0")]
    InvalidMailboxCapacity,

    /// Dispatch buffer is zero.
    #[error("dispatch_buffer must be > 0")]
    InvalidDispatchBuffer,

    /// Write wait is zero.
    #[error("write_wait must be > 0")]
    InvalidWriteWait,

    /// Ping period is zero or not shorter than the pong wait.
    #[error("ping_period must be > 0 and < pong_wait")]
    InvalidPingPeriod,
}

fn derived_ping_period(pong_wait: Duration) -> Duration {
    pong_wait * 9 / 10
}
