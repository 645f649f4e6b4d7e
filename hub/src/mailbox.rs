//! Bounded per-client outbound queue.
//!
//! The hub holds the sending half inside the registered [`Client`](crate::Client);
//! the connection's write pump drains the receiving half. Dropping the sending
//! half is what closes the mailbox, so removal from the registry and closing
//! happen in the same step.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::connection::CloseReason;

/// Creates a mailbox with the given capacity.
///
/// # Panics
///
/// Panics if `capacity` is zero; callers validate it through
/// [`HubConfig::validate`](crate::HubConfig::validate).
#[must_use]
pub fn channel(capacity: usize) -> (Mailbox, MailboxReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    let close_reason = Arc::new(AtomicU8::new(CloseReason::Normal.as_u8()));

    (
        Mailbox {
            tx,
            close_reason: Arc::clone(&close_reason),
        },
        MailboxReceiver { rx, close_reason },
    )
}

/// Sending half of a client mailbox.
#[derive(Debug)]
pub struct Mailbox {
    tx: mpsc::Sender<Bytes>,
    close_reason: Arc<AtomicU8>,
}

impl Mailbox {
    /// Attempts to enqueue a frame without waiting.
    ///
    /// Returns false if the mailbox is full or its reader is gone.
    #[must_use]
    pub fn send(&self, frame: Bytes) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Returns the number of frames the mailbox can still accept.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.tx.capacity()
    }

    /// Returns the total capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Returns true if the receiving half has been dropped.
    #[must_use]
    pub fn is_reader_gone(&self) -> bool {
        self.tx.is_closed()
    }

    /// Closes the mailbox, recording why.
    ///
    /// Frames already queued are still delivered to the reader.
    pub fn close(self, reason: CloseReason) {
        self.close_reason.store(reason.as_u8(), Ordering::Release);
        drop(self.tx);
    }
}

/// Receiving half of a client mailbox.
#[derive(Debug)]
pub struct MailboxReceiver {
    rx: mpsc::Receiver<Bytes>,
    close_reason: Arc<AtomicU8>,
}

impl MailboxReceiver {
    /// Waits for the next frame.
    ///
    /// Returns None once the mailbox is closed and drained.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    /// Takes the next frame if one is queued.
    pub fn try_recv(&mut self) -> Option<Bytes> {
        self.rx.try_recv().ok()
    }

    /// Takes every queued frame.
    pub fn drain(&mut self) -> Vec<Bytes> {
        let mut frames = Vec::with_capacity(self.rx.len());
        while let Ok(frame) = self.rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    /// Returns the number of queued frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Returns true if no frames are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Returns true if the sending half has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.rx.is_closed()
    }

    /// Returns why the mailbox was closed.
    ///
    /// Meaningful once [`recv`](Self::recv) has returned None.
    #[must_use]
    pub fn close_reason(&self) -> CloseReason {
        CloseReason::from_u8(self.close_reason.load(Ordering::Acquire))
    }
}
