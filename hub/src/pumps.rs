//! Read and write pumps for one live connection.
//!
//! The read pump applies subscribe/unsubscribe control frames and detects a
//! silent or vanished peer. The write pump drains the mailbox and sends
//! keep-alive probes. Either one ending moves the connection to `Closing`
//! and asks the hub to unregister the client.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::client::{ClientId, Subscriptions};
use crate::config::ConnectionConfig;
use crate::connection::{ConnectionState, Frame, Lifecycle};
use crate::error::TransportError;
use crate::hub::Hub;
use crate::mailbox::MailboxReceiver;
use crate::messages::{ControlAction, ControlFrame};
use crate::metrics::HubMetrics;

/// State shared by both pumps of one connection.
#[derive(Debug, Clone)]
pub(crate) struct PumpContext {
    pub(crate) id: ClientId,
    pub(crate) hub: Hub,
    pub(crate) metrics: Arc<HubMetrics>,
    pub(crate) config: ConnectionConfig,
    pub(crate) lifecycle: Lifecycle,
}

impl PumpContext {
    /// Common exit path for both pumps.
    fn finish(&self, pump: &str, result: &Result<(), TransportError>) {
        match result {
            Ok(()) => debug!("{} pump for {} finished", pump, self.id),
            Err(e) => {
                self.metrics.record_transport_error();
                warn!("{} pump for {} stopped: {}", pump, self.id, e);
            }
        }

        self.lifecycle.transition(ConnectionState::Closing);
        self.hub.unregister(&self.id);
    }
}

/// Reads frames until the peer closes, errors, goes silent past the read
/// deadline, or the connection starts closing.
pub(crate) async fn read_pump<S, E>(
    mut stream: S,
    subscriptions: Subscriptions,
    ctx: PumpContext,
) -> Result<(), TransportError>
where
    S: Stream<Item = Result<Frame, E>> + Unpin,
    E: Display,
{
    let mut state = ctx.lifecycle.subscribe();
    let mut deadline = Instant::now() + ctx.config.pong_wait;

    let result = loop {
        if ctx.lifecycle.current() != ConnectionState::Active {
            break Ok(());
        }

        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
            }
            next = time::timeout_at(deadline, stream.next()) => match next {
                Err(_) => break Err(TransportError::ReadTimeout),
                Ok(None) => break Ok(()),
                Ok(Some(Err(e))) => break Err(TransportError::Read(e.to_string())),
                Ok(Some(Ok(frame))) => match frame {
                    Frame::Pong(_) => deadline = Instant::now() + ctx.config.pong_wait,
                    Frame::Text(text) => handle_text(&text, &subscriptions, &ctx),
                    Frame::Close(_) => break Ok(()),
                    Frame::Ping(_) | Frame::Binary(_) => {}
                },
            },
        }
    };

    ctx.finish("Read", &result);
    result
}

/// Applies a control frame; anything else is ignored.
fn handle_text(text: &Bytes, subscriptions: &Subscriptions, ctx: &PumpContext) {
    let Some(frame) = ControlFrame::parse(text) else {
        debug!("Ignoring non-control frame from {}", ctx.id);
        return;
    };

    if frame.action == ControlAction::Unknown {
        debug!("Ignoring unknown action from {}", ctx.id);
        return;
    }

    ctx.metrics.record_control_frame();
    if frame.apply(subscriptions) {
        debug!("{} {:?} {}", ctx.id, frame.action, frame.channel);
    } else {
        debug!(
            "No-op {:?} {:?} from {}",
            frame.action, frame.channel, ctx.id
        );
    }
}

/// Drains the mailbox to the peer and sends keep-alive probes until the
/// mailbox closes or a write fails.
pub(crate) async fn write_pump<K>(
    mut sink: K,
    mut mailbox: MailboxReceiver,
    ctx: PumpContext,
) -> Result<(), TransportError>
where
    K: Sink<Frame> + Unpin,
    K::Error: Display,
{
    let write_wait = ctx.config.write_wait;
    let period = ctx.config.ping_period;
    let mut ping = time::interval_at(Instant::now() + period, period);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let result = loop {
        tokio::select! {
            next = mailbox.recv() => match next {
                Some(frame) => {
                    if let Err(e) = write_frame(&mut sink, Frame::Text(frame), write_wait).await {
                        break Err(e);
                    }
                    ctx.metrics.record_frame_sent();
                }
                None => {
                    let reason = mailbox.close_reason();
                    // The peer may already be gone; the close frame is best-effort.
                    let _ = write_frame(&mut sink, Frame::Close(Some(reason)), write_wait).await;
                    break Ok(());
                }
            },
            _ = ping.tick() => {
                if let Err(e) = write_frame(&mut sink, Frame::Ping(Bytes::new()), write_wait).await {
                    break Err(e);
                }
            }
        }
    };

    ctx.finish("Write", &result);
    let _ = time::timeout(write_wait, sink.close()).await;
    result
}

/// Writes one frame, bounded by the write deadline.
async fn write_frame<K>(sink: &mut K, frame: Frame, wait: Duration) -> Result<(), TransportError>
where
    K: Sink<Frame> + Unpin,
    K::Error: Display,
{
    match time::timeout(wait, sink.send(frame)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(TransportError::Write(e.to_string())),
        Err(_) => Err(TransportError::WriteTimeout),
    }
}
