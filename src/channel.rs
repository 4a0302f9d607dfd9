//! Point-to-point message channel between a host and one mounted render.
//!
//! Frames cross the channel as JSON text, so nothing but values can reach
//! the other side. Delivery is ordered per direction and unacknowledged.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use crate::protocol::{decode_frame, encode_frame, HostMessage, RenderMessage};

/// Result of posting a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Posted,
    /// The receiving side is gone; the frame was discarded.
    Dropped,
}

/// Sending half.
pub struct Outbox<M> {
    tx: UnboundedSender<String>,
    _marker: PhantomData<fn(M)>,
}

impl<M: Serialize> Outbox<M> {
    pub fn post(&self, message: &M) -> Delivery {
        let frame = match encode_frame(message) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(target = "channel", error = %err, "failed to encode frame");
                return Delivery::Dropped;
            }
        };

        match self.tx.send(frame) {
            Ok(()) => Delivery::Posted,
            Err(_) => {
                debug!(target = "channel", "receiver torn down; frame dropped");
                Delivery::Dropped
            }
        }
    }
}

/// Receiving half. Frames that fail to decode are skipped.
pub struct Inbox<M> {
    rx: UnboundedReceiver<String>,
    _marker: PhantomData<fn() -> M>,
}

impl<M: DeserializeOwned> Inbox<M> {
    /// Next decodable message, without waiting.
    pub fn try_next(&mut self) -> Option<M> {
        loop {
            let frame = match self.rx.try_recv() {
                Ok(frame) => frame,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return None,
            };
            match decode_frame(&frame) {
                Ok(message) => return Some(message),
                Err(err) => {
                    warn!(target = "channel", error = %err, "discarding undecodable frame");
                }
            }
        }
    }

    /// Stop accepting frames. Anything posted afterwards is dropped.
    pub fn close(&mut self) {
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
    }
}

/// One side of a channel: what it sends and what it receives.
pub struct Endpoint<Out, In> {
    pub outbox: Outbox<Out>,
    pub inbox: Inbox<In>,
}

pub type HostEndpoint = Endpoint<HostMessage, RenderMessage>;
pub type RenderEndpoint = Endpoint<RenderMessage, HostMessage>;

/// Create a fresh channel for one mount.
pub fn channel() -> (HostEndpoint, RenderEndpoint) {
    let (host_tx, render_rx) = unbounded_channel();
    let (render_tx, host_rx) = unbounded_channel();
    let host = Endpoint {
        outbox: Outbox {
            tx: host_tx,
            _marker: PhantomData,
        },
        inbox: Inbox {
            rx: host_rx,
            _marker: PhantomData,
        },
    };
    let render = Endpoint {
        outbox: Outbox {
            tx: render_tx,
            _marker: PhantomData,
        },
        inbox: Inbox {
            rx: render_rx,
            _marker: PhantomData,
        },
    };
    (host, render)
}

/// Host-side listener for render messages. Closing happens on drop, so a
/// listener can never observe frames after its owner is gone.
pub struct Subscription {
    inbox: Inbox<RenderMessage>,
}

impl Subscription {
    pub fn new(inbox: Inbox<RenderMessage>) -> Self {
        debug!(target = "channel", "subscription installed");
        Self { inbox }
    }

    pub fn try_next(&mut self) -> Option<RenderMessage> {
        self.inbox.try_next()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.inbox.close();
        debug!(target = "channel", "subscription released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ElementUpdate;

    #[test]
    fn delivers_in_order_per_direction() {
        let (host, mut render) = channel();
        let first = HostMessage::UpdateElement(ElementUpdate::default().with_text("one"));
        let second = HostMessage::ClearSelectionRequest;
        assert_eq!(host.outbox.post(&first), Delivery::Posted);
        assert_eq!(host.outbox.post(&second), Delivery::Posted);

        assert_eq!(render.inbox.try_next(), Some(first));
        assert_eq!(render.inbox.try_next(), Some(second));
        assert_eq!(render.inbox.try_next(), None);
    }

    #[test]
    fn posting_after_subscription_drop_is_dropped() {
        let (host, render) = channel();
        let subscription = Subscription::new(host.inbox);
        drop(subscription);
        assert_eq!(
            render.outbox.post(&RenderMessage::ClearSelection),
            Delivery::Dropped
        );
    }

    #[test]
    fn posting_to_dropped_render_is_dropped() {
        let (host, render) = channel();
        drop(render);
        assert_eq!(
            host.outbox.post(&HostMessage::ClearSelectionRequest),
            Delivery::Dropped
        );
    }
}
