//! # Broadcast Event Adapter
//!
//! Fans committed association events out to in-process subscribers over a
//! `tokio::sync::broadcast` channel.
//!
//! ## Event Flow
//!
//! ```text
//! store / revoke ──commit──→ [AssociationService]
//!                                    │
//!                                    ↓
//!                          AssociationEvent ──→ [BroadcastEventSink]
//!                                                        │
//!                                   ┌────────────────────┼────────────────────┐
//!                                   ↓                    ↓                    ↓
//!                             Subscription         Subscription         Subscription
//! ```
//!
//! Publishing never blocks. A subscriber that falls more than `capacity`
//! events behind skips the overflow.

use crate::domain::events::AssociationEvent;
use crate::ports::outbound::AssociationEventSink;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Default channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The sink was dropped.
    #[error("Event sink closed")]
    Closed,
}

/// In-memory broadcast implementation of [`AssociationEventSink`].
pub struct BroadcastEventSink {
    sender: broadcast::Sender<AssociationEvent>,
    events_published: AtomicU64,
    capacity: usize,
}

impl BroadcastEventSink {
    /// Create a sink with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a sink with the given capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            events_published: AtomicU64::new(0),
            capacity: capacity.max(1),
        }
    }

    /// Receive every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        debug!(
            subscribers = self.sender.receiver_count() + 1,
            "New association event subscription"
        );
        Subscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Total events handed to the sink, delivered or not.
    #[must_use]
    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }

    /// Channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for BroadcastEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AssociationEventSink for BroadcastEventSink {
    fn publish(&self, event: AssociationEvent) -> usize {
        let id = hex::encode(event.id());
        let kind = event.kind();
        self.events_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(%id, kind, receivers, "Association event published");
                receivers
            }
            Err(e) => {
                warn!(%id, kind, error = %e, "Association event dropped (no receivers)");
                0
            }
        }
    }
}

/// Receiving end of a [`BroadcastEventSink`].
pub struct Subscription {
    receiver: broadcast::Receiver<AssociationEvent>,
}

impl Subscription {
    /// Wait for the next event.
    ///
    /// Returns `None` once the sink has been dropped and drained.
    pub async fn recv(&mut self) -> Option<AssociationEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(lagged = count, "Subscriber lagged, association events dropped");
                }
            }
        }
    }

    /// Take the next event if one is ready.
    pub fn try_recv(&mut self) -> Result<Option<AssociationEvent>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Ok(Some(event)),
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn revoked(byte: u8, at: u64) -> AssociationEvent {
        AssociationEvent::Revoked {
            id: [byte; 32],
            revoker_hash: [0xAA; 32],
            revoked_at: at,
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        let sink = BroadcastEventSink::new();
        let mut first = sink.subscribe();
        let mut second = sink.subscribe();

        assert_eq!(sink.publish(revoked(1, 10)), 2);

        assert_eq!(first.recv().await, Some(revoked(1, 10)));
        assert_eq!(second.recv().await, Some(revoked(1, 10)));
        assert_eq!(sink.events_published(), 1);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_counted() {
        let sink = BroadcastEventSink::new();
        assert_eq!(sink.subscriber_count(), 0);
        assert_eq!(sink.publish(revoked(1, 10)), 0);
        assert_eq!(sink.events_published(), 1);
    }

    #[tokio::test]
    async fn test_subscriber_sees_only_later_events() {
        let sink = BroadcastEventSink::new();
        sink.publish(revoked(1, 10));

        let mut sub = sink.subscribe();
        assert_eq!(sub.try_recv(), Ok(None));

        sink.publish(revoked(2, 20));
        assert_eq!(sub.try_recv(), Ok(Some(revoked(2, 20))));
    }

    #[tokio::test]
    async fn test_lagging_subscriber_skips_overflow() {
        let sink = BroadcastEventSink::with_capacity(2);
        let mut sub = sink.subscribe();
        for i in 0..4u8 {
            sink.publish(revoked(i, u64::from(i)));
        }

        assert_eq!(sub.recv().await, Some(revoked(2, 2)));
        assert_eq!(sub.recv().await, Some(revoked(3, 3)));
    }

    #[tokio::test]
    async fn test_closed_after_sink_dropped() {
        let sink = BroadcastEventSink::new();
        let mut sub = sink.subscribe();
        sink.publish(revoked(1, 10));
        drop(sink);

        assert_eq!(sub.recv().await, Some(revoked(1, 10)));
        assert_eq!(sub.recv().await, None);
        assert_eq!(sub.try_recv(), Err(SubscriptionError::Closed));
    }
}
