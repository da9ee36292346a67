//! # Notification Sinks
//!
//! - `InMemoryEventLog`: append-only observation log, read back by polling.
//! - `BroadcastNotifier`: fan-out over `tokio::sync::broadcast`; each
//!   subscriber gets a stream of events.
//!
//! A sink never reports failure to the engine. A broadcast with no receivers
//! drops the event and logs it.

use crate::config::{SettlementConfig, DEFAULT_EVENT_CHANNEL_CAPACITY};
use crate::domain::BlockHeight;
use crate::events::SettlementEvent;
use crate::ports::outbound::NotificationSink;
use parking_lot::RwLock;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::{debug, warn};

/// Append-only log of every event, in emission order.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    events: RwLock<Vec<SettlementEvent>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SettlementEvent> {
        self.events.read().clone()
    }

    /// Events recorded at or after `cursor`, for incremental polling.
    pub fn events_since(&self, cursor: usize) -> Vec<SettlementEvent> {
        self.events.read().iter().skip(cursor).cloned().collect()
    }

    pub fn accepted_heights(&self) -> Vec<BlockHeight> {
        self.events
            .read()
            .iter()
            .filter(|e| e.is_acceptance())
            .map(SettlementEvent::height)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

impl NotificationSink for InMemoryEventLog {
    fn notify(&self, event: SettlementEvent) {
        self.events.write().push(event);
    }
}

/// Broadcast fan-out of settlement events.
pub struct BroadcastNotifier {
    sender: broadcast::Sender<SettlementEvent>,
    events_published: AtomicU64,
    capacity: usize,
}

impl BroadcastNotifier {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Notifier sized by `config.event_channel_capacity`.
    #[must_use]
    pub fn from_config(config: &SettlementConfig) -> Self {
        Self::with_capacity(config.event_channel_capacity)
    }

    /// Subscribe to events emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> SettlementEventStream {
        SettlementEventStream {
            inner: BroadcastStream::new(self.sender.subscribe()),
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CHANNEL_CAPACITY)
    }
}

impl NotificationSink for BroadcastNotifier {
    fn notify(&self, event: SettlementEvent) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
        let height = event.height();
        match self.sender.send(event) {
            Ok(receivers) => debug!(height, receivers, "[finality] event published"),
            Err(_) => warn!(height, "[finality] event dropped (no receivers)"),
        }
    }
}

/// Stream of settlement events for one subscriber.
///
/// A subscriber that falls more than the channel capacity behind skips the
/// events it missed and continues with the oldest retained one.
pub struct SettlementEventStream {
    inner: BroadcastStream<SettlementEvent>,
}

impl Stream for SettlementEventStream {
    type Item = SettlementEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => return Poll::Ready(Some(event)),
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(count)))) => {
                    debug!(lagged = count, "[finality] subscriber lagged, events skipped");
                    continue;
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
