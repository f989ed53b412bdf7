//! Overlay event channel

use elixir_core::EventPublisher;
use elixir_domain::{OverlayEvent, Result};
use tokio::sync::broadcast;
use tracing::trace;

const DEFAULT_CAPACITY: usize = 64;

/// [`EventPublisher`] fanning events out to any number of subscribers.
///
/// Publishing with no subscriber attached drops the event.
#[derive(Debug, Clone)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<OverlayEvent>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OverlayEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastEventPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventPublisher for BroadcastEventPublisher {
    fn publish(&self, event: OverlayEvent) -> Result<()> {
        let kind = event.kind();
        match self.sender.send(event) {
            Ok(receivers) => trace!(kind, receivers, "overlay event published"),
            Err(_) => trace!(kind, "overlay event dropped, no subscribers"),
        }
        Ok(())
    }
}
