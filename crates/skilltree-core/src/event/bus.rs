//! Broadcast bus for [`TreeEvent`]s.
//!
//! Recompute results and progress transitions are pushed to every live
//! subscriber, so renderers and stats panels react instead of polling.
//! Events published while nobody listens are dropped; a subscriber that
//! falls more than `capacity` events behind skips ahead and sees `Lagged`.

use skilltree_types::event::TreeEvent;
use tokio::sync::broadcast;

/// Clones share one channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<TreeEvent>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<TreeEvent> {
        self.sender.subscribe()
    }

    /// Send `event` to the current subscribers; returns how many there were.
    pub fn publish(&self, event: TreeEvent) -> usize {
        match self.sender.send(event) {
            Ok(reached) => reached,
            Err(broadcast::error::SendError(event)) => {
                tracing::trace!(event = ?event, "No subscribers for tree event");
                0
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}
