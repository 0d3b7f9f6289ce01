//! Pre-connection status backlog

use std::collections::VecDeque;
use std::sync::Arc;

use flowbridge_protocol::BridgeEvent;
use tokio::sync::Mutex;

/// FIFO queue of status events raised before any client was connected.
///
/// Delivery is at-most-once and order-preserving: whoever connects first
/// pops the queue empty; a later client finds nothing. An entry pushed
/// while a drain is in progress is picked up by that same drain, since
/// draining pops until the queue is empty rather than copying it.
#[derive(Clone, Default)]
pub struct StatusBacklog {
    queue: Arc<Mutex<VecDeque<BridgeEvent>>>,
}

impl StatusBacklog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a status event for the next client to connect.
    pub async fn push(&self, event: BridgeEvent) {
        self.queue.lock().await.push_back(event);
    }

    /// Pop the oldest queued event, if any.
    pub async fn pop(&self) -> Option<BridgeEvent> {
        self.queue.lock().await.pop_front()
    }

    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.queue.lock().await.is_empty()
    }
}
