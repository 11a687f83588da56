//! Change notifications for UI layers rendering store state.

use super::domain::ProcessId;
use serde::Serialize;
use tokio::sync::broadcast;

/// Maximum number of events buffered per subscriber before it starts lagging.
const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StoreEvent {
    ProfileUpdated,
    DraftUpdated,
    ProcessSubmitted { id: ProcessId },
    ProcessUpdated { id: ProcessId },
    LoggedOut,
}

/// Broadcast sender shared by the store. Dropping a receiver unsubscribes it.
#[derive(Debug, Clone)]
pub struct StoreEvents {
    tx: broadcast::Sender<StoreEvent>,
}

impl StoreEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, event: StoreEvent) {
        // No subscribers is not an error.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }
}

impl Default for StoreEvents {
    fn default() -> Self {
        Self::new()
    }
}
