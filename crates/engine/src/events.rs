use async_trait::async_trait;
use parking_lot::Mutex;

use arbor_core::NodeEvent;

/// Receives domain events after a mutation commits. Event transport is
/// outside the engine; implementations must not fail the operation.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: NodeEvent);
}

/// Discards every event.
#[derive(Debug, Default)]
pub struct NoopEventSink;

#[async_trait]
impl EventSink for NoopEventSink {
    async fn publish(&self, _event: NodeEvent) {}
}

/// Captures events for assertions in tests.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<NodeEvent>>,
}

impl MemoryEventSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<NodeEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl EventSink for MemoryEventSink {
    async fn publish(&self, event: NodeEvent) {
        self.events.lock().push(event);
    }
}
