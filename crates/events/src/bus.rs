//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>`. Pipeline completion is
//! observable by subscribing and waiting for
//! [`AssetEvent::PipelineCompleted`] or [`AssetEvent::PipelineFailed`].

use assetforge_core::types::{DbId, Timestamp};
use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// AssetEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssetEvent {
    GenerationCompleted {
        asset_id: DbId,
        category: String,
        asset_key: String,
        variant: i32,
    },
    GenerationFailed {
        asset_id: DbId,
        error: String,
    },
    Approved {
        asset_id: DbId,
        actor: String,
    },
    Rejected {
        asset_id: DbId,
        actor: String,
    },
    Activated {
        asset_id: DbId,
    },
    PipelineStarted {
        asset_id: DbId,
    },
    /// `warning` carries a non-fatal step error (e.g. resize).
    PipelineCompleted {
        asset_id: DbId,
        public_url: String,
        warning: Option<String>,
    },
    PipelineFailed {
        asset_id: DbId,
        error: String,
    },
    /// A queued run did not start (claim lost, row gone).
    PipelineSkipped {
        asset_id: DbId,
        reason: String,
    },
    CompositeStored {
        kind: String,
        owner_key: String,
        scope_key: String,
        content_hash: String,
    },
    CompositesInvalidated {
        owner_key: String,
        removed: usize,
    },
}

impl AssetEvent {
    /// Dot-separated event name, e.g. `"pipeline.completed"`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GenerationCompleted { .. } => "generation.completed",
            Self::GenerationFailed { .. } => "generation.failed",
            Self::Approved { .. } => "asset.approved",
            Self::Rejected { .. } => "asset.rejected",
            Self::Activated { .. } => "asset.activated",
            Self::PipelineStarted { .. } => "pipeline.started",
            Self::PipelineCompleted { .. } => "pipeline.completed",
            Self::PipelineFailed { .. } => "pipeline.failed",
            Self::PipelineSkipped { .. } => "pipeline.skipped",
            Self::CompositeStored { .. } => "composite.stored",
            Self::CompositesInvalidated { .. } => "composite.invalidated",
        }
    }

    /// The generated asset the event is about, if any.
    pub fn asset_id(&self) -> Option<DbId> {
        match self {
            Self::GenerationCompleted { asset_id, .. }
            | Self::GenerationFailed { asset_id, .. }
            | Self::Approved { asset_id, .. }
            | Self::Rejected { asset_id, .. }
            | Self::Activated { asset_id }
            | Self::PipelineStarted { asset_id }
            | Self::PipelineCompleted { asset_id, .. }
            | Self::PipelineFailed { asset_id, .. }
            | Self::PipelineSkipped { asset_id, .. } => Some(*asset_id),
            Self::CompositeStored { .. } | Self::CompositesInvalidated { .. } => None,
        }
    }

    /// Whether this event ends a pipeline run for its asset.
    pub fn is_pipeline_terminal(&self) -> bool {
        matches!(
            self,
            Self::PipelineCompleted { .. } | Self::PipelineFailed { .. } | Self::PipelineSkipped { .. }
        )
    }
}

/// An event with its publish time.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    pub event: AssetEvent,
    pub timestamp: Timestamp,
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest un-consumed messages are dropped
    /// and slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: AssetEvent) {
        // Ignore the SendError; it only means there are zero receivers.
        let _ = self.sender.send(EventEnvelope {
            event,
            timestamp: Utc::now(),
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(AssetEvent::PipelineStarted { asset_id: 5 });

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event, AssetEvent::PipelineStarted { asset_id: 5 });
        assert_eq!(received.event.name(), "pipeline.started");
        assert_eq!(received.event.asset_id(), Some(5));
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(AssetEvent::Activated { asset_id: 1 });

        assert_eq!(rx1.recv().await.unwrap().event.name(), "asset.activated");
        assert_eq!(rx2.recv().await.unwrap().event.name(), "asset.activated");
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        EventBus::default().publish(AssetEvent::Activated { asset_id: 1 });
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(AssetEvent::PipelineFailed {
            asset_id: 9,
            error: "boom".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "pipeline_failed");
        assert_eq!(json["asset_id"], 9);
    }

    #[test]
    fn terminal_pipeline_events() {
        assert!(AssetEvent::PipelineFailed { asset_id: 1, error: String::new() }.is_pipeline_terminal());
        assert!(!AssetEvent::PipelineStarted { asset_id: 1 }.is_pipeline_terminal());
        assert_eq!(
            AssetEvent::CompositesInvalidated { owner_key: "c".into(), removed: 2 }.asset_id(),
            None
        );
    }
}
