//! Background subscriber writing every [`AssetEvent`] to the structured log.

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::bus::EventEnvelope;

pub struct EventLogger;

impl EventLogger {
    /// Run the logging loop until the bus closes or `cancel` fires.
    pub async fn run(mut receiver: broadcast::Receiver<EventEnvelope>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Event logger stopping (cancelled)");
                    break;
                }
                received = receiver.recv() => match received {
                    Ok(envelope) => {
                        let payload = serde_json::to_string(&envelope.event).unwrap_or_default();
                        tracing::info!(
                            event = envelope.event.name(),
                            asset_id = envelope.event.asset_id(),
                            payload = %payload,
                            "Asset event"
                        );
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Event logger lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Event bus closed, logger shutting down");
                        break;
                    }
                }
            }
        }
    }
}
