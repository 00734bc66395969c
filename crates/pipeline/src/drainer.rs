//! Generation queue drainer.
//!
//! Polls `generation_queue` for `pending` entries (rows auto-enqueued when a
//! reference sheet is approved) and generates them one at a time. Claims use
//! `FOR UPDATE SKIP LOCKED` in Postgres, so several drainers can share a
//! queue.

use std::sync::Arc;
use std::time::Duration;

use assetforge_db::models::status::{AssetStatus, QueueStatus};
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;
use crate::orchestrator::Orchestrator;
use crate::services::Services;

/// `error_message` written to entries found in `processing` at start-up.
const INTERRUPTED_MESSAGE: &str = "interrupted";

pub struct GenerationDrainer {
    services: Services,
    orchestrator: Arc<Orchestrator>,
    poll_interval: Duration,
}

impl GenerationDrainer {
    pub fn new(services: Services, orchestrator: Arc<Orchestrator>) -> Self {
        let poll_interval = Duration::from_secs(services.config.worker_poll_interval_secs.max(1));
        Self {
            services,
            orchestrator,
            poll_interval,
        }
    }

    /// Fail queue entries and rows left mid-generation by a previous process.
    pub async fn recover(&self) -> Result<usize, PipelineError> {
        let store = &self.services.store;
        let asset_ids = store
            .recover_interrupted_generations(INTERRUPTED_MESSAGE)
            .await?;
        for asset_id in &asset_ids {
            let in_flight = store.find_asset(*asset_id).await?.is_some_and(|a| {
                matches!(a.status(), AssetStatus::Pending | AssetStatus::Generating)
            });
            if in_flight {
                store
                    .fail_generation(*asset_id, "Generation interrupted")
                    .await?;
            }
        }
        if !asset_ids.is_empty() {
            tracing::warn!(count = asset_ids.len(), "Failed interrupted generations");
        }
        Ok(asset_ids.len())
    }

    /// Run the polling loop until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        tracing::info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Generation drainer started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Generation drainer shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match self.drain().await {
                        Ok(0) => {}
                        Ok(count) => tracing::info!(count, "Drained generation queue"),
                        Err(e) => tracing::error!(error = %e, "Drain cycle failed"),
                    }
                }
            }
        }
    }

    /// Generate every pending entry. Returns how many were processed.
    pub async fn drain(&self) -> Result<usize, PipelineError> {
        let store = &self.services.store;
        let mut processed = 0;

        while let Some(entry) = store.claim_next_generation().await? {
            tracing::info!(
                queue_entry_id = entry.id,
                asset_id = entry.asset_id,
                attempts = entry.attempts,
                "Generation entry claimed"
            );
            if let Err(e) = self
                .orchestrator
                .run_generation(entry.asset_id, Some(entry.id))
                .await
            {
                tracing::error!(
                    queue_entry_id = entry.id,
                    asset_id = entry.asset_id,
                    error = %e,
                    "Queued generation could not run"
                );
                store
                    .finish_generation(entry.id, QueueStatus::Failed, Some(&e.to_string()))
                    .await?;
            }
            processed += 1;
        }

        Ok(processed)
    }
}
