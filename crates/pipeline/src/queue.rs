//! Pipeline task queue.
//!
//! Approval hands an asset id to a bounded `mpsc` channel and returns at
//! once. A single worker task drains the channel and runs the pipeline;
//! completion is observable through [`AssetEvent`](assetforge_events::AssetEvent)s
//! and the row's `pipeline_status`. A run, once started, is never
//! cancelled mid-flight; cancellation only stops the worker between runs.

use std::sync::Arc;

use assetforge_core::category::ALL_CATEGORIES;
use assetforge_core::types::DbId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;
use crate::post_approval::{PipelineOutcome, PostApprovalPipeline};
use crate::services::Services;

/// `pipeline_error` written to runs found in `processing` at start-up.
pub const INTERRUPTED_MESSAGE: &str = "interrupted";

#[derive(Clone)]
pub struct PipelineQueue {
    sender: mpsc::Sender<DbId>,
}

impl PipelineQueue {
    /// Spawn the worker task and return the sending half.
    pub fn start(
        pipeline: Arc<PostApprovalPipeline>,
        capacity: usize,
        cancel: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run_worker(pipeline, receiver, cancel));
        (Self { sender }, handle)
    }

    /// Queue a pipeline run. Waits only while the channel is full.
    pub async fn enqueue(&self, asset_id: DbId) -> Result<(), PipelineError> {
        self.sender
            .send(asset_id)
            .await
            .map_err(|_| PipelineError::QueueClosed)?;
        tracing::debug!(asset_id, "Pipeline run queued");
        Ok(())
    }

    /// Fail runs left in `processing` by a previous process and queue them
    /// again, together with approved sprites that never had a run.
    ///
    /// Returns the number of runs queued.
    pub async fn recover(&self, services: &Services) -> Result<usize, PipelineError> {
        let store = &services.store;
        let interrupted = store
            .recover_interrupted_pipelines(INTERRUPTED_MESSAGE)
            .await?;
        let sprite_categories: Vec<String> = ALL_CATEGORIES
            .iter()
            .filter(|c| c.is_sprite())
            .map(|c| c.name().to_string())
            .collect();
        let backlog = store.list_pipeline_backlog(&sprite_categories).await?;

        let mut ids = interrupted.clone();
        for id in backlog {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        for id in &ids {
            self.enqueue(*id).await?;
        }

        if !ids.is_empty() {
            tracing::info!(
                interrupted = interrupted.len(),
                queued = ids.len(),
                "Recovered pipeline runs"
            );
        }
        Ok(ids.len())
    }
}

async fn run_worker(
    pipeline: Arc<PostApprovalPipeline>,
    mut receiver: mpsc::Receiver<DbId>,
    cancel: CancellationToken,
) {
    tracing::info!("Pipeline worker started");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Pipeline worker shutting down");
                break;
            }
            next = receiver.recv() => {
                let Some(asset_id) = next else {
                    tracing::info!("Pipeline queue closed, worker exiting");
                    break;
                };
                match pipeline.run(asset_id).await {
                    Ok(PipelineOutcome::Completed { warning: Some(warning), .. }) => {
                        tracing::warn!(asset_id, warning = %warning, "Pipeline run degraded");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(asset_id, error = %e, "Pipeline run failed");
                    }
                }
            }
        }
    }
}
