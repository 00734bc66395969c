//! Generation queue entries, one per requested generation run.

use assetforge_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use crate::models::status::{QueueStatus, StatusId};

/// A row from the `generation_queue` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GenerationQueueEntry {
    pub id: DbId,
    pub asset_id: DbId,
    pub status_id: StatusId,
    pub attempts: i32,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl GenerationQueueEntry {
    pub fn status(&self) -> Option<QueueStatus> {
        QueueStatus::from_id(self.status_id)
    }
}
