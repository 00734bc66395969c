use assetforge_cloud::StorageError;
use assetforge_core::error::CoreError;
use assetforge_core::prompt::MissingTemplate;
use assetforge_core::trim::TrimError;
use assetforge_core::types::DbId;
use assetforge_db::store::StoreError;
use assetforge_imaging::RemoteError;

/// Errors from the orchestrator, the approval engine, the post-approval
/// pipeline and the composite cache.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Reference asset {asset_id} is not approved")]
    ReferenceNotApproved { asset_id: DbId },

    #[error("Dependency not met: missing approved {}", .missing.join(", "))]
    DependencyNotMet { missing: Vec<String> },

    #[error(transparent)]
    MissingTemplate(#[from] MissingTemplate),

    #[error("Cannot {action} an asset in status '{from}'")]
    InvalidTransition { from: String, action: &'static str },

    #[error("Original image not found at '{key}'")]
    OriginalNotFound { key: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Image processing failed: {0}")]
    Image(#[from] TrimError),

    #[error("Pipeline queue is closed")]
    QueueClosed,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    pub(crate) fn asset_not_found(id: DbId) -> Self {
        Self::NotFound {
            entity: "generated_asset",
            id: id.to_string(),
        }
    }
}

impl From<CoreError> for PipelineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { entity, id } => Self::NotFound {
                entity,
                id: id.to_string(),
            },
            CoreError::Validation(msg) | CoreError::Conflict(msg) => Self::Validation(msg),
            CoreError::Internal(msg) => Self::Internal(msg),
        }
    }
}
