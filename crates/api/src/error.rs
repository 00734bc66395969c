use assetforge_cloud::StorageError;
use assetforge_core::error::CoreError;
use assetforge_db::store::StoreError;
use assetforge_pipeline::PipelineError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce `{ "error": msg, "code": CODE }`
/// bodies. Dependency failures also carry `"missing": [..]`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

struct Classified {
    status: StatusCode,
    code: &'static str,
    message: String,
    missing: Option<Vec<String>>,
}

impl Classified {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            missing: None,
        }
    }

    fn internal(error: &dyn std::fmt::Display) -> Self {
        tracing::error!(error = %error, "Internal error");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "An internal error occurred",
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let classified = match &self {
            AppError::Core(core) => classify_core(core),
            AppError::Pipeline(err) => classify_pipeline(err),
            AppError::Store(err) => classify_store(err),
            AppError::BadRequest(msg) => {
                Classified::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone())
            }
            AppError::InternalError(msg) => Classified::internal(msg),
        };

        let mut body = json!({
            "error": classified.message,
            "code": classified.code,
        });
        if let Some(missing) = classified.missing {
            body["missing"] = json!(missing);
        }

        (classified.status, axum::Json(body)).into_response()
    }
}

fn classify_core(err: &CoreError) -> Classified {
    match err {
        CoreError::NotFound { entity, id } => Classified::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => {
            Classified::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
        }
        CoreError::Conflict(msg) => Classified::new(StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Internal(msg) => Classified::internal(msg),
    }
}

fn classify_store(err: &StoreError) -> Classified {
    match err {
        StoreError::Conflict(msg) => {
            Classified::new(StatusCode::CONFLICT, "CONFLICT", msg.clone())
        }
        StoreError::Database(db) => Classified::internal(db),
    }
}

/// Map pipeline errors to HTTP statuses.
///
/// - 400: malformed input.
/// - 404: unknown asset, configuration or object.
/// - 409: the asset's status does not allow the action.
/// - 422: well-formed request whose preconditions are not met.
/// - 502: a remote transform service failed; its raw body is in the message.
fn classify_pipeline(err: &PipelineError) -> Classified {
    let message = err.to_string();
    match err {
        PipelineError::Validation(msg) => {
            Classified::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
        }
        PipelineError::NotFound { .. } => {
            Classified::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
        }
        PipelineError::InvalidTransition { .. } => {
            Classified::new(StatusCode::CONFLICT, "INVALID_TRANSITION", message)
        }
        PipelineError::DependencyNotMet { missing } => Classified {
            missing: Some(missing.clone()),
            ..Classified::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "DEPENDENCY_NOT_MET",
                message,
            )
        },
        PipelineError::ReferenceNotApproved { .. } => Classified::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "REFERENCE_NOT_APPROVED",
            message,
        ),
        PipelineError::MissingTemplate(_) => Classified::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "MISSING_TEMPLATE",
            message,
        ),
        PipelineError::OriginalNotFound { .. } => Classified::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "ORIGINAL_NOT_FOUND",
            message,
        ),
        PipelineError::Image(_) => {
            Classified::new(StatusCode::UNPROCESSABLE_ENTITY, "IMAGE_ERROR", message)
        }
        PipelineError::Remote(_) => {
            tracing::warn!(error = %message, "Remote service error");
            Classified::new(StatusCode::BAD_GATEWAY, "REMOTE_SERVICE_ERROR", message)
        }
        PipelineError::Storage(StorageError::NotFound { .. }) => {
            Classified::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
        }
        PipelineError::Storage(_) | PipelineError::QueueClosed | PipelineError::Internal(_) => {
            Classified::internal(err)
        }
        PipelineError::Store(store) => classify_store(store),
    }
}
