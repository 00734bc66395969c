//! Actor extractor for audit attribution.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::state::AppState;

/// Header naming the human (or tool) performing a mutation.
pub const ACTOR_HEADER: &str = "x-actor";

/// Actor used when the header is absent or blank.
pub const DEFAULT_ACTOR: &str = "admin";

/// Who performed the request, taken from the `x-actor` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor(pub String);

impl Actor {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromRequestParts<AppState> for Actor {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let actor = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_ACTOR);
        Ok(Actor(actor.to_string()))
    }
}
