use std::sync::Arc;

use assetforge_pipeline::Forge;

use crate::config::ServerConfig;

/// Shared application state available to all handlers via `State<AppState>`.
///
/// Cheap to clone: everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Orchestrator, approval engine, pipeline queue, configurations and
    /// composite cache over one set of backends.
    pub forge: Forge,
    pub config: Arc<ServerConfig>,
}
