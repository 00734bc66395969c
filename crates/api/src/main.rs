use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use assetforge_api::config::ServerConfig;
use assetforge_api::router::build_app_router;
use assetforge_api::state::AppState;
use assetforge_db::store::{AssetStore, MemoryStore};
use assetforge_events::{EventBus, EventLogger};
use assetforge_pipeline::Forge;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    assetforge_worker::init_tracing(
        "assetforge_api=debug,assetforge_pipeline=debug,tower_http=debug",
    );

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Store ---
    let store: Arc<dyn AssetStore> = match std::env::var("DATABASE_URL") {
        Ok(url) => assetforge_worker::connect_store(&url).await,
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store; nothing will persist");
            Arc::new(MemoryStore::new())
        }
    };

    // --- Event bus ---
    let events = Arc::new(EventBus::default());
    let cancel = CancellationToken::new();
    let logger_handle = tokio::spawn(EventLogger::run(events.subscribe(), cancel.clone()));

    // --- Services ---
    let services = assetforge_worker::build_services(store, Arc::clone(&events)).await;
    let (forge, pipeline_handle) = Forge::start(services.clone(), cancel.clone());
    match forge.queue.recover(&services).await {
        Ok(count) => tracing::info!(count, "Pipeline runs re-queued"),
        Err(e) => tracing::error!(error = %e, "Pipeline recovery failed"),
    }

    // --- Router ---
    let state = AppState {
        forge,
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(assetforge_worker::shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    cancel.cancel();

    let grace = Duration::from_secs(config.shutdown_timeout_secs);
    let _ = tokio::time::timeout(grace, pipeline_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), logger_handle).await;
    tracing::info!("Graceful shutdown complete");
}
