use std::sync::Arc;
use std::time::Duration;

use assetforge_events::{EventBus, EventLogger};
use assetforge_pipeline::{Forge, GenerationDrainer};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    assetforge_worker::init_tracing("assetforge_worker=debug,assetforge_pipeline=debug");

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let store = assetforge_worker::connect_store(&database_url).await;

    let events = Arc::new(EventBus::default());
    let services = assetforge_worker::build_services(store, Arc::clone(&events)).await;

    let cancel = CancellationToken::new();
    let logger_handle = tokio::spawn(EventLogger::run(events.subscribe(), cancel.clone()));

    let (forge, pipeline_handle) = Forge::start(services.clone(), cancel.clone());
    let drainer = GenerationDrainer::new(services.clone(), Arc::clone(&forge.orchestrator));

    match drainer.recover().await {
        Ok(count) => tracing::info!(count, "Generation queue recovered"),
        Err(e) => tracing::error!(error = %e, "Generation queue recovery failed"),
    }
    match forge.queue.recover(&services).await {
        Ok(count) => tracing::info!(count, "Pipeline runs re-queued"),
        Err(e) => tracing::error!(error = %e, "Pipeline recovery failed"),
    }

    let drainer_cancel = cancel.clone();
    let drainer_handle = tokio::spawn(async move {
        drainer.run(drainer_cancel).await;
    });
    tracing::info!("Worker started");

    assetforge_worker::shutdown_signal().await;
    cancel.cancel();

    let grace = Duration::from_secs(30);
    let _ = tokio::time::timeout(grace, drainer_handle).await;
    let _ = tokio::time::timeout(grace, pipeline_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), logger_handle).await;
    tracing::info!("Worker stopped");
}
