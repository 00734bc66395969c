//! Process bootstrap shared by the worker and API binaries: tracing setup,
//! store connection, and assembly of the [`Services`] bundle from the
//! environment.

use std::sync::Arc;

use assetforge_cloud::{build_object_store, StorageConfig};
use assetforge_db::store::{AssetStore, PgAssetStore};
use assetforge_events::EventBus;
use assetforge_imaging::http::{
    build_client, HttpBackgroundRemover, HttpImageGenerator, HttpImageResizer,
};
use assetforge_imaging::ServiceConfig;
use assetforge_pipeline::{PipelineConfig, Services};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` overrides `default_filter`;
/// `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.to_string().into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Connect to Postgres at `database_url`, check it and apply migrations.
///
/// Panics on failure; only called during start-up.
pub async fn connect_store(database_url: &str) -> Arc<dyn AssetStore> {
    let pool = assetforge_db::create_pool(database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    assetforge_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    assetforge_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    Arc::new(PgAssetStore::new(pool))
}

/// Build the object store, remote clients and prompt library from the
/// environment around an already connected `store`.
pub async fn build_services(store: Arc<dyn AssetStore>, events: Arc<EventBus>) -> Services {
    let storage = StorageConfig::from_env();
    let objects = build_object_store(&storage).await;
    tracing::info!(backend = ?storage.backend, "Object store ready");

    let remote = ServiceConfig::from_env();
    let client = build_client(&remote).expect("Failed to build HTTP client");
    tracing::info!(
        generation_url = %remote.generation_url,
        model = %remote.generation_model,
        "Remote services configured"
    );

    let config = PipelineConfig::from_env();
    let prompts = config
        .load_prompt_library()
        .expect("Failed to load prompt library");
    if prompts.is_empty() {
        tracing::warn!("Prompt library is empty; every generation will fail its template lookup");
    }

    Services {
        store,
        objects,
        generator: Arc::new(HttpImageGenerator::new(client.clone(), &remote)),
        remover: Arc::new(HttpBackgroundRemover::new(client.clone(), &remote)),
        resizer: Arc::new(HttpImageResizer::new(client, &remote)),
        events,
        prompts: Arc::new(prompts),
        config,
    }
}

/// Wait for SIGINT or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
