#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use assetforge_cloud::memory::MemoryObjectStore;
use assetforge_cloud::{ObjectStore, Tier};
use assetforge_core::category::{AssetCategory, ALL_CATEGORIES};
use assetforge_core::prompt::{PromptLibrary, CATEGORY_WILDCARD};
use assetforge_core::storage_keys::{raw_key, PNG_CONTENT_TYPE};
use assetforge_core::types::DbId;
use assetforge_db::models::generated_asset::{AssetQuery, CreateGeneratedAsset, GeneratedAsset};
use assetforge_db::store::{AssetRepository, AssetStore, MemoryStore};
use assetforge_events::{AssetEvent, EventBus, EventEnvelope};
use assetforge_imaging::mock::{sprite_png, MockBackgroundRemover, MockGenerator, MockResizer};
use assetforge_pipeline::{Forge, PipelineConfig, Services};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

pub const ACTOR: &str = "tester";

/// A prompt library with a category-wide template for every category.
pub fn full_library() -> PromptLibrary {
    ALL_CATEGORIES.iter().fold(PromptLibrary::new(), |lib, c| {
        lib.with(*c, CATEGORY_WILDCARD, format!("Isometric {} {{asset_key}}", c.name()))
    })
}

pub struct Harness {
    pub forge: Forge,
    pub store: Arc<MemoryStore>,
    pub objects: Arc<MemoryObjectStore>,
    pub generator: Arc<MockGenerator>,
    pub remover: Arc<MockBackgroundRemover>,
    pub resizer: Arc<MockResizer>,
    pub events: Arc<EventBus>,
    pub cancel: CancellationToken,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(
            MockGenerator::new(),
            MockBackgroundRemover::new(),
            MockResizer::new(),
            full_library(),
            PipelineConfig::default(),
        )
    }

    pub fn with_generator(generator: MockGenerator) -> Self {
        Self::build(
            generator,
            MockBackgroundRemover::new(),
            MockResizer::new(),
            full_library(),
            PipelineConfig::default(),
        )
    }

    pub fn with_remover(remover: MockBackgroundRemover) -> Self {
        Self::build(
            MockGenerator::new(),
            remover,
            MockResizer::new(),
            full_library(),
            PipelineConfig::default(),
        )
    }

    pub fn with_resizer(resizer: MockResizer) -> Self {
        Self::build(
            MockGenerator::new(),
            MockBackgroundRemover::new(),
            resizer,
            full_library(),
            PipelineConfig::default(),
        )
    }

    pub fn with_prompts(prompts: PromptLibrary) -> Self {
        Self::build(
            MockGenerator::new(),
            MockBackgroundRemover::new(),
            MockResizer::new(),
            prompts,
            PipelineConfig::default(),
        )
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        Self::build(
            MockGenerator::new(),
            MockBackgroundRemover::new(),
            MockResizer::new(),
            full_library(),
            config,
        )
    }

    fn build(
        generator: MockGenerator,
        remover: MockBackgroundRemover,
        resizer: MockResizer,
        prompts: PromptLibrary,
        config: PipelineConfig,
    ) -> Self {
        let store = Arc::new(MemoryStore::new());
        let objects = Arc::new(MemoryObjectStore::default());
        let generator = Arc::new(generator);
        let remover = Arc::new(remover);
        let resizer = Arc::new(resizer);
        let events = Arc::new(EventBus::default());
        let cancel = CancellationToken::new();

        let services = Services {
            store: store.clone(),
            objects: objects.clone(),
            generator: generator.clone(),
            remover: remover.clone(),
            resizer: resizer.clone(),
            events: events.clone(),
            prompts: Arc::new(prompts),
            config,
        };
        let (forge, _worker) = Forge::start(services, cancel.clone());

        Self {
            forge,
            store,
            objects,
            generator,
            remover,
            resizer,
            events,
            cancel,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.events.subscribe()
    }

    /// Insert a `completed` version with a stored raw image, bypassing the
    /// orchestrator and its gates.
    pub async fn seed(&self, category: AssetCategory, asset_key: &str) -> GeneratedAsset {
        let input = CreateGeneratedAsset::new(category, asset_key, format!("Seed {asset_key}"));
        let row = self.store.create_asset(&input).await.unwrap();
        let key = raw_key(category, asset_key, row.variant);
        self.objects
            .put(Tier::Private, &key, sprite_png(96, 96, 8), PNG_CONTENT_TYPE)
            .await
            .unwrap();
        self.store
            .complete_generation(row.id, &key, Some("mock"))
            .await
            .unwrap()
            .unwrap()
    }

    /// Seed a version and approve it directly in the store (no pipeline run).
    pub async fn seed_approved(&self, category: AssetCategory, asset_key: &str) -> GeneratedAsset {
        let row = self.seed(category, asset_key).await;
        self.store
            .approve_and_activate(row.id, ACTOR)
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn asset(&self, id: DbId) -> GeneratedAsset {
        self.store.find_asset(id).await.unwrap().unwrap()
    }

    pub async fn all_assets(&self) -> Vec<GeneratedAsset> {
        self.store.list_assets(&AssetQuery::default()).await.unwrap()
    }

    pub async fn versions(&self, category: AssetCategory, asset_key: &str) -> Vec<GeneratedAsset> {
        self.store
            .list_versions(category.name(), asset_key)
            .await
            .unwrap()
    }

    pub fn services(&self) -> &Services {
        &self.forge.services
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Wait for the terminal pipeline event of `asset_id`.
pub async fn wait_for_pipeline(
    rx: &mut broadcast::Receiver<EventEnvelope>,
    asset_id: DbId,
) -> AssetEvent {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match rx.recv().await {
                Ok(envelope)
                    if envelope.event.asset_id() == Some(asset_id)
                        && envelope.event.is_pipeline_terminal() =>
                {
                    return envelope.event;
                }
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
            }
        }
    })
    .await
    .expect("pipeline run did not finish in time")
}

/// Active rows of a logical key.
pub fn active_rows(rows: &[GeneratedAsset]) -> Vec<&GeneratedAsset> {
    rows.iter().filter(|a| a.is_active).collect()
}
