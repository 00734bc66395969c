//! The shared collaborators every service is built over.

use std::sync::Arc;

use assetforge_cloud::ObjectStore;
use assetforge_core::prompt::PromptLibrary;
use assetforge_db::store::AssetStore;
use assetforge_events::EventBus;
use assetforge_imaging::{BackgroundRemover, ImageGenerator, ImageResizer};

use crate::config::PipelineConfig;

#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn AssetStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub generator: Arc<dyn ImageGenerator>,
    pub remover: Arc<dyn BackgroundRemover>,
    pub resizer: Arc<dyn ImageResizer>,
    pub events: Arc<EventBus>,
    pub prompts: Arc<PromptLibrary>,
    pub config: PipelineConfig,
}
