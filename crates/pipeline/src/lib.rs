//! Asset lifecycle services.
//!
//! - [`Orchestrator`]: dependency gates, reference assembly and the remote
//!   generation call.
//! - [`PostApprovalPipeline`]: background removal, trim, resize and publish
//!   for approved sprites, driven through the [`PipelineQueue`].
//! - [`ApprovalEngine`]: approve / reject / regenerate / set-active and the
//!   dependent-sprite fan-out.
//! - [`ConfigurationService`]: live-game sprite selection and publishing.
//! - [`CompositeCache`]: content-hash keyed avatar and scene composites.
//! - [`GenerationDrainer`]: polls the generation queue for auto-enqueued rows.
//!
//! [`Forge`] wires all of them over one set of [`Services`].

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub mod approval;
mod audit;
pub mod composite;
pub mod config;
pub mod configuration;
pub mod drainer;
pub mod error;
pub mod orchestrator;
pub mod post_approval;
pub mod queue;
mod references;
pub mod services;

pub use approval::{ApprovalEngine, ApprovalOutcome, PipelineTrigger, RegenerateOverrides};
pub use composite::{CompositeCache, CompositeLookup, CompositeRef};
pub use config::PipelineConfig;
pub use configuration::{ConfigurationService, SpriteOverrides};
pub use drainer::GenerationDrainer;
pub use error::PipelineError;
pub use orchestrator::{GenerateRequest, Orchestrator};
pub use post_approval::{PipelineOutcome, PostApprovalPipeline};
pub use queue::PipelineQueue;
pub use services::Services;

/// Every service over one shared [`Services`] bundle, with the pipeline
/// queue worker running.
#[derive(Clone)]
pub struct Forge {
    pub services: Services,
    pub orchestrator: Arc<Orchestrator>,
    pub approval: Arc<ApprovalEngine>,
    pub configurations: Arc<ConfigurationService>,
    pub composites: Arc<CompositeCache>,
    pub pipeline: Arc<PostApprovalPipeline>,
    pub queue: PipelineQueue,
}

impl Forge {
    /// Build the services and spawn the pipeline queue worker. The worker
    /// stops when `cancel` fires.
    pub fn start(services: Services, cancel: CancellationToken) -> (Self, JoinHandle<()>) {
        let orchestrator = Arc::new(Orchestrator::new(services.clone()));
        let pipeline = Arc::new(PostApprovalPipeline::new(services.clone()));
        let (queue, worker) = PipelineQueue::start(
            Arc::clone(&pipeline),
            services.config.queue_capacity,
            cancel,
        );
        let approval = Arc::new(ApprovalEngine::new(
            services.clone(),
            Arc::clone(&orchestrator),
            queue.clone(),
        ));
        let configurations = Arc::new(ConfigurationService::new(services.clone()));
        let composites = Arc::new(CompositeCache::new(services.clone()));

        let forge = Self {
            services,
            orchestrator,
            approval,
            configurations,
            composites,
            pipeline,
            queue,
        };
        (forge, worker)
    }
}
