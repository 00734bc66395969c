//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod audit_repo;
pub mod composite_repo;
pub mod configuration_repo;
pub mod generated_asset_repo;
pub mod generation_queue_repo;
pub mod rejection_repo;

pub use audit_repo::AuditLogRepo;
pub use composite_repo::CompositeCacheRepo;
pub use configuration_repo::AssetConfigurationRepo;
pub use generated_asset_repo::GeneratedAssetRepo;
pub use generation_queue_repo::GenerationQueueRepo;
pub use rejection_repo::AssetRejectionRepo;
