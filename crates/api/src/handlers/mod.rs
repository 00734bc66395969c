//! Request handlers.
//!
//! Handlers stay thin: they parse input, delegate to the services on
//! [`Forge`](assetforge_pipeline::Forge) and wrap results in
//! [`DataResponse`](crate::response::DataResponse). Errors map to HTTP
//! statuses through [`AppError`](crate::error::AppError).

pub mod assets;
pub mod audit;
pub mod composites;
pub mod configurations;
