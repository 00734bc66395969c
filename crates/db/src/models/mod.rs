//! Row models and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row, plus the insert DTOs the store accepts.

pub mod audit;
pub mod composite;
pub mod configuration;
pub mod generated_asset;
pub mod generation_queue;
pub mod rejection;
pub mod status;
