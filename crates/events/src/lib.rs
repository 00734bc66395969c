//! Asset lifecycle events.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`AssetEvent`]: the events published by the orchestrator, the
//!   approval engine, the post-approval pipeline and the composite cache.
//! - [`EventLogger`]: background subscriber writing every event to the
//!   structured log.

pub mod bus;
pub mod logger;

pub use bus::{AssetEvent, EventBus, EventEnvelope};
pub use logger::EventLogger;
