//! Contracts and clients for the remote image transform services.
//!
//! Three services are consumed, each treated as an opaque remote function:
//! - [`ImageGenerator`]: prompt + reference images -> images.
//! - [`BackgroundRemover`]: image bytes (+ crop flag) -> image bytes.
//! - [`ImageResizer`]: publicly fetchable URL + size + format -> image bytes.
//!
//! [`http`] holds the reqwest clients; [`mock`] holds deterministic local
//! stand-ins used by tests and offline development.

use async_trait::async_trait;
use serde::Serialize;

pub mod config;
pub mod error;
pub mod http;
pub mod mock;

pub use config::ServiceConfig;
pub use error::RemoteError;

/// A reference image sent alongside a generation prompt.
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    /// Where the image came from, e.g. `building_ref/restaurant#12`.
    pub label: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Input to a generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    /// In priority order.
    pub references: Vec<ReferenceImage>,
    /// Model parameters, passed through verbatim.
    pub settings: serde_json::Value,
}

/// One image returned by the generation service.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Output format of the resize service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Webp,
    Png,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Png => "png",
        }
    }
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Model identifier recorded on the asset row.
    fn model_name(&self) -> &str;

    /// Generate one or more images. An empty result is an error.
    async fn generate(&self, request: &GenerationRequest)
        -> Result<Vec<GeneratedImage>, RemoteError>;
}

#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    /// Remove the background. With `crop`, fully transparent borders are
    /// trimmed by the service as part of the same call.
    async fn remove_background(&self, bytes: Vec<u8>, crop: bool) -> Result<Vec<u8>, RemoteError>;
}

#[async_trait]
pub trait ImageResizer: Send + Sync {
    /// Fetch `source_url`, resize to `width`x`height` and convert to `format`.
    async fn resize_from_url(
        &self,
        source_url: &str,
        width: u32,
        height: u32,
        format: OutputFormat,
    ) -> Result<Vec<u8>, RemoteError>;
}
