//! Deterministic local stand-ins for the remote services.
//!
//! No network calls. Each mock records its inputs so callers can assert on
//! what would have been sent, and can be built in a failing mode that
//! returns an [`RemoteError::Api`] with a fixed body.

use std::io::Cursor;
use std::sync::Mutex;

use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};

use crate::{
    BackgroundRemover, GeneratedImage, GenerationRequest, ImageGenerator, ImageResizer,
    OutputFormat, RemoteError,
};

/// Encode an RGBA image in the given format.
fn encode(img: &RgbaImage, format: ImageFormat) -> Result<Vec<u8>, RemoteError> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format)
        .map_err(|e| RemoteError::Other(format!("Failed to encode mock image: {e}")))?;
    Ok(out.into_inner())
}

/// A `width`x`height` PNG with a transparent border of `margin` pixels
/// around an opaque block.
pub fn sprite_png(width: u32, height: u32, margin: u32) -> Vec<u8> {
    let mut img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    for y in margin..height.saturating_sub(margin) {
        for x in margin..width.saturating_sub(margin) {
            img.put_pixel(x, y, Rgba([90, 140, 200, 255]));
        }
    }
    // Encoding an in-memory RGBA buffer as PNG cannot fail.
    encode(&img, ImageFormat::Png).unwrap_or_default()
}

fn api_error(body: &str) -> RemoteError {
    RemoteError::Api {
        status: 500,
        body: body.to_string(),
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Returns a 96x96 sprite with an 8px transparent border.
pub struct MockGenerator {
    failure: Option<String>,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            failure: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with `body` as the remote error text.
    pub fn failing(body: impl Into<String>) -> Self {
        Self {
            failure: Some(body.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<GenerationRequest> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageGenerator for MockGenerator {
    fn model_name(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<GeneratedImage>, RemoteError> {
        lock(&self.calls).push(request.clone());
        if let Some(body) = &self.failure {
            return Err(api_error(body));
        }
        Ok(vec![GeneratedImage {
            bytes: sprite_png(96, 96, 8),
            content_type: "image/png".into(),
        }])
    }
}

// ---------------------------------------------------------------------------
// Background removal
// ---------------------------------------------------------------------------

/// Returns its input unchanged (the mock sprites already have transparent
/// borders). Records the crop flag of every call.
pub struct MockBackgroundRemover {
    failure: Option<String>,
    calls: Mutex<Vec<bool>>,
}

impl MockBackgroundRemover {
    pub fn new() -> Self {
        Self {
            failure: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(body: impl Into<String>) -> Self {
        Self {
            failure: Some(body.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Crop flags passed, one per call.
    pub fn calls(&self) -> Vec<bool> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

impl Default for MockBackgroundRemover {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackgroundRemover for MockBackgroundRemover {
    async fn remove_background(&self, bytes: Vec<u8>, crop: bool) -> Result<Vec<u8>, RemoteError> {
        lock(&self.calls).push(crop);
        if let Some(body) = &self.failure {
            return Err(api_error(body));
        }
        Ok(bytes)
    }
}

// ---------------------------------------------------------------------------
// Resize
// ---------------------------------------------------------------------------

/// Returns a blank image of the requested size and format. Records every
/// source URL it was asked to fetch.
pub struct MockResizer {
    failure: Option<String>,
    urls: Mutex<Vec<String>>,
}

impl MockResizer {
    pub fn new() -> Self {
        Self {
            failure: None,
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(body: impl Into<String>) -> Self {
        Self {
            failure: Some(body.into()),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn urls(&self) -> Vec<String> {
        lock(&self.urls).clone()
    }
}

impl Default for MockResizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageResizer for MockResizer {
    async fn resize_from_url(
        &self,
        source_url: &str,
        width: u32,
        height: u32,
        format: OutputFormat,
    ) -> Result<Vec<u8>, RemoteError> {
        lock(&self.urls).push(source_url.to_string());
        if let Some(body) = &self.failure {
            return Err(api_error(body));
        }
        let img = RgbaImage::from_pixel(width, height, Rgba([90, 140, 200, 255]));
        let format = match format {
            OutputFormat::Webp => ImageFormat::WebP,
            OutputFormat::Png => ImageFormat::Png,
        };
        encode(&img, format)
    }
}
