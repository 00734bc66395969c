//! reqwest clients for the remote transform services.
//!
//! Every service answers with raw image bytes in the response body; any
//! non-2xx response is surfaced as [`RemoteError::Api`] with the body text
//! kept verbatim.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use crate::config::ServiceConfig;
use crate::{
    BackgroundRemover, GeneratedImage, GenerationRequest, ImageGenerator, ImageResizer,
    OutputFormat, RemoteError,
};

/// Build a shared client with the configured per-request timeout.
pub fn build_client(config: &ServiceConfig) -> Result<reqwest::Client, RemoteError> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?)
}

/// Ensure the response has a success status code. Returns the response
/// unchanged on success, or [`RemoteError::Api`] with the status and body.
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(RemoteError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

/// Read a successful response as image bytes.
async fn read_image(response: reqwest::Response) -> Result<GeneratedImage, RemoteError> {
    let response = ensure_success(response).await?;
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("image/png")
        .to_string();
    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Err(RemoteError::EmptyResponse);
    }
    Ok(GeneratedImage {
        bytes: bytes.to_vec(),
        content_type,
    })
}

fn authorized(builder: reqwest::RequestBuilder, api_key: Option<&str>) -> reqwest::RequestBuilder {
    match api_key {
        Some(key) => builder.bearer_auth(key),
        None => builder,
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Client for `POST {base}/generate` (multipart: prompt, model, settings,
/// one `reference` file part per reference image).
pub struct HttpImageGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpImageGenerator {
    pub fn new(client: reqwest::Client, config: &ServiceConfig) -> Self {
        Self {
            client,
            base_url: config.generation_url.trim_end_matches('/').to_string(),
            model: config.generation_model.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl ImageGenerator for HttpImageGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<GeneratedImage>, RemoteError> {
        let mut form = Form::new()
            .text("prompt", request.prompt.clone())
            .text("model", self.model.clone())
            .text("settings", request.settings.to_string());

        for (index, reference) in request.references.iter().enumerate() {
            let part = Part::bytes(reference.bytes.clone())
                .file_name(format!("reference_{index}"))
                .mime_str(&reference.content_type)?;
            form = form.part("reference", part);
        }

        tracing::debug!(
            model = %self.model,
            references = request.references.len(),
            "Submitting generation request"
        );

        let response = authorized(
            self.client.post(format!("{}/generate", self.base_url)),
            self.api_key.as_deref(),
        )
        .multipart(form)
        .send()
        .await?;

        Ok(vec![read_image(response).await?])
    }
}

// ---------------------------------------------------------------------------
// Background removal
// ---------------------------------------------------------------------------

/// Client for `POST {base}/remove-background` (multipart: `image_file`, `crop`).
pub struct HttpBackgroundRemover {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpBackgroundRemover {
    pub fn new(client: reqwest::Client, config: &ServiceConfig) -> Self {
        Self {
            client,
            base_url: config.background_removal_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl BackgroundRemover for HttpBackgroundRemover {
    async fn remove_background(&self, bytes: Vec<u8>, crop: bool) -> Result<Vec<u8>, RemoteError> {
        let part = Part::bytes(bytes)
            .file_name("image.png")
            .mime_str("image/png")?;
        let form = Form::new()
            .part("image_file", part)
            .text("crop", crop.to_string())
            .text("format", "png");

        let response = authorized(
            self.client.post(format!("{}/remove-background", self.base_url)),
            self.api_key.as_deref(),
        )
        .multipart(form)
        .send()
        .await?;

        Ok(read_image(response).await?.bytes)
    }
}

// ---------------------------------------------------------------------------
// Resize
// ---------------------------------------------------------------------------

/// Client for a URL-fetching transform proxy:
/// `GET {base}/?url=..&w=..&h=..&fit=contain&output=webp`.
pub struct HttpImageResizer {
    client: reqwest::Client,
    base_url: String,
}

impl HttpImageResizer {
    pub fn new(client: reqwest::Client, config: &ServiceConfig) -> Self {
        Self {
            client,
            base_url: config.resize_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageResizer for HttpImageResizer {
    async fn resize_from_url(
        &self,
        source_url: &str,
        width: u32,
        height: u32,
        format: OutputFormat,
    ) -> Result<Vec<u8>, RemoteError> {
        let width = width.to_string();
        let height = height.to_string();
        let response = self
            .client
            .get(format!("{}/", self.base_url))
            .query(&[
                ("url", source_url),
                ("w", width.as_str()),
                ("h", height.as_str()),
                ("fit", "contain"),
                ("output", format.as_str()),
            ])
            .send()
            .await?;

        Ok(read_image(response).await?.bytes)
    }
}
