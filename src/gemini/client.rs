use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{GeminiConfig, ModelIds};
use crate::encoder::EncodedImage;
use crate::error::{BoothError, ConfigError, Result};

use super::normalize::{first_image_of, text_of, GeneratedImage};
use super::request::{describe_request, transform_request};
use super::types::{ErrorEnvelope, GenerateContentRequest, GenerateContentResponse};

const LOG_BODY_LIMIT: usize = 500;

/// One request in, one response out. Anything that goes wrong on the way is a
/// [`BoothError::Service`].
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse>;
}

/// `generateContent` over HTTPS.
pub struct GeminiHttp {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl GeminiHttp {
    /// Fails when no credential is configured. There is no later check.
    pub fn new(config: &GeminiConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?
            .to_string();

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        let model = model.trim();
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{}:generateContent", self.api_base, model)
    }
}

#[async_trait]
impl ContentGenerator for GeminiHttp {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = self.endpoint(model);
        tracing::info!(model, "sending request to Gemini");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(%status, body = %truncate(&body, LOG_BODY_LIMIT), "Gemini response");

        if !status.is_success() {
            let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
                _ => truncate(&body, LOG_BODY_LIMIT).to_string(),
            };
            tracing::warn!(%status, %message, "Gemini rejected the request");
            return Err(BoothError::Service(format!(
                "Gemini API error {}: {}",
                status.as_u16(),
                message
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| BoothError::Service(format!("Unreadable response from Gemini: {e}")))
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Describe and edit, each bound to its own model.
#[derive(Clone)]
pub struct ImageService {
    generator: Arc<dyn ContentGenerator>,
    models: ModelIds,
}

impl ImageService {
    pub fn new(generator: Arc<dyn ContentGenerator>, models: ModelIds) -> Self {
        Self { generator, models }
    }

    pub fn models(&self) -> &ModelIds {
        &self.models
    }

    pub async fn describe(&self, image: &EncodedImage) -> Result<String> {
        let request = describe_request(image);
        let response = self
            .generator
            .generate_content(&self.models.describe, &request)
            .await?;
        let text = text_of(&response)?;
        tracing::info!(chars = text.len(), "analysis received");
        Ok(text)
    }

    pub async fn transform(&self, image: &EncodedImage, prompt: &str) -> Result<GeneratedImage> {
        let request = transform_request(image, prompt)?;
        let response = self
            .generator
            .generate_content(&self.models.edit, &request)
            .await?;
        let generated = first_image_of(&response)?;
        tracing::info!(mime_type = %generated.mime_type, "edited image received");
        Ok(generated)
    }
}
