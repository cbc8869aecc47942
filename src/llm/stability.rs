use anyhow::{anyhow, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::multipart::Form;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::CONFIG;
use crate::llm::{GeneratedImage, ImageModel, ImageQuality};
use crate::media::detect_mime_type;
use crate::utils::http::{get_http_client, summarize_error_body};
use crate::utils::timing::log_model_timing;

/// Stable Image Ultra over multipart form upload.
#[derive(Debug, Clone)]
pub struct StabilityClient {
    api_key: String,
    endpoint: String,
    style_preset: String,
    output_format: String,
}

impl StabilityClient {
    pub fn new(api_key: &str, endpoint: &str, style_preset: &str, output_format: &str) -> Self {
        StabilityClient {
            api_key: api_key.to_string(),
            endpoint: endpoint.to_string(),
            style_preset: style_preset.to_string(),
            output_format: output_format.to_string(),
        }
    }

    pub fn from_config() -> Self {
        Self::new(
            &CONFIG.stability_api_key,
            &CONFIG.stability_endpoint,
            &CONFIG.stability_style_preset,
            &CONFIG.stability_output_format,
        )
    }

    fn build_form(&self, prompt: &str) -> Form {
        let mut form = Form::new()
            .text("prompt", prompt.to_string())
            .text("output_format", self.output_format.clone());
        if !self.style_preset.is_empty() {
            form = form.text("style_preset", self.style_preset.clone());
        }
        form
    }

    fn fallback_mime_type(&self) -> String {
        match self.output_format.as_str() {
            "jpg" | "jpeg" => "image/jpeg".to_string(),
            other => format!("image/{other}"),
        }
    }

    async fn request_image(&self, prompt: &str) -> Result<Vec<u8>> {
        let response = get_http_client()
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("accept", "image/*")
            .multipart(self.build_form(prompt))
            .send()
            .await
            .map_err(|err| anyhow!("Stability request failed: {}", err))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let (message, body_summary) = summarize_error_body(&body);
            warn!("Stability API error: status={}, body={}", status, body_summary);
            let detail = message.unwrap_or(body_summary);
            return Err(anyhow!(
                "Stability request failed with status {}: {}",
                status,
                detail
            ));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(anyhow!("Stability returned an empty image"));
        }
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ImageModel for StabilityClient {
    async fn generate(&self, prompt: &str, quality: ImageQuality) -> Result<GeneratedImage> {
        if quality == ImageQuality::Hd {
            debug!(target: "llm.stability", "Ignoring hd quality flag; Stability has no quality tiers");
        }
        debug!(
            target: "llm.stability",
            prompt_chars = prompt.chars().count(),
            style_preset = %self.style_preset,
            output_format = %self.output_format,
            "Image generation request"
        );
        let metadata = json!({
            "style_preset": self.style_preset,
            "output_format": self.output_format,
        });

        log_model_timing("stability", "stable-image-ultra", "image_generation", Some(metadata), || async {
            let bytes = self.request_image(prompt).await?;
            Ok(GeneratedImage {
                mime_type: detect_mime_type(&bytes).unwrap_or_else(|| self.fallback_mime_type()),
                base64: general_purpose::STANDARD.encode(&bytes),
            })
        })
        .await
    }

    fn name(&self) -> &str {
        "stable-image-ultra"
    }
}
