use anyhow::{anyhow, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::CONFIG;
use crate::llm::{
    require_text, DescriptionModel, DescriptionRequest, GeneratedImage, ImageModel, ImageQuality,
};
use crate::media::detect_mime_type;
use crate::utils::http::{get_http_client, summarize_error_body};
use crate::utils::timing::log_model_timing;

/// Client for any OpenAI-compatible REST surface. Serves OpenAI itself and
/// Imagen through Gemini's compatibility endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    provider: &'static str,
    api_key: String,
    base_url: String,
    chat_model: String,
    image_model: String,
}

impl OpenAiClient {
    pub fn new(
        provider: &'static str,
        api_key: &str,
        base_url: &str,
        chat_model: &str,
        image_model: &str,
    ) -> Self {
        OpenAiClient {
            provider,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            chat_model: chat_model.to_string(),
            image_model: image_model.to_string(),
        }
    }

    pub fn openai_from_config() -> Self {
        Self::new(
            "openai",
            &CONFIG.openai_api_key,
            &CONFIG.openai_base_url,
            &CONFIG.openai_model,
            "",
        )
    }

    pub fn imagen_from_config() -> Self {
        Self::new(
            "imagen",
            &CONFIG.gemini_api_key,
            &CONFIG.gemini_openai_base_url,
            &CONFIG.gemini_model,
            &CONFIG.imagen_model,
        )
    }

    async fn post_json(&self, path: &str, payload: &Value) -> Result<Value> {
        let response = get_http_client()
            .post(format!("{}/{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|err| anyhow!("{} request failed: {}", self.provider, err))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let (message, body_summary) = summarize_error_body(&body);
            warn!(
                "{} API error on {}: status={}, body={}",
                self.provider, path, status, body_summary
            );
            let detail = message.unwrap_or(body_summary);
            return Err(anyhow!(
                "{} request failed with status {}: {}",
                self.provider,
                status,
                detail
            ));
        }

        Ok(response.json::<Value>().await?)
    }
}

fn build_user_content(request: &DescriptionRequest<'_>) -> Value {
    let Some(image) = request.image else {
        return Value::String(request.instruction.to_string());
    };

    json!([
        { "type": "text", "text": request.instruction },
        { "type": "image_url", "image_url": { "url": image.data_url() } }
    ])
}

pub fn build_chat_payload(model: &str, request: &DescriptionRequest<'_>) -> Value {
    let mut messages = Vec::new();
    if !request.system_instruction.trim().is_empty() {
        messages.push(json!({ "role": "system", "content": request.system_instruction }));
    }
    messages.push(json!({ "role": "user", "content": build_user_content(request) }));

    let mut payload = json!({
        "model": model,
        "messages": messages,
        "n": 1,
        "temperature": request.temperature,
    });
    if let Some(max_tokens) = request.max_output_tokens {
        payload["max_tokens"] = json!(max_tokens);
    }
    payload
}

pub fn build_image_payload(model: &str, prompt: &str, quality: ImageQuality) -> Value {
    json!({
        "model": model,
        "prompt": prompt,
        "response_format": "b64_json",
        "n": 1,
        "quality": quality.as_str(),
    })
}

fn extract_chat_content(response: &Value) -> String {
    response
        .pointer("/choices/0/message/content")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

fn extract_generated_image(response: &Value) -> Option<GeneratedImage> {
    let encoded = response
        .pointer("/data/0/b64_json")
        .and_then(|v| v.as_str())
        .filter(|value| !value.is_empty())?;
    let mime_type = general_purpose::STANDARD
        .decode(encoded)
        .ok()
        .and_then(|bytes| detect_mime_type(&bytes))
        .unwrap_or_else(|| "image/png".to_string());
    Some(GeneratedImage {
        base64: encoded.to_string(),
        mime_type,
    })
}

#[async_trait]
impl DescriptionModel for OpenAiClient {
    async fn describe(&self, request: DescriptionRequest<'_>) -> Result<String> {
        let payload = build_chat_payload(&self.chat_model, &request);
        debug!(
            target: "llm.openai",
            provider = self.provider,
            model = %self.chat_model,
            messages = payload["messages"].as_array().map(|m| m.len()).unwrap_or(0),
            has_image = request.image.is_some(),
            "Chat completion request"
        );
        let metadata = json!({
            "temperature": request.temperature,
            "has_image": request.image.is_some(),
            "max_output_tokens": request.max_output_tokens,
        });

        log_model_timing(self.provider, &self.chat_model, "chat_completion", Some(metadata), || async {
            let response = self.post_json("chat/completions", &payload).await?;
            require_text(self.provider, &self.chat_model, extract_chat_content(&response))
        })
        .await
    }

    fn name(&self) -> &str {
        &self.chat_model
    }
}

#[async_trait]
impl ImageModel for OpenAiClient {
    async fn generate(&self, prompt: &str, quality: ImageQuality) -> Result<GeneratedImage> {
        if self.image_model.is_empty() {
            return Err(anyhow!("{} client has no image model configured", self.provider));
        }
        let payload = build_image_payload(&self.image_model, prompt, quality);
        debug!(
            target: "llm.openai",
            provider = self.provider,
            model = %self.image_model,
            prompt_chars = prompt.chars().count(),
            quality = quality.as_str(),
            "Image generation request"
        );
        let metadata = json!({ "quality": quality.as_str() });

        log_model_timing(self.provider, &self.image_model, "image_generation", Some(metadata), || async {
            let response = self.post_json("images/generations", &payload).await?;
            extract_generated_image(&response).ok_or_else(|| {
                anyhow!("No images returned by {} (model: {})", self.provider, self.image_model)
            })
        })
        .await
    }

    fn name(&self) -> &str {
        &self.image_model
    }
}
