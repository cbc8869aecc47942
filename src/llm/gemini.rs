use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::config::CONFIG;
use crate::llm::{require_text, DescriptionModel, DescriptionRequest};
use crate::media::EncodedImage;
use crate::utils::http::{get_http_client, summarize_error_body, truncate_for_log};
use crate::utils::timing::log_model_timing;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    api_key: String,
    model: String,
    safety_profile: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str, safety_profile: &str) -> Self {
        GeminiClient {
            api_key: api_key.to_string(),
            model: model.to_string(),
            safety_profile: safety_profile.to_string(),
        }
    }

    pub fn from_config() -> Self {
        Self::new(
            &CONFIG.gemini_api_key,
            &CONFIG.gemini_model,
            &CONFIG.gemini_safety_settings,
        )
    }

    async fn call_generate_content(&self, payload: &Value) -> Result<GeminiResponse> {
        let url = format!("{}/models/{}:generateContent", GEMINI_API_BASE, self.model);

        if tracing::enabled!(tracing::Level::DEBUG) {
            let payload_summary = summarize_gemini_payload(payload);
            debug!(target: "llm.gemini", model = %self.model, payload = %payload_summary);
        }

        let response = client_post(&url, &self.api_key, payload).await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let (message, body_summary) = summarize_error_body(&body);
            warn!("Gemini API error: status={}, body={}", status, body_summary);
            let detail = message.unwrap_or(body_summary);
            return Err(anyhow!(
                "Gemini request failed with status {}: {}",
                status,
                detail
            ));
        }

        let value = response.json::<GeminiResponse>().await?;
        if tracing::enabled!(tracing::Level::DEBUG) {
            let response_summary = summarize_gemini_response(&value);
            debug!(target: "llm.gemini", model = %self.model, response = %response_summary);
        }
        Ok(value)
    }
}

async fn client_post(url: &str, api_key: &str, payload: &Value) -> Result<reqwest::Response> {
    get_http_client()
        .post(url)
        .header("x-goog-api-key", api_key)
        .json(payload)
        .send()
        .await
        .map_err(|err| {
            warn!(
                "Gemini request failed to send: {} (timeout={}, connect={})",
                err,
                err.is_timeout(),
                err.is_connect()
            );
            anyhow!("Gemini request failed: {}", err)
        })
}

pub fn build_safety_settings(profile: &str) -> Vec<Value> {
    let threshold = match profile {
        "standard" => "BLOCK_MEDIUM_AND_ABOVE",
        "permissive" => "OFF",
        _ => {
            warn!(
                "Unknown GEMINI_SAFETY_SETTINGS value '{}', using permissive defaults.",
                profile
            );
            "OFF"
        }
    };

    [
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ]
    .iter()
    .map(|category| json!({ "category": category, "threshold": threshold }))
    .collect()
}

fn build_parts(instruction: &str, image: Option<&EncodedImage>) -> Vec<Value> {
    let mut parts = vec![json!({ "text": instruction })];
    if let Some(image) = image {
        parts.push(json!({
            "inlineData": {
                "mimeType": EncodedImage::MIME_TYPE,
                "data": image.base64
            }
        }));
    }
    parts
}

pub fn build_generate_content_payload(request: &DescriptionRequest<'_>, safety_profile: &str) -> Value {
    let mut generation_config = Map::new();
    generation_config.insert("temperature".to_string(), json!(request.temperature));
    if let Some(max_tokens) = request.max_output_tokens {
        generation_config.insert("maxOutputTokens".to_string(), json!(max_tokens));
    }

    let mut payload = json!({
        "contents": [{ "role": "user", "parts": build_parts(request.instruction, request.image) }],
        "generationConfig": Value::Object(generation_config),
        "safetySettings": build_safety_settings(safety_profile),
    });
    if !request.system_instruction.trim().is_empty() {
        payload["systemInstruction"] = json!({ "parts": [{ "text": request.system_instruction }] });
    }
    payload
}

fn summarize_gemini_payload(payload: &Value) -> Value {
    let mut summary = Map::new();

    if let Some(text) = payload.pointer("/systemInstruction/parts/0/text").and_then(|v| v.as_str()) {
        summary.insert(
            "systemInstruction".to_string(),
            json!(truncate_for_log(text, 120)),
        );
    }

    if let Some(parts) = payload.pointer("/contents/0/parts").and_then(|v| v.as_array()) {
        let parts: Vec<Value> = parts
            .iter()
            .map(|part| {
                if let Some(text) = part.get("text").and_then(|value| value.as_str()) {
                    json!({ "text": truncate_for_log(text, 200) })
                } else if let Some(inline_data) = part.get("inlineData") {
                    let data_len = inline_data
                        .get("data")
                        .and_then(|value| value.as_str())
                        .map(|value| value.len())
                        .unwrap_or(0);
                    json!({ "inlineData": { "mimeType": inline_data.get("mimeType"), "dataLen": data_len } })
                } else {
                    json!({ "unknownPart": true })
                }
            })
            .collect();
        summary.insert("parts".to_string(), Value::Array(parts));
    }

    if let Some(config) = payload.get("generationConfig") {
        summary.insert("generationConfig".to_string(), config.clone());
    }

    if let Some(safety) = payload.get("safetySettings").and_then(|v| v.as_array()) {
        summary.insert("safetySettingsCount".to_string(), json!(safety.len()));
    }

    Value::Object(summary)
}

fn summarize_gemini_response(response: &GeminiResponse) -> Value {
    let candidates = response.candidates.as_deref().unwrap_or(&[]);
    let finish_reasons: Vec<&str> = candidates
        .iter()
        .filter_map(|candidate| candidate.finish_reason.as_deref())
        .collect();
    let text_preview = candidates
        .iter()
        .filter_map(|candidate| candidate.content.as_ref())
        .filter_map(|content| content.parts.as_ref())
        .flatten()
        .filter_map(|part| part.text.as_deref())
        .find(|text| !text.trim().is_empty())
        .map(|text| truncate_for_log(text, 200));

    json!({
        "candidates": candidates.len(),
        "finishReasons": finish_reasons,
        "textPreview": text_preview,
        "promptFeedback": response.prompt_feedback,
    })
}

fn extract_text_from_response(response: GeminiResponse) -> String {
    let mut text_parts = Vec::new();
    for candidate in response.candidates.unwrap_or_default() {
        let Some(parts) = candidate.content.and_then(|content| content.parts) else {
            continue;
        };
        for part in parts {
            if let Some(text) = part.text {
                if !text.trim().is_empty() {
                    text_parts.push(text);
                }
            }
        }
    }
    text_parts.join("\n")
}

#[async_trait]
impl DescriptionModel for GeminiClient {
    async fn describe(&self, request: DescriptionRequest<'_>) -> Result<String> {
        let payload = build_generate_content_payload(&request, &self.safety_profile);
        let metadata = json!({
            "temperature": request.temperature,
            "has_image": request.image.is_some(),
            "max_output_tokens": request.max_output_tokens,
        });

        log_model_timing("gemini", &self.model, "generate_content", Some(metadata), || async {
            let response = self.call_generate_content(&payload).await?;
            require_text("gemini", &self.model, extract_text_from_response(response))
        })
        .await
    }

    fn name(&self) -> &str {
        &self.model
    }
}
