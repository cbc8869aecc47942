pub mod gemini;
pub mod openai;
pub mod stability;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::media::EncodedImage;

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use stability::StabilityClient;

/// One request to a multimodal text model.
#[derive(Debug, Clone, Copy)]
pub struct DescriptionRequest<'a> {
    pub system_instruction: &'a str,
    pub instruction: &'a str,
    pub temperature: f32,
    pub image: Option<&'a EncodedImage>,
    pub max_output_tokens: Option<u32>,
}

impl<'a> DescriptionRequest<'a> {
    pub fn new(system_instruction: &'a str, instruction: &'a str, temperature: f32) -> Self {
        DescriptionRequest {
            system_instruction,
            instruction,
            temperature,
            image: None,
            max_output_tokens: None,
        }
    }

    pub fn with_image(mut self, image: &'a EncodedImage) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageQuality {
    #[default]
    Standard,
    Hd,
}

impl ImageQuality {
    /// Anything other than `hd` (case-insensitive) is standard.
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag.map(|value| value.trim().to_lowercase()) {
            Some(value) if value == "hd" => ImageQuality::Hd,
            _ => ImageQuality::Standard,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageQuality::Standard => "standard",
            ImageQuality::Hd => "hd",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub base64: String,
    pub mime_type: String,
}

#[async_trait]
pub trait DescriptionModel: Send + Sync {
    /// Returns the model's text. Empty output is an error.
    async fn describe(&self, request: DescriptionRequest<'_>) -> Result<String>;

    fn name(&self) -> &str;
}

#[async_trait]
pub trait ImageModel: Send + Sync {
    async fn generate(&self, prompt: &str, quality: ImageQuality) -> Result<GeneratedImage>;

    fn name(&self) -> &str;
}

pub(crate) fn require_text(provider: &str, model: &str, text: String) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("{provider} model {model} returned no text"));
    }
    Ok(trimmed.to_string())
}
