use std::env;
use std::fmt;

use once_cell::sync::Lazy;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineMode {
    /// One structured description call, then one image call.
    SingleCall,
    /// Image straight from a template prompt, then caption and title calls.
    OnePass,
    /// Themed description call, title call, then image from the description.
    TwoCall,
}

impl PipelineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineMode::SingleCall => "single-call",
            PipelineMode::OnePass => "one-pass",
            PipelineMode::TwoCall => "two-call",
        }
    }
}

impl fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionProvider {
    Gemini,
    OpenAi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageProvider {
    Imagen,
    Stability,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_dir: String,
    pub host: String,
    pub port: u16,
    pub pipeline_mode: PipelineMode,
    pub description_provider: DescriptionProvider,
    pub image_provider: ImageProvider,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_openai_base_url: String,
    pub gemini_safety_settings: String,
    pub imagen_model: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub stability_api_key: String,
    pub stability_endpoint: String,
    pub stability_style_preset: String,
    pub stability_output_format: String,
    pub model_timeout_seconds: u64,
}

pub static CONFIG: Lazy<Config> = Lazy::new(Config::load);

fn env_string(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u16>().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

pub fn parse_pipeline_mode(value: &str) -> PipelineMode {
    match value.trim().to_lowercase().replace('_', "-").as_str() {
        "" | "single-call" | "single" | "all-in-one" => PipelineMode::SingleCall,
        "one-pass" | "onepass" => PipelineMode::OnePass,
        "two-call" | "two-pass" | "describe" => PipelineMode::TwoCall,
        _ => {
            warn!(
                "Unknown PIPELINE_MODE value '{}'; defaulting to single-call.",
                value
            );
            PipelineMode::SingleCall
        }
    }
}

pub fn parse_description_provider(value: &str) -> DescriptionProvider {
    match value.trim().to_lowercase().as_str() {
        "" | "gemini" => DescriptionProvider::Gemini,
        "openai" | "gpt" => DescriptionProvider::OpenAi,
        _ => {
            warn!(
                "Unknown DESCRIPTION_PROVIDER value '{}'; defaulting to gemini.",
                value
            );
            DescriptionProvider::Gemini
        }
    }
}

pub fn parse_image_provider(value: &str) -> ImageProvider {
    match value.trim().to_lowercase().as_str() {
        "" | "imagen" | "gemini" => ImageProvider::Imagen,
        "stability" | "stable-diffusion" => ImageProvider::Stability,
        _ => {
            warn!(
                "Unknown IMAGE_PROVIDER value '{}'; defaulting to imagen.",
                value
            );
            ImageProvider::Imagen
        }
    }
}

fn normalize_gemini_safety_settings(value: String) -> String {
    let lowered = value.trim().to_lowercase();
    match lowered.as_str() {
        "" | "permissive" | "off" | "none" => "permissive".to_string(),
        "standard" => "standard".to_string(),
        _ => {
            warn!(
                "Unknown GEMINI_SAFETY_SETTINGS value '{}'; defaulting to permissive.",
                value
            );
            "permissive".to_string()
        }
    }
}

impl Config {
    pub fn load() -> Self {
        Config {
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            log_dir: env_string("LOG_DIR", "logs"),
            host: env_string("HOST", "0.0.0.0"),
            port: env_u16("PORT", 8080),
            pipeline_mode: parse_pipeline_mode(&env_string("PIPELINE_MODE", "single-call")),
            description_provider: parse_description_provider(&env_string(
                "DESCRIPTION_PROVIDER",
                "gemini",
            )),
            image_provider: parse_image_provider(&env_string("IMAGE_PROVIDER", "imagen")),
            gemini_api_key: env_string("GEMINI_API_KEY", ""),
            gemini_model: env_string("GEMINI_MODEL", "gemini-2.0-flash"),
            gemini_openai_base_url: env_string(
                "GEMINI_OPENAI_BASE_URL",
                "https://generativelanguage.googleapis.com/v1beta/openai",
            ),
            gemini_safety_settings: normalize_gemini_safety_settings(env_string(
                "GEMINI_SAFETY_SETTINGS",
                "permissive",
            )),
            imagen_model: env_string("IMAGEN_MODEL", "imagen-3.0-generate-002"),
            openai_api_key: env_string("OPENAI_API_KEY", ""),
            openai_base_url: env_string("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            openai_model: env_string("OPENAI_MODEL", "gpt-4o-mini"),
            stability_api_key: env_string("STABILITY_API_KEY", ""),
            stability_endpoint: env_string(
                "STABILITY_ENDPOINT",
                "https://api.stability.ai/v2beta/stable-image/generate/ultra",
            ),
            stability_style_preset: env_string("STABILITY_STYLE_PRESET", "photographic"),
            stability_output_format: env_string("STABILITY_OUTPUT_FORMAT", "jpeg"),
            model_timeout_seconds: env_u64("MODEL_TIMEOUT_SECONDS", 90).max(1),
        }
    }

    /// Names of the API keys the selected providers need but are not set.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let needs_gemini = self.description_provider == DescriptionProvider::Gemini
            || self.image_provider == ImageProvider::Imagen;
        if needs_gemini && self.gemini_api_key.is_empty() {
            missing.push("GEMINI_API_KEY");
        }
        if self.description_provider == DescriptionProvider::OpenAi
            && self.openai_api_key.is_empty()
        {
            missing.push("OPENAI_API_KEY");
        }
        if self.image_provider == ImageProvider::Stability && self.stability_api_key.is_empty() {
            missing.push("STABILITY_API_KEY");
        }
        missing
    }
}
