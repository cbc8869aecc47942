use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::handlers::error::ApiError;
use crate::llm::ImageQuality;
use crate::media::decode_image_payload;
use crate::pipeline::{GenerationRequest, GenerationResult};
use crate::prompts::DEFAULT_THEME;
use crate::state::AppState;
use crate::utils::timing::RequestTimer;

#[derive(Debug, Deserialize)]
pub struct GeneratePromptBody {
    pub image: Option<String>,
    pub theme: Option<String>,
    pub prompt: Option<String>,
    /// `hd` or `standard`.
    pub complexity: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImageBody {
    pub image: Option<String>,
}

fn require_image(image: Option<&str>) -> Result<&str, ApiError> {
    image
        .filter(|value| !value.trim().is_empty())
        .ok_or(ApiError::MissingImage)
}

pub async fn get_image(
    payload: Result<Json<ImageBody>, JsonRejection>,
) -> Result<String, ApiError> {
    let Json(body) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let image = require_image(body.image.as_deref())?;
    info!("Received image payload ({} chars)", image.len());
    Ok(image.to_string())
}

async fn run_generation(state: &AppState, body: GeneratePromptBody) -> Result<GenerationResult, ApiError> {
    let payload = require_image(body.image.as_deref())?;
    let image = decode_image_payload(payload)?;

    let request = GenerationRequest {
        image,
        theme_name: body.theme,
        user_addition: body.prompt.unwrap_or_default(),
        quality: ImageQuality::from_flag(body.complexity.as_deref()),
    };
    Ok(state.pipeline.run(&request).await?)
}

pub async fn generate_prompt(
    State(state): State<AppState>,
    payload: Result<Json<GeneratePromptBody>, JsonRejection>,
) -> Result<Json<GenerationResult>, ApiError> {
    let Json(body) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let mut timer = RequestTimer::start(
        "/generate-prompt",
        body.theme.as_deref().unwrap_or(DEFAULT_THEME),
        state.pipeline.mode().as_str(),
    );

    let result = run_generation(&state, body).await;
    match &result {
        Ok(generated) => {
            info!(
                "Generated \"{}\" in {:.3}s ({} image chars)",
                generated.title,
                generated.latency,
                generated.image.len()
            );
            timer.complete("success", None);
        }
        Err(err) => timer.complete("error", Some(&err.to_string())),
    }
    result.map(Json)
}
