use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::handlers::error::ApiError;
use crate::state::AppState;

pub async fn home() -> Json<Value> {
    Json(json!({
        "message": "Welcome to Sketchify.ai API",
        "endpoints": [
            { "path": "/generate-prompt", "method": "POST", "description": "Generate an image from a sketch" },
            { "path": "/get-image", "method": "POST", "description": "Process an uploaded image" },
            { "path": "/GetTheme", "method": "POST", "description": "Resolve a theme name" },
            { "path": "/themes", "method": "GET", "description": "List available themes" },
            { "path": "/test", "method": "GET", "description": "Connectivity check" }
        ]
    }))
}

pub async fn connection_test(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "connected",
        "api_key": state.api_key_configured,
        "pipeline": state.pipeline.mode().as_str(),
    }))
}

pub async fn list_themes(State(state): State<AppState>) -> Json<Value> {
    let themes: Vec<Value> = state
        .pipeline
        .catalog()
        .iter()
        .map(|theme| json!({ "name": theme.name, "temperature": theme.sampling_temperature }))
        .collect();
    Json(json!({ "themes": themes }))
}

#[derive(Debug, Deserialize)]
pub struct ThemeBody {
    pub theme: Option<String>,
}

pub async fn get_theme(
    State(state): State<AppState>,
    payload: Result<Json<ThemeBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let theme = state.pipeline.catalog().resolve(body.theme.as_deref());
    info!(
        "Theme lookup: requested={:?}, known={}, resolved={}, temperature={}",
        body.theme,
        body.theme
            .as_deref()
            .map(|name| state.pipeline.catalog().contains(name))
            .unwrap_or(false),
        theme.name,
        theme.sampling_temperature
    );
    Ok(Json(json!({ "theme": theme.name })))
}
