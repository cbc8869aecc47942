use std::sync::Arc;

use anyhow::{anyhow, Context};
use dotenvy::dotenv;
use tracing::{error, info};

mod config;
mod handlers;
mod llm;
mod media;
mod pipeline;
mod prompts;
mod state;
mod utils;

use config::{DescriptionProvider, ImageProvider, CONFIG};
use llm::{DescriptionModel, GeminiClient, ImageModel, OpenAiClient, StabilityClient};
use pipeline::Pipeline;
use prompts::ThemeCatalog;
use state::AppState;
use utils::logging::init_logging;

fn build_description_model() -> Arc<dyn DescriptionModel> {
    match CONFIG.description_provider {
        DescriptionProvider::Gemini => Arc::new(GeminiClient::from_config()),
        DescriptionProvider::OpenAi => Arc::new(OpenAiClient::openai_from_config()),
    }
}

fn build_image_model() -> Arc<dyn ImageModel> {
    match CONFIG.image_provider {
        ImageProvider::Imagen => Arc::new(OpenAiClient::imagen_from_config()),
        ImageProvider::Stability => Arc::new(StabilityClient::from_config()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let _log_guards = init_logging();

    let missing = CONFIG.missing_credentials();
    if !missing.is_empty() {
        error!("Missing required credentials: {}", missing.join(", "));
        return Err(anyhow!(
            "Missing required credentials: {}",
            missing.join(", ")
        ));
    }

    let catalog = Arc::new(ThemeCatalog::builtin());
    let description_model = build_description_model();
    let image_model = build_image_model();
    info!(
        "Starting sketchify server: pipeline={}, description_model={}, image_model={}, themes={}",
        CONFIG.pipeline_mode,
        description_model.name(),
        image_model.name(),
        catalog.len()
    );

    let pipeline = Pipeline::new(catalog, description_model, image_model, CONFIG.pipeline_mode);
    let app = handlers::build_router(AppState::new(pipeline, true));

    let addr = format!("{}:{}", CONFIG.host, CONFIG.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on {}", addr);

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            if let Err(err) = result {
                error!("Server error: {}", err);
                return Err(err.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested (Ctrl+C received)");
        }
    }

    Ok(())
}
