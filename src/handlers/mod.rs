pub mod error;
pub mod generate;
pub mod info;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Canvas exports arrive as base64 JSON and easily exceed axum's 2 MB default.
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(info::home))
        .route(
            "/test",
            get(info::connection_test).post(info::connection_test),
        )
        .route("/themes", get(info::list_themes))
        .route("/GetTheme", post(info::get_theme))
        .route("/get-image", post(generate::get_image))
        .route("/generate-prompt", post(generate::generate_prompt))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use base64::{engine::general_purpose, Engine as _};
    use image::{DynamicImage, ImageFormat, RgbImage};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::PipelineMode;
    use crate::pipeline::testing::{RecordingImageModel, ScriptedDescriptionModel};
    use crate::pipeline::Pipeline;
    use crate::prompts::ThemeCatalog;

    const STRUCTURED_REPLY: &str = "SKETCH_CONTENT: A cat.\n\
        TRANSFORMATION_PROMPT: A sleepy tabby cat curled on a windowsill.\n\
        TITLE: Windowsill Afternoon Nap\n\
        DESCRIPTION: A tabby dozes in a pool of warm afternoon light.";

    fn app_with(
        description: Arc<ScriptedDescriptionModel>,
        image: Arc<RecordingImageModel>,
    ) -> Router {
        let pipeline = Pipeline::new(
            Arc::new(ThemeCatalog::builtin()),
            description,
            image,
            PipelineMode::SingleCall,
        );
        build_router(AppState::new(pipeline, false))
    }

    fn app() -> Router {
        app_with(
            Arc::new(ScriptedDescriptionModel::new([Ok(STRUCTURED_REPLY)])),
            Arc::new(RecordingImageModel::succeeding()),
        )
    }

    fn sketch_data_url() -> String {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(6, 6))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(bytes)
        )
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    }

    async fn read_json(res: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn home_lists_endpoints() {
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = read_json(res).await;
        assert_eq!(json["message"], "Welcome to Sketchify.ai API");
        assert!(json["endpoints"].as_array().unwrap().len() >= 2);
    }

    #[tokio::test]
    async fn connection_test_reports_pipeline() {
        let res = app().oneshot(post_json("/test", json!({}))).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = read_json(res).await;
        assert_eq!(json["status"], "connected");
        assert_eq!(json["api_key"], false);
        assert_eq!(json["pipeline"], "single-call");
    }

    #[tokio::test]
    async fn themes_are_listed_and_resolved() {
        let req = Request::builder().uri("/themes").body(Body::empty()).unwrap();
        let json = read_json(app().oneshot(req).await.unwrap()).await;
        assert_eq!(json["themes"].as_array().unwrap().len(), 7);
        assert_eq!(json["themes"][0]["name"], "Default");

        let res = app()
            .oneshot(post_json("/GetTheme", json!({ "theme": "anime" })))
            .await
            .unwrap();
        assert_eq!(read_json(res).await["theme"], "Anime");

        let res = app()
            .oneshot(post_json("/GetTheme", json!({ "theme": "Vaporwave" })))
            .await
            .unwrap();
        assert_eq!(read_json(res).await["theme"], "Default");
    }

    #[tokio::test]
    async fn get_image_echoes_payload() {
        let res = app()
            .oneshot(post_json("/get-image", json!({ "image": "abc123" })))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"abc123");

        let res = app()
            .oneshot(post_json("/get-image", json!({})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_image_is_rejected() {
        let res = app()
            .oneshot(post_json("/generate-prompt", json!({ "theme": "Nature" })))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(res).await["error"], "No image provided");
    }

    #[tokio::test]
    async fn undecodable_image_is_rejected_before_any_model_call() {
        let description = Arc::new(ScriptedDescriptionModel::new([Ok(STRUCTURED_REPLY)]));
        let image = Arc::new(RecordingImageModel::succeeding());
        let app = app_with(description.clone(), image.clone());

        let res = app
            .oneshot(post_json(
                "/generate-prompt",
                json!({ "image": "data:image/png;base64,bm90IGFuIGltYWdl" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let json = read_json(res).await;
        assert!(json["error"]
            .as_str()
            .unwrap()
            .starts_with("Image processing error"));
        assert!(description.recorded().is_empty());
        assert!(image.recorded().is_empty());
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let req = Request::builder()
            .method("POST")
            .uri("/generate-prompt")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(read_json(res).await["error"].is_string());
    }

    #[tokio::test]
    async fn generate_prompt_returns_all_fields() {
        let res = app()
            .oneshot(post_json(
                "/generate-prompt",
                json!({
                    "image": sketch_data_url(),
                    "theme": "Realism",
                    "prompt": "",
                    "complexity": "hd"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let json = read_json(res).await;
        assert_eq!(json["image"], "R0VORVJBVEVE");
        assert_eq!(json["title"], "Windowsill Afternoon Nap");
        assert_eq!(
            json["description"],
            "A tabby dozes in a pool of warm afternoon light."
        );
        assert_eq!(json["prompt"], json["description"]);
        assert!(json["latency"].as_f64().unwrap() >= 0.0);
    }

    #[tokio::test]
    async fn model_failure_is_a_bad_gateway() {
        let app = app_with(
            Arc::new(ScriptedDescriptionModel::new([Err("upstream timeout")])),
            Arc::new(RecordingImageModel::succeeding()),
        );
        let res = app
            .oneshot(post_json(
                "/generate-prompt",
                json!({ "image": sketch_data_url() }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
        let error = read_json(res).await["error"].as_str().unwrap().to_string();
        assert!(error.contains("upstream timeout"));
    }
}
