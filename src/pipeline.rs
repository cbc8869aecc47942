use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::PipelineMode;
use crate::llm::{DescriptionModel, DescriptionRequest, GeneratedImage, ImageModel, ImageQuality};
use crate::media::EncodedImage;
use crate::prompts::composer::{
    creative_description_prompt, structured_analysis_prompt, title_prompt,
    CREATIVE_DESCRIPTION_SYSTEM_PROMPT, STRICT_TITLE_SYSTEM_PROMPT,
    STRUCTURED_ANALYSIS_SYSTEM_PROMPT, TITLE_SYSTEM_PROMPT,
};
use crate::prompts::{
    compose, refine_title, transformation_prompt, StructuredResponseParser, ThemeCatalog,
    ThemeConfig, TitleOutcome,
};
use crate::utils::timing::round_latency;

const PROMPT_PREVIEW_CHARS: usize = 100;
const CREATIVE_DESCRIPTION_TEMPERATURE: f32 = 0.7;
const STRICT_TITLE_TEMPERATURE: f32 = 0.7;
const STRICT_TITLE_MAX_TOKENS: u32 = 15;

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub image: EncodedImage,
    pub theme_name: Option<String>,
    pub user_addition: String,
    pub quality: ImageQuality,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResult {
    pub image: String,
    pub title: String,
    pub description: String,
    pub prompt: String,
    pub latency: f64,
}

/// Text shown to the caller as the prompt: the description cut to 100 chars.
pub fn prompt_preview(description: &str) -> String {
    if description.chars().count() <= PROMPT_PREVIEW_CHARS {
        return description.to_string();
    }
    let truncated: String = description.chars().take(PROMPT_PREVIEW_CHARS).collect();
    format!("{truncated}...")
}

/// Everything a request needs, shared across requests.
#[derive(Clone)]
pub struct Pipeline {
    catalog: Arc<ThemeCatalog>,
    description_model: Arc<dyn DescriptionModel>,
    image_model: Arc<dyn ImageModel>,
    mode: PipelineMode,
}

struct Draft {
    image: GeneratedImage,
    title: TitleOutcome,
    description: String,
}

impl Pipeline {
    pub fn new(
        catalog: Arc<ThemeCatalog>,
        description_model: Arc<dyn DescriptionModel>,
        image_model: Arc<dyn ImageModel>,
        mode: PipelineMode,
    ) -> Self {
        Pipeline {
            catalog,
            description_model,
            image_model,
            mode,
        }
    }

    pub fn mode(&self) -> PipelineMode {
        self.mode
    }

    pub fn catalog(&self) -> &ThemeCatalog {
        &self.catalog
    }

    /// Errors only when a model call the result depends on fails.
    pub async fn run(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        let started = Instant::now();
        let theme = self.catalog.resolve(request.theme_name.as_deref());
        let addition = request.user_addition.trim();
        info!(
            "Running {} pipeline: theme={} (requested {:?}), quality={}, addition_chars={}, sketch={}x{} ({} PNG bytes)",
            self.mode,
            theme.name,
            request.theme_name,
            request.quality.as_str(),
            addition.chars().count(),
            request.image.width,
            request.image.height,
            request.image.png_bytes.len()
        );

        let draft = match self.mode {
            PipelineMode::SingleCall => self.single_call(theme, addition, request).await?,
            PipelineMode::OnePass => self.one_pass(theme, addition, request).await?,
            PipelineMode::TwoCall => self.two_call(theme, addition, request).await?,
        };

        info!(
            "Pipeline finished: theme={}, title={:?} ({}), image_mime={}",
            theme.name,
            draft.title.title(),
            draft.title.stage(),
            draft.image.mime_type
        );

        Ok(GenerationResult {
            image: draft.image.base64,
            title: draft.title.into_title(),
            prompt: prompt_preview(&draft.description),
            description: draft.description,
            latency: round_latency(started.elapsed().as_secs_f64()),
        })
    }

    async fn single_call(
        &self,
        theme: &ThemeConfig,
        addition: &str,
        request: &GenerationRequest,
    ) -> Result<Draft> {
        let instruction = structured_analysis_prompt(theme, addition);
        let raw = self
            .description_model
            .describe(
                DescriptionRequest::new(
                    STRUCTURED_ANALYSIS_SYSTEM_PROMPT,
                    &instruction,
                    theme.sampling_temperature,
                )
                .with_image(&request.image),
            )
            .await
            .context("Sketch analysis failed")?;

        let parsed = StructuredResponseParser::for_theme(theme, addition).parse(&raw);
        let title = self
            .refine(&parsed.title, &theme.name, &parsed.description)
            .await;

        let image = self
            .image_model
            .generate(&parsed.transformation_instruction, request.quality)
            .await
            .context("Image generation failed")?;

        Ok(Draft {
            image,
            title,
            description: parsed.description,
        })
    }

    async fn one_pass(
        &self,
        theme: &ThemeConfig,
        addition: &str,
        request: &GenerationRequest,
    ) -> Result<Draft> {
        let prompt = transformation_prompt(theme, addition);
        let image = self
            .image_model
            .generate(&prompt, request.quality)
            .await
            .context("Image generation failed")?;

        let caption_instruction = creative_description_prompt(&prompt, &theme.name);
        let description = match self
            .description_model
            .describe(DescriptionRequest::new(
                CREATIVE_DESCRIPTION_SYSTEM_PROMPT,
                &caption_instruction,
                CREATIVE_DESCRIPTION_TEMPERATURE,
            ))
            .await
        {
            Ok(description) => description,
            Err(err) => {
                warn!("Creative description failed, using fallback: {}", err);
                format!(
                    "A creative {} style artwork based on your original sketch.",
                    theme.name.to_lowercase()
                )
            }
        };

        let candidate = self.initial_title(&description, &theme.name, 0.6, 10).await;
        let title = self.refine(&candidate, &theme.name, &description).await;

        Ok(Draft {
            image,
            title,
            description,
        })
    }

    async fn two_call(
        &self,
        theme: &ThemeConfig,
        addition: &str,
        request: &GenerationRequest,
    ) -> Result<Draft> {
        let composite = compose(theme, addition);
        let description = self
            .description_model
            .describe(
                DescriptionRequest::new(
                    &theme.system_instruction,
                    &composite.final_instruction,
                    composite.expected_temperature,
                )
                .with_image(&request.image),
            )
            .await
            .context("Sketch description failed")?;

        let candidate = self.initial_title(&description, &theme.name, 0.4, 15).await;
        let title = self.refine(&candidate, &theme.name, &description).await;

        let image = self
            .image_model
            .generate(&description, request.quality)
            .await
            .context("Image generation failed")?;

        Ok(Draft {
            image,
            title,
            description,
        })
    }

    /// A failed title call yields an empty candidate so the refiner retries.
    async fn initial_title(
        &self,
        description: &str,
        theme_name: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> String {
        let instruction = title_prompt(description, theme_name);
        self.description_model
            .describe(
                DescriptionRequest::new(TITLE_SYSTEM_PROMPT, &instruction, temperature)
                    .with_max_output_tokens(max_tokens),
            )
            .await
            .unwrap_or_else(|err| {
                warn!("Title generation failed: {}", err);
                String::new()
            })
    }

    async fn refine(&self, candidate: &str, theme_name: &str, description: &str) -> TitleOutcome {
        let model = self.description_model.as_ref();
        refine_title(candidate, theme_name, description, |strict_prompt| async move {
            model
                .describe(
                    DescriptionRequest::new(
                        STRICT_TITLE_SYSTEM_PROMPT,
                        &strict_prompt,
                        STRICT_TITLE_TEMPERATURE,
                    )
                    .with_max_output_tokens(STRICT_TITLE_MAX_TOKENS),
                )
                .await
        })
        .await
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::prompts::parser::default_description;

    const STRUCTURED_REPLY: &str = "SKETCH_CONTENT: A boat on water.\n\n\
        TRANSFORMATION_PROMPT: A sailboat at golden hour, photorealistic.\n\n\
        TITLE: Harbor at First Light\n\n\
        DESCRIPTION: A lone sailboat drifts across a calm harbor as dawn breaks.";

    fn pipeline(
        mode: PipelineMode,
        description: Arc<ScriptedDescriptionModel>,
        image: Arc<RecordingImageModel>,
    ) -> Pipeline {
        Pipeline::new(Arc::new(ThemeCatalog::builtin()), description, image, mode)
    }

    fn request(theme: Option<&str>, addition: &str, quality: ImageQuality) -> GenerationRequest {
        GenerationRequest {
            image: sketch(),
            theme_name: theme.map(str::to_string),
            user_addition: addition.to_string(),
            quality,
        }
    }

    #[test]
    fn preview_truncates_long_descriptions() {
        assert_eq!(prompt_preview("short"), "short");
        let long = "é".repeat(120);
        let preview = prompt_preview(&long);
        assert_eq!(preview.chars().count(), 103);
        assert!(preview.ends_with("..."));
        assert_eq!(prompt_preview(&"a".repeat(100)), "a".repeat(100));
    }

    #[tokio::test]
    async fn single_call_uses_parsed_sections() {
        let description = Arc::new(ScriptedDescriptionModel::new([Ok(STRUCTURED_REPLY)]));
        let image = Arc::new(RecordingImageModel::succeeding());
        let pipeline = pipeline(PipelineMode::SingleCall, description.clone(), image.clone());

        let result = pipeline
            .run(&request(Some("realism"), "add seagulls", ImageQuality::Hd))
            .await
            .unwrap();

        assert_eq!(result.title, "Harbor at First Light");
        assert_eq!(
            result.description,
            "A lone sailboat drifts across a calm harbor as dawn breaks."
        );
        assert_eq!(result.prompt, result.description);
        assert_eq!(result.image, "R0VORVJBVEVE");
        assert!(result.latency >= 0.0);

        let calls = description.recorded();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].had_image);
        assert_eq!(calls[0].temperature, 0.4);
        assert!(calls[0].instruction.contains("IMPORTANT USER REQUEST: add seagulls"));
        assert_eq!(
            image.recorded(),
            vec![(
                "A sailboat at golden hour, photorealistic.".to_string(),
                ImageQuality::Hd
            )]
        );
    }

    #[tokio::test]
    async fn single_call_with_garbled_reply_uses_defaults_and_retries_title() {
        let description = Arc::new(ScriptedDescriptionModel::new([
            Ok("I cannot follow that format."),
            Ok("Quiet Harbor Morning"),
        ]));
        let image = Arc::new(RecordingImageModel::succeeding());
        let pipeline = pipeline(PipelineMode::SingleCall, description.clone(), image.clone());

        let result = pipeline
            .run(&request(Some("Nature"), "", ImageQuality::Standard))
            .await
            .unwrap();

        assert_eq!(result.title, "Quiet Harbor Morning");
        assert_eq!(result.description, default_description("Nature"));
        let calls = description.recorded();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].system_instruction, STRICT_TITLE_SYSTEM_PROMPT);
        assert!(!calls[1].had_image);
        assert_eq!(calls[1].temperature, 0.7);
        assert_eq!(calls[1].max_output_tokens, Some(15));

        let theme = ThemeCatalog::builtin().resolve(Some("Nature")).clone();
        assert_eq!(image.recorded()[0].0, transformation_prompt(&theme, ""));
    }

    #[tokio::test]
    async fn description_failure_is_an_error() {
        let description = Arc::new(ScriptedDescriptionModel::new([Err("quota exceeded")]));
        let image = Arc::new(RecordingImageModel::succeeding());
        let pipeline = pipeline(PipelineMode::SingleCall, description, image.clone());

        let err = pipeline
            .run(&request(None, "", ImageQuality::Standard))
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("quota exceeded"));
        assert!(image.recorded().is_empty());
    }

    #[tokio::test]
    async fn image_failure_is_an_error() {
        let description = Arc::new(ScriptedDescriptionModel::new([Ok(STRUCTURED_REPLY)]));
        let image = Arc::new(RecordingImageModel::failing());
        let pipeline = pipeline(PipelineMode::SingleCall, description, image);

        let err = pipeline
            .run(&request(None, "", ImageQuality::Standard))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Image generation failed"));
    }

    #[tokio::test]
    async fn one_pass_generates_image_from_template_then_captions() {
        let description = Arc::new(ScriptedDescriptionModel::new([
            Ok("Petals swirl around two friends beneath a glowing sakura tree."),
            Ok("Sakura Promise at Twilight"),
        ]));
        let image = Arc::new(RecordingImageModel::succeeding());
        let pipeline = pipeline(PipelineMode::OnePass, description.clone(), image.clone());

        let result = pipeline
            .run(&request(Some("Anime"), "cherry blossoms", ImageQuality::Standard))
            .await
            .unwrap();

        let theme = ThemeCatalog::builtin().resolve(Some("Anime")).clone();
        assert_eq!(
            image.recorded()[0].0,
            transformation_prompt(&theme, "cherry blossoms")
        );
        assert_eq!(result.title, "Sakura Promise at Twilight");

        let calls = description.recorded();
        assert_eq!(calls[0].temperature, 0.7);
        assert!(!calls[0].had_image);
        assert_eq!(calls[1].temperature, 0.6);
        assert_eq!(calls[1].max_output_tokens, Some(10));
    }

    #[tokio::test]
    async fn one_pass_survives_caption_and_title_failures() {
        let description = Arc::new(ScriptedDescriptionModel::new([
            Err("caption down"),
            Err("title down"),
            Err("retry down"),
        ]));
        let image = Arc::new(RecordingImageModel::succeeding());
        let pipeline = pipeline(PipelineMode::OnePass, description, image);

        let result = pipeline
            .run(&request(Some("Cartoon"), "", ImageQuality::Standard))
            .await
            .unwrap();

        assert_eq!(
            result.description,
            "A creative cartoon style artwork based on your original sketch."
        );
        assert_eq!(result.title, "A creative cartoon");
    }

    #[tokio::test]
    async fn two_call_describes_with_theme_then_draws_description() {
        let description = Arc::new(ScriptedDescriptionModel::new([
            Ok("A single line curves across an empty white plane."),
            Ok("Minimalism Sketch"),
            Ok("Lone Curve on White"),
        ]));
        let image = Arc::new(RecordingImageModel::succeeding());
        let pipeline = pipeline(PipelineMode::TwoCall, description.clone(), image.clone());

        let result = pipeline
            .run(&request(Some("minimalism"), "use blue", ImageQuality::Standard))
            .await
            .unwrap();

        let theme = ThemeCatalog::builtin().resolve(Some("Minimalism")).clone();
        let calls = description.recorded();
        assert_eq!(calls[0].system_instruction, theme.system_instruction);
        assert_eq!(calls[0].instruction, compose(&theme, "use blue").final_instruction);
        assert_eq!(calls[0].temperature, 0.5);
        assert!(calls[0].had_image);
        assert_eq!(calls[1].temperature, 0.4);
        assert_eq!(calls[1].max_output_tokens, Some(15));

        assert_eq!(result.title, "Lone Curve on White");
        assert_eq!(
            image.recorded()[0].0,
            "A single line curves across an empty white plane."
        );
    }
}
