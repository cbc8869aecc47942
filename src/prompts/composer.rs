use crate::prompts::parser::SectionLabel;
use crate::prompts::themes::ThemeConfig;

/// Separator placed between a theme's instruction and the caller's addendum.
pub const ADDITIONAL_REQUIREMENTS_MARKER: &str = "\nAdditional requirements: ";

pub const STRUCTURED_ANALYSIS_SYSTEM_PROMPT: &str = "You analyze sketches and provide detailed information for style transformation, titles, and descriptions.";
pub const CREATIVE_DESCRIPTION_SYSTEM_PROMPT: &str =
    "You write engaging, concise descriptions of artwork for users to read.";
pub const TITLE_SYSTEM_PROMPT: &str = "You are a precise image captioning system that creates specific, descriptive titles focusing on the exact content of images.";
pub const STRICT_TITLE_SYSTEM_PROMPT: &str =
    "You create specific, creative titles focusing on exact content.";

#[derive(Debug, Clone, PartialEq)]
pub struct CompositePrompt {
    pub final_instruction: String,
    pub expected_temperature: f32,
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

pub fn compose(theme: &ThemeConfig, user_addition: &str) -> CompositePrompt {
    let final_instruction = match non_blank(user_addition) {
        Some(addition) => format!(
            "{}{}{}",
            theme.user_instruction, ADDITIONAL_REQUIREMENTS_MARKER, addition
        ),
        None => theme.user_instruction.clone(),
    };

    CompositePrompt {
        final_instruction,
        expected_temperature: theme.sampling_temperature,
    }
}

/// First two sentences of the theme persona, reworded from "describe" to "transform".
fn style_guidance(system_instruction: &str) -> Option<String> {
    let cleaned = system_instruction
        .replace("these are instructions for a diffusion model.", "")
        .replace("Describe the sketch", "Transform the sketch")
        .replace("in 1-2 sentences", "");
    if !cleaned.contains('.') {
        return None;
    }

    let sentences: Vec<&str> = cleaned
        .split('.')
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .take(2)
        .collect();
    if sentences.is_empty() {
        return None;
    }
    Some(format!("{}.", sentences.join(". ")))
}

fn focus_points(user_instruction: &str) -> Option<String> {
    let reworded = user_instruction
        .replace("Translate this sketch into", "Create")
        .replace("description", "image");
    reworded
        .find("Focus on")
        .map(|index| reworded[index..].trim().to_string())
}

/// Deterministic image prompt built only from the theme template.
pub fn transformation_prompt(theme: &ThemeConfig, user_addition: &str) -> String {
    let mut prompt = format!(
        "Transform this sketch into a high-quality {} style image while preserving its key elements and composition.",
        theme.name
    );

    if let Some(guidance) = style_guidance(&theme.system_instruction) {
        prompt.push(' ');
        prompt.push_str(&guidance);
    }

    if let Some(elements) = non_blank(&theme.style_elements) {
        prompt.push_str(&format!(" Include these style elements: {}.", elements));
    }

    if let Some(focus) = focus_points(&theme.user_instruction) {
        prompt.push(' ');
        prompt.push_str(&focus);
    }

    if let Some(addition) = non_blank(user_addition) {
        prompt.push_str(&format!(" Additional details: {}.", addition));
    }

    prompt
}

/// Single-call request asking for all four labeled sections at once.
pub fn structured_analysis_prompt(theme: &ThemeConfig, user_addition: &str) -> String {
    let user_request = non_blank(user_addition);
    let mut prompt = String::from(
        "You are an expert AI art assistant tasked with analyzing a sketch and providing information for style transformation.\n\n\
         First, examine the sketch carefully and identify exactly what is drawn.\n",
    );

    if let Some(request) = user_request {
        prompt.push_str(&format!("\nIMPORTANT USER REQUEST: {}\n", request));
    }

    prompt.push_str("\nThen, provide the following information in this exact format:\n\n");
    prompt.push_str(&format!(
        "{}: [Write a detailed factual analysis of what's in the sketch: objects, figures, composition]\n\n",
        SectionLabel::SketchContent.as_str()
    ));

    let mut transformation = format!(
        "{}: [Create a detailed prompt to transform this sketch into {} style while preserving the original content. Use these style elements: {}",
        SectionLabel::TransformationPrompt.as_str(),
        theme.name,
        theme.system_instruction
    );
    if let Some(request) = user_request {
        transformation.push_str(&format!(
            ". MAKE SURE to incorporate this user request: {}",
            request
        ));
    }
    transformation.push_str("]\n\n");
    prompt.push_str(&transformation);

    prompt.push_str(&format!(
        "{}: [Create a memorable, specific 3-6 word title that focuses on the actual content of the sketch, NOT mentioning \"{}\", \"art\", \"sketch\" or \"AI\"]\n\n",
        SectionLabel::Title.as_str(),
        theme.name
    ));
    prompt.push_str(&format!(
        "{}: [Write a brief, engaging 2-3 sentence description of how the sketch would look when transformed into {} style. Make it sound like a gallery caption, focusing on the actual content while mentioning the style elements]\n\n",
        SectionLabel::Description.as_str(),
        theme.name
    ));
    prompt.push_str(
        "Follow this format exactly. Each section should start on its own line with the exact label as shown, separated by a blank line.",
    );

    prompt
}

pub fn creative_description_prompt(transformation_prompt: &str, theme_name: &str) -> String {
    format!(
        "Based on this image generation prompt:\n\"{transformation_prompt}\"\n\n\
         Write a brief, engaging description (2-3 sentences) of the resulting image that a user would enjoy reading. \
         Make it sound like you're describing a finished artwork, not like you're giving instructions to an AI.\n\n\
         The description should:\n\
         1. Focus on the visual elements and subject matter\n\
         2. Mention the {theme_name} style in a natural way\n\
         3. Sound like a gallery description or social media caption\n\
         4. Be written in present tense, describing what IS in the image\n\
         5. Avoid phrases like \"this sketch depicts\" or \"this image shows\""
    )
}

pub fn title_prompt(description: &str, theme_name: &str) -> String {
    format!(
        "Based on this image description:\n\"{description}\"\n\n\
         Create a short, specific title (3-6 words) that captures the exact subject of the image.\n\n\
         The title should:\n\
         1. Focus on the main subject or feeling of the image\n\
         2. Be memorable and interesting\n\
         3. NOT include words like \"sketch\", \"AI\", \"art\", \"generated\", or \"{theme_name}\"\n\
         4. NOT be generic like \"Beautiful Landscape\" or \"Artistic Creation\"\n\n\
         Return ONLY the title, with no quotes or explanation."
    )
}

pub fn strict_title_prompt(description: &str, theme_name: &str) -> String {
    format!(
        "Create a SPECIFIC and CREATIVE title (3-6 words) for this image: \"{description}\"\n\n\
         DO NOT use generic words or include \"{theme_name}\", \"AI\", \"sketch\", \"art\", \"creative\", \"artistic\", \"creation\" or \"generated\".\n\
         Focus on the EXACT subject matter and feeling. Be precise and imaginative.\n\n\
         Examples of good titles: \"Moonlit Mountain Journey\", \"Whispering Forest Spirits\", \"Neon City Dreams\"\n\
         Examples of bad titles: \"Beautiful Art\", \"Creative Sketch\", \"Amazing {theme_name}\"\n\n\
         Return ONLY the title with no explanation."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::themes::ThemeCatalog;

    fn theme(name: &str) -> ThemeConfig {
        ThemeCatalog::builtin().resolve(Some(name)).clone()
    }

    #[test]
    fn blank_addition_keeps_instruction_verbatim() {
        let minimalism = theme("Minimalism");
        for addition in ["", "   ", "\n\t"] {
            let composed = compose(&minimalism, addition);
            assert_eq!(composed.final_instruction, minimalism.user_instruction);
            assert_eq!(composed.expected_temperature, 0.5);
        }
    }

    #[test]
    fn addition_follows_marker() {
        let nature = theme("Nature");
        let composed = compose(&nature, "  add a red fox  ");

        let (base, addendum) = composed
            .final_instruction
            .split_once(ADDITIONAL_REQUIREMENTS_MARKER)
            .expect("marker present");
        assert_eq!(base, nature.user_instruction);
        assert_eq!(addendum, "add a red fox");
    }

    #[test]
    fn transformation_prompt_uses_theme_template() {
        let prompt = transformation_prompt(&theme("Minimalism"), "Make it modern");

        assert!(prompt.starts_with(
            "Transform this sketch into a high-quality Minimalism style image"
        ));
        assert!(prompt.contains("You are a minimalist art specialist"));
        assert!(prompt.contains("Include these style elements: clean lines"));
        assert!(prompt.contains("Focus on essential lines"));
        assert!(prompt.ends_with("Additional details: Make it modern."));
    }

    #[test]
    fn transformation_prompt_omits_empty_parts() {
        let default = theme("Default");
        let prompt = transformation_prompt(&default, " ");

        assert!(!prompt.contains("Include these style elements"));
        assert!(!prompt.contains("Additional details"));
        assert_eq!(prompt, transformation_prompt(&default, ""));
    }

    #[test]
    fn structured_prompt_mentions_user_request_only_when_given() {
        let realism = theme("Realism");
        let plain = structured_analysis_prompt(&realism, "");
        let with_request = structured_analysis_prompt(&realism, "night time");

        for label in SectionLabel::ALL {
            assert!(plain.contains(&format!("{}:", label.as_str())));
        }
        assert!(!plain.contains("IMPORTANT USER REQUEST"));
        assert!(with_request.contains("IMPORTANT USER REQUEST: night time"));
        assert!(with_request.contains("incorporate this user request: night time"));
    }

    #[test]
    fn title_prompts_name_the_theme() {
        assert!(title_prompt("a fox", "Nature").contains("\"Nature\""));
        assert!(strict_title_prompt("a fox", "Nature").contains("Amazing Nature"));
        assert!(creative_description_prompt("prompt", "Anime").contains("Anime style"));
    }
}
