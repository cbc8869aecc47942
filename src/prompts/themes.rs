use std::collections::HashMap;

pub const DEFAULT_THEME: &str = "Default";

#[derive(Debug, Clone, PartialEq)]
pub struct ThemeConfig {
    pub name: String,
    pub system_instruction: String,
    pub user_instruction: String,
    pub sampling_temperature: f32,
    /// Comma separated keywords for the template transformation prompt.
    pub style_elements: String,
}

struct BuiltinTheme {
    name: &'static str,
    system_instruction: &'static str,
    user_instruction: &'static str,
    temperature: f32,
    style_elements: &'static str,
}

impl BuiltinTheme {
    fn to_config(&self) -> ThemeConfig {
        ThemeConfig {
            name: self.name.to_string(),
            system_instruction: self.system_instruction.to_string(),
            user_instruction: self.user_instruction.to_string(),
            sampling_temperature: self.temperature,
            style_elements: self.style_elements.to_string(),
        }
    }
}

const BUILTIN_THEMES: &[BuiltinTheme] = &[
    BuiltinTheme {
        name: DEFAULT_THEME,
        system_instruction: "You are an expert visual analyst for an AI image generation pipeline. Your task is to describe sketches in vivid, precise detail, capturing every visible element: shapes, lines, textures, objects, and their spatial arrangement. Focus solely on what is explicitly shown, avoiding speculation or added context. Deliver a concise, evocative paragraph optimized for an image generation model, using clear, descriptive language that emphasizes form, composition, and visual weight.",
        user_instruction: "Describe this sketch in a single vivid paragraph, detailing all visible elements: shapes, lines, textures, objects, and their layout. Use precise, evocative language to create a clear visual blueprint for a high-quality AI-generated image, focusing only on what is present.",
        temperature: 0.7,
        style_elements: "",
    },
    BuiltinTheme {
        name: "Minimalism",
        system_instruction: "You are a minimalist art specialist for an AI image generation system. Your role is to distill sketches into their core essence, highlighting clean lines, basic geometric shapes, and the interplay of negative space. Describe the sketch with sharp, simple precision, emphasizing sparsity, balance, and refined composition for a sleek, minimal output.",
        user_instruction: "Render this sketch as a minimalist description in one paragraph. Focus on essential lines, geometric forms, and the use of negative space, capturing the composition's simplicity and elegance with concise, clear language.",
        temperature: 0.5,
        style_elements: "clean lines, elegant simplicity, essential elements only, minimalist design",
    },
    BuiltinTheme {
        name: "Nature",
        system_instruction: "You are a nature-inspired visual interpreter for an AI image generation pipeline. Your task is to describe sketches with an organic focus, emphasizing flowing lines, natural textures, and earthy forms. Tie visible elements to nature (winding branches, rippling water, rugged stone) while staying true to the sketch's structure, delivering a vivid paragraph rich with natural imagery.",
        user_instruction: "Describe this sketch in one paragraph using nature-inspired language. Highlight organic shapes, flowing lines, and textures reminiscent of natural patterns such as leaves, waves, or bark, while grounding the description in the sketch's visible elements.",
        temperature: 0.8,
        style_elements: "natural elements, organic forms, environmental harmony",
    },
    BuiltinTheme {
        name: "Realism",
        system_instruction: "You are a realism specialist for an AI image generation system, tasked with translating sketches into photorealistic descriptions. Focus on exact proportions, detailed textures, and lifelike lighting effects. Describe the sketch as a high-fidelity scene, emphasizing physical accuracy and tangible qualities in a concise, vivid paragraph suitable for an image generation model.",
        user_instruction: "Describe this sketch in one paragraph as a photorealistic scene. Detail precise proportions, lifelike textures, and realistic lighting, painting a clear, tangible picture based solely on the sketch's visible elements.",
        temperature: 0.4,
        style_elements: "photorealistic details, true-to-life lighting and textures, accurate lighting and shadows, precise proportions, lifelike quality",
    },
    BuiltinTheme {
        name: "Anime",
        system_instruction: "You are an anime art director for an AI image generation pipeline. Your task is to reinterpret sketches through the language of Japanese animation, emphasizing expressive characters, dynamic poses, and vibrant cel-shaded color. Keep every visible element of the sketch while describing it as a single striking anime frame.",
        user_instruction: "Describe this sketch in one paragraph as an anime illustration. Focus on expressive faces, dynamic motion lines, bold color palettes, and manga-inspired composition, staying faithful to the elements drawn in the sketch.",
        temperature: 0.9,
        style_elements: "anime style art, expressive eyes, vibrant colors, manga aesthetics, dynamic poses",
    },
    BuiltinTheme {
        name: "Cartoon",
        system_instruction: "You are a cartoon illustrator guiding an AI image generation system. Your task is to describe sketches as playful cartoons, emphasizing bold outlines, exaggerated features, and bright flat colors. Keep the sketch's subjects and layout intact while giving them a lively, animated personality.",
        user_instruction: "Describe this sketch in one paragraph as a cartoon scene. Focus on bold outlines, exaggerated proportions, cheerful colors, and whimsical details that bring the drawn subjects to life.",
        temperature: 0.9,
        style_elements: "cartoon style, bold outlines, exaggerated features, vibrant colors, playful aesthetic, whimsical elements, animated look",
    },
    BuiltinTheme {
        name: "Abstract",
        system_instruction: "You are an abstract art interpreter for an AI image generation pipeline. Your task is to translate sketches into expressive, non-literal compositions of color, form, and movement. Preserve the sketch's underlying structure and rhythm while describing it as an emotionally resonant abstract work.",
        user_instruction: "Describe this sketch in one paragraph as an abstract artwork. Focus on free-form shapes, expressive color relationships, texture, and movement, letting the sketch's composition guide the abstraction.",
        temperature: 1.1,
        style_elements: "abstract interpretation, non-literal, expressive colors, emotional resonance, abstract art style, free-form shapes",
    },
];

/// Process-wide, read-only theme table. Lookups never fail.
#[derive(Debug, Clone)]
pub struct ThemeCatalog {
    themes: HashMap<String, ThemeConfig>,
    order: Vec<String>,
    default: ThemeConfig,
}

fn catalog_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl ThemeCatalog {
    pub fn builtin() -> Self {
        Self::from_themes(BUILTIN_THEMES.iter().map(BuiltinTheme::to_config))
    }

    /// Builds a catalog from arbitrary entries. A `Default` entry is synthesized
    /// from the builtin table when the input lacks one. Temperatures are
    /// clamped to [0, 2]; later duplicates replace earlier ones.
    pub fn from_themes(themes: impl IntoIterator<Item = ThemeConfig>) -> Self {
        let mut map = HashMap::new();
        let mut order = Vec::new();
        for mut theme in themes {
            let key = catalog_key(&theme.name);
            if key.is_empty() {
                continue;
            }
            theme.sampling_temperature = theme.sampling_temperature.clamp(0.0, 2.0);
            if !map.contains_key(&key) {
                order.push(key.clone());
            }
            map.insert(key, theme);
        }

        let default_key = catalog_key(DEFAULT_THEME);
        let default = match map.get(&default_key) {
            Some(theme) => theme.clone(),
            None => {
                let theme = BUILTIN_THEMES[0].to_config();
                map.insert(default_key.clone(), theme.clone());
                order.insert(0, default_key);
                theme
            }
        };

        ThemeCatalog {
            themes: map,
            order,
            default,
        }
    }

    /// Case-insensitive lookup; absent or unknown names give the `Default` entry.
    pub fn resolve(&self, theme_name: Option<&str>) -> &ThemeConfig {
        theme_name
            .map(catalog_key)
            .and_then(|key| self.themes.get(&key))
            .unwrap_or_else(|| self.default_theme())
    }

    pub fn default_theme(&self) -> &ThemeConfig {
        &self.default
    }

    pub fn contains(&self, theme_name: &str) -> bool {
        self.themes.contains_key(&catalog_key(theme_name))
    }

    /// Themes in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ThemeConfig> {
        self.order.iter().filter_map(|key| self.themes.get(key))
    }

    pub fn len(&self) -> usize {
        self.themes.len()
    }
}
