use tracing::debug;

use crate::prompts::composer::transformation_prompt;
use crate::prompts::themes::ThemeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionLabel {
    SketchContent,
    TransformationPrompt,
    Title,
    Description,
}

impl SectionLabel {
    pub const ALL: [SectionLabel; 4] = [
        SectionLabel::SketchContent,
        SectionLabel::TransformationPrompt,
        SectionLabel::Title,
        SectionLabel::Description,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionLabel::SketchContent => "SKETCH_CONTENT",
            SectionLabel::TransformationPrompt => "TRANSFORMATION_PROMPT",
            SectionLabel::Title => "TITLE",
            SectionLabel::Description => "DESCRIPTION",
        }
    }

    fn slot(&self) -> usize {
        match self {
            SectionLabel::SketchContent => 0,
            SectionLabel::TransformationPrompt => 1,
            SectionLabel::Title => 2,
            SectionLabel::Description => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructuredModelResponse {
    pub content_summary: String,
    pub transformation_instruction: String,
    pub title: String,
    pub description: String,
}

/// Values substituted for sections the model left out.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseDefaults {
    pub content_summary: String,
    pub transformation_instruction: String,
    pub title: String,
    pub description: String,
}

impl ResponseDefaults {
    pub fn for_theme(theme: &ThemeConfig, user_addition: &str) -> Self {
        ResponseDefaults {
            content_summary: "A sketch".to_string(),
            transformation_instruction: transformation_prompt(theme, user_addition),
            title: default_title(&theme.name),
            description: default_description(&theme.name),
        }
    }

    pub fn into_response(self) -> StructuredModelResponse {
        StructuredModelResponse {
            content_summary: self.content_summary,
            transformation_instruction: self.transformation_instruction,
            title: self.title,
            description: self.description,
        }
    }
}

pub fn default_title(theme_name: &str) -> String {
    format!("{} Creation", theme_name)
}

pub fn default_description(theme_name: &str) -> String {
    format!(
        "A {} style artwork based on the sketch.",
        theme_name.to_lowercase()
    )
}

#[derive(Debug, Clone, Copy)]
struct LabelHit {
    label: SectionLabel,
    start: usize,
    content_start: usize,
}

fn is_label_byte(byte: u8) -> bool {
    byte.is_ascii_uppercase() || byte == b'_'
}

/// Every `LABEL:` in `raw` whose preceding byte is not `[A-Z_]`, so labels
/// inside numbered lists, bullets or after a short preamble are found while
/// `SUBTITLE:` is not taken for `TITLE:`. Labels are case-sensitive.
fn find_labels(raw: &str) -> Vec<LabelHit> {
    let bytes = raw.as_bytes();
    let mut hits = Vec::new();
    let mut index = 0;
    while index < bytes.len() {
        if index > 0 && is_label_byte(bytes[index - 1]) {
            index += 1;
            continue;
        }
        let matched = SectionLabel::ALL.iter().find(|label| {
            let name = label.as_str().as_bytes();
            bytes[index..].starts_with(name) && bytes.get(index + name.len()) == Some(&b':')
        });
        match matched {
            Some(label) => {
                let content_start = index + label.as_str().len() + 1;
                hits.push(LabelHit {
                    label: *label,
                    start: index,
                    content_start,
                });
                index = content_start;
            }
            None => index += 1,
        }
    }
    hits
}

fn is_list_decoration(prefix: &str) -> bool {
    prefix.chars().all(|c| {
        c.is_whitespace()
            || c.is_ascii_digit()
            || matches!(c, '.' | ')' | '-' | '+' | '*' | '#' | '>' | '\u{2022}')
    })
}

/// Where the section before `hit` stops: at the start of the label's line when
/// only list or markdown decoration precedes the label on that line.
fn section_end(raw: &str, hit: &LabelHit) -> usize {
    let line_start = raw[..hit.start].rfind('\n').map(|pos| pos + 1).unwrap_or(0);
    if is_list_decoration(&raw[line_start..hit.start]) {
        line_start
    } else {
        hit.start
    }
}

/// Splits `raw` into labeled sections. Each section runs until the next
/// recognized label or the end of the text; text before the first label is
/// ignored. The first non-empty occurrence of a label wins.
pub fn scan_sections(raw: &str) -> [Option<String>; 4] {
    let mut sections: [Option<String>; 4] = Default::default();
    let hits = find_labels(raw);

    for (position, hit) in hits.iter().enumerate() {
        let end = hits
            .get(position + 1)
            .map(|next| section_end(raw, next))
            .unwrap_or(raw.len())
            .max(hit.content_start);
        let content = raw[hit.content_start..end]
            .trim_start_matches('*')
            .trim();
        let slot = &mut sections[hit.label.slot()];
        if slot.is_none() && !content.is_empty() {
            *slot = Some(content.to_string());
        }
    }

    sections
}

fn strip_enclosing_quotes(value: &str) -> &str {
    value
        .trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '\u{201C}' | '\u{201D}' | '\u{2018}' | '\u{2019}'))
        .trim()
}

pub struct StructuredResponseParser {
    defaults: ResponseDefaults,
}

impl StructuredResponseParser {
    pub fn new(defaults: ResponseDefaults) -> Self {
        StructuredResponseParser { defaults }
    }

    pub fn for_theme(theme: &ThemeConfig, user_addition: &str) -> Self {
        Self::new(ResponseDefaults::for_theme(theme, user_addition))
    }

    #[cfg(test)]
    pub fn defaults(&self) -> &ResponseDefaults {
        &self.defaults
    }

    /// Never fails: any missing or empty section falls back to its default.
    pub fn parse(&self, raw: &str) -> StructuredModelResponse {
        if raw.trim().is_empty() {
            debug!(target: "prompts.parser", "Empty structured response; using defaults");
            return self.defaults.clone().into_response();
        }

        let [content, transformation, title, description] = scan_sections(raw);

        let title = title
            .as_deref()
            .map(strip_enclosing_quotes)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        let description = description
            .as_deref()
            .map(strip_enclosing_quotes)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        let defaulted: Vec<&str> = [
            (SectionLabel::SketchContent, content.is_none()),
            (SectionLabel::TransformationPrompt, transformation.is_none()),
            (SectionLabel::Title, title.is_none()),
            (SectionLabel::Description, description.is_none()),
        ]
        .iter()
        .filter(|(_, missing)| *missing)
        .map(|(label, _)| label.as_str())
        .collect();
        if !defaulted.is_empty() {
            debug!(
                target: "prompts.parser",
                "Structured response missing sections {:?}; using defaults",
                defaulted
            );
        }

        let defaults = &self.defaults;
        StructuredModelResponse {
            content_summary: content.unwrap_or_else(|| defaults.content_summary.clone()),
            transformation_instruction: transformation
                .unwrap_or_else(|| defaults.transformation_instruction.clone()),
            title: title.unwrap_or_else(|| defaults.title.clone()),
            description: description.unwrap_or_else(|| defaults.description.clone()),
        }
    }
}
