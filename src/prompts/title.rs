use std::future::Future;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::prompts::composer::strict_title_prompt;

pub const GENERIC_TITLE_TOKENS: &[&str] = &[
    "ai",
    "sketch",
    "art",
    "creation",
    "generated",
    "creative",
    "artistic",
];

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}']+").expect("valid word regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleRejection {
    TooShort,
    ContainsTheme,
    GenericToken(String),
}

/// Terminal state of the refinement ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleOutcome {
    Accepted(String),
    Retried(String),
    Fallback(String),
}

impl TitleOutcome {
    pub fn title(&self) -> &str {
        match self {
            TitleOutcome::Accepted(title)
            | TitleOutcome::Retried(title)
            | TitleOutcome::Fallback(title) => title,
        }
    }

    pub fn into_title(self) -> String {
        match self {
            TitleOutcome::Accepted(title)
            | TitleOutcome::Retried(title)
            | TitleOutcome::Fallback(title) => title,
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            TitleOutcome::Accepted(_) => "accepted",
            TitleOutcome::Retried(_) => "retried",
            TitleOutcome::Fallback(_) => "fallback",
        }
    }
}

fn words(text: &str) -> Vec<&str> {
    WORD_RE.find_iter(text).map(|word| word.as_str()).collect()
}

/// Trims whitespace and any enclosing quotes a model wraps titles in.
pub fn clean_title(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '\u{201C}' | '\u{201D}' | '\u{2018}' | '\u{2019}'))
        .trim()
        .to_string()
}

pub fn check_title(candidate: &str, theme_name: &str) -> Result<(), TitleRejection> {
    let candidate_words = words(candidate);
    if candidate_words.len() < 2 {
        return Err(TitleRejection::TooShort);
    }

    let lowered = candidate.to_lowercase();
    let theme = theme_name.trim().to_lowercase();
    if !theme.is_empty() && lowered.contains(&theme) {
        return Err(TitleRejection::ContainsTheme);
    }

    // Substring match: "Smart" and "Heartbeat" are rejected too.
    match GENERIC_TITLE_TOKENS
        .iter()
        .find(|token| lowered.contains(*token))
    {
        Some(token) => Err(TitleRejection::GenericToken(token.to_string())),
        None => Ok(()),
    }
}

/// First two or three words of the description, or `"<Theme> Scene"`.
pub fn fallback_title(source_description: &str, theme_name: &str) -> String {
    let description_words: Vec<&str> = words(source_description).into_iter().take(3).collect();
    if description_words.len() >= 2 {
        return description_words.join(" ");
    }
    format!("{} Scene", theme_name.trim())
}

/// Accept the candidate, otherwise ask `retry` once with a stricter prompt,
/// otherwise derive a title from the description. Errors from `retry` never
/// escape.
pub async fn refine_title<F, Fut>(
    candidate: &str,
    theme_name: &str,
    source_description: &str,
    retry: F,
) -> TitleOutcome
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = anyhow::Result<String>>,
{
    let candidate = clean_title(candidate);
    let rejection = match check_title(&candidate, theme_name) {
        Ok(()) => return TitleOutcome::Accepted(candidate),
        Err(rejection) => rejection,
    };
    debug!(
        target: "prompts.title",
        "Rejected title {:?}: {:?}; retrying with stricter prompt",
        candidate,
        rejection
    );

    match retry(strict_title_prompt(source_description, theme_name)).await {
        Ok(raw) => {
            let retried = clean_title(&raw);
            match check_title(&retried, theme_name) {
                Ok(()) => return TitleOutcome::Retried(retried),
                Err(rejection) => debug!(
                    target: "prompts.title",
                    "Retried title {:?} still rejected: {:?}",
                    retried,
                    rejection
                ),
            }
        }
        Err(err) => warn!("Title retry failed: {}", err),
    }

    TitleOutcome::Fallback(fallback_title(source_description, theme_name))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use anyhow::anyhow;

    use super::*;

    #[test]
    fn generic_titles_are_rejected() {
        assert_eq!(
            check_title("AI Sketch Art", "Minimalism"),
            Err(TitleRejection::GenericToken("ai".to_string()))
        );
        assert_eq!(check_title("Sunset", "Nature"), Err(TitleRejection::TooShort));
        assert_eq!(
            check_title("Quiet Minimalism Study", "minimalism"),
            Err(TitleRejection::ContainsTheme)
        );
        assert_eq!(
            check_title("An Artistic Morning", "Realism"),
            Err(TitleRejection::GenericToken("art".to_string()))
        );
    }

    #[test]
    fn denylist_tokens_match_inside_words() {
        for (title, token) in [
            ("Smart Harbor Lights", "art"),
            ("Heartbeat of Dawn", "art"),
            ("Rainy Mountain Trail", "ai"),
            ("Sketchbook Memories Revisited", "sketch"),
        ] {
            assert_eq!(
                check_title(title, "Nature"),
                Err(TitleRejection::GenericToken(token.to_string())),
                "title {title:?}"
            );
        }
        assert_eq!(check_title("Whispering Forest Spirits", "Minimalism"), Ok(()));
        assert_eq!(check_title("Harbor Lights at Dusk", "Nature"), Ok(()));
    }

    #[test]
    fn fallback_uses_description_words_then_theme() {
        assert_eq!(
            fallback_title("A lone heron wades through reeds.", "Nature"),
            "A lone heron"
        );
        assert_eq!(fallback_title("Heron, reeds", "Nature"), "Heron reeds");
        assert_eq!(fallback_title("", "Nature"), "Nature Scene");
        assert_eq!(fallback_title("Heron", "Nature"), "Nature Scene");
    }

    #[tokio::test]
    async fn good_title_is_accepted_without_retry() {
        let called = Cell::new(false);
        let outcome = refine_title("Whispering Forest Spirits", "Minimalism", "", |_| {
            called.set(true);
            async { Ok("unused".to_string()) }
        })
        .await;

        assert_eq!(
            outcome,
            TitleOutcome::Accepted("Whispering Forest Spirits".to_string())
        );
        assert!(!called.get());
    }

    #[tokio::test]
    async fn rejected_title_is_replaced_by_retry() {
        let outcome = refine_title("\"AI Sketch Art\"", "Minimalism", "a boat", |prompt| {
            assert!(prompt.contains("Minimalism"));
            async { Ok("  'Harbor at First Light' ".to_string()) }
        })
        .await;

        assert_eq!(
            outcome,
            TitleOutcome::Retried("Harbor at First Light".to_string())
        );
    }

    #[tokio::test]
    async fn failed_retry_falls_back() {
        let outcome = refine_title("AI Sketch Art", "Minimalism", "", |_| async {
            Err(anyhow!("model unavailable"))
        })
        .await;

        assert_eq!(outcome, TitleOutcome::Fallback("Minimalism Scene".to_string()));
        assert_ne!(outcome.title(), "AI Sketch Art");
    }

    #[tokio::test]
    async fn still_generic_retry_falls_back_to_description() {
        let outcome = refine_title(
            "Creation",
            "Realism",
            "Old lighthouse keeper watching waves",
            |_| async { Ok("Realism Art".to_string()) },
        )
        .await;

        assert_eq!(outcome.stage(), "fallback");
        assert_eq!(outcome.into_title(), "Old lighthouse keeper");
    }
}
