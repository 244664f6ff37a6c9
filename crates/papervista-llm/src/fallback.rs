//! Best-effort citation synthesis for records the rules engine rejected.

use crate::client::TextGenerator;
use crate::error::{FallbackError, Result};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const SYSTEM_PROMPT: &str =
    "You are a specialized citation engine that formats references accurately.";

/// Tag lines a model may put in front of the citation.
const TAG_LINES: &[&str] = &["plaintext", "text", "json", "txt", "markdown"];

/// Asks a [`TextGenerator`] for a single-line citation and cleans its answer.
#[derive(Clone)]
pub struct FallbackGenerator {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl FallbackGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    pub fn is_configured(&self) -> bool {
        self.generator.is_configured()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Generate a citation for `data` (possibly incomplete) in `style`.
    ///
    /// The call is bounded by the configured timeout. Dropping the returned
    /// future abandons the request.
    pub async fn generate(&self, data: &Value, style: &str) -> Result<String> {
        if !self.generator.is_configured() {
            return Err(FallbackError::NotConfigured);
        }

        let prompt = build_prompt(data, style);
        let raw = tokio::time::timeout(self.timeout, self.generator.complete(SYSTEM_PROMPT, &prompt))
            .await
            .map_err(|_| FallbackError::Timeout(self.timeout))??;

        let citation = clean_citation(&raw);
        if citation.is_empty() {
            return Err(FallbackError::EmptyResponse);
        }
        Ok(citation)
    }
}

/// The user prompt for one record.
pub fn build_prompt(data: &Value, style: &str) -> String {
    let pretty = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());
    format!(
        "You are an expert academic citation assistant. Your task is to generate a full \
reference list entry in the {style} format.
The citation data provided below is messy or incomplete. Use academic best practices \
(e.g., 'n.d.' for no date, correctly format capitalization, use 'et al.' when appropriate) \
to complete and format the citation.

**Data:** {pretty}

**INSTRUCTIONS:** Generate ONLY the fully formatted, single-line reference list entry. \
Do not include any surrounding text, explanations, or markdown fences (e.g., ```).",
        style = style.trim().to_uppercase(),
        pretty = pretty,
    )
}

/// Reduce a model answer to one clean line.
///
/// Strips enclosing code fences (with or without a language tag), a leading
/// tag line such as `plaintext`, and surrounding inline backticks, then
/// collapses all whitespace runs to single spaces.
pub fn clean_citation(raw: &str) -> String {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // Drop the language tag on the opening fence line, if any
        text = match rest.split_once('\n') {
            Some((tag, body)) if is_tag(tag) => body,
            _ => strip_inline_tag(rest),
        };
    }
    text = text.trim();
    if let Some(rest) = text.strip_suffix("```") {
        text = rest.trim();
    }

    if let Some((first, rest)) = text.split_once('\n')
        && is_known_tag(first)
    {
        text = rest.trim();
    }

    if text.len() >= 2 && text.starts_with('`') && text.ends_with('`') {
        text = text.trim_matches('`').trim();
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// "plaintext Doe, J." -> "Doe, J." for fences opened on the same line.
fn strip_inline_tag(text: &str) -> &str {
    match text.trim_start().split_once(char::is_whitespace) {
        Some((word, body)) if is_known_tag(word) => body,
        _ => text,
    }
}

fn is_known_tag(word: &str) -> bool {
    TAG_LINES.contains(&word.trim().to_lowercase().as_str())
}

fn is_tag(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Returns a fixed answer and records the prompt it was given.
    struct Canned {
        answer: Result<String>,
        delay: Duration,
        prompts: Mutex<Vec<String>>,
    }

    impl Canned {
        fn new(answer: Result<String>) -> Arc<Self> {
            Arc::new(Self {
                answer,
                delay: Duration::ZERO,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for Canned {
        fn is_configured(&self) -> bool {
            self.answer != Err(FallbackError::NotConfigured)
        }

        async fn complete(&self, _system: &str, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            tokio::time::sleep(self.delay).await;
            self.answer.clone()
        }
    }

    #[test]
    fn test_clean_citation_strips_fences() {
        assert_eq!(
            clean_citation("```\nVaswani, A. (2017). Attention.\n```"),
            "Vaswani, A. (2017). Attention."
        );
        assert_eq!(
            clean_citation("```plaintext\nVaswani, A. (2017).\n```"),
            "Vaswani, A. (2017)."
        );
        assert_eq!(clean_citation("```Smith (n.d.).```"), "Smith (n.d.).");
        assert_eq!(
            clean_citation("```plaintext Doe, J. (n.d.). T.```"),
            "Doe, J. (n.d.). T."
        );
        assert_eq!(clean_citation("``` Text Doe, J. (n.d.).```"), "Doe, J. (n.d.).");
        assert_eq!(clean_citation("```Textbook, A. (2001).```"), "Textbook, A. (2001).");
        assert_eq!(clean_citation("`Smith (n.d.).`"), "Smith (n.d.).");
    }

    #[test]
    fn test_clean_citation_strips_tag_line_and_joins_lines() {
        assert_eq!(
            clean_citation("plaintext\nDoe, J.\n  (n.d.).  Title."),
            "Doe, J. (n.d.). Title."
        );
    }

    #[test]
    fn test_clean_citation_keeps_words_containing_tags() {
        // Titles mentioning "json" or "text" survive intact
        assert_eq!(
            clean_citation("Doe, J. (2020). Parsing JSON text fast."),
            "Doe, J. (2020). Parsing JSON text fast."
        );
    }

    #[test]
    fn test_prompt_contents() {
        let prompt = build_prompt(&json!({"title": "Untitled"}), "apa");
        assert!(prompt.contains("in the APA format"), "Got: {}", prompt);
        assert!(prompt.contains("\"title\": \"Untitled\""), "Got: {}", prompt);
        assert!(prompt.contains("'n.d.'"));
        assert!(prompt.contains("'et al.'"));
        assert!(prompt.contains("single-line"));
    }

    #[tokio::test]
    async fn test_generate_cleans_fenced_answer() {
        let canned = Canned::new(Ok("```\nDoe, J. (n.d.). Untitled.\n```".to_string()));
        let fallback = FallbackGenerator::new(canned.clone(), Duration::from_secs(5));
        let citation = fallback.generate(&json!({"id": "X2"}), "mla").await.unwrap();
        assert_eq!(citation, "Doe, J. (n.d.). Untitled.");

        let prompts = canned.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("MLA"));
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_answer() {
        let fallback = FallbackGenerator::new(Canned::new(Ok("``` ```".to_string())), Duration::from_secs(5));
        let err = fallback.generate(&json!({}), "apa").await.unwrap_err();
        assert_eq!(err, FallbackError::EmptyResponse);
    }

    #[tokio::test]
    async fn test_generate_unconfigured() {
        let canned = Canned::new(Err(FallbackError::NotConfigured));
        let fallback = FallbackGenerator::new(canned.clone(), Duration::from_secs(5));
        assert!(!fallback.is_configured());
        let err = fallback.generate(&json!({}), "apa").await.unwrap_err();
        assert_eq!(err, FallbackError::NotConfigured);
        assert!(canned.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generate_times_out() {
        let slow = Arc::new(Canned {
            answer: Ok("too late".to_string()),
            delay: Duration::from_secs(30),
            prompts: Mutex::new(Vec::new()),
        });
        let fallback = FallbackGenerator::new(slow, Duration::from_millis(50));
        let err = fallback.generate(&json!({}), "apa").await.unwrap_err();
        assert_eq!(err, FallbackError::Timeout(Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn test_generate_passes_through_service_errors() {
        let failing = Canned::new(Err(FallbackError::Network("connection refused".to_string())));
        let fallback = FallbackGenerator::new(failing, Duration::from_secs(5));
        let err = fallback.generate(&json!({}), "apa").await.unwrap_err();
        assert!(matches!(err, FallbackError::Network(_)));
    }
}
