//! Deterministic rules-based citation rendering.

use crate::error::{Result, RulesFailure};
use crate::eval::evaluate_bibliography_entry;
use crate::locale::LocaleManager;
use crate::output::{OutputFormat, RenderOptions};
use crate::record::CanonicalCitationRecord;
use papervista_csl::{Error as CslError, StyleRegistry};
use std::sync::Arc;

/// Renders canonical records with CSL styles from a [`StyleRegistry`].
///
/// Rendering is a pure function of `(record, style, format)`: the same inputs
/// always produce the same string.
#[derive(Clone)]
pub struct RulesEngine {
    registry: Arc<StyleRegistry>,
}

impl RulesEngine {
    pub fn new(registry: Arc<StyleRegistry>) -> Self {
        Self { registry }
    }

    /// An engine over the built-in styles only.
    pub fn builtin() -> Self {
        Self::new(Arc::new(StyleRegistry::builtin()))
    }

    pub fn registry(&self) -> &StyleRegistry {
        &self.registry
    }

    /// Names of every style this engine can render.
    pub fn style_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Render `record` as a single bibliography entry in `style`.
    ///
    /// Records missing an author, title, or issued year fail with
    /// [`RulesFailure::MissingData`] before the style is looked up.
    pub fn render(
        &self,
        record: &CanonicalCitationRecord,
        style: &str,
        format: OutputFormat,
    ) -> Result<String> {
        let missing = record.missing_for_rendering();
        if !missing.is_empty() {
            return Err(RulesFailure::MissingData(format!(
                "record '{}' has no {}",
                record.id,
                missing.join(", ")
            )));
        }

        let parsed = match self.registry.load(style) {
            Ok(Some(parsed)) => parsed,
            Ok(None) | Err(CslError::InvalidStyleName { .. }) => {
                return Err(RulesFailure::UnknownStyle(style.to_string()));
            }
            Err(e) => {
                return Err(RulesFailure::ProcessingError(format!(
                    "style '{}' could not be loaded: {}",
                    style, e
                )));
            }
        };

        let locale = LocaleManager::for_style(&parsed)
            .map_err(|e| RulesFailure::ProcessingError(format!("locale: {}", e)))?;

        let output = evaluate_bibliography_entry(&parsed, &locale, record)?;
        let options = RenderOptions {
            format,
            punctuation_in_quote: locale.punctuation_in_quote(),
        };
        let rendered = collapse_spaces(&output.render(&options));

        if rendered.is_empty() {
            return Err(RulesFailure::ProcessingError(format!(
                "style '{}' produced an empty entry",
                style
            )));
        }

        tracing::debug!(id = %record.id, style = %style, "Rendered citation by rules");
        Ok(rendered)
    }
}

impl Default for RulesEngine {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Trim and collapse runs of spaces left by adjacent affixes.
fn collapse_spaces(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.trim().chars() {
        if c == ' ' && out.ends_with(' ') {
            continue;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::PersonName;
    use papervista_csl::StyleSource;

    /// One style held in memory under the name "house".
    struct HouseStyle(&'static str);

    impl StyleSource for HouseStyle {
        fn load(&self, name: &str) -> papervista_csl::Result<Option<String>> {
            Ok((name == "house").then(|| self.0.to_string()))
        }

        fn names(&self) -> Vec<String> {
            vec!["house".to_string()]
        }
    }

    fn house_engine(csl: &'static str) -> RulesEngine {
        RulesEngine::new(Arc::new(StyleRegistry::from_sources(vec![Box::new(
            HouseStyle(csl),
        )])))
    }

    fn vaswani() -> CanonicalCitationRecord {
        let mut record = CanonicalCitationRecord::new(
            "X1",
            "Attention Is All You Need",
            vec![PersonName::new("Vaswani", Some("Ashish"))],
        );
        record.issued = Some(vec![2017]);
        record
    }

    #[test]
    fn test_renders_minimal_record_in_apa() {
        let engine = RulesEngine::builtin();
        let out = engine.render(&vaswani(), "apa", OutputFormat::Plain).unwrap();
        assert_eq!(out, "Vaswani, A. (2017). Attention Is All You Need.");
    }

    #[test]
    fn test_style_name_is_case_insensitive() {
        let engine = RulesEngine::builtin();
        let lower = engine.render(&vaswani(), "apa", OutputFormat::Plain).unwrap();
        let upper = engine.render(&vaswani(), " APA ", OutputFormat::Plain).unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_missing_data_checked_before_style() {
        let engine = RulesEngine::builtin();
        let mut record = CanonicalCitationRecord::new("X2", "", Vec::new());
        record.issued = Some(Vec::new());
        let err = engine.render(&record, "klingon", OutputFormat::Plain).unwrap_err();
        assert!(matches!(err, RulesFailure::MissingData(_)));
        let display = err.to_string();
        assert!(display.contains("author, title, issued"), "Got: {}", display);
    }

    #[test]
    fn test_unknown_style() {
        let engine = RulesEngine::builtin();
        let err = engine.render(&vaswani(), "klingon", OutputFormat::Plain).unwrap_err();
        assert_eq!(err, RulesFailure::UnknownStyle("klingon".to_string()));

        let err = engine.render(&vaswani(), "../apa", OutputFormat::Plain).unwrap_err();
        assert_eq!(err.kind(), "unknown_style");
    }

    #[test]
    fn test_empty_entry_is_a_processing_error() {
        let engine = house_engine(
            r#"<style class="in-text" version="1.0">
  <info><title>Notes only</title></info>
  <citation><layout><text variable="title"/></layout></citation>
  <bibliography><layout><text variable="note"/></layout></bibliography>
</style>"#,
        );
        let err = engine.render(&vaswani(), "house", OutputFormat::Plain).unwrap_err();
        assert!(matches!(err, RulesFailure::ProcessingError(_)), "Got: {:?}", err);
        assert!(err.to_string().contains("empty entry"), "Got: {}", err);
    }

    #[test]
    fn test_malformed_style_is_a_processing_error() {
        let engine = house_engine(
            r#"<style class="in-text" version="1.0">
  <citation><layout><text macro="nowhere"/></layout></citation>
</style>"#,
        );
        let err = engine.render(&vaswani(), "house", OutputFormat::Plain).unwrap_err();
        assert!(matches!(err, RulesFailure::ProcessingError(_)), "Got: {:?}", err);
        assert!(err.to_string().contains("could not be loaded"), "Got: {}", err);
    }

    #[test]
    fn test_style_without_bibliography_is_a_processing_error() {
        let engine = house_engine(
            r#"<style class="in-text" version="1.0">
  <citation><layout><text variable="title"/></layout></citation>
</style>"#,
        );
        let err = engine.render(&vaswani(), "house", OutputFormat::Plain).unwrap_err();
        assert_eq!(err.kind(), "processing_error");
    }

    #[test]
    fn test_collapse_spaces() {
        assert_eq!(collapse_spaces("  a  b "), "a b");
    }
}
