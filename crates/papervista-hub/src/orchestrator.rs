//! The hybrid citation pipeline: normalize, try rules, then fall back.

use papervista_citeproc::{
    OutputFormat, RulesEngine, RulesFailure, normalize, partial_data, raw_id,
};
use papervista_llm::{FallbackError, FallbackGenerator};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Which strategy produced a citation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CitationSource {
    Rules,
    Fallback,
}

impl CitationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CitationSource::Rules => "RULES",
            CitationSource::Fallback => "FALLBACK",
        }
    }
}

/// A resolved citation with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationResult {
    /// Requested style, upper-cased.
    pub style: String,
    pub citation: String,
    pub source: CitationSource,
    /// Identifier of the input record, or `"unknown"`.
    pub source_id: String,
}

/// Both strategies failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("Both rules and fallback generation failed: rules: {rules}; fallback: {fallback}")]
    BothFailed {
        rules: RulesFailure,
        fallback: FallbackError,
    },
}

/// Runs the rules engine and, when it fails, the fallback generator.
///
/// Holds no per-request state; one instance serves concurrent requests.
#[derive(Clone)]
pub struct Orchestrator {
    engine: RulesEngine,
    fallback: FallbackGenerator,
}

impl Orchestrator {
    pub fn new(engine: RulesEngine, fallback: FallbackGenerator) -> Self {
        Self { engine, fallback }
    }

    pub fn engine(&self) -> &RulesEngine {
        &self.engine
    }

    pub fn fallback(&self) -> &FallbackGenerator {
        &self.fallback
    }

    /// Resolve a citation for a raw record.
    ///
    /// A record that fails validation is treated like a rules-engine
    /// `MissingData` failure: the fallback generator still gets whatever
    /// data survived.
    pub async fn resolve(
        &self,
        raw: &Value,
        style: &str,
        format: OutputFormat,
    ) -> Result<CitationResult, ResolutionError> {
        let source_id = raw_id(raw).unwrap_or_else(|| "unknown".to_string());
        let result = |citation: String, source: CitationSource| CitationResult {
            style: style.trim().to_uppercase(),
            citation,
            source,
            source_id: source_id.clone(),
        };

        let rules_failure = match normalize(raw) {
            Ok(record) => match self.engine.render(&record, style, format) {
                Ok(citation) => {
                    debug!(id = %source_id, style, "Resolved by rules");
                    return Ok(result(citation, CitationSource::Rules));
                }
                Err(failure) => failure,
            },
            Err(invalid) => RulesFailure::from(invalid),
        };

        info!(
            id = %source_id,
            style,
            kind = rules_failure.kind(),
            cause = %rules_failure,
            "Rules rendering failed; escalating to fallback"
        );

        match self.fallback.generate(&partial_data(raw), style).await {
            Ok(citation) => Ok(result(citation, CitationSource::Fallback)),
            Err(fallback) => {
                warn!(id = %source_id, style, cause = %fallback, "Fallback generation failed");
                Err(ResolutionError::BothFailed {
                    rules: rules_failure,
                    fallback,
                })
            }
        }
    }
}
