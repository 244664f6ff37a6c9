//! Service configuration.
//!
//! Values come from, in decreasing precedence: command-line flags and
//! `PAPERVISTA_*` environment variables (merged by clap in the binary), an
//! optional TOML file, and the defaults below.

use std::path::{Path, PathBuf};
use std::time::Duration;

use papervista_llm::GeneratorConfig;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Allowed range for the fallback timeout, in seconds.
pub const TIMEOUT_RANGE_SECS: std::ops::RangeInclusive<u64> = 1..=120;

/// Where raw paper metadata comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// In-memory catalog, optionally loaded from a JSON file.
    #[default]
    Catalog,
    /// The arXiv Atom API.
    Arxiv,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Catalog => "catalog",
            ProviderKind::Arxiv => "arxiv",
        }
    }
}

/// Settings for the generative-text fallback.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Normally injected from `GEMINI_API_KEY` / `PAPERVISTA_LLM_API_KEY`.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: GeneratorConfig::DEFAULT_BASE_URL.to_string(),
            model: GeneratorConfig::DEFAULT_MODEL.to_string(),
            timeout_secs: GeneratorConfig::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl std::fmt::Debug for GeneratorSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Configuration for the citation service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Directory of `<name>.csl` files consulted before the built-in styles.
    pub styles_dir: Option<PathBuf>,

    pub provider: ProviderKind,

    /// JSON catalog replacing the built-in seed records.
    pub catalog: Option<PathBuf>,

    /// arXiv API query endpoint.
    pub arxiv_url: String,

    pub generator: GeneratorSettings,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            styles_dir: None,
            provider: ProviderKind::default(),
            catalog: None,
            arxiv_url: crate::provider::arxiv::DEFAULT_ARXIV_URL.to_string(),
            generator: GeneratorSettings::default(),
        }
    }
}

impl HubConfig {
    /// Load from a TOML file, or defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|message| Error::ConfigParse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Reject settings that cannot work.
    pub fn validate(&self) -> Result<()> {
        if !TIMEOUT_RANGE_SECS.contains(&self.generator.timeout_secs) {
            return Err(Error::InvalidConfig(format!(
                "generator timeout must be between {} and {} seconds, got {}",
                TIMEOUT_RANGE_SECS.start(),
                TIMEOUT_RANGE_SECS.end(),
                self.generator.timeout_secs
            )));
        }
        if self.generator.model.trim().is_empty() {
            return Err(Error::InvalidConfig("generator model must not be empty".into()));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Client settings for the fallback generator.
    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            api_key: self
                .generator
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty()),
            base_url: self.generator.base_url.clone(),
            model: self.generator.model.clone(),
            timeout: Duration::from_secs(self.generator.timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = HubConfig::default();
        assert_eq!(config.bind_addr(), "127.0.0.1:8000");
        assert_eq!(config.provider, ProviderKind::Catalog);
        assert_eq!(config.generator.timeout_secs, 20);
        assert!(config.generator_config().api_key.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = HubConfig::from_toml(
            r#"
port = 9000
provider = "arxiv"
styles_dir = "csl_styles"

[generator]
model = "gemini-2.0-flash"
"#,
        )
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.provider, ProviderKind::Arxiv);
        assert_eq!(config.styles_dir, Some(PathBuf::from("csl_styles")));
        assert_eq!(config.generator.model, "gemini-2.0-flash");
        assert_eq!(config.generator.timeout_secs, 20);
    }

    #[test]
    fn test_unknown_provider_is_parse_error() {
        let err = HubConfig::from_toml(r#"provider = "crossref""#).unwrap_err();
        assert!(err.contains("crossref"), "Got: {}", err);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host = \"0.0.0.0\"").unwrap();
        let config = HubConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn test_load_missing_file() {
        let err = HubConfig::load(Some(Path::new("/nonexistent/papervista.toml"))).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }

    #[test]
    fn test_timeout_range() {
        let mut config = HubConfig::default();
        config.generator.timeout_secs = 0;
        assert!(config.validate().is_err());
        config.generator.timeout_secs = 121;
        assert!(config.validate().is_err());
        config.generator.timeout_secs = 120;
        config.validate().unwrap();
    }

    #[test]
    fn test_blank_key_is_unconfigured() {
        let mut config = HubConfig::default();
        config.generator.api_key = Some("  ".to_string());
        assert!(config.generator_config().api_key.is_none());
    }

    #[test]
    fn test_debug_redacts_key() {
        let mut config = HubConfig::default();
        config.generator.api_key = Some("secret-key".to_string());
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret-key"), "Got: {}", debug);
    }
}
