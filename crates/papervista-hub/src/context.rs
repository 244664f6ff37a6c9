//! Hub context - shared state for the server
//!
//! Everything in here is immutable after startup, so handlers share it
//! through an `Arc` without locking.

use std::sync::Arc;

use papervista_citeproc::RulesEngine;
use papervista_csl::StyleRegistry;
use papervista_llm::{FallbackGenerator, OpenAiCompatibleGenerator};
use tracing::info;

use crate::config::{HubConfig, ProviderKind};
use crate::error::Result;
use crate::orchestrator::Orchestrator;
use crate::provider::{ArxivProvider, CatalogProvider, MetadataProvider};

pub struct HubContext {
    config: HubConfig,
    orchestrator: Orchestrator,
    provider: Arc<dyn MetadataProvider>,
}

pub type SharedContext = Arc<HubContext>;

impl HubContext {
    pub fn new(
        config: HubConfig,
        orchestrator: Orchestrator,
        provider: Arc<dyn MetadataProvider>,
    ) -> Self {
        Self {
            config,
            orchestrator,
            provider,
        }
    }

    /// Build the production context: style registry, generator client, and
    /// metadata provider, all from `config`.
    pub fn from_config(config: HubConfig) -> Result<Self> {
        config.validate()?;

        let registry = StyleRegistry::with_directory(config.styles_dir.clone());
        let engine = RulesEngine::new(Arc::new(registry));

        let generator_config = config.generator_config();
        let timeout = generator_config.timeout;
        let generator = OpenAiCompatibleGenerator::new(generator_config);
        let fallback = FallbackGenerator::new(Arc::new(generator), timeout);

        let provider: Arc<dyn MetadataProvider> = match config.provider {
            ProviderKind::Catalog => match &config.catalog {
                Some(path) => Arc::new(CatalogProvider::from_file(path)?),
                None => Arc::new(CatalogProvider::seeded()),
            },
            ProviderKind::Arxiv => Arc::new(ArxivProvider::new(config.arxiv_url.clone())),
        };

        info!(
            provider = provider.name(),
            styles_dir = ?config.styles_dir,
            model = %config.generator.model,
            fallback_configured = fallback.is_configured(),
            "Citation context ready"
        );

        Ok(Self::new(config, Orchestrator::new(engine, fallback), provider))
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn provider(&self) -> &dyn MetadataProvider {
        self.provider.as_ref()
    }
}
