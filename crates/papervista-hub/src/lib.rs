//! papervista-hub: the hybrid citation service
//!
//! This crate provides:
//! - The [`Orchestrator`]: rules-based rendering first, generative fallback second
//! - Metadata providers (in-memory catalog, arXiv) behind [`provider::MetadataProvider`]
//! - Configuration loading
//! - The HTTP API served by the `papervista` binary, and a client for it

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod provider;
pub mod server;

pub use config::{HubConfig, ProviderKind};
pub use context::{HubContext, SharedContext};
pub use error::{Error, Result};
pub use orchestrator::{CitationResult, CitationSource, Orchestrator, ResolutionError};
