//! Citation record normalization and rules-based rendering.
//!
//! This crate takes raw paper metadata and produces a formatted citation:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     papervista-citeproc                       │
//! │   raw JSON ──normalize──▶ CanonicalCitationRecord ──render──▶ │
//! │                                           String (one entry)  │
//! └──────────────────────────────┬────────────────────────────────┘
//!                                │
//!                                ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │                       papervista-csl                          │
//! │            style registry, CSL parsing, Style types           │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use papervista_citeproc::{OutputFormat, RulesEngine, normalize};
//! use serde_json::json;
//!
//! let record = normalize(&json!({
//!     "id": "X1",
//!     "title": "Attention Is All You Need",
//!     "author": [{"family": "Vaswani", "given": "Ashish"}],
//!     "issued": {"date-parts": [[2017]]}
//! }))
//! .unwrap();
//!
//! let engine = RulesEngine::builtin();
//! let citation = engine.render(&record, "apa", OutputFormat::Plain).unwrap();
//! assert_eq!(citation, "Vaswani, A. (2017). Attention Is All You Need.");
//! ```

pub mod engine;
pub mod error;
mod eval;
pub mod locale;
pub mod normalize;
pub mod output;
pub mod record;

pub use engine::RulesEngine;
pub use error::{FieldProblem, Result, RulesFailure, ValidationError};
pub use locale::LocaleManager;
pub use normalize::{issued_parts, normalize, partial_data, raw_id};
pub use output::{Output, OutputFormat, RenderOptions};
pub use record::{CanonicalCitationRecord, ItemKind, PersonName};
