//! CSL (Citation Style Language) style definitions for papervista.
//!
//! This crate parses the subset of CSL 1.0 that the papervista rules engine
//! evaluates and resolves style names to parsed [`Style`]s.
//!
//! # Example
//!
//! ```rust
//! use papervista_csl::StyleRegistry;
//!
//! let registry = StyleRegistry::builtin();
//! let apa = registry.load("apa").unwrap().expect("apa is built in");
//! assert!(apa.bibliography.is_some());
//! assert!(registry.load("klingon").unwrap().is_none());
//! ```
//!
//! Styles are looked up through [`StyleSource`]s: [`EmbeddedStyles`] carries
//! the built-in `apa`, `mla`, `ieee`, `chicago-author-date`, and `harvard`
//! styles, and [`DirectoryStyles`] reads `<name>.csl` files from disk.

pub mod error;
pub mod parser;
pub mod registry;
pub mod source;
pub mod types;

pub use error::{Error, Result};
pub use parser::{parse_csl, parse_locale};
pub use registry::{StyleRegistry, normalize_style_name};
pub use source::{DirectoryStyles, EmbeddedStyles, StyleSource};
pub use types::*;
