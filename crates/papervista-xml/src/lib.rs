//! XML tree parsing for papervista.
//!
//! Wraps [`quick-xml`] to build a small owned tree of [`XmlElement`]s. Both
//! CSL style definitions and arXiv Atom feeds go through this crate, so the
//! tree keeps only what those consumers need: local names (namespace prefixes
//! are split off), unescaped attributes, child elements, collected text, and
//! the byte offset of each element for error messages.
//!
//! # Example
//!
//! ```rust
//! use papervista_xml::parse;
//!
//! let feed = parse(r#"<feed xmlns:arxiv="http://arxiv.org/schemas/atom">
//!   <entry>
//!     <title> Attention Is All You Need </title>
//!     <link rel="alternate" href="http://arxiv.org/abs/1706.03762v7"/>
//!     <arxiv:doi>10.48550/arXiv.1706.03762</arxiv:doi>
//!   </entry>
//! </feed>"#).unwrap();
//!
//! let entry = feed.root.get_child("entry").unwrap();
//! assert_eq!(entry.child_text("title"), Some("Attention Is All You Need"));
//! assert_eq!(
//!     entry.get_child("link").and_then(|l| l.get_attribute("href")),
//!     Some("http://arxiv.org/abs/1706.03762v7")
//! );
//! assert!(entry.get_prefixed_child("arxiv", "doi").is_some());
//! ```

pub mod error;
pub mod parser;
pub mod types;

pub use error::{Error, Result};
pub use parser::parse;
pub use types::{XmlAttribute, XmlDocument, XmlElement};
