//! Lookup of parsed styles by name across several sources.

use crate::error::{Error, Result};
use crate::parser::parse_csl;
use crate::source::{DirectoryStyles, EmbeddedStyles, StyleSource};
use crate::types::Style;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// An ordered chain of [`StyleSource`]s. The first source that knows a name wins.
pub struct StyleRegistry {
    sources: Vec<Box<dyn StyleSource>>,
}

impl StyleRegistry {
    /// A registry with only the built-in styles.
    pub fn builtin() -> Self {
        Self {
            sources: vec![Box::new(EmbeddedStyles)],
        }
    }

    /// A registry that checks `dir` before the built-in styles.
    pub fn with_directory(dir: Option<PathBuf>) -> Self {
        let mut registry = Self {
            sources: Vec::new(),
        };
        if let Some(dir) = dir {
            registry.sources.push(Box::new(DirectoryStyles::new(dir)));
        }
        registry.sources.push(Box::new(EmbeddedStyles));
        registry
    }

    /// A registry over exactly the given sources, in priority order.
    pub fn from_sources(sources: Vec<Box<dyn StyleSource>>) -> Self {
        Self { sources }
    }

    /// Look up raw CSL text. `Ok(None)` means no source has the style.
    pub fn load_source(&self, name: &str) -> Result<Option<String>> {
        let key = normalize_style_name(name)?;
        for source in &self.sources {
            if let Some(csl) = source.load(&key)? {
                tracing::debug!(style = %key, "Loaded style definition");
                return Ok(Some(csl));
            }
        }
        Ok(None)
    }

    /// Look up and parse a style. `Ok(None)` means no source has the style.
    pub fn load(&self, name: &str) -> Result<Option<Style>> {
        self.load_source(name)?
            .map(|csl| parse_csl(&csl))
            .transpose()
    }

    /// Sorted, de-duplicated names from every source.
    pub fn names(&self) -> Vec<String> {
        let names: BTreeSet<String> = self.sources.iter().flat_map(|s| s.names()).collect();
        names.into_iter().collect()
    }
}

impl Default for StyleRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Lower-case and trim a style name, rejecting anything that could escape a
/// style directory.
pub fn normalize_style_name(name: &str) -> Result<String> {
    let key = name.trim().to_lowercase();
    let invalid = key.is_empty()
        || key.contains(['/', '\\'])
        || key.starts_with('.')
        || key.contains("..");
    if invalid {
        return Err(Error::InvalidStyleName {
            name: name.to_string(),
        });
    }
    Ok(key)
}
