//! Style-definition sources.
//!
//! A [`StyleSource`] maps a style name (such as `apa`) to raw CSL text, or
//! reports that it does not know the name. The built-in styles are compiled
//! into the binary with `include_dir`; extra styles can be dropped into a
//! directory as `<name>.csl`.

use crate::error::{Error, Result};
use include_dir::{Dir, include_dir};
use std::path::{Path, PathBuf};

/// Built-in CSL styles directory.
static BUILTIN_STYLES: Dir = include_dir!("$CARGO_MANIFEST_DIR/styles");

/// Anything that can look up CSL text by style name.
pub trait StyleSource: Send + Sync {
    /// Load the CSL text for `name`, or `Ok(None)` if this source has no such style.
    fn load(&self, name: &str) -> Result<Option<String>>;

    /// Names of all styles this source provides.
    fn names(&self) -> Vec<String>;
}

/// Styles compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedStyles;

impl StyleSource for EmbeddedStyles {
    fn load(&self, name: &str) -> Result<Option<String>> {
        let Some(file) = BUILTIN_STYLES.get_file(format!("{}.csl", name)) else {
            return Ok(None);
        };

        file.contents_utf8()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| Error::InvalidEncoding {
                name: name.to_string(),
            })
    }

    fn names(&self) -> Vec<String> {
        BUILTIN_STYLES
            .files()
            .filter_map(|f| style_name(f.path()))
            .collect()
    }
}

/// Styles read from `<dir>/<name>.csl` at lookup time.
#[derive(Debug, Clone)]
pub struct DirectoryStyles {
    dir: PathBuf,
}

impl DirectoryStyles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl StyleSource for DirectoryStyles {
    fn load(&self, name: &str) -> Result<Option<String>> {
        let path = self.dir.join(format!("{}.csl", name));
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(Error::Io { path, source }),
        }
    }

    fn names(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| style_name(&entry.path()))
            .collect()
    }
}

/// `apa.csl` -> `apa`; anything without the `.csl` extension is skipped.
fn style_name(path: &Path) -> Option<String> {
    if path.extension()? != "csl" {
        return None;
    }
    path.file_stem()?.to_str().map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_styles_include_builtins() {
        let names = EmbeddedStyles.names();
        for expected in ["apa", "mla", "ieee", "chicago-author-date", "harvard"] {
            assert!(names.iter().any(|n| n == expected), "missing {}: {:?}", expected, names);
        }
    }

    #[test]
    fn test_embedded_unknown_style() {
        assert!(EmbeddedStyles.load("klingon").unwrap().is_none());
    }

    #[test]
    fn test_embedded_styles_all_parse() {
        for name in EmbeddedStyles.names() {
            let csl = EmbeddedStyles.load(&name).unwrap().unwrap();
            let style = crate::parse_csl(&csl);
            assert!(style.is_ok(), "{} failed to parse: {:?}", name, style.err());
            assert!(
                style.is_ok_and(|s| s.bibliography.is_some()),
                "{} has no bibliography",
                name
            );
        }
    }

    #[test]
    fn test_directory_styles() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("custom.csl"), "<style/>").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let source = DirectoryStyles::new(dir.path());
        assert_eq!(source.load("custom").unwrap().as_deref(), Some("<style/>"));
        assert!(source.load("missing").unwrap().is_none());
        assert_eq!(source.names(), vec!["custom".to_string()]);
    }

    #[test]
    fn test_missing_directory_has_no_names() {
        let source = DirectoryStyles::new("/nonexistent/papervista/styles");
        assert!(source.names().is_empty());
        assert!(source.load("apa").unwrap().is_none());
    }
}
