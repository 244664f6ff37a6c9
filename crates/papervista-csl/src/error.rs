//! Error types for CSL parsing and style lookup.

use std::path::PathBuf;

/// Result type alias for papervista-csl operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or parsing a CSL style.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// XML parsing error from papervista-xml.
    #[error("XML error: {0}")]
    Xml(#[from] papervista_xml::Error),

    /// Root element is not <style>.
    #[error("Expected root element <style>, found <{found}>")]
    InvalidRootElement { found: String },

    /// Missing required attribute.
    #[error("Missing required attribute '{attribute}' on <{element}>")]
    MissingAttribute { element: String, attribute: String },

    /// Invalid attribute value.
    #[error("Invalid value '{value}' for attribute '{attribute}' on <{element}>: expected {expected}")]
    InvalidAttributeValue {
        element: String,
        attribute: String,
        value: String,
        expected: String,
    },

    /// Missing required element.
    #[error("Missing required element <{element}> in <{parent}>")]
    MissingElement { parent: String, element: String },

    /// Element outside the supported rendering subset.
    #[error("Unexpected element <{element}> in {context}")]
    UnexpectedElement { element: String, context: String },

    /// Missing text source in <text> element.
    #[error(
        "The <text> element must have one of: variable, macro, term, or value attribute"
    )]
    MissingTextSource,

    /// Undefined macro reference.
    #[error("Undefined macro '{name}'{}", suggestion.as_ref().map(|s| format!(" (did you mean '{}'?)", s)).unwrap_or_default())]
    UndefinedMacro {
        name: String,
        /// Suggestion for similar macro name, if any.
        suggestion: Option<String>,
    },

    /// Circular macro dependency.
    #[error("Circular macro dependency: {}", chain.join(" -> "))]
    CircularMacro {
        /// The chain of macro names forming the cycle.
        chain: Vec<String>,
    },

    /// Duplicate macro definition.
    #[error("Macro '{name}' is defined more than once")]
    DuplicateMacro { name: String },

    /// Style name that cannot be used for lookup.
    #[error("Invalid style name '{name}'")]
    InvalidStyleName { name: String },

    /// Reading a style file failed.
    #[error("Failed to read style file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An embedded style file is not valid UTF-8.
    #[error("Embedded style '{name}' is not valid UTF-8")]
    InvalidEncoding { name: String },
}
