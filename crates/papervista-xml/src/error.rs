//! Error types for XML parsing.

/// Result type alias for papervista-xml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building an XML tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Malformed XML reported by quick-xml.
    #[error("XML syntax error at byte {position}: {message}")]
    Syntax { message: String, position: u64 },

    /// A closing tag that does not match the open element.
    #[error("Mismatched closing tag: expected </{expected}>, found </{found}> (byte {offset})")]
    MismatchedEndTag {
        expected: String,
        found: String,
        offset: usize,
    },

    /// A closing tag with no open element.
    #[error("Unexpected closing tag </{name}>")]
    UnexpectedEndTag { name: String },

    /// The input ended while elements were still open.
    #[error("Unexpected end of input: <{name}> opened at byte {offset} is never closed")]
    UnclosedElement { name: String, offset: usize },

    /// More than one top-level element.
    #[error("Multiple root elements (second root at byte {offset})")]
    MultipleRoots { offset: usize },

    /// No elements at all.
    #[error("Empty document: no root element")]
    EmptyDocument,
}
