//! Owned XML tree types.

#[derive(Debug, Clone)]
pub struct XmlDocument {
    pub root: XmlElement,
}

#[derive(Debug, Clone, Default)]
pub struct XmlElement {
    /// Local name; `arxiv:doi` is stored as `doi` with prefix `arxiv`.
    pub name: String,

    /// Namespace prefix, if any (e.g., "arxiv" in `<arxiv:doi>`).
    pub prefix: Option<String>,

    /// Attributes in document order.
    pub attributes: Vec<XmlAttribute>,

    /// Child elements in document order.
    pub children: Vec<XmlElement>,

    /// Concatenated text content directly inside this element.
    pub text: String,

    /// Byte offset of the element's `<` in the source.
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub name: String,
    /// `xml` for `xml:lang`.
    pub prefix: Option<String>,
    /// Entities already unescaped.
    pub value: String,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Value of the first attribute with this local name, any prefix.
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Get child elements by local name.
    pub fn get_children(&self, name: &str) -> Vec<&XmlElement> {
        self.children.iter().filter(|e| e.name == name).collect()
    }

    /// Get the first child element with the given local name.
    pub fn get_child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|e| e.name == name)
    }

    /// Get the first child element with the given prefix and local name.
    pub fn get_prefixed_child(&self, prefix: &str, name: &str) -> Option<&XmlElement> {
        self.children
            .iter()
            .find(|e| e.name == name && e.prefix.as_deref() == Some(prefix))
    }

    /// Trimmed text of the first child with the given name, if non-empty.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.get_child(name)
            .map(|c| c.text.trim())
            .filter(|t| !t.is_empty())
    }

    pub fn has_elements(&self) -> bool {
        !self.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(name: &str, value: &str) -> XmlAttribute {
        XmlAttribute {
            name: name.to_string(),
            prefix: None,
            value: value.to_string(),
        }
    }

    #[test]
    fn test_element_get_attribute() {
        let mut element = XmlElement::new("test");
        element.attributes.push(attr("name", "value"));

        assert_eq!(element.get_attribute("name"), Some("value"));
        assert_eq!(element.get_attribute("missing"), None);
    }

    #[test]
    fn test_child_text_skips_blank() {
        let mut title = XmlElement::new("title");
        title.text = "  A Title \n".to_string();
        let blank = XmlElement::new("summary");

        let mut parent = XmlElement::new("entry");
        parent.children = vec![title, blank];

        assert!(parent.has_elements());
        assert_eq!(parent.child_text("title"), Some("A Title"));
        assert_eq!(parent.child_text("summary"), None);
        assert_eq!(parent.child_text("missing"), None);
    }
}
