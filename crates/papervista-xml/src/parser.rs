//! XML parser that builds [`XmlDocument`] trees.

use crate::{Error, Result, XmlAttribute, XmlDocument, XmlElement};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Parse XML from a string into an owned tree.
///
/// Comments, processing instructions, the XML declaration, and DOCTYPE are
/// skipped. Text and CDATA are appended to the enclosing element's `text`.
///
/// # Example
///
/// ```rust
/// use papervista_xml::parse;
///
/// let xml = parse("<root><child/></root>").unwrap();
/// assert_eq!(xml.root.name, "root");
/// assert_eq!(xml.root.children.len(), 1);
/// ```
///
/// # Errors
///
/// Returns an error if the XML is malformed, has no root, or has several.
pub fn parse(content: &str) -> Result<XmlDocument> {
    XmlParser::new(content).parse()
}

/// Internal parser state.
struct XmlParser<'a> {
    /// The quick-xml reader.
    reader: Reader<&'a [u8]>,

    /// Stack of elements being built.
    stack: Vec<XmlElement>,
}

impl<'a> XmlParser<'a> {
    fn new(source: &'a str) -> Self {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;

        Self {
            reader,
            stack: Vec::new(),
        }
    }

    fn parse(&mut self) -> Result<XmlDocument> {
        let mut root: Option<XmlElement> = None;

        loop {
            // Capture position before reading the event
            let event_start = self.reader.buffer_position() as usize;

            match self.reader.read_event() {
                Ok(Event::Start(e)) => {
                    let element = self.open_element(&e, event_start)?;
                    self.stack.push(element);
                }
                Ok(Event::End(e)) => {
                    let end_name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    let (end_local, _) = split_name(&end_name);

                    let element = self
                        .stack
                        .pop()
                        .ok_or_else(|| Error::UnexpectedEndTag {
                            name: end_name.clone(),
                        })?;

                    if element.name != end_local {
                        return Err(Error::MismatchedEndTag {
                            expected: element.name,
                            found: end_local,
                            offset: event_start,
                        });
                    }

                    self.attach(element, &mut root)?;
                }
                Ok(Event::Empty(e)) => {
                    let element = self.open_element(&e, event_start)?;
                    self.attach(element, &mut root)?;
                }
                Ok(Event::Text(e)) => {
                    let text = e.unescape().map_err(|err| Error::Syntax {
                        message: format!("Invalid text content: {}", err),
                        position: event_start as u64,
                    })?;
                    if let Some(node) = self.stack.last_mut() {
                        node.text.push_str(&text);
                    }
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(e.as_ref()).to_string();
                    if let Some(node) = self.stack.last_mut() {
                        node.text.push_str(&text);
                    }
                }
                Ok(Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_)) => {}
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Syntax {
                        message: e.to_string(),
                        position: self.reader.error_position(),
                    });
                }
            }
        }

        if let Some(node) = self.stack.last() {
            return Err(Error::UnclosedElement {
                name: node.name.clone(),
                offset: node.offset,
            });
        }

        let root = root.ok_or(Error::EmptyDocument)?;
        Ok(XmlDocument { root })
    }

    /// Attach a finished element to its parent, or make it the root.
    fn attach(&mut self, element: XmlElement, root: &mut Option<XmlElement>) -> Result<()> {
        match self.stack.last_mut() {
            Some(parent) => {
                parent.children.push(element);
                Ok(())
            }
            None if root.is_some() => Err(Error::MultipleRoots {
                offset: element.offset,
            }),
            None => {
                *root = Some(element);
                Ok(())
            }
        }
    }

    fn open_element(&self, e: &BytesStart<'_>, offset: usize) -> Result<XmlElement> {
        let full_name = String::from_utf8_lossy(e.name().as_ref()).to_string();
        let (name, prefix) = split_name(&full_name);

        let mut attributes = Vec::new();
        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|err| Error::Syntax {
                message: format!("Invalid attribute: {}", err),
                position: offset as u64,
            })?;

            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let (attr_name, attr_prefix) = split_name(&key);

            let value = attr.unescape_value().map_err(|err| Error::Syntax {
                message: format!("Invalid attribute value: {}", err),
                position: offset as u64,
            })?;

            attributes.push(XmlAttribute {
                name: attr_name,
                prefix: attr_prefix,
                value: value.into_owned(),
            });
        }

        Ok(XmlElement {
            name,
            prefix,
            attributes,
            children: Vec::new(),
            text: String::new(),
            offset,
        })
    }
}

/// Split `prefix:local` into `(local, Some(prefix))`.
fn split_name(full_name: &str) -> (String, Option<String>) {
    match full_name.split_once(':') {
        Some((prefix, local)) => (local.to_string(), Some(prefix.to_string())),
        None => (full_name.to_string(), None),
    }
}
