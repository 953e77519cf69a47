//! Minimal generic XML tree used as the intermediate form for sidecar
//! parsing. NFO files are loosely structured, so fields are projected out of
//! this tree with explicit per-field fallback rules rather than deserialized
//! against a schema.

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::events::Event;

/// One element of the parsed document: name, attributes, accumulated inline
/// text, and child elements in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// First child with the given element name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given element name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text of the first child with the given name, or `""`.
    pub fn text_of(&self, name: &str) -> &str {
        self.child(name).map(|c| c.text.trim()).unwrap_or("")
    }

    /// Attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Parse a document into its root element.
pub fn parse_document(input: &str) -> Result<XmlElement, quick_xml::Error> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                stack.push(element_from_start(&start));
            }
            Event::Empty(start) => {
                let element = element_from_start(&start);
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None if root.is_none() => root = Some(element),
                    None => {}
                }
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.text
                        .push_str(&text.xml_content().unwrap_or(Cow::Borrowed("")));
                }
            }
            Event::CData(cdata) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&cdata));
                }
            }
            Event::End(_) => {
                if let Some(done) = stack.pop() {
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(done),
                        None if root.is_none() => root = Some(done),
                        None => {}
                    }
                }
            }
            Event::Eof => break,
            // Declarations, comments, PIs, doctypes carry no catalog data
            _ => {}
        }
    }

    Ok(root.unwrap_or_default())
}

fn element_from_start(start: &quick_xml::events::BytesStart<'_>) -> XmlElement {
    let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
    let attrs = start
        .attributes()
        .flatten()
        .map(|a| {
            let key = String::from_utf8_lossy(a.key.as_ref()).to_string();
            let value = a
                .unescape_value()
                .unwrap_or(Cow::Borrowed(""))
                .to_string();
            (key, value)
        })
        .collect();

    XmlElement {
        name,
        attrs,
        text: String::new(),
        children: Vec::new(),
    }
}
