//! Owned XML tree used for output.
//!
//! Unlike the read-only `roxmltree` documents used for input, this tree is
//! built in code. It has an explicit [`XmlNode::CData`] kind so rich-text
//! bodies can be emitted unescaped.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(Element),
    /// Escaped on output.
    Text(String),
    /// Written verbatim inside `<![CDATA[...]]>`.
    CData(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Append a text child; empty strings add nothing so the element
    /// serializes as `<name/>`.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.is_empty() {
            self.children.push(XmlNode::Text(text));
        }
        self
    }

    pub fn with_cdata(mut self, raw: impl Into<String>) -> Self {
        self.children.push(XmlNode::CData(raw.into()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(XmlNode::Element(child));
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    /// Concatenated text and CDATA content of direct children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|c| match c {
                XmlNode::Text(t) | XmlNode::CData(t) => Some(t.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    /// `<name><text>value</text></name>`, the shape Moodle uses for most fields.
    pub fn text_wrapper(name: impl Into<String>, value: impl Into<String>) -> Self {
        Element::new(name).with_child(Element::new("text").with_text(value))
    }
}
