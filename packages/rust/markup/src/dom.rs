//! Minimal owned XML tree built from `quick-xml` events.
//!
//! Names are reduced to their local part and namespace declarations are
//! dropped while reading, so queries never have to care whether a document
//! uses the legacy un-namespaced schema or a namespaced (possibly prefixed) one.

use quick_xml::Reader;
use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::{BytesStart, Event};

use jsondocgen_shared::{DocGenError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
    Comment(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct XmlElement {
    /// Local name, without any namespace prefix.
    pub name: String,
    /// Attributes in document order; `xmlns` bindings are not kept.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Child elements, skipping text and comments.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |el| el.name == name)
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.name == name)
    }

    /// Concatenated text of all descendants, markup removed.
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// The element's content re-serialized as markup, without the element's own tags.
    pub fn inner_markup(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            write_node(node, &mut out);
        }
        out
    }
}

fn collect_text(el: &XmlElement, out: &mut String) {
    for node in &el.children {
        match node {
            XmlNode::Element(child) => collect_text(child, out),
            XmlNode::Text(text) | XmlNode::CData(text) => out.push_str(text),
            XmlNode::Comment(_) => {}
        }
    }
}

fn write_node(node: &XmlNode, out: &mut String) {
    match node {
        XmlNode::Element(el) => {
            out.push('<');
            out.push_str(&el.name);
            for (key, value) in &el.attributes {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(&escape(value.as_str()));
                out.push('"');
            }
            if el.children.is_empty() {
                out.push_str("/>");
            } else {
                out.push('>');
                for child in &el.children {
                    write_node(child, out);
                }
                out.push_str("</");
                out.push_str(&el.name);
                out.push('>');
            }
        }
        XmlNode::Text(text) => out.push_str(&partial_escape(text.as_str())),
        XmlNode::CData(data) => {
            out.push_str("<![CDATA[");
            out.push_str(data);
            out.push_str("]]>");
        }
        XmlNode::Comment(comment) => {
            out.push_str("<!--");
            out.push_str(comment);
            out.push_str("-->");
        }
    }
}

/// Parse a complete document and return its root element.
pub(crate) fn parse_document(xml: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            DocGenError::parse(format!("malformed markup at byte {}: {e}", reader.buffer_position()))
        })?;

        match event {
            Event::Start(start) => stack.push(open_element(&start)?),
            Event::Empty(start) => {
                let el = open_element(&start)?;
                attach(&mut stack, &mut root, XmlNode::Element(el))?;
            }
            Event::End(_) => {
                // end-name mismatches are rejected by the reader itself
                let el = stack
                    .pop()
                    .ok_or_else(|| DocGenError::parse("closing tag without opening tag"))?;
                attach(&mut stack, &mut root, XmlNode::Element(el))?;
            }
            Event::Text(text) => {
                if let Some(parent) = stack.last_mut() {
                    let text = text
                        .unescape()
                        .map_err(|e| DocGenError::parse(format!("bad text content: {e}")))?;
                    parent.children.push(XmlNode::Text(text.into_owned()));
                }
            }
            Event::CData(data) => {
                if let Some(parent) = stack.last_mut() {
                    let data = String::from_utf8_lossy(&data).into_owned();
                    parent.children.push(XmlNode::CData(data));
                }
            }
            Event::Comment(comment) => {
                if let Some(parent) = stack.last_mut() {
                    let comment = String::from_utf8_lossy(&comment).into_owned();
                    parent.children.push(XmlNode::Comment(comment));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(DocGenError::parse(format!("unclosed element <{}>", open.name)));
    }
    root.ok_or_else(|| DocGenError::parse("document has no root element"))
}

fn open_element(start: &BytesStart<'_>) -> Result<XmlElement> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut attributes = Vec::new();

    for attr in start.attributes() {
        let attr =
            attr.map_err(|e| DocGenError::parse(format!("bad attribute on <{name}>: {e}")))?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| DocGenError::parse(format!("bad value for {key} on <{name}>: {e}")))?
            .into_owned();
        attributes.push((key, value));
    }

    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, node: XmlNode) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            if let XmlNode::Element(el) = node {
                if root.is_some() {
                    return Err(DocGenError::parse("more than one root element"));
                }
                *root = Some(el);
            }
        }
    }
    Ok(())
}
