//! Minimal XML element tree for CIB fragments.
//!
//! The CIB only uses elements and attributes, so text, comments and
//! processing instructions are dropped on parse. Attribute order is kept
//! as read; equality on [`Element`] is therefore order-sensitive and the
//! model layer decides what ordering is significant.

use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};

/// An XML element with ordered attributes and child elements.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder form of [`Element::set_attr`].
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Builder form of [`Element::push`].
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn remove_attr(&mut self, key: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(k, _)| k == key)?;
        Some(self.attributes.remove(pos).1)
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    /// First direct child with the given tag.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Direct children with the given tag.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Depth-first search (self included) for an element with `id`.
    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        if self.id() == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_by_id(id))
    }

    /// Depth-first search (self included) for the first element named `name`.
    pub fn find_named(&self, name: &str) -> Option<&Element> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_named(name))
    }

    pub fn find_named_mut(&mut self, name: &str) -> Option<&mut Element> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_named_mut(name))
    }

    /// Replace the descendant with `id`. Returns false if none matched.
    pub fn replace_by_id(&mut self, id: &str, replacement: Element) -> bool {
        for child in &mut self.children {
            if child.id() == Some(id) {
                *child = replacement;
                return true;
            }
        }
        self.children
            .iter_mut()
            .any(|c| c.replace_by_id(id, replacement.clone()))
    }

    /// Remove and return the descendant with `id`.
    pub fn remove_by_id(&mut self, id: &str) -> Option<Element> {
        if let Some(pos) = self.children.iter().position(|c| c.id() == Some(id)) {
            return Some(self.children.remove(pos));
        }
        self.children.iter_mut().find_map(|c| c.remove_by_id(id))
    }

    /// Every `id` attribute in this subtree, self first.
    pub fn ids(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_ids(&mut out);
        out
    }

    fn collect_ids<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Some(id) = self.id() {
            out.push(id);
        }
        for child in &self.children {
            child.collect_ids(out);
        }
    }

    /// Parse a document and return its root element.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(e) => {
                    return Err(Error::Xml(format!(
                        "{e} at byte {}",
                        reader.error_position()
                    )));
                }
            };
            match event {
                Event::Start(start) => stack.push(element_from(&start)?),
                Event::Empty(start) => attach(&mut stack, &mut root, element_from(&start)?)?,
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| Error::Xml("unexpected closing tag".into()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(Error::Xml(format!("unclosed element <{}>", open.name)));
        }
        root.ok_or_else(|| Error::Xml("document has no root element".into()))
    }

    /// Compact single-line rendering, as passed to `--xml-text`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.write(&mut out, None);
        out
    }

    /// Indented rendering for human-readable diffs.
    pub fn render_pretty(&self) -> String {
        let mut out = String::new();
        self.write(&mut out, Some(0));
        out
    }

    fn write(&self, out: &mut String, depth: Option<usize>) {
        if let Some(d) = depth {
            out.push_str(&"  ".repeat(d));
        }
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape(value.as_str()));
            out.push('"');
        }

        if self.children.is_empty() {
            out.push_str("/>");
        } else {
            out.push('>');
            for child in &self.children {
                if depth.is_some() {
                    out.push('\n');
                }
                child.write(out, depth.map(|d| d + 1));
            }
            if let Some(d) = depth {
                out.push('\n');
                out.push_str(&"  ".repeat(d));
            }
            out.push_str("</");
            out.push_str(&self.name);
            out.push('>');
        }
    }
}

fn element_from(start: &BytesStart<'_>) -> Result<Element> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::Xml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::Xml(e.to_string()))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(Error::Xml(format!(
            "unexpected second root element <{}>",
            element.name
        )));
    }
    *root = Some(element);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested() {
        let xml = r#"<?xml version="1.0"?>
            <!-- comment -->
            <primitive id="vip" class="ocf" provider="heartbeat" type="IPaddr2">
              <instance_attributes id="vip-instance_attributes">
                <nvpair id="vip-instance_attributes-ip" name="ip" value="10.0.0.1"/>
              </instance_attributes>
            </primitive>"#;
        let root = Element::parse(xml).unwrap();

        assert_eq!(root.name, "primitive");
        assert_eq!(root.attr("type"), Some("IPaddr2"));
        let nvpair = root.find_by_id("vip-instance_attributes-ip").unwrap();
        assert_eq!(nvpair.attr("value"), Some("10.0.0.1"));
    }

    #[test]
    fn test_render_escapes_values() {
        let el = Element::new("nvpair")
            .with_attr("name", "options")
            .with_attr("value", r#"a<b & "c""#);
        let xml = el.render();

        assert_eq!(
            xml,
            r#"<nvpair name="options" value="a&lt;b &amp; &quot;c&quot;"/>"#
        );
        assert_eq!(Element::parse(&xml).unwrap(), el);
    }

    #[test]
    fn test_render_pretty_indents_children() {
        let el = Element::new("group")
            .with_attr("id", "web")
            .with_child(Element::new("primitive").with_attr("id", "vip"));

        assert_eq!(
            el.render_pretty(),
            "<group id=\"web\">\n  <primitive id=\"vip\"/>\n</group>"
        );
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(Element::parse("<a><b></a>"), Err(Error::Xml(_))));
        assert!(matches!(Element::parse("<a>"), Err(Error::Xml(_))));
        assert!(matches!(Element::parse(""), Err(Error::Xml(_))));
        assert!(matches!(Element::parse("<a/><b/>"), Err(Error::Xml(_))));
    }

    #[test]
    fn test_replace_and_remove_by_id() {
        let mut root = Element::new("resources")
            .with_child(Element::new("primitive").with_attr("id", "a"))
            .with_child(
                Element::new("group")
                    .with_attr("id", "g")
                    .with_child(Element::new("primitive").with_attr("id", "b")),
            );

        assert!(root.replace_by_id("b", Element::new("primitive").with_attr("id", "b2")));
        assert!(root.find_by_id("b2").is_some());
        assert!(!root.replace_by_id("missing", Element::new("x")));

        let removed = root.remove_by_id("a").unwrap();
        assert_eq!(removed.id(), Some("a"));
        assert_eq!(root.ids(), vec!["g", "b2"]);
    }

    #[test]
    fn test_set_attr_keeps_position() {
        let mut el = Element::new("op")
            .with_attr("id", "x")
            .with_attr("name", "monitor");
        el.set_attr("id", "y");
        assert_eq!(el.attributes[0], ("id".to_string(), "y".to_string()));
        assert_eq!(el.remove_attr("name"), Some("monitor".to_string()));
        assert_eq!(el.attr("name"), None);
    }
}
