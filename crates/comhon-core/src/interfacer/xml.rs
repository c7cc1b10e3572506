//! XML tree backend
//!
//! Scalars are written as attributes unless a property asks for a child
//! node. Null values are child elements flagged `xsi:nil="true"`; the
//! namespace declaration is added to the root once the export is complete.
//! On read the flag may use any prefix bound to the schema instance
//! namespace.

use super::{Format, InterfacedRef, InterfacedValue, Interfacer, Scalar};
use crate::errors::{ComhonError, Result};
use crate::manifest::ASSOCIATIVE_KEY;
use indexmap::IndexMap;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::{NsReader, Writer};

pub const NIL_ATTRIBUTE: &str = "xsi:nil";
pub const XSI_NAMESPACE_ATTRIBUTE: &str = "xmlns:xsi";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: IndexMap<String, String>,
    pub children: Vec<XmlElement>,
    pub text: String,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    fn child_position(&self, name: &str) -> Option<usize> {
        self.children.iter().position(|c| c.name == name)
    }

    pub fn is_nil(&self) -> bool {
        self.attributes.get(NIL_ATTRIBUTE).is_some_and(|v| v == "true")
    }

    fn nil(name: &str) -> Self {
        XmlElement::new(name).with_attribute(NIL_ATTRIBUTE, "true")
    }

    fn contains_nil(&self) -> bool {
        self.is_nil() || self.children.iter().any(XmlElement::contains_nil)
    }

    fn write<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (name, value) in &self.attributes {
            start.push_attribute((name.as_str(), value.as_str()));
        }
        if self.children.is_empty() && self.text.is_empty() {
            return writer.write_event(Event::Empty(start)).map_err(xml_error);
        }
        writer.write_event(Event::Start(start)).map_err(xml_error)?;
        if !self.text.is_empty() {
            writer
                .write_event(Event::Text(BytesText::new(&self.text)))
                .map_err(xml_error)?;
        }
        for child in &self.children {
            child.write(writer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(xml_error)
    }
}

fn xml_error(err: impl std::fmt::Display) -> ComhonError {
    ComhonError::Serialization {
        message: format!("invalid xml: {}", err),
    }
}

/// Read the element opened by `start`; a nil flag is keyed
/// [`NIL_ATTRIBUTE`] whatever prefix binds the schema instance namespace
fn read_element(reader: &NsReader<&[u8]>, start: &BytesStart<'_>) -> Result<XmlElement> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = XmlElement::new(name);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(xml_error)?;
        let key = match reader.resolve_attribute(attribute.key) {
            (ResolveResult::Bound(Namespace(uri)), local)
                if uri == XSI_NAMESPACE.as_bytes() && local.as_ref() == b"nil" =>
            {
                NIL_ATTRIBUTE.to_string()
            }
            _ => String::from_utf8_lossy(attribute.key.as_ref()).into_owned(),
        };
        let value = attribute.unescape_value().map_err(xml_error)?.into_owned();
        element.attributes.insert(key, value);
    }
    Ok(element)
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(xml_error("multiple root elements")),
    }
    Ok(())
}

/// Parse an XML document into its root element
///
/// # Errors
///
/// Returns `Serialization` for malformed or empty documents.
pub fn parse_document(text: &str) -> Result<XmlElement> {
    let mut reader = NsReader::from_str(text);
    reader.config_mut().trim_text(true);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root = None;
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(start) => stack.push(read_element(&reader, &start)?),
            Event::Empty(start) => {
                let element = read_element(&reader, &start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack.pop().ok_or_else(|| xml_error("unbalanced end tag"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(xml_error)?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if !stack.is_empty() {
        return Err(xml_error("unclosed element"));
    }
    root.ok_or_else(|| xml_error("document has no root element"))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct XmlInterfacer;

impl XmlInterfacer {
    pub fn new() -> Self {
        Self
    }

    fn element_ref(element: &XmlElement) -> InterfacedRef<'_, XmlElement> {
        if element.is_nil() {
            InterfacedRef::Null
        } else {
            InterfacedRef::Node(element)
        }
    }

    fn into_element(name: &str, value: InterfacedValue<XmlElement>) -> XmlElement {
        match value {
            InterfacedValue::Null => XmlElement::nil(name),
            InterfacedValue::Scalar(scalar) => XmlElement::new(name).with_text(scalar.to_string()),
            InterfacedValue::Node(mut element) => {
                element.name = name.to_string();
                element
            }
        }
    }
}

impl Interfacer for XmlInterfacer {
    type Node = XmlElement;

    fn format(&self) -> Format {
        Format::Xml
    }

    fn create_node(&self, name: &str) -> XmlElement {
        XmlElement::new(name)
    }

    fn create_array_node(&self, name: &str, _associative: bool) -> XmlElement {
        XmlElement::new(name)
    }

    /// An XML element does not tell an object from an array by itself
    fn is_array_node(&self, _node: &XmlElement) -> bool {
        false
    }

    fn get_value<'a>(
        &self,
        node: &'a XmlElement,
        name: &str,
        as_node: bool,
    ) -> Option<InterfacedRef<'a, XmlElement>> {
        let attribute = || {
            node.attributes
                .get(name)
                .map(|v| InterfacedRef::Scalar(Scalar::String(v.clone())))
        };
        let child = || node.child(name).map(Self::element_ref);
        if as_node {
            child().or_else(attribute)
        } else {
            attribute().or_else(child)
        }
    }

    fn set_value(&self, node: &mut XmlElement, name: &str, value: InterfacedValue<XmlElement>, as_node: bool) {
        self.unset_value(node, name, as_node);
        match value {
            InterfacedValue::Scalar(scalar) if !as_node => {
                node.attributes.insert(name.to_string(), scalar.to_string());
            }
            other => node.children.push(Self::into_element(name, other)),
        }
    }

    fn unset_value(&self, node: &mut XmlElement, name: &str, _as_node: bool) {
        node.attributes.shift_remove(name);
        node.children.retain(|c| c.name != name);
    }

    fn add_value(&self, array: &mut XmlElement, value: InterfacedValue<XmlElement>, element_name: &str) {
        array.children.push(Self::into_element(element_name, value));
    }

    fn add_associative_value(
        &self,
        array: &mut XmlElement,
        key: &str,
        value: InterfacedValue<XmlElement>,
        element_name: &str,
    ) {
        let mut element = Self::into_element(element_name, value);
        element.attributes.shift_insert(0, ASSOCIATIVE_KEY.to_string(), key.to_string());
        array.children.push(element);
    }

    fn array_entries<'a>(
        &self,
        array: &'a XmlElement,
        associative: bool,
    ) -> Result<Vec<(Option<String>, InterfacedRef<'a, XmlElement>)>> {
        array
            .children
            .iter()
            .map(|child| {
                let key = match (associative, child.attributes.get(ASSOCIATIVE_KEY)) {
                    (true, Some(key)) => Some(key.clone()),
                    (true, None) => {
                        return Err(ComhonError::ArrayShape {
                            model: String::new(),
                            reason: format!("element {} has no {} attribute", child.name, ASSOCIATIVE_KEY),
                        })
                    }
                    (false, _) => None,
                };
                Ok((key, Self::element_ref(child)))
            })
            .collect()
    }

    fn node_scalar(&self, node: &XmlElement) -> Option<Scalar> {
        if node.children.is_empty() {
            Some(Scalar::String(node.text.clone()))
        } else {
            None
        }
    }

    fn child_nodes<'a>(&self, node: &'a XmlElement) -> Vec<&'a XmlElement> {
        node.children.iter().collect()
    }

    fn to_string(&self, node: &XmlElement, pretty: bool) -> Result<String> {
        let mut writer = if pretty {
            Writer::new_with_indent(Vec::new(), b' ', 2)
        } else {
            Writer::new(Vec::new())
        };
        node.write(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(xml_error)
    }

    fn from_string(&self, text: &str) -> Result<XmlElement> {
        parse_document(text)
    }

    fn flatten_node(&self, node: &mut XmlElement, name: &str) -> Result<()> {
        if let Some(position) = node.child_position(name) {
            let child = &node.children[position];
            if child.is_nil() || (child.children.is_empty() && child.attributes.is_empty()) {
                return Ok(());
            }
            let text = self.to_string(child, false)?;
            node.children[position] = XmlElement::new(name).with_text(text);
        }
        Ok(())
    }

    fn unflatten_node(&self, node: &mut XmlElement, name: &str) -> Result<()> {
        if let Some(position) = node.child_position(name) {
            let child = &node.children[position];
            let embedded = child.text.trim_start().starts_with('<');
            if child.is_nil() || !child.children.is_empty() || !embedded {
                return Ok(());
            }
            let mut parsed = parse_document(&child.text)?;
            parsed.name = name.to_string();
            node.children[position] = parsed;
        }
        Ok(())
    }

    fn finalize_export(&self, root: &mut XmlElement) {
        if root.contains_nil() && !root.attributes.contains_key(XSI_NAMESPACE_ATTRIBUTE) {
            root.attributes
                .shift_insert(0, XSI_NAMESPACE_ATTRIBUTE.to_string(), XSI_NAMESPACE.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document() {
        let root = parse_document(
            r#"<person id="1" name="A &amp; B"><address city="Paris"/><nick>al</nick></person>"#,
        )
        .unwrap();
        assert_eq!(root.name, "person");
        assert_eq!(root.attributes.get("name").map(String::as_str), Some("A & B"));
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.child("nick").map(|c| c.text.as_str()), Some("al"));
    }

    #[test]
    fn test_parse_rejects_unbalanced() {
        assert!(parse_document("<a><b></a>").is_err());
        assert!(parse_document("").is_err());
    }

    #[test]
    fn test_attribute_and_node_lookup() {
        let interfacer = XmlInterfacer::new();
        let mut node = interfacer.create_node("person");
        interfacer.set_value(&mut node, "age", InterfacedValue::Scalar(Scalar::Int(3)), false);
        interfacer.set_value(&mut node, "bio", InterfacedValue::Scalar(Scalar::String("x".into())), true);
        interfacer.set_value(&mut node, "father", InterfacedValue::Null, false);

        assert!(matches!(
            interfacer.get_value(&node, "age", false),
            Some(InterfacedRef::Scalar(Scalar::String(s))) if s == "3"
        ));
        assert!(interfacer.is_node_value(&node, "bio", true));
        assert!(interfacer.is_null_value(&node, "father", false));
    }

    #[test]
    fn test_nil_namespace_added_at_the_end() {
        let interfacer = XmlInterfacer::new();
        let mut root = interfacer.create_node("person");
        let mut child = interfacer.create_node("child");
        interfacer.set_value(&mut child, "father", InterfacedValue::Null, false);
        interfacer.set_value(&mut root, "child", InterfacedValue::Node(child), true);
        assert!(!root.attributes.contains_key(XSI_NAMESPACE_ATTRIBUTE));

        interfacer.finalize_export(&mut root);
        let text = interfacer.to_string(&root, false).unwrap();
        assert_eq!(
            text,
            r#"<person xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><child><father xsi:nil="true"/></child></person>"#
        );
    }

    #[test]
    fn test_associative_entries_need_keys() {
        let interfacer = XmlInterfacer::new();
        let mut array = interfacer.create_array_node("tags", true);
        interfacer.add_associative_value(&mut array, "a", InterfacedValue::Scalar(Scalar::Int(1)), "tag");
        let entries = interfacer.array_entries(&array, true).unwrap();
        assert_eq!(entries[0].0.as_deref(), Some("a"));

        let plain = XmlElement::new("tags").with_child(XmlElement::new("tag").with_text("1"));
        assert!(matches!(
            interfacer.array_entries(&plain, true),
            Err(ComhonError::ArrayShape { .. })
        ));
    }

    #[test]
    fn test_flatten_round_trip() {
        let interfacer = XmlInterfacer::new();
        let mut node = XmlElement::new("person")
            .with_child(XmlElement::new("address").with_attribute("city", "Paris"));
        interfacer.flatten_node(&mut node, "address").unwrap();
        assert_eq!(
            node.child("address").map(|c| c.text.as_str()),
            Some(r#"<address city="Paris"/>"#)
        );
        interfacer.unflatten_node(&mut node, "address").unwrap();
        assert_eq!(
            node.child("address").and_then(|c| c.attributes.get("city")).map(String::as_str),
            Some("Paris")
        );
    }

    #[test]
    fn test_writer_escapes_text_and_attributes() {
        let interfacer = XmlInterfacer::new();
        let node = XmlElement::new("note")
            .with_attribute("by", r#"A & "B""#)
            .with_text("1 < 2 & 3");
        let text = interfacer.to_string(&node, false).unwrap();
        assert_eq!(text, r#"<note by="A &amp; &quot;B&quot;">1 &lt; 2 &amp; 3</note>"#);
        assert_eq!(parse_document(&text).unwrap(), node);
    }

    #[test]
    fn test_pretty_output_indents_children() {
        let interfacer = XmlInterfacer::new();
        let node = XmlElement::new("a")
            .with_child(XmlElement::new("b"))
            .with_child(XmlElement::new("c").with_text("x"));
        let text = interfacer.to_string(&node, true).unwrap();
        assert!(text.contains("\n  <b/>"));
        assert!(text.contains("\n  <c>x</c>"));
        assert!(text.ends_with("\n</a>"));
        assert_eq!(parse_document(&text).unwrap(), node);
    }

    #[test]
    fn test_nil_flag_is_resolved_by_namespace() {
        let interfacer = XmlInterfacer::new();
        let root = parse_document(
            r#"<person xmlns:i="http://www.w3.org/2001/XMLSchema-instance"><father i:nil="true"/><mother xsi:nil="true"/></person>"#,
        )
        .unwrap();
        assert!(interfacer.is_null_value(&root, "father", false));
        assert!(interfacer.is_null_value(&root, "mother", false));

        let foreign = parse_document(r#"<person xmlns:i="urn:other"><father i:nil="true"/></person>"#).unwrap();
        assert!(!interfacer.is_null_value(&foreign, "father", false));
    }
}
