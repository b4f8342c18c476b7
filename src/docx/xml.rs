//! Owned XML element tree for OOXML parts.
//!
//! `quick-xml` streams events; Word templates need random access (clone a
//! table, move a paragraph), so parts are materialised into [`Element`]s and
//! written back once editing is done.

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use super::DocxError;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    /// Raw comment body, written back unchanged.
    Comment(String),
    /// Raw processing instruction, target included.
    Pi(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Qualified-name comparison, e.g. `el.is("w:p")`.
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(Node::as_element_mut)
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|el| el.is(name))
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.elements_mut().find(|el| el.is(name))
    }

    pub fn remove_children(&mut self, name: &str) {
        self.children
            .retain(|node| !matches!(node, Node::Element(el) if el.is(name)));
    }

    /// Concatenated character data of the whole subtree.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(t) | Node::CData(t) => out.push_str(t),
                Node::Element(el) => el.collect_text(out),
                Node::Comment(_) | Node::Pi(_) => {}
            }
        }
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![Node::Text(text.into())];
    }

    /// Pre-order visit of every descendant named `name`. Matched elements
    /// are not searched further.
    pub fn for_each_named_mut(&mut self, name: &str, f: &mut dyn FnMut(&mut Element)) {
        for child in self.elements_mut() {
            if child.is(name) {
                f(child);
            } else {
                child.for_each_named_mut(name, f);
            }
        }
    }

    pub fn for_each_named(&self, name: &str, f: &mut dyn FnMut(&Element)) {
        for child in self.elements() {
            if child.is(name) {
                f(child);
            } else {
                child.for_each_named(name, f);
            }
        }
    }

    /// Depth-first search for the first descendant named `name`.
    pub fn find_mut(&mut self, name: &str) -> Option<&mut Element> {
        for child in self.elements_mut() {
            if child.is(name) {
                return Some(child);
            }
            if let Some(found) = child.find_mut(name) {
                return Some(found);
            }
        }
        None
    }

    pub fn find(&self, name: &str) -> Option<&Element> {
        for child in self.elements() {
            if child.is(name) {
                return Some(child);
            }
            if let Some(found) = child.find(name) {
                return Some(found);
            }
        }
        None
    }
}

/// A parsed XML part: the root element, whether it carried a declaration,
/// and the comments or processing instructions around the root.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    pub declaration: bool,
    pub prolog: Vec<Node>,
    pub root: Element,
    pub epilog: Vec<Node>,
}

impl XmlDocument {
    pub fn parse(source: &str) -> Result<Self, DocxError> {
        let source = source.trim_start_matches('\u{feff}');
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text(false);

        let mut declaration = false;
        let mut prolog = Vec::new();
        let mut epilog = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader.read_event().map_err(|e| {
                DocxError::Xml(format!(
                    "{} at byte {}",
                    e,
                    reader.buffer_position()
                ))
            })?;

            match event {
                Event::Decl(_) => declaration = true,
                Event::Start(start) => stack.push(element_from_start(&start)?),
                Event::Empty(start) => {
                    let el = element_from_start(&start)?;
                    attach(&mut stack, &mut root, el)?;
                }
                Event::End(_) => {
                    let el = stack
                        .pop()
                        .ok_or_else(|| DocxError::Xml("unbalanced end tag".to_string()))?;
                    attach(&mut stack, &mut root, el)?;
                }
                Event::Text(text) => {
                    if let Some(parent) = stack.last_mut() {
                        let value = text.unescape().map_err(|e| DocxError::Xml(e.to_string()))?;
                        parent.children.push(Node::Text(value.into_owned()));
                    }
                }
                Event::CData(data) => {
                    if let Some(parent) = stack.last_mut() {
                        let raw = data.into_inner();
                        parent
                            .children
                            .push(Node::CData(String::from_utf8_lossy(&raw).into_owned()));
                    }
                }
                Event::Comment(comment) => {
                    let node = Node::Comment(String::from_utf8_lossy(&comment.into_inner()).into_owned());
                    place_misc(&mut stack, &root, &mut prolog, &mut epilog, node);
                }
                Event::PI(pi) => {
                    let node = Node::Pi(String::from_utf8_lossy(&pi).into_owned());
                    place_misc(&mut stack, &root, &mut prolog, &mut epilog, node);
                }
                Event::Eof => break,
                // DOCTYPE and general references never appear in OOXML parts.
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(DocxError::Xml(format!("unclosed element <{}>", stack[stack.len() - 1].name)));
        }

        let root = root.ok_or_else(|| DocxError::Xml("document has no root element".to_string()))?;
        Ok(Self {
            declaration,
            prolog,
            root,
            epilog,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DocxError> {
        let mut writer = Writer::new(Vec::new());
        if self.declaration {
            writer
                .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
                .map_err(write_error)?;
            // Word writes the root on its own line after the declaration.
            writer
                .write_event(Event::Text(BytesText::from_escaped("\r\n")))
                .map_err(write_error)?;
        }
        for node in &self.prolog {
            write_node(&mut writer, node)?;
        }
        write_element(&mut writer, &self.root)?;
        for node in &self.epilog {
            write_node(&mut writer, node)?;
        }
        Ok(writer.into_inner())
    }

    pub fn to_string_lossy(&self) -> Result<String, DocxError> {
        Ok(String::from_utf8_lossy(&self.to_bytes()?).into_owned())
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, DocxError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut el = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| DocxError::Xml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| DocxError::Xml(e.to_string()))?
            .into_owned();
        el.attributes.push((key, value));
    }
    Ok(el)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) -> Result<(), DocxError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(Node::Element(el));
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(el);
            Ok(())
        }
        None => Err(DocxError::Xml("multiple root elements".to_string())),
    }
}

/// Comments and PIs go to the open element, or around the root at top level.
fn place_misc(
    stack: &mut [Element],
    root: &Option<Element>,
    prolog: &mut Vec<Node>,
    epilog: &mut Vec<Node>,
    node: Node,
) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => prolog.push(node),
        None => epilog.push(node),
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, el: &Element) -> Result<(), DocxError> {
    let mut start = BytesStart::new(el.name.as_str());
    for (key, value) in &el.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if el.children.is_empty() {
        writer.write_event(Event::Empty(start)).map_err(write_error)?;
        return Ok(());
    }

    writer.write_event(Event::Start(start)).map_err(write_error)?;
    for node in &el.children {
        write_node(writer, node)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(el.name.as_str())))
        .map_err(write_error)?;
    Ok(())
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &Node) -> Result<(), DocxError> {
    let event = match node {
        Node::Element(child) => return write_element(writer, child),
        Node::Text(text) => Event::Text(BytesText::new(text)),
        Node::CData(data) => Event::CData(BytesCData::new(data.as_str())),
        Node::Comment(raw) => Event::Comment(BytesText::from_escaped(raw.as_str())),
        Node::Pi(raw) => Event::PI(BytesPI::new(raw.as_str())),
    };
    writer.write_event(event).map_err(write_error)
}

fn write_error(e: impl std::fmt::Display) -> DocxError {
    DocxError::Xml(format!("failed to serialize xml: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_and_attributes() {
        let doc = XmlDocument::parse(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:p w:rsidR="00AB"><w:r><w:t xml:space="preserve">Olá &amp; adeus </w:t></w:r><w:r><w:br/></w:r></w:p>"#,
        )
        .unwrap();

        assert!(doc.declaration);
        assert!(doc.root.is("w:p"));
        assert_eq!(doc.root.attr("w:rsidR"), Some("00AB"));
        assert_eq!(doc.root.text(), "Olá & adeus ");
        assert_eq!(doc.root.elements().count(), 2);
    }

    #[test]
    fn serialization_escapes_text_and_attributes() {
        let root = Element::new("w:t")
            .with_attr("w:val", "a\"b")
            .with_text("1 < 2 & 3");
        let doc = XmlDocument {
            declaration: false,
            prolog: Vec::new(),
            root,
            epilog: Vec::new(),
        };

        let xml = doc.to_string_lossy().unwrap();
        assert!(xml.contains("1 &lt; 2 &amp; 3"));
        assert!(xml.contains("w:val=\"a&quot;b\""));

        let reparsed = XmlDocument::parse(&xml).unwrap();
        assert_eq!(reparsed.root.text(), "1 < 2 & 3");
        assert_eq!(reparsed.root.attr("w:val"), Some("a\"b"));
    }

    #[test]
    fn empty_elements_are_written_self_closing() {
        let doc = XmlDocument {
            declaration: false,
            prolog: Vec::new(),
            root: Element::new("w:r").with_child(Element::new("w:br")),
            epilog: Vec::new(),
        };
        assert_eq!(doc.to_string_lossy().unwrap(), "<w:r><w:br/></w:r>");
    }

    #[test]
    fn keeps_comments_and_processing_instructions() {
        let source = r#"<?mso-application progid="Word.Document"?><!-- gerado --><w:body><!-- modelo v2 --><w:p/><?Bookmark inicio?></w:body><!-- fim -->"#;
        let doc = XmlDocument::parse(source).unwrap();

        assert_eq!(doc.prolog.len(), 2);
        assert_eq!(doc.epilog, vec![Node::Comment(" fim ".to_string())]);
        assert_eq!(doc.root.text(), "");
        assert_eq!(doc.to_string_lossy().unwrap(), source);
    }

    #[test]
    fn rejects_unbalanced_documents() {
        assert!(XmlDocument::parse("<a><b></a>").is_err());
        assert!(XmlDocument::parse("").is_err());
    }

    #[test]
    fn find_mut_descends_depth_first() {
        let mut root = Element::new("w:document").with_child(
            Element::new("w:body").with_child(Element::new("w:p").with_text("x")),
        );
        let p = root.find_mut("w:p").unwrap();
        p.set_text("y");
        assert_eq!(root.text(), "y");
    }
}
