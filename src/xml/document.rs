//! Arena-backed XML document.
//!
//! Text nodes and attribute values are stored in their raw, escaped form so
//! that a parse followed by [`Document::to_xml`] reproduces the source: entity
//! references, attribute order, prefixes and namespace declarations survive
//! untouched. Accessors hand out unescaped values.

use std::borrow::Cow;
use std::fmt::Write as _;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::escape::{escape_xml, strip_bom, unescape_xml};
use super::{XML_NS, local_name, prefix_of};
use crate::error::{Error, Result};

/// Unique identifier for a node in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Node payload.
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Document root.
    Document,
    /// Element with its qualified name and attributes in document order.
    Element(Element),
    /// Character data, raw (entity references unresolved).
    Text(String),
    /// CDATA section, including its delimiters.
    CData(String),
    /// Comment, including its delimiters.
    Comment(String),
    /// XML declaration, doctype or processing instruction, verbatim.
    Markup(String),
}

/// An element's name and attributes.
#[derive(Debug, Clone)]
pub struct Element {
    /// Qualified name as written, e.g. `dc:title`.
    pub name: String,
    pub attrs: Vec<Attribute>,
}

/// An attribute with a raw (escaped) value.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub raw_value: String,
}

impl Attribute {
    /// The attribute value with references resolved.
    pub fn value(&self) -> Cow<'_, str> {
        unescape_xml(&self.raw_value)
    }
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Elements whose content is phrasing content; pretty printing never
/// introduces whitespace inside them.
const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "cite", "code", "dfn", "em", "i", "kbd", "label", "mark", "q",
    "s", "samp", "small", "span", "strong", "sub", "sup", "text", "time", "title", "u", "var",
];

/// A parsed XML document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only the document node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Parse XML text into a document.
    pub fn parse(text: &str) -> Result<Self> {
        let src = strip_bom(text);
        let mut reader = Reader::from_str(src);
        reader.config_mut().trim_text(false);

        let mut doc = Document::new();
        let mut stack = vec![doc.root()];

        loop {
            let start = reader.buffer_position() as usize;
            let event = reader
                .read_event()
                .map_err(|e| Error::malformed(format!("{e} (near byte {start})")))?;
            let end = reader.buffer_position() as usize;
            let raw = src.get(start..end).unwrap_or_default();
            let parent = stack[stack.len() - 1];

            match event {
                Event::Start(e) => {
                    let id = doc.alloc(NodeData::Element(element_from(&e)?));
                    doc.attach(parent, id);
                    stack.push(id);
                }
                Event::Empty(e) => {
                    let id = doc.alloc(NodeData::Element(element_from(&e)?));
                    doc.attach(parent, id);
                }
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    if stack.len() == 1 {
                        return Err(Error::malformed(format!("unexpected closing tag </{name}>")));
                    }
                    let open = stack.pop().and_then(|id| doc.element(id)).map(|el| el.name.clone());
                    if open.as_deref() != Some(name.as_str()) {
                        return Err(Error::malformed(format!(
                            "closing tag </{name}> does not match <{}>",
                            open.unwrap_or_default()
                        )));
                    }
                }
                Event::Text(_) | Event::GeneralRef(_) => doc.push_raw_text(parent, raw),
                Event::CData(_) => {
                    let id = doc.alloc(NodeData::CData(raw.to_string()));
                    doc.attach(parent, id);
                }
                Event::Comment(_) => {
                    let id = doc.alloc(NodeData::Comment(raw.to_string()));
                    doc.attach(parent, id);
                }
                Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {
                    let id = doc.alloc(NodeData::Markup(raw.to_string()));
                    doc.attach(parent, id);
                }
                Event::Eof => break,
            }
        }

        if stack.len() > 1 {
            let open = stack
                .last()
                .and_then(|&id| doc.element(id))
                .map(|el| el.name.clone())
                .unwrap_or_default();
            return Err(Error::malformed(format!("unclosed element <{open}>")));
        }
        if doc.document_element().is_none() {
            return Err(Error::malformed("no root element"));
        }

        Ok(doc)
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// The document node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The single top-level element.
    pub fn document_element(&self) -> Option<NodeId> {
        self.element_children(self.root()).next()
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()].data
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes.get(id.index())?.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(id.index())?.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Local part of an element's name.
    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| local_name(&el.name))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|&child| self.element(child).is_some())
    }

    /// All nodes below `id` in document order (pre-order), excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Concatenated, unescaped character data below `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut text = String::new();
        self.collect_text(id, &mut text);
        text
    }

    fn collect_text(&self, id: NodeId, text: &mut String) {
        match self.data(id) {
            NodeData::Text(raw) => text.push_str(&unescape_xml(raw)),
            NodeData::CData(raw) => text.push_str(
                raw.strip_prefix("<![CDATA[")
                    .and_then(|r| r.strip_suffix("]]>"))
                    .unwrap_or(raw),
            ),
            NodeData::Element(_) | NodeData::Document => {
                for &child in self.children(id) {
                    self.collect_text(child, text);
                }
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Attributes and namespaces
    // ------------------------------------------------------------------

    /// Attribute value by qualified name (e.g. `href`, `xml:lang`).
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<Cow<'_, str>> {
        self.element(id)?
            .attrs
            .iter()
            .find(|a| a.name == name)
            .map(Attribute::value)
    }

    /// Attribute value by namespace URI and local name, whatever prefix the
    /// document bound to that namespace.
    pub fn attribute_ns(&self, id: NodeId, namespace: Option<&str>, local: &str) -> Option<Cow<'_, str>> {
        self.element(id)?
            .attrs
            .iter()
            .find(|a| self.attribute_matches(id, a, namespace, local))
            .map(Attribute::value)
    }

    pub(crate) fn attribute_matches(
        &self,
        id: NodeId,
        attr: &Attribute,
        namespace: Option<&str>,
        local: &str,
    ) -> bool {
        if local_name(&attr.name) != local || attr.name.starts_with("xmlns") {
            return false;
        }
        match (prefix_of(&attr.name), namespace) {
            (None, None) => true,
            (Some(prefix), Some(ns)) => self.lookup_namespace(id, Some(prefix)) == Some(ns),
            _ => false,
        }
    }

    /// Set an attribute, replacing its value in place or appending it.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let raw_value = escape_xml(value).into_owned();
        if let Some(el) = self.element_mut(id) {
            match el.attrs.iter_mut().find(|a| a.name == name) {
                Some(attr) => attr.raw_value = raw_value,
                None => el.attrs.push(Attribute {
                    name: name.to_string(),
                    raw_value,
                }),
            }
        }
    }

    /// Remove an attribute by qualified name. Returns whether it was present.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> bool {
        match self.element_mut(id) {
            Some(el) => {
                let before = el.attrs.len();
                el.attrs.retain(|a| a.name != name);
                el.attrs.len() != before
            }
            None => false,
        }
    }

    /// Resolve a prefix (or the default namespace for `None`) from the
    /// declarations in scope at `id`.
    pub fn lookup_namespace(&self, id: NodeId, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_NS);
        }
        let key: Cow<'_, str> = match prefix {
            Some(p) => Cow::Owned(format!("xmlns:{p}")),
            None => Cow::Borrowed("xmlns"),
        };

        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(el) = self.element(node)
                && let Some(decl) = el.attrs.iter().find(|a| a.name == key)
            {
                return (!decl.raw_value.is_empty()).then_some(decl.raw_value.as_str());
            }
            current = self.parent(node);
        }
        None
    }

    /// Namespace URI of an element.
    pub fn namespace(&self, id: NodeId) -> Option<&str> {
        let el = self.element(id)?;
        self.lookup_namespace(id, prefix_of(&el.name))
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    fn push_raw_text(&mut self, parent: NodeId, raw: &str) {
        if let Some(&last) = self.children(parent).last()
            && let NodeData::Text(existing) = &mut self.nodes[last.index()].data
        {
            existing.push_str(raw);
            return;
        }
        let id = self.alloc(NodeData::Text(raw.to_string()));
        self.attach(parent, id);
    }

    /// Create a detached element.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.alloc(NodeData::Element(Element {
            name: name.to_string(),
            attrs: Vec::new(),
        }))
    }

    /// Move `child` to the end of `parent`'s children.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.attach(parent, child);
    }

    /// Append character data, escaping it.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        self.push_raw_text(parent, &escape_xml(text));
    }

    /// Append verbatim markup such as an XML declaration or a doctype.
    pub fn append_markup(&mut self, parent: NodeId, markup: &str) {
        let id = self.alloc(NodeData::Markup(markup.to_string()));
        self.attach(parent, id);
    }

    /// Remove a node from its parent. The node and its subtree stay usable.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.index()].parent.take() {
            self.nodes[parent.index()].children.retain(|&c| c != id);
        }
    }

    /// Move `node` to directly after `anchor` among `anchor`'s siblings.
    pub fn insert_after(&mut self, anchor: NodeId, node: NodeId) {
        let Some(parent) = self.parent(anchor) else {
            return;
        };
        self.detach(node);
        let siblings = &mut self.nodes[parent.index()].children;
        let pos = siblings
            .iter()
            .position(|&c| c == anchor)
            .map_or(siblings.len(), |p| p + 1);
        siblings.insert(pos, node);
        self.nodes[node.index()].parent = Some(parent);
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Serialize exactly as parsed; empty elements are self-closed.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_node(&mut out, self.root(), 0, false);
        out
    }

    /// Serialize with tab indentation for element-only content.
    pub fn to_pretty_xml(&self) -> String {
        let mut out = String::new();
        self.write_node(&mut out, self.root(), 0, true);
        out
    }

    fn write_node(&self, out: &mut String, id: NodeId, depth: usize, pretty: bool) {
        match self.data(id) {
            NodeData::Document => {
                for &child in self.children(id) {
                    if pretty {
                        if self.is_whitespace(child) {
                            continue;
                        }
                        self.write_node(out, child, depth, true);
                        out.push('\n');
                    } else {
                        self.write_node(out, child, depth, false);
                    }
                }
            }
            NodeData::Element(el) => {
                out.push('<');
                out.push_str(&el.name);
                for attr in &el.attrs {
                    let _ = write!(out, " {}=\"{}\"", attr.name, attr.raw_value);
                }

                let children = self.children(id);
                if children.is_empty() {
                    out.push_str("/>");
                    return;
                }
                out.push('>');

                if pretty && self.is_block(id) {
                    for &child in children {
                        if self.is_whitespace(child) {
                            continue;
                        }
                        out.push('\n');
                        push_tabs(out, depth + 1);
                        self.write_node(out, child, depth + 1, true);
                    }
                    out.push('\n');
                    push_tabs(out, depth);
                } else {
                    for &child in children {
                        self.write_node(out, child, depth + 1, false);
                    }
                }

                out.push_str("</");
                out.push_str(&el.name);
                out.push('>');
            }
            NodeData::Text(raw)
            | NodeData::CData(raw)
            | NodeData::Comment(raw)
            | NodeData::Markup(raw) => out.push_str(raw),
        }
    }

    fn is_whitespace(&self, id: NodeId) -> bool {
        matches!(self.data(id), NodeData::Text(raw) if raw.trim().is_empty())
    }

    /// Whether an element's children may be laid out one per line.
    fn is_block(&self, id: NodeId) -> bool {
        let Some(el) = self.element(id) else {
            return false;
        };
        if INLINE_ELEMENTS.contains(&local_name(&el.name))
            || el.attrs.iter().any(|a| a.name == "xml:space" && a.raw_value == "preserve")
        {
            return false;
        }

        let mut has_element = false;
        for &child in self.children(id) {
            match self.data(child) {
                NodeData::Element(_) => has_element = true,
                NodeData::Text(raw) if !raw.trim().is_empty() => return false,
                NodeData::CData(_) => return false,
                _ => {}
            }
        }
        has_element
    }
}

fn element_from(e: &BytesStart<'_>) -> Result<Element> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = Vec::new();

    for attr in e.attributes() {
        let attr =
            attr.map_err(|err| Error::malformed(format!("invalid attribute in <{name}>: {err}")))?;
        let raw_value = String::from_utf8_lossy(&attr.value);
        attrs.push(Attribute {
            name: String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            // Single-quoted values may hold a bare double quote.
            raw_value: raw_value.replace('"', "&quot;"),
        });
    }

    Ok(Element { name, attrs })
}

fn push_tabs(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push('\t');
    }
}
