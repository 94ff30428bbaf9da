//! Arena-backed XML document with location tracking.
//!
//! Nodes live in a flat table indexed by [`NodeId`]. Detached nodes stay in
//! the table and are simply unreachable from the document node.

use crate::error::{Error, Result};
use crate::parser::{self, ParseOrigin};
use crate::preserve::{AttributeLayout, LayoutStore};
use crate::writer;
use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};
use std::path::Path;
use xdt_source_map::{FileId, SourceContext};

/// Namespace bound to the predefined `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespace of `xmlns` declarations.
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// Handle to a node of an [`XmlDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// A possibly prefixed XML name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
}

impl QName {
    /// Split a qualified name at its first colon.
    pub fn parse(qualified: &str) -> Self {
        match qualified.split_once(':') {
            Some((prefix, local)) => QName {
                prefix: Some(prefix.to_string()),
                local: local.to_string(),
            },
            None => QName {
                prefix: None,
                local: qualified.to_string(),
            },
        }
    }

    /// Whether this name is spelled `qualified`.
    pub fn is(&self, qualified: &str) -> bool {
        match (&self.prefix, qualified.split_once(':')) {
            (Some(prefix), Some((p, l))) => prefix == p && self.local == l,
            (None, None) => self.local == qualified,
            _ => false,
        }
    }

    /// Whether this is a namespace declaration (`xmlns` or `xmlns:p`).
    pub fn is_namespace_declaration(&self) -> bool {
        match &self.prefix {
            Some(prefix) => prefix == "xmlns",
            None => self.local == "xmlns",
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// Where a node was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeInfo {
    pub file_id: FileId,
    /// Byte offset of the node in its file: the `<` of an element, the name of an attribute.
    pub offset: usize,
    /// 1-based line.
    pub line: usize,
    /// 1-based column of the element or attribute name, counted in characters.
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,
    /// Decoded value.
    pub value: String,
    pub info: Option<NodeInfo>,
}

/// How an element's content was closed in the text it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Closing {
    /// `<name/>`, also used for elements created through the API.
    SelfClosing,
    /// An explicit end tag, kept verbatim.
    Explicit(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub name: QName,
    pub attributes: Vec<Attribute>,
    pub closing: Closing,
}

impl ElementData {
    pub fn attribute(&self, qualified: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name.is(qualified))
    }
}

/// Node payloads. Everything except elements is stored as its raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element(ElementData),
    /// Character data, still escaped.
    Text(String),
    /// `<![CDATA[...]]>`
    CData(String),
    /// `<!--...-->`
    Comment(String),
    /// `<?target ...?>`
    ProcessingInstruction(String),
    /// `<?xml ...?>`
    Declaration(String),
    /// `<!DOCTYPE ...>`
    DocType(String),
}

#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub info: Option<NodeInfo>,
    /// Set only for nodes read from the document's own text.
    pub original: bool,
}

impl NodeData {
    pub(crate) fn new(kind: NodeKind, info: Option<NodeInfo>, original: bool) -> Self {
        NodeData {
            kind,
            parent: None,
            children: Vec::new(),
            info,
            original,
        }
    }
}

/// A parsed XML document.
///
/// Cloning an `XmlDocument` takes a full snapshot, layouts included.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    nodes: Vec<NodeData>,
    file_id: FileId,
    pub(crate) layouts: LayoutStore,
    pub(crate) bom: bool,
}

impl XmlDocument {
    /// An empty document containing only the document node.
    pub fn new(file_id: FileId) -> Self {
        XmlDocument {
            nodes: vec![NodeData::new(NodeKind::Document, None, true)],
            file_id,
            layouts: LayoutStore::new(),
            bom: false,
        }
    }

    /// Parse `content`, stamping every element and attribute with its
    /// location in `file_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedXml`] if the text is not well-formed,
    /// [`Error::EmptyDocument`] or [`Error::MultipleRoots`] if it does not
    /// have exactly one root element.
    pub fn parse(content: &str, file_id: FileId) -> Result<Self> {
        parser::parse_document(content, file_id)
    }

    /// Read and parse a file, registering it in `ctx`.
    pub fn load_path(path: impl AsRef<Path>, ctx: &mut SourceContext) -> Result<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(&display, e))?;
        let file_id = ctx.add_file(display, Some(content.clone()));
        Self::parse(&content, file_id)
    }

    /// Read and parse a whole stream, registering it in `ctx` under `name`.
    ///
    /// The reader is consumed and dropped before parsing starts.
    pub fn load_reader<R: Read>(mut reader: R, name: &str, ctx: &mut SourceContext) -> Result<Self> {
        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .map_err(|e| Error::io(name, e))?;
        drop(reader);
        let file_id = ctx.add_file(name.to_string(), Some(content.clone()));
        Self::parse(&content, file_id)
    }

    /// Write the document to `writer`. The writer is flushed but stays open.
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        let text = self.to_xml_string();
        if self.bom {
            writer
                .write_all("\u{feff}".as_bytes())
                .map_err(|e| Error::io("<writer>", e))?;
        }
        writer
            .write_all(text.as_bytes())
            .map_err(|e| Error::io("<writer>", e))?;
        writer.flush().map_err(|e| Error::io("<writer>", e))
    }

    /// Write the document to a file, creating or truncating it.
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let file = std::fs::File::create(path).map_err(|e| Error::io(&display, e))?;
        let mut out = std::io::BufWriter::new(file);
        self.save(&mut out).map_err(|err| match err {
            Error::Io { source, .. } => Error::io(&display, source),
            other => other,
        })
    }

    /// Serialize the document with the format-preserving writer.
    pub fn to_xml_string(&self) -> String {
        writer::node_to_string(self, self.document_node())
    }

    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    pub fn document_node(&self) -> NodeId {
        NodeId(0)
    }

    pub fn root_element(&self) -> Option<NodeId> {
        self.element_children(self.document_node()).first().copied()
    }

    // Tree access

    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.is_element(*c))
            .collect()
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Element(_))
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.kind(id) {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn name(&self, id: NodeId) -> Option<&QName> {
        self.element(id).map(|e| &e.name)
    }

    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.name(id).map(|n| n.local.as_str())
    }

    pub fn info(&self, id: NodeId) -> Option<&NodeInfo> {
        self.nodes[id.0].info.as_ref()
    }

    /// The 1-based line of the node, `0` when it has no recorded origin.
    pub fn line(&self, id: NodeId) -> usize {
        self.info(id).map_or(0, |i| i.line)
    }

    /// The 1-based column of the node, `0` when it has no recorded origin.
    pub fn column(&self, id: NodeId) -> usize {
        self.info(id).map_or(0, |i| i.column)
    }

    /// The recorded attribute layout of an element's start tag.
    pub fn layout(&self, id: NodeId) -> Option<&AttributeLayout> {
        self.element(id)?;
        self.layouts.lookup(id)
    }

    pub fn layouts(&self) -> &LayoutStore {
        &self.layouts
    }

    /// Whether the node was read from this document's own text.
    pub fn is_original(&self, id: NodeId) -> bool {
        self.nodes[id.0].original
    }

    /// Whether the node was synthesized after loading.
    ///
    /// The answer comes from the nearest element ancestor-or-self, so a text
    /// node inside an inserted element is new, and an inserted text node
    /// directly under an original element is not.
    pub fn is_new_node(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.is_element(node) {
                return !self.is_original(node);
            }
            current = self.parent(node);
        }
        !self.is_original(id)
    }

    /// Ancestors of a node, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self.parent(id);
        while let Some(node) = current {
            result.push(node);
            current = self.parent(node);
        }
        result
    }

    /// Descendants of a node in document order, not including the node itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            result.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        result
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        ancestor == id || self.ancestors(id).contains(&ancestor)
    }

    /// Preorder position of every node reachable from the document node.
    pub fn document_order(&self) -> HashMap<NodeId, usize> {
        let mut order = HashMap::new();
        order.insert(self.document_node(), 0);
        for (index, node) in self.descendants(self.document_node()).into_iter().enumerate() {
            order.insert(node, index + 1);
        }
        order
    }

    /// Whether the node is reachable from the document node.
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.document_node() || self.ancestors(id).last() == Some(&self.document_node())
    }

    /// Element path from the root, e.g. `/configuration/appSettings/add`.
    pub fn path(&self, id: NodeId) -> String {
        let mut names: Vec<String> = std::iter::once(id)
            .chain(self.ancestors(id))
            .filter_map(|n| self.name(n).map(|q| q.to_string()))
            .collect();
        names.reverse();
        format!("/{}", names.join("/"))
    }

    // Text

    /// The decoded content of a text or CDATA node.
    pub fn text(&self, id: NodeId) -> Option<String> {
        match self.kind(id) {
            NodeKind::Text(raw) => Some(match quick_xml::escape::unescape(raw) {
                Ok(text) => text.into_owned(),
                Err(_) => raw.clone(),
            }),
            NodeKind::CData(raw) => Some(
                raw.strip_prefix("<![CDATA[")
                    .and_then(|s| s.strip_suffix("]]>"))
                    .unwrap_or(raw)
                    .to_string(),
            ),
            _ => None,
        }
    }

    /// Whether the node is a text node made only of whitespace.
    pub fn is_whitespace(&self, id: NodeId) -> bool {
        match self.kind(id) {
            NodeKind::Text(raw) => raw.chars().all(char::is_whitespace),
            _ => false,
        }
    }

    /// Concatenated text of all descendant text and CDATA nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text;
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    /// Replace the raw text of a text node. No-op for other node kinds.
    pub fn set_raw_text(&mut self, id: NodeId, raw: impl Into<String>) {
        if let NodeKind::Text(text) = &mut self.nodes[id.0].kind {
            *text = raw.into();
        }
    }

    // Attributes

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        self.element(id).map_or(&[], |e| e.attributes.as_slice())
    }

    /// Value of the attribute spelled `qualified`.
    pub fn attribute(&self, id: NodeId, qualified: &str) -> Option<&str> {
        self.element(id)?
            .attribute(qualified)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute's value, appending it if the element lacks it.
    /// No-op on non-elements.
    pub fn set_attribute(&mut self, id: NodeId, qualified: &str, value: &str) {
        let Some(element) = self.element_mut(id) else {
            return;
        };
        match element.attributes.iter_mut().find(|a| a.name.is(qualified)) {
            Some(attr) => attr.value = value.to_string(),
            None => element.attributes.push(Attribute {
                name: QName::parse(qualified),
                value: value.to_string(),
                info: None,
            }),
        }
    }

    /// Remove an attribute. Returns whether it was present.
    pub fn remove_attribute(&mut self, id: NodeId, qualified: &str) -> bool {
        let Some(element) = self.element_mut(id) else {
            return false;
        };
        let before = element.attributes.len();
        element.attributes.retain(|a| !a.name.is(qualified));
        element.attributes.len() != before
    }

    // Namespaces

    /// Resolve a prefix (or the default namespace for `None`) in scope at `id`.
    pub fn lookup_namespace(&self, id: NodeId, prefix: Option<&str>) -> Option<String> {
        match prefix {
            Some("xml") => return Some(XML_NAMESPACE.to_string()),
            Some("xmlns") => return Some(XMLNS_NAMESPACE.to_string()),
            _ => {}
        }

        let declaration = match prefix {
            Some(p) => format!("xmlns:{}", p),
            None => "xmlns".to_string(),
        };

        std::iter::once(id)
            .chain(self.ancestors(id))
            .find_map(|n| self.attribute(n, &declaration))
            .filter(|uri| !uri.is_empty())
            .map(str::to_string)
    }

    /// Namespace URI of an element.
    pub fn namespace_uri(&self, id: NodeId) -> Option<String> {
        let name = self.name(id)?;
        self.lookup_namespace(id, name.prefix.as_deref())
    }

    /// Namespace URI of an attribute of `element`. Unprefixed attributes
    /// are in no namespace.
    pub fn attribute_namespace(&self, element: NodeId, name: &QName) -> Option<String> {
        if name.is_namespace_declaration() {
            return Some(XMLNS_NAMESPACE.to_string());
        }
        let prefix = name.prefix.as_deref()?;
        self.lookup_namespace(element, Some(prefix))
    }

    /// Every namespace binding in scope at `id`, nearest declaration winning.
    /// The default namespace is reported with a `None` prefix.
    pub fn in_scope_namespaces(&self, id: NodeId) -> Vec<(Option<String>, String)> {
        let mut seen: Vec<Option<String>> = Vec::new();
        let mut result = Vec::new();
        for node in std::iter::once(id).chain(self.ancestors(id)) {
            for attr in self.attributes(node) {
                let prefix = match (&attr.name.prefix, attr.name.local.as_str()) {
                    (Some(p), local) if p == "xmlns" => Some(local.to_string()),
                    (None, "xmlns") => None,
                    _ => continue,
                };
                if seen.contains(&prefix) {
                    continue;
                }
                seen.push(prefix.clone());
                if !attr.value.is_empty() {
                    result.push((prefix, attr.value.clone()));
                }
            }
        }
        result
    }

    // Construction and mutation

    pub(crate) fn push_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(data);
        id
    }

    pub(crate) fn set_closing(&mut self, id: NodeId, closing: Closing) {
        if let Some(element) = self.element_mut(id) {
            element.closing = closing;
        }
    }

    /// Create a detached, non-original element.
    pub fn create_element(&mut self, qualified: &str) -> NodeId {
        self.push_node(NodeData::new(
            NodeKind::Element(ElementData {
                name: QName::parse(qualified),
                attributes: Vec::new(),
                closing: Closing::SelfClosing,
            }),
            None,
            false,
        ))
    }

    /// Create a detached, non-original text node holding `text`.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        let raw = quick_xml::escape::partial_escape(text).into_owned();
        self.create_raw_text(raw)
    }

    /// Create a detached, non-original text node from already escaped text.
    pub fn create_raw_text(&mut self, raw: impl Into<String>) -> NodeId {
        self.push_node(NodeData::new(NodeKind::Text(raw.into()), None, false))
    }

    /// Unlink a node from its parent. The node and its subtree stay usable.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    fn insert_at(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_at(parent, 0, child);
    }

    /// Index of a node among its parent's children.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// Insert `new` right before `reference`. No-op if `reference` is detached.
    pub fn insert_before(&mut self, reference: NodeId, new: NodeId) {
        if reference == new {
            return;
        }
        self.detach(new);
        if let (Some(parent), Some(index)) = (self.parent(reference), self.index_in_parent(reference))
        {
            self.insert_at(parent, index, new);
        }
    }

    /// Insert `new` right after `reference`. No-op if `reference` is detached.
    pub fn insert_after(&mut self, reference: NodeId, new: NodeId) {
        if reference == new {
            return;
        }
        self.detach(new);
        if let (Some(parent), Some(index)) = (self.parent(reference), self.index_in_parent(reference))
        {
            self.insert_at(parent, index + 1, new);
        }
    }

    /// Put `new` where `old` is and detach `old`.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        self.insert_before(old, new);
        self.detach(old);
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Copy a node of `template` into this document ("CloneInto").
    ///
    /// The template subtree is serialized and parsed again as a fragment,
    /// shifted so that the clone reports the template's own coordinates:
    /// lines are offset by `line - 1` and the first line's columns by
    /// `column - 2`. Clones are never original. The returned node is
    /// detached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedXml`] if the serialized fragment does not
    /// parse back into a single node.
    pub fn clone_from_document(&mut self, template: &XmlDocument, node: NodeId) -> Result<NodeId> {
        let fragment = writer::node_to_string(template, node);
        let origin = match template.info(node) {
            Some(info) => ParseOrigin {
                file_id: info.file_id,
                offset_base: info.offset,
                line_offset: info.line.saturating_sub(1),
                column_offset: info.column.saturating_sub(2),
                original: false,
            },
            None => ParseOrigin::detached(template.file_id()),
        };

        tracing::trace!(
            line = origin.line_offset + 1,
            bytes = fragment.len(),
            "Cloning fragment"
        );

        let nodes = parser::parse_fragment(self, &fragment, origin)?;
        match nodes.as_slice() {
            [single] => Ok(*single),
            _ => Err(Error::MalformedXml {
                line: origin.line_offset + 1,
                column: origin.column_offset + 2,
                offset: origin.offset_base,
                message: format!(
                    "expected a single node when cloning, found {}",
                    nodes.len()
                ),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> XmlDocument {
        XmlDocument::parse(content, FileId(0)).unwrap()
    }

    #[test]
    fn test_qname() {
        let name = QName::parse("xdt:Transform");
        assert_eq!(name.prefix.as_deref(), Some("xdt"));
        assert_eq!(name.local, "Transform");
        assert!(name.is("xdt:Transform"));
        assert!(!name.is("Transform"));
        assert_eq!(name.to_string(), "xdt:Transform");
        assert!(QName::parse("xmlns:xdt").is_namespace_declaration());
        assert!(QName::parse("xmlns").is_namespace_declaration());
    }

    #[test]
    fn test_element_locations() {
        let doc = parse("<a>\n  <b x=\"1\"\n     y='2'/>\n</a>");
        let a = doc.root_element().unwrap();
        let b = doc.element_children(a)[0];

        assert_eq!((doc.line(a), doc.column(a)), (1, 2));
        assert_eq!((doc.line(b), doc.column(b)), (2, 4));

        let attrs = doc.attributes(b);
        let x = attrs[0].info.unwrap();
        let y = attrs[1].info.unwrap();
        assert_eq!((x.line, x.column), (2, 6));
        assert_eq!((y.line, y.column), (3, 6));
        assert!(doc.is_original(b));
    }

    #[test]
    fn test_tree_mutation() {
        let mut doc = parse("<a><b/><c/></a>");
        let a = doc.root_element().unwrap();
        let c = doc.element_children(a)[1];

        let d = doc.create_element("d");
        doc.insert_before(c, d);
        let e = doc.create_element("e");
        doc.prepend_child(a, e);
        let f = doc.create_element("f");
        doc.insert_after(c, f);

        assert_eq!(doc.to_xml_string(), "<a><e/><b/><d/><c/><f/></a>");

        doc.detach(c);
        let g = doc.create_element("g");
        doc.replace(d, g);
        assert_eq!(doc.to_xml_string(), "<a><e/><b/><g/><f/></a>");
        assert!(!doc.is_attached(d));
        assert!(doc.is_attached(g));
    }

    #[test]
    fn test_attributes() {
        let mut doc = parse(r#"<a x="1" p:y="2"/>"#);
        let a = doc.root_element().unwrap();
        assert_eq!(doc.attribute(a, "x"), Some("1"));
        assert_eq!(doc.attribute(a, "p:y"), Some("2"));
        assert_eq!(doc.attribute(a, "y"), None);

        doc.set_attribute(a, "x", "3");
        doc.set_attribute(a, "z", "4");
        assert!(doc.remove_attribute(a, "p:y"));
        assert!(!doc.remove_attribute(a, "p:y"));
        assert_eq!(doc.to_xml_string(), r#"<a x="3" z="4"/>"#);
    }

    #[test]
    fn test_is_new_node_uses_nearest_element() {
        let mut doc = parse("<a><b>text</b></a>");
        let a = doc.root_element().unwrap();
        let b = doc.element_children(a)[0];
        let text = doc.children(b)[0];
        assert!(!doc.is_new_node(text));

        let inserted = doc.create_text("more");
        doc.append_child(b, inserted);
        assert!(!doc.is_new_node(inserted));

        let c = doc.create_element("c");
        let inner = doc.create_text("inner");
        doc.append_child(c, inner);
        doc.append_child(a, c);
        assert!(doc.is_new_node(c));
        assert!(doc.is_new_node(inner));
    }

    #[test]
    fn test_namespaces() {
        let doc = parse(
            r#"<root xmlns="urn:default" xmlns:p="urn:p"><p:child xmlns=""><leaf/></p:child></root>"#,
        );
        let root = doc.root_element().unwrap();
        let child = doc.element_children(root)[0];
        let leaf = doc.element_children(child)[0];

        assert_eq!(doc.namespace_uri(root).as_deref(), Some("urn:default"));
        assert_eq!(doc.namespace_uri(child).as_deref(), Some("urn:p"));
        assert_eq!(doc.namespace_uri(leaf), None);
        assert_eq!(
            doc.lookup_namespace(leaf, Some("xml")).as_deref(),
            Some(XML_NAMESPACE)
        );

        let scope = doc.in_scope_namespaces(leaf);
        assert!(scope.contains(&(Some("p".to_string()), "urn:p".to_string())));
        assert!(!scope.iter().any(|(prefix, _)| prefix.is_none()));
    }

    #[test]
    fn test_clone_from_document_reports_template_coordinates() {
        let template = XmlDocument::parse(
            "<root>\n  <item a=\"1\">\n    <sub/>\n  </item>\n</root>",
            FileId(7),
        )
        .unwrap();
        let item = template.element_children(template.root_element().unwrap())[0];

        let mut doc = parse("<target/>");
        let clone = doc.clone_from_document(&template, item).unwrap();

        assert_eq!(doc.info(clone).unwrap().file_id, FileId(7));
        assert_eq!((doc.line(clone), doc.column(clone)), (2, 4));
        let sub = doc.element_children(clone)[0];
        assert_eq!((doc.line(sub), doc.column(sub)), (3, 6));
        assert_eq!(doc.attributes(clone)[0].info.unwrap().column, 9);

        assert!(doc.is_new_node(clone));
        assert!(doc.is_new_node(sub));
        assert!(!doc.is_attached(clone));
        assert!(doc.layout(clone).is_some());
    }

    #[test]
    fn test_clones_with_same_coordinates_keep_own_layouts() {
        let first = XmlDocument::parse("<t>\n<y r=\"1\"\n   s=\"2\"/></t>", FileId(1)).unwrap();
        let second = XmlDocument::parse("<t>\n<y   s=\"2\"/></t>", FileId(1)).unwrap();

        let mut doc = parse("<a   b=\"1\"/>");
        let a = doc.root_element().unwrap();
        for template in [&first, &second] {
            let y = template.element_children(template.root_element().unwrap())[0];
            let clone = doc.clone_from_document(template, y).unwrap();
            doc.append_child(a, clone);
        }

        assert_eq!(
            doc.to_xml_string(),
            "<a   b=\"1\"><y r=\"1\"\n   s=\"2\"/><y   s=\"2\"/></a>"
        );
    }

    #[test]
    fn test_path_and_text_content() {
        let doc = parse("<a><b>one<![CDATA[<two>]]></b><c>&amp;</c></a>");
        let a = doc.root_element().unwrap();
        let b = doc.element_children(a)[0];
        assert_eq!(doc.path(b), "/a/b");
        assert_eq!(doc.text_content(a), "one<two>&");
    }
}
