//! Arena-backed mutable XML tree.
//!
//! Nodes live in an [`indextree::Arena`] and are addressed by [`NodeId`], so
//! transient per-node bookkeeping (such as tag census counters) can be kept in
//! side tables keyed by node identity instead of on the nodes themselves.
//! Removing a node only detaches it; its subtree stays in the arena and keeps
//! its internal parent links, which lets callers detect stale ids with
//! [`Document::is_attached`].

use indextree::{Arena, NodeEdge, NodeId};

use super::XmlError;

/// An element: its qualified name (prefix kept verbatim) and ordered attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing the value in place when it already exists
    /// so attribute order is preserved.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }
}

/// Payload of a tree node. Text-like payloads hold decoded text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Document,
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    DocType(String),
}

/// The `<?xml ...?>` declaration of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDeclaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

impl Default for XmlDeclaration {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            encoding: Some("UTF-8".to_string()),
            standalone: None,
        }
    }
}

/// An owned, mutable XML document.
#[derive(Debug, Clone)]
pub struct Document {
    arena: Arena<XmlNode>,
    root: NodeId,
    declaration: Option<XmlDeclaration>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document holding only the document node.
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(XmlNode::Document);
        Self {
            arena,
            root,
            declaration: None,
        }
    }

    /// The document node (parent of the root element).
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The root element, if the document has one.
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root).find(|&id| self.element(id).is_some())
    }

    pub fn declaration(&self) -> Option<&XmlDeclaration> {
        self.declaration.as_ref()
    }

    pub fn set_declaration(&mut self, declaration: Option<XmlDeclaration>) {
        self.declaration = declaration;
    }

    pub fn node(&self, id: NodeId) -> &XmlNode {
        self.arena[id].get()
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut XmlNode {
        self.arena[id].get_mut()
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.node(id) {
            XmlNode::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.node_mut(id) {
            XmlNode::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Element name of `id`, or `None` for non-element nodes.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|element| element.name.as_str())
    }

    /// Text of a text node, or `None` for any other kind of node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.node(id) {
            XmlNode::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|element| element.attribute(name))
    }

    /// Set an attribute on an element node. Non-element nodes are left as is.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(element) = self.element_mut(id) {
            element.set_attribute(name, value);
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].parent()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].first_child()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].last_child()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].next_sibling()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    /// Proper ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.ancestors(&self.arena).skip(1)
    }

    /// `id` and all of its descendants in document order.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.descendants(&self.arena)
    }

    pub(crate) fn traverse(&self) -> impl Iterator<Item = NodeEdge> + '_ {
        self.root.traverse(&self.arena)
    }

    /// All elements named exactly `name`, in document order.
    pub fn elements_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.descendants(self.root).filter(move |&id| self.name(id) == Some(name))
    }

    /// Nearest proper ancestor of `id` whose element name matches `name`
    /// case-insensitively. Walks parent links iteratively.
    pub fn nearest_ancestor_named(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.ancestors(id)
            .find(|&ancestor| self.name(ancestor).is_some_and(|n| n.eq_ignore_ascii_case(name)))
    }

    /// Whether `id` is still reachable from the document node.
    pub fn is_attached(&self, id: NodeId) -> bool {
        id.ancestors(&self.arena).any(|ancestor| ancestor == self.root)
    }

    /// Concatenated text of all text and CDATA descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .filter_map(|node| match self.node(node) {
                XmlNode::Text(text) | XmlNode::CData(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn create(&mut self, node: XmlNode) -> NodeId {
        self.arena.new_node(node)
    }

    pub fn create_element(&mut self, name: impl Into<String>) -> NodeId {
        self.create(XmlNode::Element(Element::new(name)))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.create(XmlNode::Text(text.into()))
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), XmlError> {
        parent.checked_append(child, &mut self.arena)?;
        Ok(())
    }

    /// Insert `new` as the previous sibling of `reference`.
    pub fn insert_before(&mut self, reference: NodeId, new: NodeId) -> Result<(), XmlError> {
        reference.checked_insert_before(new, &mut self.arena)?;
        Ok(())
    }

    /// Insert `new` as the next sibling of `reference`.
    pub fn insert_after(&mut self, reference: NodeId, new: NodeId) -> Result<(), XmlError> {
        reference.checked_insert_after(new, &mut self.arena)?;
        Ok(())
    }

    /// Detach `id` (and its subtree) from its parent.
    pub fn remove(&mut self, id: NodeId) {
        id.detach(&mut self.arena);
    }
}
