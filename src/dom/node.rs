// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! DOM Node types and the shared tree storage

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use url::Url;

use super::activity::PageActivity;
use super::document::Document;
use super::event::{Handler, ListenerEntry};

/// Unique node identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Create a new unique node ID
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Node type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// Document node
    Document,
    /// Element node (like <div>, <p>, etc.)
    Element,
    /// Text node
    Text,
    /// Comment node
    Comment,
    /// Document type node (<!DOCTYPE>)
    DocumentType,
    /// Document fragment
    DocumentFragment,
}

/// Element namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Namespace {
    #[default]
    Html,
    Svg,
    MathMl,
}

/// Internal node data
#[derive(Debug)]
pub struct NodeData {
    /// Node type
    pub node_type: NodeType,
    /// Element namespace (meaningless for non-elements)
    pub namespace: Namespace,
    /// Tag name (for elements)
    pub tag_name: Option<String>,
    /// Text content (for text/comment nodes)
    pub text_content: Option<String>,
    /// Attributes (for elements)
    pub attributes: HashMap<String, String>,
    /// Parent node ID
    pub parent: Option<NodeId>,
    /// Child node IDs
    pub children: Vec<NodeId>,
}

impl NodeData {
    fn with_type(node_type: NodeType) -> Self {
        Self {
            node_type,
            namespace: Namespace::Html,
            tag_name: None,
            text_content: None,
            attributes: HashMap::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    /// Create a new HTML element node data
    pub fn element(tag_name: impl Into<String>) -> Self {
        Self::element_ns(tag_name, Namespace::Html)
    }

    /// Create a new element node data in a namespace
    pub fn element_ns(tag_name: impl Into<String>, namespace: Namespace) -> Self {
        let mut data = Self::with_type(NodeType::Element);
        data.tag_name = Some(tag_name.into().to_lowercase());
        data.namespace = namespace;
        data
    }

    /// Create a new text node data
    pub fn text(content: impl Into<String>) -> Self {
        let mut data = Self::with_type(NodeType::Text);
        data.text_content = Some(content.into());
        data
    }

    /// Create a new comment node data
    pub fn comment(content: impl Into<String>) -> Self {
        let mut data = Self::with_type(NodeType::Comment);
        data.text_content = Some(content.into());
        data
    }

    /// Create a new document node data
    pub fn document() -> Self {
        Self::with_type(NodeType::Document)
    }

    /// Create a doctype node data
    pub fn doctype() -> Self {
        Self::with_type(NodeType::DocumentType)
    }
}

/// Mutable per-document state
#[derive(Debug, Default)]
pub(crate) struct DocumentState {
    pub url: Option<Url>,
    pub title: String,
    pub document_element: Option<NodeId>,
    pub head: Option<NodeId>,
    pub body: Option<NodeId>,
    /// Whether `Event`/`MouseEvent` construction is available
    pub event_construction: bool,
}

/// Registered mutation observer
pub(crate) struct ObserverSlot {
    pub root: NodeId,
    pub records: Weak<Mutex<Vec<NodeId>>>,
}

pub(crate) type Microtask = Box<dyn FnOnce() + Send>;

/// Storage shared by every handle into one document
pub(crate) struct DomTree {
    pub root_id: NodeId,
    pub nodes: RwLock<HashMap<NodeId, NodeData>>,
    pub state: RwLock<DocumentState>,
    pub listeners: RwLock<HashMap<NodeId, Vec<ListenerEntry>>>,
    pub handlers: RwLock<HashMap<(NodeId, String), Handler>>,
    pub observers: RwLock<Vec<ObserverSlot>>,
    pub activity: Mutex<VecDeque<PageActivity>>,
    pub microtasks: Mutex<VecDeque<Microtask>>,
    /// Child documents keyed by their hosting frame element
    pub frames: RwLock<HashMap<NodeId, Document>>,
    /// Hosting frame element in the parent document
    pub host: RwLock<Option<(Weak<DomTree>, NodeId)>>,
}

impl DomTree {
    pub fn new() -> Self {
        let root_id = NodeId::new();
        let mut nodes = HashMap::new();
        nodes.insert(root_id, NodeData::document());

        Self {
            root_id,
            nodes: RwLock::new(nodes),
            state: RwLock::new(DocumentState {
                event_construction: true,
                ..Default::default()
            }),
            listeners: RwLock::new(HashMap::new()),
            handlers: RwLock::new(HashMap::new()),
            observers: RwLock::new(Vec::new()),
            activity: Mutex::new(VecDeque::new()),
            microtasks: Mutex::new(VecDeque::new()),
            frames: RwLock::new(HashMap::new()),
            host: RwLock::new(None),
        }
    }

    /// Insert detached node data and return its ID
    pub fn create(&self, data: NodeData) -> NodeId {
        let id = NodeId::new();
        self.nodes.write().insert(id, data);
        id
    }

    /// Check whether `ancestor` is `node` or one of its ancestors
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let nodes = self.nodes.read();
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    /// Feed an inserted node to every observer whose root covers its parent
    fn notify_inserted(&self, parent: NodeId, child: NodeId) {
        let mut observers = self.observers.write();
        observers.retain(|slot| slot.records.strong_count() > 0);
        for slot in observers.iter() {
            if self.is_inclusive_ancestor(slot.root, parent) {
                if let Some(records) = slot.records.upgrade() {
                    records.lock().push(child);
                }
            }
        }
    }
}

impl fmt::Debug for DomTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomTree")
            .field("root_id", &self.root_id)
            .field("nodes", &self.nodes.read().len())
            .field("url", &self.state.read().url)
            .finish()
    }
}

/// A reference to a node in the DOM tree
#[derive(Debug, Clone)]
pub struct Node {
    /// Node ID
    pub id: NodeId,
    /// Reference to document's node storage
    pub(crate) tree: Arc<DomTree>,
}

impl Node {
    /// Create a new node reference
    pub(crate) fn new(id: NodeId, tree: Arc<DomTree>) -> Self {
        Self { id, tree }
    }

    fn read<T>(&self, f: impl FnOnce(&NodeData) -> T) -> Option<T> {
        self.tree.nodes.read().get(&self.id).map(f)
    }

    /// Get the document owning this node
    pub fn owner_document(&self) -> Document {
        Document::from_tree(self.tree.clone())
    }

    /// Get the node type
    pub fn node_type(&self) -> NodeType {
        self.read(|n| n.node_type).unwrap_or(NodeType::Element)
    }

    /// Get the element namespace
    pub fn namespace(&self) -> Option<Namespace> {
        self.read(|n| (n.node_type == NodeType::Element).then_some(n.namespace))
            .flatten()
    }

    /// HTML or SVG element (the kinds of node the probe addresses and tracks)
    pub fn is_markup_or_graphics(&self) -> bool {
        matches!(self.namespace(), Some(Namespace::Html) | Some(Namespace::Svg))
    }

    /// Get the tag name (uppercase, like browsers)
    pub fn tag_name(&self) -> Option<String> {
        self.local_name().map(|t| t.to_uppercase())
    }

    /// Get the tag name in lowercase
    pub fn local_name(&self) -> Option<String> {
        self.read(|n| n.tag_name.clone()).flatten()
    }

    /// Get text content
    pub fn text_content(&self) -> String {
        let nodes = self.tree.nodes.read();
        collect_text_content(&nodes, self.id)
    }

    /// Set text content (replaces all children with a text node)
    pub fn set_text_content(&self, content: impl Into<String>) {
        let content = content.into();
        let mut nodes = self.tree.nodes.write();

        let Some(node) = nodes.get_mut(&self.id) else {
            return;
        };
        if node.node_type == NodeType::Text {
            node.text_content = Some(content);
            return;
        }
        let old_children = std::mem::take(&mut node.children);
        for child in old_children {
            if let Some(c) = nodes.get_mut(&child) {
                c.parent = None;
            }
        }

        let text_id = NodeId::new();
        let mut text_data = NodeData::text(content);
        text_data.parent = Some(self.id);
        nodes.insert(text_id, text_data);
        if let Some(parent) = nodes.get_mut(&self.id) {
            parent.children.push(text_id);
        }
    }

    /// Get an attribute value
    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.read(|n| n.attributes.get(&name.to_lowercase()).cloned())
            .flatten()
    }

    /// Set an attribute value
    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) {
        if let Some(node) = self.tree.nodes.write().get_mut(&self.id) {
            node.attributes.insert(name.into().to_lowercase(), value.into());
        }
    }

    /// Remove an attribute
    pub fn remove_attribute(&self, name: &str) {
        if let Some(node) = self.tree.nodes.write().get_mut(&self.id) {
            node.attributes.remove(&name.to_lowercase());
        }
    }

    /// Check if has an attribute
    pub fn has_attribute(&self, name: &str) -> bool {
        self.read(|n| n.attributes.contains_key(&name.to_lowercase()))
            .unwrap_or(false)
    }

    /// Get all attributes
    pub fn attributes(&self) -> HashMap<String, String> {
        self.read(|n| n.attributes.clone()).unwrap_or_default()
    }

    /// Get parent node
    pub fn parent(&self) -> Option<Node> {
        self.read(|n| n.parent)
            .flatten()
            .map(|id| Node::new(id, self.tree.clone()))
    }

    /// Get child nodes
    pub fn children(&self) -> Vec<Node> {
        self.read(|n| n.children.clone())
            .unwrap_or_default()
            .into_iter()
            .map(|id| Node::new(id, self.tree.clone()))
            .collect()
    }

    /// Get first child
    pub fn first_child(&self) -> Option<Node> {
        self.children().into_iter().next()
    }

    fn sibling(&self, offset: isize) -> Option<Node> {
        let nodes = self.tree.nodes.read();
        let parent = nodes.get(&self.id)?.parent?;
        let siblings = &nodes.get(&parent)?.children;
        let index = siblings.iter().position(|&id| id == self.id)? as isize + offset;
        if index < 0 {
            return None;
        }
        siblings
            .get(index as usize)
            .map(|&id| Node::new(id, self.tree.clone()))
    }

    /// Get next sibling
    pub fn next_sibling(&self) -> Option<Node> {
        self.sibling(1)
    }

    /// Get previous sibling
    pub fn prev_sibling(&self) -> Option<Node> {
        self.sibling(-1)
    }

    /// Check if this is an element node
    pub fn is_element(&self) -> bool {
        self.node_type() == NodeType::Element
    }

    /// Check if `other` is this node or a descendant of it
    pub fn contains(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.tree, &other.tree) && self.tree.is_inclusive_ancestor(self.id, other.id)
    }

    /// Append a child node
    pub fn append_child(&self, child: &Node) {
        self.insert_child(child, None);
    }

    /// Insert `child` before `reference` (append when `reference` is not a child)
    pub fn insert_before(&self, child: &Node, reference: Option<&Node>) {
        self.insert_child(child, reference.map(|r| r.id));
    }

    fn insert_child(&self, child: &Node, reference: Option<NodeId>) {
        if !Arc::ptr_eq(&self.tree, &child.tree) || child.contains(self) {
            return;
        }

        {
            let mut nodes = self.tree.nodes.write();

            // Remove from old parent if any
            let old_parent_id = nodes.get(&child.id).and_then(|d| d.parent);
            if let Some(old_pid) = old_parent_id {
                if let Some(old_parent) = nodes.get_mut(&old_pid) {
                    old_parent.children.retain(|&id| id != child.id);
                }
            }

            if let Some(child_data) = nodes.get_mut(&child.id) {
                child_data.parent = Some(self.id);
            }

            if let Some(parent_data) = nodes.get_mut(&self.id) {
                let position = reference
                    .and_then(|r| parent_data.children.iter().position(|&id| id == r))
                    .unwrap_or(parent_data.children.len());
                parent_data.children.insert(position, child.id);
            }
        }

        self.tree.notify_inserted(self.id, child.id);
    }

    /// Remove a child node
    pub fn remove_child(&self, child: &Node) {
        let mut nodes = self.tree.nodes.write();

        if let Some(parent_data) = nodes.get_mut(&self.id) {
            parent_data.children.retain(|&id| id != child.id);
        }
        if let Some(child_data) = nodes.get_mut(&child.id) {
            if child_data.parent == Some(self.id) {
                child_data.parent = None;
            }
        }
    }

    /// Get outer HTML
    pub fn outer_html(&self) -> String {
        let nodes = self.tree.nodes.read();
        serialize_node(&nodes, self.id)
    }
}

fn collect_text_content(nodes: &HashMap<NodeId, NodeData>, node_id: NodeId) -> String {
    let Some(node) = nodes.get(&node_id) else {
        return String::new();
    };
    match node.node_type {
        NodeType::Text => node.text_content.clone().unwrap_or_default(),
        NodeType::Element | NodeType::Document | NodeType::DocumentFragment => node
            .children
            .iter()
            .map(|&child_id| collect_text_content(nodes, child_id))
            .collect(),
        _ => String::new(),
    }
}

/// Serialize a node to HTML string
fn serialize_node(nodes: &HashMap<NodeId, NodeData>, node_id: NodeId) -> String {
    let Some(node) = nodes.get(&node_id) else {
        return String::new();
    };
    match node.node_type {
        NodeType::Text => node.text_content.clone().unwrap_or_default(),
        NodeType::Comment => format!("<!--{}-->", node.text_content.as_deref().unwrap_or("")),
        NodeType::Element => {
            let tag = node.tag_name.as_deref().unwrap_or("div");
            let mut attrs: Vec<_> = node.attributes.iter().collect();
            attrs.sort();
            let attrs: String = attrs
                .into_iter()
                .map(|(k, v)| {
                    if v.is_empty() {
                        format!(" {}", k)
                    } else {
                        format!(" {}=\"{}\"", k, html_escape(v))
                    }
                })
                .collect();

            const VOID_ELEMENTS: [&str; 14] = [
                "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta",
                "param", "source", "track", "wbr",
            ];

            if VOID_ELEMENTS.contains(&tag) {
                format!("<{}{}>", tag, attrs)
            } else {
                let children: String = node
                    .children
                    .iter()
                    .map(|&id| serialize_node(nodes, id))
                    .collect();
                format!("<{}{}>{}</{}>", tag, attrs, children, tag)
            }
        }
        NodeType::Document | NodeType::DocumentFragment => node
            .children
            .iter()
            .map(|&id| serialize_node(nodes, id))
            .collect(),
        NodeType::DocumentType => "<!DOCTYPE html>".to_string(),
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl std::hash::Hash for Node {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Escape HTML special characters
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    #[test]
    fn test_node_id() {
        let id1 = NodeId::new();
        let id2 = NodeId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_node_data() {
        let element = NodeData::element("DIV");
        assert_eq!(element.tag_name, Some("div".to_string()));
        assert_eq!(element.node_type, NodeType::Element);
        assert_eq!(element.namespace, Namespace::Html);

        let text = NodeData::text("Hello");
        assert_eq!(text.text_content, Some("Hello".to_string()));
        assert_eq!(text.node_type, NodeType::Text);
    }

    #[test]
    fn test_insert_before_and_siblings() {
        let doc = parse_html("<ul><li id='a'></li><li id='c'></li></ul>").unwrap();
        let ul = doc.query_selector("ul").unwrap();
        let c = doc.get_element_by_id("c").unwrap();
        let b = doc.create_element("li");
        b.set_attribute("id", "b");
        ul.insert_before(&b, Some(&c));

        let ids: Vec<_> = ul.children().iter().filter_map(|e| e.id()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(b.prev_sibling().and_then(|n| n.get_attribute("id")), Some("a".into()));
        assert_eq!(b.next_sibling().and_then(|n| n.get_attribute("id")), Some("c".into()));
    }

    #[test]
    fn test_cannot_insert_ancestor_into_descendant() {
        let doc = parse_html("<div id='outer'><p id='inner'></p></div>").unwrap();
        let outer = doc.get_element_by_id("outer").unwrap();
        let inner = doc.get_element_by_id("inner").unwrap();
        inner.append_child(&outer);
        assert_eq!(inner.parent_element().map(|p| p.node.id), Some(outer.node.id));
    }

    #[test]
    fn test_remove_child() {
        let doc = parse_html("<ul><li id='a'></li><li id='b'></li></ul>").unwrap();
        let ul = doc.query_selector("ul").unwrap();
        let a = doc.get_element_by_id("a").unwrap();
        ul.remove_child(&a);
        assert_eq!(ul.children().len(), 1);
        assert!(a.parent().is_none());
        assert!(doc.get_element_by_id("a").is_none());
    }
}
