// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Document representation
//!
//! A `Document` is a cheap handle over the shared tree storage. Cloning it
//! never copies nodes; two handles compare equal when they point at the
//! same tree.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use super::activity::{PageActivity, WebSocket};
use super::element::Element;
use super::node::{DomTree, Namespace, Node, NodeData, NodeId, NodeType, ObserverSlot};
use super::observer::MutationObserver;
use super::selector::Selector;
use crate::error::Result;

/// HTML Document representation
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) tree: Arc<DomTree>,
}

impl Document {
    /// Create a new empty document
    pub fn new() -> Self {
        Self {
            tree: Arc::new(DomTree::new()),
        }
    }

    /// Create a document with URL
    pub fn with_url(url: Url) -> Self {
        let doc = Self::new();
        doc.set_url(url);
        doc
    }

    pub(crate) fn from_tree(tree: Arc<DomTree>) -> Self {
        Self { tree }
    }

    /// Check whether two handles point at the same document
    pub fn same_document(&self, other: &Document) -> bool {
        Arc::ptr_eq(&self.tree, &other.tree)
    }

    /// Get the document URL
    pub fn url(&self) -> Option<Url> {
        self.tree.state.read().url.clone()
    }

    /// Replace the document URL
    pub fn set_url(&self, url: Url) {
        self.tree.state.write().url = Some(url);
    }

    /// Get document URL as string
    pub fn url_string(&self) -> Option<String> {
        self.url().map(|u| u.to_string())
    }

    /// Resolve a possibly relative reference against the document URL
    pub fn resolve_url(&self, reference: &str) -> Result<Url> {
        Ok(match self.url() {
            Some(base) => base.join(reference)?,
            None => Url::parse(reference)?,
        })
    }

    /// Set the fragment of the current location (same-document navigation)
    pub fn set_location_fragment(&self, fragment: Option<&str>) {
        if let Some(url) = self.tree.state.write().url.as_mut() {
            url.set_fragment(fragment);
        }
    }

    /// Get document title
    pub fn title(&self) -> String {
        self.tree.state.read().title.clone()
    }

    /// Set document title
    pub fn set_title(&self, title: impl Into<String>) {
        self.tree.state.write().title = title.into();
    }

    /// Whether `Event`/`MouseEvent` construction is available to the page
    pub fn supports_event_construction(&self) -> bool {
        self.tree.state.read().event_construction
    }

    /// Toggle event construction (legacy engines lack it)
    pub fn set_event_construction(&self, enabled: bool) {
        self.tree.state.write().event_construction = enabled;
    }

    fn element_for(&self, id: Option<NodeId>) -> Option<Element> {
        id.and_then(|id| Element::new(Node::new(id, self.tree.clone())))
    }

    /// Get the document element (<html>)
    pub fn document_element(&self) -> Option<Element> {
        self.element_for(self.tree.state.read().document_element)
    }

    /// Get the <head> element
    pub fn head(&self) -> Option<Element> {
        self.element_for(self.tree.state.read().head)
    }

    /// Get the <body> element
    pub fn body(&self) -> Option<Element> {
        self.element_for(self.tree.state.read().body)
    }

    /// Set document element IDs (called during parsing)
    pub(crate) fn set_elements(
        &self,
        document_element: Option<NodeId>,
        head: Option<NodeId>,
        body: Option<NodeId>,
    ) {
        let mut state = self.tree.state.write();
        state.document_element = document_element;
        state.head = head;
        state.body = body;
    }

    /// Get the root node
    pub fn root(&self) -> Node {
        Node::new(self.tree.root_id, self.tree.clone())
    }

    /// Query selector - find first matching element
    pub fn query_selector(&self, selector: &str) -> Option<Element> {
        let sel = Selector::parse(selector).ok()?;
        self.find_matching(&sel, false).into_iter().next()
    }

    /// Query selector all - find all matching elements
    pub fn query_selector_all(&self, selector: &str) -> Vec<Element> {
        self.try_query_selector_all(selector).unwrap_or_default()
    }

    /// Query selector all, surfacing selector syntax errors
    pub fn try_query_selector_all(&self, selector: &str) -> Result<Vec<Element>> {
        let sel = Selector::parse(selector)?;
        Ok(self.find_matching(&sel, true))
    }

    /// Element IDs in document order
    fn elements_in_order(&self) -> Vec<NodeId> {
        let nodes = self.tree.nodes.read();
        let mut order = Vec::new();
        let mut stack = vec![self.tree.root_id];
        while let Some(id) = stack.pop() {
            if let Some(data) = nodes.get(&id) {
                if data.node_type == NodeType::Element {
                    order.push(id);
                }
                stack.extend(data.children.iter().rev().copied());
            }
        }
        order
    }

    /// Find matching elements
    fn find_matching(&self, selector: &Selector, find_all: bool) -> Vec<Element> {
        let mut results = Vec::new();
        for id in self.elements_in_order() {
            let node = Node::new(id, self.tree.clone());
            if selector.matches(&node) {
                results.extend(Element::new(node));
                if !find_all {
                    break;
                }
            }
        }
        results
    }

    /// Get element by ID
    pub fn get_element_by_id(&self, id: &str) -> Option<Element> {
        self.elements_in_order()
            .into_iter()
            .map(|nid| Node::new(nid, self.tree.clone()))
            .find(|n| n.get_attribute("id").as_deref() == Some(id))
            .and_then(Element::new)
    }

    /// Create a new HTML element
    pub fn create_element(&self, tag: &str) -> Element {
        self.create_element_ns(tag, Namespace::Html)
    }

    /// Create a new element in a namespace
    pub fn create_element_ns(&self, tag: &str, namespace: Namespace) -> Element {
        let id = self.tree.create(NodeData::element_ns(tag, namespace));
        Element {
            node: Node::new(id, self.tree.clone()),
        }
    }

    /// Create a text node
    pub fn create_text_node(&self, content: &str) -> Node {
        let id = self.tree.create(NodeData::text(content));
        Node::new(id, self.tree.clone())
    }

    /// Get all links (<a> elements with href)
    pub fn links(&self) -> Vec<Element> {
        self.query_selector_all("a[href]")
    }

    /// Get all forms
    pub fn forms(&self) -> Vec<Element> {
        self.query_selector_all("form")
    }

    /// Get all scripts
    pub fn scripts(&self) -> Vec<Element> {
        self.query_selector_all("script")
    }

    /// Get all input elements
    pub fn inputs(&self) -> Vec<Element> {
        self.query_selector_all("input, textarea, select")
    }

    /// Get the document's HTML
    pub fn outer_html(&self) -> String {
        self.root().outer_html()
    }

    /// Get all text content
    pub fn text_content(&self) -> String {
        self.root().text_content()
    }

    /// Start observing child insertions below `root`
    pub fn observe(&self, root: &Node) -> MutationObserver {
        let observer = MutationObserver::new(self.tree.clone());
        self.tree.observers.write().push(ObserverSlot {
            root: root.id,
            records: observer.slot(),
        });
        observer
    }

    pub(crate) fn push_activity(&self, activity: PageActivity) {
        trace!("page activity: {}", activity.kind());
        self.tree.activity.lock().push_back(activity);
    }

    /// Take the oldest queued page activity
    pub fn take_activity(&self) -> Option<PageActivity> {
        self.tree.activity.lock().pop_front()
    }

    /// Number of queued page activities
    pub fn pending_activity(&self) -> usize {
        self.tree.activity.lock().len()
    }

    /// Page-initiated top-level navigation (`location.href = ...`)
    pub fn navigate(&self, url: &str) {
        self.navigate_with("GET", url, None);
    }

    /// Page-initiated navigation with an explicit method and body
    pub fn navigate_with(&self, method: &str, url: &str, data: Option<String>) {
        match self.resolve_url(url) {
            Ok(resolved) => self.push_activity(PageActivity::Navigate {
                method: method.to_uppercase(),
                url: resolved.to_string(),
                data,
            }),
            Err(e) => debug!("ignoring navigation to {}: {}", url, e),
        }
    }

    /// Open a WebSocket on behalf of the page
    pub fn open_websocket(&self, url: &str) -> WebSocket {
        let resolved = self
            .resolve_url(url)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| url.to_string());
        let socket = WebSocket::new(resolved, &self.tree);
        self.push_activity(PageActivity::WebSocketOpen {
            socket: socket.clone(),
        });
        socket
    }

    /// Cross-context `postMessage` issued by the page
    pub fn post_message(
        &self,
        destination: impl Into<String>,
        message: Value,
        target_origin: impl Into<String>,
        transfer: Vec<String>,
    ) {
        self.push_activity(PageActivity::PostMessage {
            destination: destination.into(),
            message,
            target_origin: target_origin.into(),
            transfer,
        });
    }

    /// Queue a microtask to run at the next checkpoint
    pub fn queue_microtask(&self, task: impl FnOnce() + Send + 'static) {
        self.tree.microtasks.lock().push_back(Box::new(task));
    }

    /// Run queued microtasks until the queue is empty
    pub fn perform_microtask_checkpoint(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = self.tree.microtasks.lock().pop_front();
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    /// Attach a child document behind a frame element
    pub fn attach_frame(&self, frame: &Element, child: &Document) {
        if !Arc::ptr_eq(&frame.node.tree, &self.tree) {
            debug!("frame element does not belong to this document");
            return;
        }
        *child.tree.host.write() = Some((Arc::downgrade(&self.tree), frame.node.id));
        self.tree.frames.write().insert(frame.node.id, child.clone());
    }

    /// Document displayed by a frame element of this document
    pub fn frame_document(&self, frame: &Element) -> Option<Document> {
        self.tree.frames.read().get(&frame.node.id).cloned()
    }

    /// All attached frames
    pub fn frames(&self) -> Vec<(Element, Document)> {
        self.tree
            .frames
            .read()
            .iter()
            .filter_map(|(&id, doc)| {
                Element::new(Node::new(id, self.tree.clone())).map(|el| (el, doc.clone()))
            })
            .collect()
    }

    /// Frame element hosting this document in its parent, if any
    pub fn hosting_frame(&self) -> Option<Element> {
        let host = self.tree.host.read();
        let (parent, id) = host.as_ref()?;
        let parent = parent.upgrade()?;
        Element::new(Node::new(*id, parent))
    }

    /// Top-level document of the frame chain
    pub fn top(&self) -> Document {
        let mut current = self.clone();
        while let Some(frame) = current.hosting_frame() {
            current = frame.owner_document();
        }
        current
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.same_document(other)
    }
}
