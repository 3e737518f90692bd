// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! DOM events: listeners, capture/target/bubble propagation and the
//! default actions of clicks on links and submit controls.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace, warn};

use super::activity::PageActivity;
use super::element::Element;
use super::node::Node;
use crate::network::same_resource;

/// Event callback
pub type Handler = Arc<dyn Fn(&mut Event) + Send + Sync>;

/// Identifies a registered listener for later removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone)]
pub(crate) struct ListenerEntry {
    pub id: ListenerId,
    pub event_type: String,
    pub capture: bool,
    pub once: bool,
    pub callback: Handler,
}

/// Interface the event was constructed with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Generic,
    Mouse,
}

/// Propagation phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    None,
    Capturing,
    AtTarget,
    Bubbling,
}

/// A DOM event travelling through the tree
#[derive(Debug, Clone)]
pub struct Event {
    event_type: String,
    kind: EventKind,
    bubbles: bool,
    cancelable: bool,
    target: Option<Node>,
    current_target: Option<Node>,
    phase: EventPhase,
    default_prevented: bool,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
    /// Payload for message-like events
    pub detail: Option<Value>,
}

impl Event {
    /// Generic event
    pub fn new(event_type: impl Into<String>, bubbles: bool, cancelable: bool) -> Self {
        Self {
            event_type: event_type.into(),
            kind: EventKind::Generic,
            bubbles,
            cancelable,
            target: None,
            current_target: None,
            phase: EventPhase::None,
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
            detail: None,
        }
    }

    /// Pointer event: bubbles and is cancelable
    pub fn mouse(event_type: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Mouse,
            ..Self::new(event_type, true, true)
        }
    }

    /// Attach a payload
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    pub fn cancelable(&self) -> bool {
        self.cancelable
    }

    pub fn phase(&self) -> EventPhase {
        self.phase
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn immediate_propagation_stopped(&self) -> bool {
        self.immediate_propagation_stopped
    }

    /// Node the event was dispatched to
    pub fn target(&self) -> Option<&Node> {
        self.target.as_ref()
    }

    /// Node whose listeners are currently running
    pub fn current_target(&self) -> Option<&Node> {
        self.current_target.as_ref()
    }

    /// Cancel the default action (ignored for non-cancelable events)
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }
}

impl Node {
    /// Register a listener
    pub fn add_event_listener(
        &self,
        event_type: &str,
        capture: bool,
        callback: impl Fn(&mut Event) + Send + Sync + 'static,
    ) -> ListenerId {
        self.register_listener(event_type, capture, false, Arc::new(callback))
    }

    /// Register a listener that removes itself after the first call
    pub fn add_event_listener_once(
        &self,
        event_type: &str,
        callback: impl Fn(&mut Event) + Send + Sync + 'static,
    ) -> ListenerId {
        self.register_listener(event_type, false, true, Arc::new(callback))
    }

    fn register_listener(
        &self,
        event_type: &str,
        capture: bool,
        once: bool,
        callback: Handler,
    ) -> ListenerId {
        let id = ListenerId::next();
        self.tree
            .listeners
            .write()
            .entry(self.id)
            .or_default()
            .push(ListenerEntry {
                id,
                event_type: event_type.to_string(),
                capture,
                once,
                callback,
            });
        id
    }

    /// Remove a listener; returns whether it was registered
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.tree.listeners.write();
        let Some(entries) = listeners.get_mut(&self.id) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|e| e.id != id);
        before != entries.len()
    }

    /// Event types with at least one listener on this node
    pub fn listened_event_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .tree
            .listeners
            .read()
            .get(&self.id)
            .map(|l| l.iter().map(|e| e.event_type.clone()).collect())
            .unwrap_or_default();
        types.extend(
            self.tree
                .handlers
                .read()
                .keys()
                .filter(|(id, _)| *id == self.id)
                .map(|(_, t)| t.clone()),
        );
        types.sort();
        types.dedup();
        types
    }

    /// Set the legacy `on<event>` handler property
    pub fn set_handler(
        &self,
        event_type: &str,
        callback: impl Fn(&mut Event) + Send + Sync + 'static,
    ) {
        self.tree
            .handlers
            .write()
            .insert((self.id, event_type.to_string()), Arc::new(callback));
    }

    /// Get the `on<event>` handler property
    pub fn handler(&self, event_type: &str) -> Option<Handler> {
        self.tree
            .handlers
            .read()
            .get(&(self.id, event_type.to_string()))
            .cloned()
    }

    /// Dispatch an event through the tree.
    ///
    /// Returns `false` when the default action was prevented.
    pub fn dispatch_event(&self, event: &mut Event) -> bool {
        event.target = Some(self.clone());
        event.default_prevented = false;
        event.propagation_stopped = false;
        event.immediate_propagation_stopped = false;

        let mut ancestors = Vec::new();
        let mut current = self.parent();
        while let Some(node) = current {
            current = node.parent();
            ancestors.push(node);
        }

        event.phase = EventPhase::Capturing;
        for node in ancestors.iter().rev() {
            if event.propagation_stopped {
                break;
            }
            invoke(node, event, Some(true));
        }

        if !event.propagation_stopped {
            event.phase = EventPhase::AtTarget;
            invoke(self, event, None);
        }

        if event.bubbles {
            event.phase = EventPhase::Bubbling;
            for node in ancestors.iter() {
                if event.propagation_stopped {
                    break;
                }
                invoke(node, event, Some(false));
            }
        }

        event.phase = EventPhase::None;
        event.current_target = None;

        if event.kind == EventKind::Mouse
            && event.event_type == "click"
            && !event.default_prevented
        {
            activate(self);
        }

        !event.default_prevented
    }
}

/// Run the listeners of one node. `capture` filters by registration
/// flag; `None` (at target) runs all of them.
fn invoke(node: &Node, event: &mut Event, capture: Option<bool>) {
    event.current_target = Some(node.clone());

    let entries: Vec<ListenerEntry> = node
        .tree
        .listeners
        .read()
        .get(&node.id)
        .map(|list| {
            list.iter()
                .filter(|e| e.event_type == event.event_type)
                .filter(|e| capture.map_or(true, |c| e.capture == c))
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    for entry in entries {
        if event.immediate_propagation_stopped {
            return;
        }
        let registered = node
            .tree
            .listeners
            .read()
            .get(&node.id)
            .map_or(false, |l| l.iter().any(|e| e.id == entry.id));
        if !registered {
            continue;
        }
        if entry.once {
            node.remove_event_listener(entry.id);
        }
        call(&entry.callback, event);
    }

    if capture != Some(true) && !event.immediate_propagation_stopped {
        if let Some(handler) = node.handler(&event.event_type) {
            call(&handler, event);
        }
    }
}

fn call(callback: &Handler, event: &mut Event) {
    if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
        warn!("listener for '{}' panicked", event.event_type);
    }
}

/// Default action of a non-prevented click
fn activate(target: &Node) {
    let mut current = Some(target.clone());
    while let Some(node) = current {
        current = node.parent();
        let Some(element) = Element::new(node) else {
            continue;
        };
        if element.is_link() {
            follow_link(&element);
            return;
        }
        if element.is_submit_control() {
            if let Some(form) = element.form() {
                submit_form(&form, Some(&element));
            }
            return;
        }
    }
}

fn follow_link(link: &Element) {
    let doc = link.owner_document();
    let Some(href) = link.href() else {
        return;
    };
    let destination = match doc.resolve_url(&href) {
        Ok(url) => url,
        Err(e) => {
            debug!("unresolvable link {}: {}", href, e);
            return;
        }
    };
    if destination.scheme() == "javascript" {
        trace!("javascript: link activated");
        return;
    }
    if let Some(current) = doc.url() {
        if destination.fragment().is_some() && same_resource(&current, &destination) {
            doc.set_location_fragment(destination.fragment());
            doc.root()
                .dispatch_event(&mut Event::new("hashchange", false, false));
            return;
        }
    }
    doc.push_activity(PageActivity::Navigate {
        method: "GET".to_string(),
        url: destination.to_string(),
        data: None,
    });
}

/// Fire `submit` on the form and queue the submission unless cancelled
pub(crate) fn submit_form(form: &Element, submitter: Option<&Element>) {
    let mut event = Event::new("submit", true, true);
    if form.dispatch_event(&mut event) {
        form.owner_document().push_activity(PageActivity::SubmitForm {
            form: form.clone(),
            submitter: submitter.cloned(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;
    use parking_lot::Mutex;
    use url::Url;

    fn log() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[test]
    fn test_capture_target_bubble_order() {
        let doc = parse_html("<div id='outer'><span id='inner'></span></div>").unwrap();
        let outer = doc.get_element_by_id("outer").unwrap();
        let inner = doc.get_element_by_id("inner").unwrap();
        let seen = log();

        let s = seen.clone();
        outer.add_event_listener("ping", true, move |_| s.lock().push("capture".into()));
        let s = seen.clone();
        inner.add_event_listener("ping", false, move |_| s.lock().push("target".into()));
        let s = seen.clone();
        outer.add_event_listener("ping", false, move |_| s.lock().push("bubble".into()));

        inner.dispatch_event(&mut Event::new("ping", true, false));
        assert_eq!(*seen.lock(), vec!["capture", "target", "bubble"]);
    }

    #[test]
    fn test_non_bubbling_event_stays_at_target() {
        let doc = parse_html("<div id='outer'><span id='inner'></span></div>").unwrap();
        let seen = log();
        let s = seen.clone();
        doc.get_element_by_id("outer")
            .unwrap()
            .add_event_listener("focus", false, move |_| s.lock().push("outer".into()));

        doc.get_element_by_id("inner")
            .unwrap()
            .dispatch_event(&mut Event::new("focus", false, false));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_prevent_default_needs_cancelable() {
        let doc = parse_html("<p id='p'></p>").unwrap();
        let p = doc.get_element_by_id("p").unwrap();
        p.add_event_listener("x", false, |e| e.prevent_default());

        assert!(p.dispatch_event(&mut Event::new("x", true, false)));
        assert!(!p.dispatch_event(&mut Event::new("x", true, true)));
    }

    #[test]
    fn test_stop_immediate_propagation() {
        let doc = parse_html("<div id='outer'><p id='p'></p></div>").unwrap();
        let p = doc.get_element_by_id("p").unwrap();
        let seen = log();

        p.add_event_listener("x", false, |e| e.stop_immediate_propagation());
        let s = seen.clone();
        p.add_event_listener("x", false, move |_| s.lock().push("second".into()));
        let s = seen.clone();
        doc.get_element_by_id("outer")
            .unwrap()
            .add_event_listener("x", false, move |_| s.lock().push("outer".into()));

        p.dispatch_event(&mut Event::new("x", true, true));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_once_listener_and_handler_property() {
        let doc = parse_html("<button id='b'></button>").unwrap();
        let b = doc.get_element_by_id("b").unwrap();
        let seen = log();
        let s = seen.clone();
        b.add_event_listener_once("x", move |_| s.lock().push("once".into()));
        let s = seen.clone();
        b.set_handler("x", move |_| s.lock().push("onx".into()));

        b.dispatch_event(&mut Event::new("x", false, false));
        b.dispatch_event(&mut Event::new("x", false, false));
        assert_eq!(*seen.lock(), vec!["once", "onx", "onx"]);
        assert_eq!(b.listened_event_types(), vec!["x"]);
    }

    #[test]
    fn test_panicking_listener_does_not_abort_dispatch() {
        let doc = parse_html("<p id='p'></p>").unwrap();
        let p = doc.get_element_by_id("p").unwrap();
        let seen = log();
        p.add_event_listener("x", false, |_| panic!("page error"));
        let s = seen.clone();
        p.add_event_listener("x", false, move |_| s.lock().push("after".into()));

        p.dispatch_event(&mut Event::new("x", false, false));
        assert_eq!(*seen.lock(), vec!["after"]);
    }

    #[test]
    fn test_link_click_queues_navigation() {
        let doc = parse_html("<a id='l' href='/next'><b id='inner'>go</b></a>").unwrap();
        doc.set_url(Url::parse("https://example.com/start").unwrap());
        doc.get_element_by_id("inner")
            .unwrap()
            .dispatch_event(&mut Event::mouse("click"));

        match doc.take_activity() {
            Some(PageActivity::Navigate { url, .. }) => {
                assert_eq!(url, "https://example.com/next")
            }
            other => panic!("unexpected activity {:?}", other),
        }
    }

    #[test]
    fn test_hash_link_updates_fragment_only() {
        let doc = parse_html("<a id='l' href='#section'>go</a>").unwrap();
        doc.set_url(Url::parse("https://example.com/page").unwrap());
        let fired = log();
        let f = fired.clone();
        doc.root()
            .add_event_listener("hashchange", false, move |_| f.lock().push("hash".into()));

        doc.get_element_by_id("l")
            .unwrap()
            .dispatch_event(&mut Event::mouse("click"));
        assert!(doc.take_activity().is_none());
        assert_eq!(doc.url().unwrap().fragment(), Some("section"));
        assert_eq!(*fired.lock(), vec!["hash"]);
    }

    #[test]
    fn test_generic_click_has_no_default_action() {
        let doc = parse_html("<a id='l' href='/next'>go</a>").unwrap();
        doc.get_element_by_id("l")
            .unwrap()
            .dispatch_event(&mut Event::new("click", true, false));
        assert!(doc.take_activity().is_none());
    }

    #[test]
    fn test_submit_button_submits_form() {
        let doc =
            parse_html("<form id='f' action='/s'><button id='b'>Go</button></form>").unwrap();
        let submits = log();
        let s = submits.clone();
        doc.get_element_by_id("f")
            .unwrap()
            .add_event_listener("submit", false, move |_| s.lock().push("submit".into()));

        doc.get_element_by_id("b")
            .unwrap()
            .dispatch_event(&mut Event::mouse("click"));
        assert_eq!(*submits.lock(), vec!["submit"]);
        assert!(matches!(
            doc.take_activity(),
            Some(PageActivity::SubmitForm { .. })
        ));
    }

    #[test]
    fn test_cancelled_submit_event_blocks_submission() {
        let doc =
            parse_html("<form id='f'><input id='s' type='submit'></form>").unwrap();
        doc.get_element_by_id("f")
            .unwrap()
            .add_event_listener("submit", false, |e| e.prevent_default());
        doc.get_element_by_id("s")
            .unwrap()
            .dispatch_event(&mut Event::mouse("click"));
        assert!(doc.take_activity().is_none());
    }
}
