// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! The in-page agent
//!
//! [`Probe`] owns the per-document state (fire ledger, mutation queue,
//! pending operations, captured requests) and turns what the page does
//! into reports for the controller.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, trace, warn};
use url::Url;

use super::address::{self, address_of};
use super::bridge::{Controller, ProbeEvent};
use super::dispatch::{EventDispatcher, Interception};
use super::input::{fillable_controls, InputFiller};
use super::ledger::{Admission, TriggerContext, TriggerLedger};
use super::mutation::MutationTracker;
use super::pending::{jsonp_source, PendingKind, PendingTracker};
use crate::browser::{Form, ProbeConfig, Scheduler};
use crate::dom::{Document, Element, Event, MutationObserver, PageActivity, Selector};
use crate::network::{strip_fragment, Request, RequestKind};

/// Result of asking the probe to fire an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// Event name is empty or never synthesized
    Skipped,
    /// Pair was fired before in this document
    AlreadyFired,
    /// Controller said no; the pair stays unfired
    Vetoed,
    /// Dispatched
    Fired,
}

/// Agent bound to one loaded document and its frames
pub struct Probe {
    document: Document,
    config: ProbeConfig,
    controller: Arc<dyn Controller>,
    scheduler: Arc<dyn Scheduler>,
    dispatcher: EventDispatcher,
    ledger: TriggerLedger,
    mutations: MutationTracker,
    /// One script observer per frame-tree document
    script_watch: Vec<(Document, MutationObserver)>,
    pending: PendingTracker,
    filler: InputFiller,
    captured: Vec<Request>,
    captured_keys: HashSet<String>,
}

impl Probe {
    /// Attach a probe to `document`. Mutations are observed from the
    /// document element.
    pub fn new(
        document: Document,
        config: ProbeConfig,
        controller: Arc<dyn Controller>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        let root = document
            .document_element()
            .map(|el| el.node)
            .unwrap_or_else(|| document.root());
        let mutations = MutationTracker::new(document.observe(&root));

        let mut probe = Self {
            dispatcher: EventDispatcher::new(
                config.simulate_real_events,
                config.mouse_events.iter().cloned(),
            ),
            filler: InputFiller::new(&config),
            pending: PendingTracker::new(controller.clone()),
            ledger: TriggerLedger::new(),
            captured: Vec::new(),
            captured_keys: HashSet::new(),
            document,
            config,
            controller,
            scheduler,
            mutations,
            script_watch: Vec::new(),
        };
        probe.watch_frames();
        probe
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub fn ledger(&self) -> &TriggerLedger {
        &self.ledger
    }

    pub fn pending(&self) -> &PendingTracker {
        &self.pending
    }

    /// The document and every attached frame document, depth first
    pub fn documents(&self) -> Vec<Document> {
        frame_tree(&self.document)
    }

    /// Observe mutations below `root` instead of the document element
    pub fn observe(&mut self, root: &Element) {
        self.mutations.rebind(root.owner_document().observe(root));
    }

    /// Address of an element, across frames
    pub fn address_of(&self, element: &Element) -> String {
        address_of(element)
    }

    /// Element named by an address, across attached frames
    pub fn resolve(&self, address: &str) -> Option<Element> {
        address::resolve(&self.document, address)
    }

    /// Events offered on `element`, in events-map key order. An invalid
    /// selector ends the enumeration.
    pub fn events_for_element(&self, element: &Element) -> Vec<String> {
        let mut events = Vec::new();
        for (selector, names) in &self.config.events_map {
            let selector = match Selector::parse(selector) {
                Ok(selector) => selector,
                Err(e) => {
                    debug!("events map: {}", e);
                    break;
                }
            };
            if selector.matches(&element.node) {
                events.extend(names.iter().cloned());
            }
        }
        events
    }

    /// Fire `event` on `element` at most once per document lifetime
    pub async fn trigger_element_event(&mut self, element: &Element, event: &str) -> FireOutcome {
        match self.ledger.admit(element, event) {
            Admission::Skipped => return FireOutcome::Skipped,
            Admission::AlreadyFired => return FireOutcome::AlreadyFired,
            Admission::Admitted => {}
        }

        let allowed = self
            .ask(ProbeEvent::TriggerEvent {
                element: address_of(element),
                event: event.to_string(),
            })
            .await;
        if !allowed {
            debug!("controller vetoed {} on {}", event, stringify_element(element));
            return FireOutcome::Vetoed;
        }

        let context = self.ledger.commit(element, event);
        self.watch_frames();
        trace!("firing {} on {}", event, stringify_element(element));
        let report = self.dispatcher.dispatch(element, event);
        self.capture(&context, report.intercepted).await;
        FireOutcome::Fired
    }

    /// Report activity that arrived outside any dispatch (socket frames,
    /// timers driven by the host)
    pub async fn process_activity(&mut self) -> usize {
        self.capture(&TriggerContext::empty(), None).await
    }

    /// Next new-DOM root, oldest first
    pub fn pop_mutation(&mut self) -> Option<Element> {
        self.mutations.pop_mutation()
    }

    pub fn total_mutations(&self) -> u64 {
        self.mutations.total_mutations()
    }

    /// Forget accumulated and queued mutations
    pub fn reset_mutations(&mut self) {
        self.mutations.reset();
    }

    /// Wait for pending script fetches, then time out the rest
    pub async fn wait_jsonp(&mut self) -> bool {
        let waited = self
            .pending
            .wait_for(
                PendingKind::ScriptLoad,
                self.config.ajax_timeout,
                self.scheduler.as_ref(),
            )
            .await;
        self.pending.sweep_scripts();
        waited
    }

    /// Wait for pending socket sends, then forget the rest
    pub async fn wait_websocket(&mut self) -> bool {
        let waited = self
            .pending
            .wait_for(
                PendingKind::SocketSend,
                self.config.ajax_timeout,
                self.scheduler.as_ref(),
            )
            .await;
        self.pending.clear_socket_sends();
        waited
    }

    /// Fill every form control below `root` (root included)
    pub async fn fill_input_values(&mut self, root: &Element) -> usize {
        let mut filled = 0;
        for control in fillable_controls(root) {
            let allowed = self
                .ask(ProbeEvent::FillInput {
                    element: address_of(&control),
                })
                .await;
            if !allowed || !self.filler.fill(&control) {
                continue;
            }
            filled += 1;
            self.watch_frames();
            let report = self.dispatcher.dispatch(&control, "input");
            self.capture(&TriggerContext::empty(), report.intercepted)
                .await;
        }
        filled
    }

    /// Every request captured so far, first occurrence per dedup key
    pub fn captured_requests(&self) -> &[Request] {
        &self.captured
    }

    async fn ask(&self, event: ProbeEvent) -> bool {
        let name = event.name();
        match self.controller.ask(event).await {
            Ok(response) => response.allows(),
            Err(e) => {
                warn!("no answer for '{}': {}", name, e);
                false
            }
        }
    }

    fn remember(&mut self, request: &Request) {
        if self.captured_keys.insert(request.key()) {
            self.captured.push(request.clone());
        }
    }

    /// Start watching script insertions in frames attached since the last call
    fn watch_frames(&mut self) {
        for document in frame_tree(&self.document) {
            if self.script_watch.iter().any(|(watched, _)| *watched == document) {
                continue;
            }
            trace!("watching scripts in {:?}", document.url_string());
            let observer = document.observe(&document.root());
            self.script_watch.push((document, observer));
        }
    }

    /// Report the synchronous and microtask side effects of a dispatch
    async fn capture(&mut self, context: &TriggerContext, intercepted: Option<Interception>) -> usize {
        let mut handled = self.drain(context).await;

        if let Some(interception) = intercepted {
            self.handle_interception(context, interception);
            handled += 1;
        }

        loop {
            let ran: usize = frame_tree(&self.document)
                .iter()
                .map(Document::perform_microtask_checkpoint)
                .sum();
            let drained = self.drain(context).await;
            handled += drained;
            if ran == 0 && drained == 0 {
                return handled;
            }
        }
    }

    /// Handle inserted scripts and queued activity until both are empty
    async fn drain(&mut self, context: &TriggerContext) -> usize {
        let mut handled = 0;
        loop {
            let before = handled;
            self.watch_frames();

            let inserted: Vec<Element> = self
                .script_watch
                .iter()
                .flat_map(|(_, observer)| observer.take_records())
                .filter_map(Element::new)
                .collect();
            for script in inserted {
                if let Some(url) = jsonp_source(&script) {
                    let request =
                        Request::new(RequestKind::Jsonp, "GET", url.as_str(), None, context.to_trigger());
                    self.remember(&request);
                    self.pending.track_script(&script, request);
                    handled += 1;
                }
            }

            for document in frame_tree(&self.document) {
                while let Some(activity) = document.take_activity() {
                    self.handle_activity(context, &document, activity).await;
                    handled += 1;
                }
            }

            if handled == before {
                return handled;
            }
        }
    }

    async fn handle_activity(
        &mut self,
        context: &TriggerContext,
        origin: &Document,
        activity: PageActivity,
    ) {
        trace!("handling {}", activity.kind());
        match activity {
            PageActivity::Navigate { method, url, data } => {
                self.report_navigation(context, &method, &url, data);
            }
            PageActivity::SubmitForm { form, .. } => self.report_form(context, &form),
            PageActivity::WebSocketOpen { socket } => {
                let request =
                    Request::new(RequestKind::WebSocket, "GET", socket.url(), None, context.to_trigger());
                self.remember(&request);
                self.controller.notify(ProbeEvent::WebSocket {
                    request: request.to_wire(),
                });
            }
            PageActivity::WebSocketSend { socket, message } => {
                let request = Request::new(RequestKind::WebSocket, "GET", socket.url(), None, None);
                self.remember(&request);
                let allowed = self
                    .ask(ProbeEvent::WebSocketSend {
                        request: request.to_wire(),
                        message: message.clone(),
                    })
                    .await;
                if allowed {
                    self.pending.track_socket_send(&socket, message);
                } else {
                    debug!("send on {} vetoed", socket.url());
                }
            }
            PageActivity::WebSocketMessage { socket, message } => {
                let request = Request::new(RequestKind::WebSocket, "GET", socket.url(), None, None);
                self.remember(&request);
                self.controller.notify(ProbeEvent::WebSocketMessage {
                    request: request.to_wire(),
                    message,
                });
            }
            PageActivity::PostMessage {
                destination,
                message,
                target_origin,
                transfer,
            } => {
                let allowed = self
                    .ask(ProbeEvent::PostMessage {
                        destination: destination.clone(),
                        message: message.clone(),
                        target_origin,
                        transfer,
                    })
                    .await;
                if allowed {
                    deliver_message(origin, &destination, message);
                }
            }
        }
    }

    fn handle_interception(&mut self, context: &TriggerContext, interception: Interception) {
        match interception {
            Interception::Navigation { url } => self.report_navigation(context, "GET", &url, None),
            Interception::FormSubmission { form } => self.report_form(context, &form),
            Interception::Blocked => debug!("click blocked without a destination"),
        }
    }

    fn report_navigation(&mut self, context: &TriggerContext, method: &str, url: &str, data: Option<String>) {
        let url = match Url::parse(url) {
            Ok(parsed) => strip_fragment(&parsed).to_string(),
            Err(_) => url.split('#').next().unwrap_or_default().to_string(),
        };
        let method = if method.is_empty() { "GET" } else { method };
        let request = Request::new(RequestKind::Navigation, method, url, data, context.to_trigger());
        self.remember(&request);
        self.controller.notify(ProbeEvent::Navigation {
            request: request.to_wire(),
        });
    }

    fn report_form(&mut self, context: &TriggerContext, form: &Element) {
        let request = Form::from_element(form).to_request(context.to_trigger());
        self.remember(&request);
        self.controller.notify(ProbeEvent::FormSubmit {
            request: request.to_wire(),
            form: address_of(form),
        });
    }
}

impl std::fmt::Debug for Probe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Probe")
            .field("url", &self.document.url_string())
            .field("fired", &self.ledger.fired().len())
            .field("captured", &self.captured.len())
            .field("pending", &self.pending)
            .finish()
    }
}

/// `document` followed by every attached frame document, depth first
fn frame_tree(document: &Document) -> Vec<Document> {
    let mut documents = vec![document.clone()];
    let mut frames = document.frames();
    frames.sort_by_key(|(frame, _)| frame.node.id.as_u64());
    for (_, child) in frames {
        documents.extend(frame_tree(&child));
    }
    documents
}

/// Deliver an approved cross-context message as a `message` event
fn deliver_message(origin: &Document, destination: &str, message: serde_json::Value) {
    let target = match destination {
        "top" => origin.top(),
        "parent" => origin
            .hosting_frame()
            .map(|frame| frame.owner_document())
            .unwrap_or_else(|| origin.clone()),
        _ => origin.clone(),
    };
    let Some(root) = target.document_element() else {
        return;
    };
    let sender = origin.url().map(|u| u.origin().ascii_serialization());
    let mut event = Event::new("message", false, false).with_detail(json!({
        "data": message,
        "origin": sender,
    }));
    root.dispatch_event(&mut event);
}

/// Bracketed one-line description of an element for log lines
pub fn stringify_element(element: &Element) -> String {
    let mut parts = vec![element.tag_name()];

    if let Some(name) = element.get_attribute("name").filter(|n| !n.is_empty()) {
        parts.push(name);
    }
    let class = element.get_attribute("class").unwrap_or_default();
    if !class.is_empty() {
        parts.push(format!(".{}", quote_spaced(&class)));
    }
    if let Some(id) = element.id().filter(|i| !i.is_empty()) {
        parts.push(format!("#{}", id));
    }
    let document = element.owner_document();
    for attr in ["src", "action"] {
        if let Some(value) = element.get_attribute(attr) {
            let resolved = document
                .resolve_url(&value)
                .map(|u| u.to_string())
                .unwrap_or(value);
            parts.push(format!("{}={}", attr, resolved));
        }
    }
    if let Some(method) = element.get_attribute("method").filter(|m| !m.is_empty()) {
        parts.push(format!("method={}", method.to_lowercase()));
    }
    if let Some(value) = element.value().filter(|v| !v.is_empty()) {
        parts.push(format!("v={}", value));
    }

    let text = element.text_content();
    let text = text.trim();
    if !text.is_empty() {
        let text: String = text
            .replacen(|c: char| c.is_whitespace(), " ", 1)
            .chars()
            .take(10)
            .collect();
        parts.push(format!("txt={}", quote_spaced(&text)));
    }

    format!("[{}]", parts.join(" "))
}

fn quote_spaced(s: &str) -> String {
    if s.contains(' ') {
        format!("'{}'", s)
    } else {
        s.to_string()
    }
}
