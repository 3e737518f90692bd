// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! In-flight script loads and socket sends, with a tick-budgeted wait

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace};
use url::Url;

use super::address::address_of;
use super::bridge::{Controller, ProbeEvent};
use crate::browser::Scheduler;
use crate::dom::{Element, Event, ListenerId, Node, WebSocket};
use crate::network::Request;

/// Which pending collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PendingKind {
    /// Script elements fetching data through a query string
    ScriptLoad,
    /// Socket frames not yet taken by the transport
    SocketSend,
}

struct PendingScript {
    script: Element,
    request: Request,
    listeners: Vec<ListenerId>,
}

#[derive(Default)]
struct PendingState {
    scripts: Vec<PendingScript>,
    sends: Vec<u64>,
    next_send: u64,
}

/// The two pending collections. Clones share state.
#[derive(Clone)]
pub struct PendingTracker {
    state: Arc<Mutex<PendingState>>,
    controller: Arc<dyn Controller>,
}

/// Resolved source of a script that looks like a JSONP fetch
pub fn jsonp_source(script: &Element) -> Option<Url> {
    if script.local_name() != "script" {
        return None;
    }
    let src = script.src()?;
    let url = script.owner_document().resolve_url(&src).ok()?;
    url.query().filter(|q| !q.is_empty())?;
    Some(url)
}

impl PendingTracker {
    pub fn new(controller: Arc<dyn Controller>) -> Self {
        Self {
            state: Arc::new(Mutex::new(PendingState::default())),
            controller,
        }
    }

    /// Operations still pending in `kind`
    pub fn len(&self, kind: PendingKind) -> usize {
        let state = self.state.lock();
        match kind {
            PendingKind::ScriptLoad => state.scripts.len(),
            PendingKind::SocketSend => state.sends.len(),
        }
    }

    pub fn is_empty(&self, kind: PendingKind) -> bool {
        self.len(kind) == 0
    }

    /// Register a script fetch, report it, and report its completion
    /// when the host fires `load` or `error` on it
    pub fn track_script(&self, script: &Element, request: Request) {
        let wire = request.to_wire();
        self.controller.notify(ProbeEvent::Jsonp {
            request: wire.clone(),
        });

        let listeners = ["load", "error"]
            .into_iter()
            .map(|event_type| {
                let state = Arc::downgrade(&self.state);
                let controller = self.controller.clone();
                let wire = wire.clone();
                script.add_event_listener(event_type, false, move |event: &mut Event| {
                    let Some(node) = event.target().cloned() else {
                        return;
                    };
                    let finished = remove_script(&state, &node);
                    if let Some(entry) = finished {
                        for id in entry.listeners {
                            node.remove_event_listener(id);
                        }
                    }
                    trace!("script {} finished with {}", wire.url, event.event_type());
                    controller.notify(ProbeEvent::JsonpCompleted {
                        request: wire.clone(),
                        script: Some(address_of(&node)),
                        response: None,
                        timedout: false,
                    });
                })
            })
            .collect();

        self.state.lock().scripts.push(PendingScript {
            script: script.clone(),
            request,
            listeners,
        });
    }

    /// Hand an approved frame to the socket; pending until the host flushes it
    pub fn track_socket_send(&self, socket: &WebSocket, message: String) {
        let id = {
            let mut state = self.state.lock();
            state.next_send += 1;
            let id = state.next_send;
            state.sends.push(id);
            id
        };
        let state = Arc::downgrade(&self.state);
        socket.transmit(
            message,
            Some(Box::new(move || {
                if let Some(state) = state.upgrade() {
                    state.lock().sends.retain(|s| *s != id);
                }
            })),
        );
    }

    /// Cooperative wait: once per scheduler tick, stop when the budget is
    /// spent or the collection is empty. Returns whether any tick passed
    /// with the collection still non-empty.
    pub async fn wait_for(&self, kind: PendingKind, budget: u64, scheduler: &dyn Scheduler) -> bool {
        let mut budget = budget;
        let mut waited = false;
        loop {
            scheduler.tick().await;
            if budget == 0 || self.is_empty(kind) {
                debug!("{:?} wait done (waited: {})", kind, waited);
                return waited;
            }
            budget -= 1;
            waited = true;
        }
    }

    /// Force-complete every pending script with a timed-out report
    pub fn sweep_scripts(&self) -> usize {
        let expired = std::mem::take(&mut self.state.lock().scripts);
        for entry in &expired {
            debug!("script {} timed out", entry.request.url);
            self.controller.notify(ProbeEvent::JsonpCompleted {
                request: entry.request.to_wire(),
                script: None,
                response: None,
                timedout: true,
            });
        }
        expired.len()
    }

    /// Forget every pending socket send, without reporting
    pub fn clear_socket_sends(&self) -> usize {
        let mut state = self.state.lock();
        let count = state.sends.len();
        state.sends.clear();
        count
    }

    /// Requests of the scripts still pending
    pub fn pending_scripts(&self) -> Vec<Request> {
        self.state
            .lock()
            .scripts
            .iter()
            .map(|p| p.request.clone())
            .collect()
    }
}

fn remove_script(state: &Weak<Mutex<PendingState>>, node: &Node) -> Option<PendingScript> {
    let state = state.upgrade()?;
    let mut state = state.lock();
    let pos = state.scripts.iter().position(|p| p.script.id == node.id)?;
    Some(state.scripts.remove(pos))
}

impl fmt::Debug for PendingTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("PendingTracker")
            .field("scripts", &state.scripts.len())
            .field("sends", &state.sends.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::VirtualClock;
    use crate::dom::{parse_html_with_url, Document};
    use crate::network::RequestKind;
    use crate::probe::RecordingController;

    fn setup() -> (Document, RecordingController, PendingTracker) {
        let doc = parse_html_with_url(
            "<body></body>",
            Some(Url::parse("https://example.com/app/").unwrap()),
        )
        .unwrap();
        let controller = RecordingController::new();
        let tracker = PendingTracker::new(Arc::new(controller.clone()));
        (doc, controller, tracker)
    }

    fn script(doc: &Document, src: &str) -> Element {
        let s = doc.create_element("script");
        s.set_attribute("src", src);
        s
    }

    fn request(url: &Url) -> Request {
        Request::new(RequestKind::Jsonp, "GET", url.as_str(), None, None)
    }

    #[test]
    fn test_jsonp_detection() {
        let (doc, _, _) = setup();
        assert_eq!(
            jsonp_source(&script(&doc, "data.js?cb=f")).map(|u| u.to_string()),
            Some("https://example.com/app/data.js?cb=f".to_string())
        );
        assert!(jsonp_source(&script(&doc, "data.js")).is_none());
        assert!(jsonp_source(&script(&doc, "data.js?")).is_none());
        assert!(jsonp_source(&doc.create_element("script")).is_none());
        let img = doc.create_element("img");
        img.set_attribute("src", "x.png?a=1");
        assert!(jsonp_source(&img).is_none());
    }

    #[test]
    fn test_load_completes_script() {
        let (doc, controller, tracker) = setup();
        let s = script(&doc, "/cb?x=1");
        doc.body().unwrap().append_child(&s);
        let url = jsonp_source(&s).unwrap();
        tracker.track_script(&s, request(&url));

        assert_eq!(tracker.len(PendingKind::ScriptLoad), 1);
        assert_eq!(tracker.pending_scripts()[0].url, "https://example.com/cb?x=1");
        assert_eq!(controller.names(), vec!["jsonp"]);

        s.dispatch_event(&mut Event::new("load", false, false));
        assert!(tracker.is_empty(PendingKind::ScriptLoad));

        let completed = controller.named("jsonpCompleted");
        assert_eq!(completed.len(), 1);
        match &completed[0] {
            ProbeEvent::JsonpCompleted {
                script, timedout, ..
            } => {
                assert_eq!(script.as_deref(), Some("body > script"));
                assert!(!timedout);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(s.listened_event_types().is_empty());
    }

    #[test]
    fn test_error_also_completes() {
        let (doc, controller, tracker) = setup();
        let s = script(&doc, "/cb?x=1");
        tracker.track_script(&s, request(&jsonp_source(&s).unwrap()));
        s.dispatch_event(&mut Event::new("error", false, false));
        assert!(tracker.is_empty(PendingKind::ScriptLoad));
        assert_eq!(controller.named("jsonpCompleted").len(), 1);
    }

    #[tokio::test]
    async fn test_timeout_sweep() {
        let (doc, controller, tracker) = setup();
        let s = script(&doc, "/never?x=1");
        tracker.track_script(&s, request(&jsonp_source(&s).unwrap()));

        let clock = VirtualClock::new();
        let waited = tracker.wait_for(PendingKind::ScriptLoad, 5, &clock).await;
        assert!(waited);
        assert_eq!(clock.now(), 6);

        assert_eq!(tracker.sweep_scripts(), 1);
        assert!(tracker.is_empty(PendingKind::ScriptLoad));
        match controller.named("jsonpCompleted").as_slice() {
            [ProbeEvent::JsonpCompleted {
                timedout, response, script, ..
            }] => {
                assert!(*timedout);
                assert!(response.is_none());
                assert!(script.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_completion_during_wait() {
        let (doc, _, tracker) = setup();
        let s = script(&doc, "/slow?x=1");
        tracker.track_script(&s, request(&jsonp_source(&s).unwrap()));

        let clock = VirtualClock::new();
        let target = s.clone();
        clock.at(3, move || {
            target.dispatch_event(&mut Event::new("load", false, false));
        });

        assert!(tracker.wait_for(PendingKind::ScriptLoad, 100, &clock).await);
        assert_eq!(clock.now(), 3);
        assert_eq!(tracker.sweep_scripts(), 0);
    }

    #[tokio::test]
    async fn test_empty_collection_does_not_wait() {
        let (_, _, tracker) = setup();
        let clock = VirtualClock::new();
        assert!(!tracker.wait_for(PendingKind::ScriptLoad, 5, &clock).await);
        assert_eq!(clock.now(), 1);
    }

    #[test]
    fn test_socket_sends_clear_on_flush() {
        let (doc, controller, tracker) = setup();
        let socket = doc.open_websocket("wss://example.com/ws");
        tracker.track_socket_send(&socket, "one".into());
        tracker.track_socket_send(&socket, "two".into());
        assert_eq!(tracker.len(PendingKind::SocketSend), 2);

        assert_eq!(socket.flush(), vec!["one", "two"]);
        assert!(tracker.is_empty(PendingKind::SocketSend));
        assert!(controller.events().is_empty());
    }

    #[test]
    fn test_socket_clear_is_silent() {
        let (doc, controller, tracker) = setup();
        let socket = doc.open_websocket("wss://example.com/ws");
        tracker.track_socket_send(&socket, "stuck".into());
        assert_eq!(tracker.clear_socket_sends(), 1);
        assert!(controller.events().is_empty());
    }
}
