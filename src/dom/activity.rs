// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Side effects the page initiates (navigations, form submissions,
//! sockets, cross-context messages). They queue on the document until
//! the probe drains them.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;

use super::document::Document;
use super::element::Element;
use super::node::DomTree;

/// Something the page asked the host to do
#[derive(Debug, Clone)]
pub enum PageActivity {
    /// Top-level navigation
    Navigate {
        method: String,
        url: String,
        data: Option<String>,
    },
    /// Form submission that survived its `submit` event
    SubmitForm {
        form: Element,
        submitter: Option<Element>,
    },
    /// New WebSocket connection
    WebSocketOpen { socket: WebSocket },
    /// Outbound frame the page wants to send
    WebSocketSend { socket: WebSocket, message: String },
    /// Inbound frame delivered to the page
    WebSocketMessage { socket: WebSocket, message: String },
    /// Cross-context message
    PostMessage {
        destination: String,
        message: Value,
        target_origin: String,
        transfer: Vec<String>,
    },
}

impl PageActivity {
    /// Short label used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            PageActivity::Navigate { .. } => "navigate",
            PageActivity::SubmitForm { .. } => "submit",
            PageActivity::WebSocketOpen { .. } => "websocket-open",
            PageActivity::WebSocketSend { .. } => "websocket-send",
            PageActivity::WebSocketMessage { .. } => "websocket-message",
            PageActivity::PostMessage { .. } => "postmessage",
        }
    }
}

type SentCallback = Box<dyn FnOnce() + Send>;

struct OutgoingFrame {
    message: String,
    on_sent: Option<SentCallback>,
}

struct SocketInner {
    id: u64,
    url: String,
    document: Weak<DomTree>,
    outbox: Mutex<Vec<OutgoingFrame>>,
}

/// Page-side WebSocket handle
#[derive(Clone)]
pub struct WebSocket {
    inner: Arc<SocketInner>,
}

impl WebSocket {
    pub(crate) fn new(url: String, document: &Arc<DomTree>) -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self {
            inner: Arc::new(SocketInner {
                id: COUNTER.fetch_add(1, Ordering::Relaxed),
                url,
                document: Arc::downgrade(document),
                outbox: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    fn document(&self) -> Option<Document> {
        self.inner.document.upgrade().map(Document::from_tree)
    }

    /// `socket.send(msg)` from page code
    pub fn send(&self, message: impl Into<String>) {
        if let Some(doc) = self.document() {
            doc.push_activity(PageActivity::WebSocketSend {
                socket: self.clone(),
                message: message.into(),
            });
        }
    }

    /// Inbound frame from the server
    pub fn receive(&self, message: impl Into<String>) {
        if let Some(doc) = self.document() {
            doc.push_activity(PageActivity::WebSocketMessage {
                socket: self.clone(),
                message: message.into(),
            });
        }
    }

    /// Put an approved frame on the wire. `on_sent` runs once the host
    /// transport has taken it.
    pub fn transmit(&self, message: impl Into<String>, on_sent: Option<SentCallback>) {
        self.inner.outbox.lock().push(OutgoingFrame {
            message: message.into(),
            on_sent,
        });
    }

    /// Bytes queued but not yet taken by the transport
    pub fn buffered_amount(&self) -> usize {
        self.inner.outbox.lock().iter().map(|f| f.message.len()).sum()
    }

    /// Host transport takes every queued frame
    pub fn flush(&self) -> Vec<String> {
        let frames = std::mem::take(&mut *self.inner.outbox.lock());
        frames
            .into_iter()
            .map(|frame| {
                if let Some(done) = frame.on_sent {
                    done();
                }
                frame.message
            })
            .collect()
    }
}

impl fmt::Debug for WebSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocket")
            .field("id", &self.inner.id)
            .field("url", &self.inner.url)
            .finish()
    }
}

impl PartialEq for WebSocket {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use url::Url;

    #[test]
    fn test_socket_lifecycle_queues_activity() {
        let doc = Document::with_url(Url::parse("https://example.com/chat").unwrap());
        let socket = doc.open_websocket("wss://example.com/ws");
        socket.send("hello");
        socket.receive("welcome");

        let kinds: Vec<_> = std::iter::from_fn(|| doc.take_activity())
            .map(|a| a.kind())
            .collect();
        assert_eq!(kinds, vec!["websocket-open", "websocket-send", "websocket-message"]);
    }

    #[test]
    fn test_flush_runs_sent_callbacks() {
        let doc = Document::new();
        let socket = doc.open_websocket("wss://example.com/ws");
        let sent = Arc::new(AtomicBool::new(false));
        let flag = sent.clone();
        socket.transmit("ping", Some(Box::new(move || flag.store(true, Ordering::SeqCst))));

        assert_eq!(socket.buffered_amount(), 4);
        assert!(!sent.load(Ordering::SeqCst));
        assert_eq!(socket.flush(), vec!["ping".to_string()]);
        assert!(sent.load(Ordering::SeqCst));
        assert_eq!(socket.buffered_amount(), 0);
    }
}
