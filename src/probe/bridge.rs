// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Controller bridge
//!
//! Every observation the probe makes is reported to an external
//! controller. Fire-and-forget reports go through [`Controller::notify`];
//! reports whose answer gates the next step go through
//! [`Controller::ask`], the probe's only suspension point.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::network::WireRequest;

/// A report sent to the controller: `name` plus `params` on the wire
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "name", content = "params")]
pub enum ProbeEvent {
    /// About to fill a form control
    #[serde(rename = "fillinput")]
    FillInput { element: String },

    /// About to fire an event
    #[serde(rename = "triggerevent")]
    TriggerEvent { element: String, event: String },

    /// Script fetch with a query string was inserted
    #[serde(rename = "jsonp")]
    Jsonp { request: WireRequest },

    /// Script fetch finished, failed or timed out
    #[serde(rename = "jsonpCompleted")]
    JsonpCompleted {
        request: WireRequest,
        #[serde(skip_serializing_if = "Option::is_none")]
        script: Option<String>,
        response: Option<Value>,
        timedout: bool,
    },

    /// WebSocket opened
    #[serde(rename = "websocket")]
    WebSocket { request: WireRequest },

    /// WebSocket frame received
    #[serde(rename = "websocketMessage")]
    WebSocketMessage { request: WireRequest, message: String },

    /// WebSocket frame about to be sent
    #[serde(rename = "websocketSend")]
    WebSocketSend { request: WireRequest, message: String },

    /// Form submitted
    #[serde(rename = "formSubmit")]
    FormSubmit { request: WireRequest, form: String },

    /// Top-level navigation
    #[serde(rename = "navigation")]
    Navigation { request: WireRequest },

    /// Cross-context message about to be delivered
    #[serde(rename = "postmessage")]
    PostMessage {
        destination: String,
        message: Value,
        #[serde(rename = "targetOrigin")]
        target_origin: String,
        transfer: Vec<String>,
    },
}

impl ProbeEvent {
    /// Wire name of the report
    pub fn name(&self) -> &'static str {
        match self {
            ProbeEvent::FillInput { .. } => "fillinput",
            ProbeEvent::TriggerEvent { .. } => "triggerevent",
            ProbeEvent::Jsonp { .. } => "jsonp",
            ProbeEvent::JsonpCompleted { .. } => "jsonpCompleted",
            ProbeEvent::WebSocket { .. } => "websocket",
            ProbeEvent::WebSocketMessage { .. } => "websocketMessage",
            ProbeEvent::WebSocketSend { .. } => "websocketSend",
            ProbeEvent::FormSubmit { .. } => "formSubmit",
            ProbeEvent::Navigation { .. } => "navigation",
            ProbeEvent::PostMessage { .. } => "postmessage",
        }
    }

    /// Request carried by the report, if any
    pub fn request(&self) -> Option<&WireRequest> {
        match self {
            ProbeEvent::Jsonp { request }
            | ProbeEvent::JsonpCompleted { request, .. }
            | ProbeEvent::WebSocket { request }
            | ProbeEvent::WebSocketMessage { request, .. }
            | ProbeEvent::WebSocketSend { request, .. }
            | ProbeEvent::FormSubmit { request, .. }
            | ProbeEvent::Navigation { request } => Some(request),
            _ => None,
        }
    }
}

/// Controller answer. Only a literal `false` stops the probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerResponse(pub Value);

impl ControllerResponse {
    pub fn proceed() -> Self {
        Self(Value::Bool(true))
    }

    pub fn veto() -> Self {
        Self(Value::Bool(false))
    }

    /// Whether the probe may go ahead
    pub fn allows(&self) -> bool {
        self.0 != Value::Bool(false)
    }
}

impl Default for ControllerResponse {
    fn default() -> Self {
        Self::proceed()
    }
}

/// External decision maker driving the probe
///
/// # Example
///
/// ```rust,no_run
/// use sondi::probe::{Controller, ControllerResponse, ProbeEvent};
/// use async_trait::async_trait;
///
/// struct NoForms;
///
/// #[async_trait]
/// impl Controller for NoForms {
///     fn notify(&self, event: ProbeEvent) {
///         println!("{}", event.name());
///     }
///
///     async fn ask(&self, event: ProbeEvent) -> sondi::Result<ControllerResponse> {
///         Ok(match event {
///             ProbeEvent::FillInput { .. } => ControllerResponse::veto(),
///             _ => ControllerResponse::proceed(),
///         })
///     }
/// }
/// ```
#[async_trait]
pub trait Controller: Send + Sync {
    /// Fire-and-forget report
    fn notify(&self, event: ProbeEvent);

    /// Report and wait for the answer
    async fn ask(&self, event: ProbeEvent) -> Result<ControllerResponse>;
}

/// Message delivered over a [`ChannelController`]
#[derive(Debug)]
pub struct BridgeMessage {
    pub event: ProbeEvent,
    /// Present when the probe waits for an answer
    pub reply: Option<oneshot::Sender<ControllerResponse>>,
}

impl BridgeMessage {
    /// Answer an `ask`; a no-op for notifications
    pub fn respond(self, response: ControllerResponse) {
        if let Some(reply) = self.reply {
            let _ = reply.send(response);
        }
    }
}

/// Forwards reports to a controller task over a tokio channel
#[derive(Debug, Clone)]
pub struct ChannelController {
    sender: mpsc::UnboundedSender<BridgeMessage>,
}

impl ChannelController {
    /// Create the controller and the receiving end for the controller task
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BridgeMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl Controller for ChannelController {
    fn notify(&self, event: ProbeEvent) {
        let name = event.name();
        if self
            .sender
            .send(BridgeMessage { event, reply: None })
            .is_err()
        {
            warn!("controller gone, dropped '{}' report", name);
        }
    }

    async fn ask(&self, event: ProbeEvent) -> Result<ControllerResponse> {
        let (reply, answer) = oneshot::channel();
        self.sender
            .send(BridgeMessage {
                event,
                reply: Some(reply),
            })
            .map_err(|_| Error::BridgeClosed)?;
        answer.await.map_err(|_| Error::BridgeClosed)
    }
}

/// Allows everything and logs each report
#[derive(Debug, Clone, Default)]
pub struct LoggingController;

#[async_trait]
impl Controller for LoggingController {
    fn notify(&self, event: ProbeEvent) {
        match event.request() {
            Some(request) => info!(
                "{} {} {} {}",
                event.name(),
                request.method,
                request.url,
                request.data.as_deref().unwrap_or("")
            ),
            None => info!("{}", event.name()),
        }
    }

    async fn ask(&self, event: ProbeEvent) -> Result<ControllerResponse> {
        self.notify(event);
        Ok(ControllerResponse::proceed())
    }
}

/// Records every report; answers per report name (default: proceed)
#[derive(Debug, Clone, Default)]
pub struct RecordingController {
    events: Arc<Mutex<Vec<ProbeEvent>>>,
    answers: Arc<Mutex<HashMap<&'static str, ControllerResponse>>>,
}

impl RecordingController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every `ask` named `name` with `response`
    pub fn answer(&self, name: &'static str, response: ControllerResponse) {
        self.answers.lock().insert(name, response);
    }

    /// Everything reported so far
    pub fn events(&self) -> Vec<ProbeEvent> {
        self.events.lock().clone()
    }

    /// Names of everything reported so far
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(ProbeEvent::name).collect()
    }

    /// Reports named `name`
    pub fn named(&self, name: &str) -> Vec<ProbeEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.name() == name)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

#[async_trait]
impl Controller for RecordingController {
    fn notify(&self, event: ProbeEvent) {
        self.events.lock().push(event);
    }

    async fn ask(&self, event: ProbeEvent) -> Result<ControllerResponse> {
        let answer = self
            .answers
            .lock()
            .get(event.name())
            .cloned()
            .unwrap_or_default();
        self.events.lock().push(event);
        Ok(answer)
    }
}
