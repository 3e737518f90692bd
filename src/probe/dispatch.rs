// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Event dispatch with navigation interception
//!
//! Simulated clicks on links and submit controls would otherwise unload
//! the page. A one-shot listener on the clicked element cancels those
//! clicks and records what they would have done, so the probe can report
//! the navigation instead of following it.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};
use url::Url;

use crate::dom::{Element, Event};
use crate::network::same_resource;

/// Click targets that get the interception listener
const INTERCEPTED_CLICK_TARGETS: &str = "a, button, input[type=submit], input[type=file]";

/// What an intercepted click would have done
#[derive(Debug, Clone, PartialEq)]
pub enum Interception {
    /// Link navigation to this URL
    Navigation { url: String },
    /// Submission of this form
    FormSubmission { form: Element },
    /// Cancelled with nothing to report
    Blocked,
}

/// Outcome of one dispatch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    /// Whether anything was dispatched
    pub dispatched: bool,
    /// Set when the interception listener cancelled the click
    pub intercepted: Option<Interception>,
}

/// Fires DOM events the way a user interaction would
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    simulate_real_events: bool,
    mouse_events: HashSet<String>,
}

impl EventDispatcher {
    pub fn new(simulate_real_events: bool, mouse_events: impl IntoIterator<Item = String>) -> Self {
        Self {
            simulate_real_events,
            mouse_events: mouse_events.into_iter().collect(),
        }
    }

    fn is_pointer_event(&self, event: &str) -> bool {
        self.simulate_real_events && self.mouse_events.contains(event)
    }

    /// Fire `event` on `element`. Never fails; problems are logged and
    /// the dispatch is skipped.
    pub fn dispatch(&self, element: &Element, event: &str) -> DispatchReport {
        if event == "click" && element.local_name() == "input" && element.input_type() == "color" {
            debug!("skipping click on color input");
            return DispatchReport::default();
        }

        let document = element.owner_document();
        if !document.supports_event_construction() {
            return match element.handler(event) {
                Some(handler) => {
                    trace!("legacy on{} handler", event);
                    let mut legacy = Event::new(event, false, false);
                    handler(&mut legacy);
                    DispatchReport {
                        dispatched: true,
                        intercepted: None,
                    }
                }
                None => DispatchReport::default(),
            };
        }

        if !self.is_pointer_event(event) {
            element.dispatch_event(&mut Event::new(event, true, false));
            return DispatchReport {
                dispatched: true,
                intercepted: None,
            };
        }

        let captured = Arc::new(Mutex::new(None));
        let interceptor = (event == "click" && element.matches(INTERCEPTED_CLICK_TARGETS))
            .then(|| {
                let target = element.clone();
                let captured = captured.clone();
                element.add_event_listener("click", false, move |e| {
                    if let Some(interception) = intercept(&target) {
                        e.prevent_default();
                        e.stop_propagation();
                        e.stop_immediate_propagation();
                        *captured.lock() = Some(interception);
                    }
                })
            });

        element.dispatch_event(&mut Event::mouse(event));

        if let Some(id) = interceptor {
            element.remove_event_listener(id);
        }

        let intercepted = captured.lock().take();
        DispatchReport {
            dispatched: true,
            intercepted,
        }
    }
}

/// Decide whether a click on `control` must be cancelled.
/// `None` lets the default action run.
fn intercept(control: &Element) -> Option<Interception> {
    let document = control.owner_document();
    let (destination, form) = if control.local_name() == "a" {
        (control.href()?, None)
    } else {
        let form = control.form()?;
        let action = form.get_attribute("action").unwrap_or_default();
        (action, Some(form))
    };

    let destination = match document.resolve_url(&destination) {
        Ok(url) => url,
        Err(e) => {
            debug!("unresolvable destination '{}': {}", destination, e);
            return None;
        }
    };

    if destination.scheme() == "javascript" {
        return None;
    }

    if let Some(current) = document.url() {
        let hash = non_empty_fragment(&destination);
        if hash.is_some()
            && hash != non_empty_fragment(&current)
            && same_resource(&destination, &current)
        {
            return None;
        }
    }

    Some(match form {
        Some(form) if control.is_submit_control() => Interception::FormSubmission { form },
        Some(_) => Interception::Blocked,
        None => Interception::Navigation {
            url: destination.to_string(),
        },
    })
}

/// A bare `#` counts as no fragment at all
fn non_empty_fragment(url: &Url) -> Option<&str> {
    url.fragment().filter(|f| !f.is_empty())
}
