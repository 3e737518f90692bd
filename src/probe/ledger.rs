// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Fire-once ledger for (element, event) pairs and the trigger context
//! that attributes captured requests to the interaction that caused them.

use tracing::debug;

use crate::dom::Element;
use crate::network::{contains_ignoring, FieldEq, Trigger};

/// Events the crawler must never synthesize
pub const NON_TRIGGERABLE: [&str; 3] = ["load", "unload", "beforeunload"];

/// A pair that has been fired
#[derive(Debug, Clone, PartialEq)]
pub struct TriggeredEventRecord {
    pub element: Element,
    pub event: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    Element,
    Event,
}

impl FieldEq for TriggeredEventRecord {
    type Field = RecordField;
    const FIELDS: &'static [RecordField] = &[RecordField::Element, RecordField::Event];

    fn field_eq(&self, other: &Self, field: RecordField) -> bool {
        match field {
            RecordField::Element => self.element == other.element,
            RecordField::Event => self.event == other.event,
        }
    }
}

/// Causal attribution carried through one dispatch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriggerContext {
    trigger: Option<Trigger>,
}

impl TriggerContext {
    /// No interaction in progress
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn for_pair(element: &Element, event: &str) -> Self {
        Self {
            trigger: Some(Trigger::new(element, event)),
        }
    }

    pub fn trigger(&self) -> Option<&Trigger> {
        self.trigger.as_ref()
    }

    /// Owned copy of the trigger for a captured request
    pub fn to_trigger(&self) -> Option<Trigger> {
        self.trigger.clone()
    }
}

/// Result of asking the ledger about a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Non-triggerable or unnamed event
    Skipped,
    /// Already fired in this document
    AlreadyFired,
    /// May be fired
    Admitted,
}

/// Append-only record of fired pairs
#[derive(Debug, Default)]
pub struct TriggerLedger {
    fired: Vec<TriggeredEventRecord>,
    current: TriggerContext,
}

impl TriggerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an event name may be synthesized at all
    pub fn is_triggerable(event: &str) -> bool {
        !event.is_empty() && !NON_TRIGGERABLE.contains(&event)
    }

    pub fn has_fired(&self, element: &Element, event: &str) -> bool {
        let probe = TriggeredEventRecord {
            element: element.clone(),
            event: event.to_string(),
        };
        contains_ignoring(&self.fired, &probe, &[])
    }

    /// Clear the current context and decide whether the pair may fire.
    /// Nothing is recorded, so a later veto leaves the pair unfired.
    pub fn admit(&mut self, element: &Element, event: &str) -> Admission {
        self.current = TriggerContext::empty();
        if !Self::is_triggerable(event) {
            debug!("event '{}' is not triggerable", event);
            return Admission::Skipped;
        }
        if self.has_fired(element, event) {
            return Admission::AlreadyFired;
        }
        Admission::Admitted
    }

    /// Mark the pair fired and make it the current trigger
    pub fn commit(&mut self, element: &Element, event: &str) -> TriggerContext {
        self.current = TriggerContext::for_pair(element, event);
        self.fired.push(TriggeredEventRecord {
            element: element.clone(),
            event: event.to_string(),
        });
        self.current.clone()
    }

    /// Current trigger context
    pub fn current(&self) -> &TriggerContext {
        &self.current
    }

    /// Fired pairs, oldest first
    pub fn fired(&self) -> &[TriggeredEventRecord] {
        &self.fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    #[test]
    fn test_fire_once() {
        let doc = parse_html("<button id='b'></button>").unwrap();
        let b = doc.get_element_by_id("b").unwrap();
        let mut ledger = TriggerLedger::new();

        assert_eq!(ledger.admit(&b, "click"), Admission::Admitted);
        let ctx = ledger.commit(&b, "click");
        assert_eq!(ctx.trigger().map(|t| t.event.as_str()), Some("click"));
        assert_eq!(ledger.admit(&b, "click"), Admission::AlreadyFired);
        assert_eq!(ledger.admit(&b, "dblclick"), Admission::Admitted);
        assert_eq!(ledger.fired().len(), 1);
    }

    #[test]
    fn test_non_triggerable_events() {
        let doc = parse_html("<body></body>").unwrap();
        let body = doc.body().unwrap();
        let mut ledger = TriggerLedger::new();
        for event in NON_TRIGGERABLE.iter().chain(std::iter::once(&"")) {
            assert_eq!(ledger.admit(&body, event), Admission::Skipped);
        }
    }

    #[test]
    fn test_admit_clears_context_without_recording() {
        let doc = parse_html("<a id='a'></a>").unwrap();
        let a = doc.get_element_by_id("a").unwrap();
        let mut ledger = TriggerLedger::new();
        ledger.admit(&a, "click");
        ledger.commit(&a, "click");
        assert!(ledger.current().trigger().is_some());

        ledger.admit(&a, "mouseup");
        assert!(ledger.current().trigger().is_none());
        assert!(!ledger.has_fired(&a, "mouseup"));
    }

    #[test]
    fn test_identity_not_address() {
        let doc = parse_html("<p></p><p></p>").unwrap();
        let ps = doc.query_selector_all("p");
        let mut ledger = TriggerLedger::new();
        ledger.commit(&ps[0], "click");
        assert!(!ledger.has_fired(&ps[1], "click"));
    }
}
