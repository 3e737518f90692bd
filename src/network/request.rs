// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Captured outbound requests

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use super::field_eq::FieldEq;
use crate::dom::Element;
use crate::probe::address_of;

/// Kind of outbound interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    /// Top-level navigation
    Navigation,
    /// Form submission
    Form,
    /// Script element fetching data through a query string
    Jsonp,
    /// WebSocket connection or frame
    #[serde(rename = "websocket")]
    WebSocket,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Navigation => "navigation",
            RequestKind::Form => "form",
            RequestKind::Jsonp => "jsonp",
            RequestKind::WebSocket => "websocket",
        }
    }
}

/// The interaction that caused a side effect
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub element: Element,
    pub event: String,
}

impl Trigger {
    pub fn new(element: &Element, event: impl Into<String>) -> Self {
        Self {
            element: element.clone(),
            event: event.into(),
        }
    }

    /// Transport form; the element is addressed at call time
    pub fn to_wire(&self) -> WireTrigger {
        WireTrigger {
            element: address_of(&self.element),
            event: self.event.clone(),
        }
    }
}

/// A captured outbound request
#[derive(Debug, Clone)]
pub struct Request {
    pub kind: RequestKind,
    pub method: String,
    pub url: String,
    pub data: Option<String>,
    pub trigger: Option<Trigger>,
    pub extra_headers: BTreeMap<String, String>,
}

impl Request {
    /// Create a request; empty `data` is treated as absent
    pub fn new(
        kind: RequestKind,
        method: impl Into<String>,
        url: impl Into<String>,
        data: Option<String>,
        trigger: Option<Trigger>,
    ) -> Self {
        Self {
            kind,
            method: method.into(),
            url: url.into(),
            data: data.filter(|d| !d.is_empty()),
            trigger,
            extra_headers: BTreeMap::new(),
        }
    }

    /// Attach extra headers
    pub fn with_extra_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.extra_headers = headers;
        self
    }

    /// Dedup key: kind, method, url, data and trigger concatenated.
    /// Absent data or trigger contribute nothing.
    pub fn key(&self) -> String {
        let mut key = String::new();
        key.push_str(self.kind.as_str());
        key.push_str(&self.method);
        key.push_str(&self.url);
        if let Some(data) = &self.data {
            key.push_str(data);
        }
        if let Some(trigger) = &self.trigger {
            key.push_str(&address_of(&trigger.element));
            key.push_str(&trigger.event);
        }
        key
    }

    /// Transport-safe form without live element references
    pub fn to_wire(&self) -> WireRequest {
        WireRequest {
            kind: self.kind,
            method: self.method.clone(),
            url: self.url.clone(),
            data: self.data.clone(),
            extra_headers: self.extra_headers.clone(),
            trigger: self.trigger.as_ref().map(Trigger::to_wire),
        }
    }
}

/// Request fields, for [`FieldEq`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestField {
    Kind,
    Method,
    Url,
    Data,
    Trigger,
    ExtraHeaders,
}

impl FieldEq for Request {
    type Field = RequestField;

    const FIELDS: &'static [RequestField] = &[
        RequestField::Kind,
        RequestField::Method,
        RequestField::Url,
        RequestField::Data,
        RequestField::Trigger,
        RequestField::ExtraHeaders,
    ];

    fn field_eq(&self, other: &Self, field: RequestField) -> bool {
        match field {
            RequestField::Kind => self.kind == other.kind,
            RequestField::Method => self.method == other.method,
            RequestField::Url => self.url == other.url,
            RequestField::Data => self.data == other.data,
            RequestField::Trigger => self.trigger == other.trigger,
            RequestField::ExtraHeaders => self.extra_headers == other.extra_headers,
        }
    }
}

/// Wire form of a trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireTrigger {
    pub element: String,
    pub event: String,
}

/// Wire form of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRequest {
    #[serde(rename = "type")]
    pub kind: RequestKind,
    pub method: String,
    pub url: String,
    pub data: Option<String>,
    pub extra_headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<WireTrigger>,
}

/// Copy of `url` without its fragment
pub fn strip_fragment(url: &Url) -> Url {
    let mut stripped = url.clone();
    stripped.set_fragment(None);
    stripped
}

/// Whether two URLs name the same resource (fragments ignored)
pub fn same_resource(a: &Url, b: &Url) -> bool {
    strip_fragment(a) == strip_fragment(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;
    use crate::network::{contains_ignoring, unique_ignoring};
    use serde_json::json;

    fn nav(url: &str) -> Request {
        Request::new(RequestKind::Navigation, "GET", url, None, None)
    }

    #[test]
    fn test_key_skips_absent_fields() {
        let req = nav("https://example.com/");
        assert_eq!(req.key(), "navigationGEThttps://example.com/");

        let empty_data = Request::new(
            RequestKind::Form,
            "POST",
            "https://example.com/",
            Some(String::new()),
            None,
        );
        assert!(empty_data.data.is_none());
        assert_eq!(empty_data.key(), "formPOSThttps://example.com/");
    }

    #[test]
    fn test_key_changes_with_each_field() {
        let doc = parse_html("<button id='go'>Go</button><a id='a'></a>").unwrap();
        let go = doc.get_element_by_id("go").unwrap();
        let base = Request::new(
            RequestKind::Form,
            "POST",
            "https://example.com/s",
            Some("a=1".into()),
            Some(Trigger::new(&go, "click")),
        );
        let same = base.clone();
        assert_eq!(base.key(), same.key());

        let mut variants = Vec::new();
        let mut r = base.clone();
        r.kind = RequestKind::Navigation;
        variants.push(r);
        let mut r = base.clone();
        r.method = "GET".into();
        variants.push(r);
        let mut r = base.clone();
        r.url = "https://example.com/t".into();
        variants.push(r);
        let mut r = base.clone();
        r.data = Some("a=2".into());
        variants.push(r);
        let mut r = base.clone();
        r.trigger = Some(Trigger::new(&go, "dblclick"));
        variants.push(r);
        let mut r = base.clone();
        r.trigger = Some(Trigger::new(&doc.get_element_by_id("a").unwrap(), "click"));
        variants.push(r);

        for variant in variants {
            assert_ne!(variant.key(), base.key());
        }
    }

    #[test]
    fn test_wire_object() {
        let doc = parse_html("<div><button id='go'>Go</button></div>").unwrap();
        let go = doc.get_element_by_id("go").unwrap();
        let req = Request::new(
            RequestKind::Jsonp,
            "GET",
            "https://api.example.com/x?cb=f",
            None,
            Some(Trigger::new(&go, "click")),
        );
        assert_eq!(
            serde_json::to_value(req.to_wire()).unwrap(),
            json!({
                "type": "jsonp",
                "method": "GET",
                "url": "https://api.example.com/x?cb=f",
                "data": null,
                "extraHeaders": {},
                "trigger": {"element": "#go", "event": "click"}
            })
        );

        let headers = [("x-requested-with".to_string(), "XMLHttpRequest".to_string())]
            .into_iter()
            .collect();
        let with_headers = req.clone().with_extra_headers(headers);
        assert_eq!(with_headers.key(), req.key());
        assert_eq!(
            serde_json::to_value(with_headers.to_wire()).unwrap()["extraHeaders"],
            json!({"x-requested-with": "XMLHttpRequest"})
        );

        let plain = serde_json::to_value(nav("https://example.com/").to_wire()).unwrap();
        assert!(plain.get("trigger").is_none());
        assert_eq!(plain["type"], "navigation");
    }

    #[test]
    fn test_field_eq_over_requests() {
        let a = nav("https://example.com/a");
        let mut b = a.clone();
        b.method = "POST".into();
        assert!(!a.eq_ignoring(&b, &[]));
        assert!(a.eq_ignoring(&b, &[RequestField::Method]));
        assert!(contains_ignoring(&[a.clone()], &b, &[RequestField::Method]));
        assert_eq!(unique_ignoring(&[a.clone(), a.clone(), b], &[]).len(), 2);
    }

    #[test]
    fn test_same_resource() {
        let a = Url::parse("https://example.com/p?q=1#one").unwrap();
        let b = Url::parse("https://example.com/p?q=1#two").unwrap();
        let c = Url::parse("https://example.com/p?q=2").unwrap();
        assert!(same_resource(&a, &b));
        assert!(!same_resource(&a, &c));
        assert_eq!(strip_fragment(&a).as_str(), "https://example.com/p?q=1");
    }
}
