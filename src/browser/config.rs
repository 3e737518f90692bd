// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Probe configuration

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Input-name rule: a field whose name matches `name` gets `input_values[value]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputMatch {
    /// Case-insensitive regex tested against the field name
    pub name: String,
    /// Key into the input value table
    pub value: String,
}

impl InputMatch {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Probe configuration, usually handed over by the controller as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProbeConfig {
    /// Ordered name rules for text-like inputs
    pub input_name_match_value: Vec<InputMatch>,
    /// Fire pointer events as mouse events with interception
    pub simulate_real_events: bool,
    /// Event names treated as pointer events
    pub mouse_events: Vec<String>,
    /// Selector to events offered on matching elements
    pub events_map: BTreeMap<String, Vec<String>>,
    /// Tick budget for pending-operation waits
    pub ajax_timeout: u64,
    /// Values typed into form controls, keyed by value kind
    pub input_values: BTreeMap<String, String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_events_map() -> BTreeMap<String, Vec<String>> {
    let pointer = ["click", "dblclick", "mouseup", "mousedown"];
    let keyed = ["click", "dblclick", "keydown", "keyup", "mouseup", "mousedown"];
    let field = [
        "change", "click", "dblclick", "blur", "focus", "keydown", "keyup", "mouseup", "mousedown",
    ];

    let mut map = BTreeMap::new();
    map.insert("a".to_string(), strings(&keyed));
    map.insert("button".to_string(), strings(&keyed));
    map.insert(
        "select".to_string(),
        strings(&["change", "click", "dblclick", "keydown", "keyup", "mouseup", "mousedown"]),
    );
    map.insert("input".to_string(), strings(&field));
    map.insert("textarea".to_string(), strings(&field));
    for tag in ["span", "td", "tr", "div"] {
        map.insert(tag.to_string(), strings(&pointer));
    }
    map
}

fn default_input_values() -> BTreeMap<String, String> {
    [
        ("string", "sondiVal"),
        ("number", "427"),
        ("month", "08"),
        ("year", "1987"),
        ("date", "1987-08-12"),
        ("color", "#3c6e9f"),
        ("week", "1987-W06"),
        ("time", "08:12"),
        ("datetimeLocal", "1987-08-12T08:12"),
        ("domain", "sondiprobe.com"),
        ("surname", "Virtanen"),
        ("firstname", "Aino"),
        ("lastname", "Virtanen"),
        ("email", "aino.virtanen@sondiprobe.com"),
        ("url", "http://www.sondiprobe.com"),
        ("humandate", "08/12/1987"),
        ("password", "Xk4!pq7Rz2"),
        ("tel", "+3 5550142031"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            input_name_match_value: vec![
                InputMatch::new("mail", "email"),
                InputMatch::new("((number)|(phone))|(^tel)", "number"),
                InputMatch::new("(date)|(birth)", "humandate"),
                InputMatch::new("((month)|(day))|(^mon$)", "month"),
                InputMatch::new("year", "year"),
                InputMatch::new("url", "url"),
                InputMatch::new("firstname", "firstname"),
                InputMatch::new("(surname)|(lastname)", "surname"),
            ],
            simulate_real_events: true,
            mouse_events: strings(&["click"]),
            events_map: default_events_map(),
            ajax_timeout: 3000,
            input_values: default_input_values(),
        }
    }
}

impl ProbeConfig {
    /// Create a config with the default tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse controller options; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read options from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Set the pending-operation tick budget
    pub fn ajax_timeout(mut self, ticks: u64) -> Self {
        self.ajax_timeout = ticks;
        self
    }

    /// Enable/disable realistic pointer events
    pub fn simulate_real_events(mut self, enabled: bool) -> Self {
        self.simulate_real_events = enabled;
        self
    }

    /// Replace the pointer event set
    pub fn mouse_events(mut self, events: Vec<String>) -> Self {
        self.mouse_events = events;
        self
    }

    /// Offer `events` on elements matching `selector`
    pub fn events_for(mut self, selector: impl Into<String>, events: Vec<String>) -> Self {
        self.events_map.insert(selector.into(), events);
        self
    }

    /// Append an input-name rule
    pub fn input_match(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.input_name_match_value.push(InputMatch::new(name, value));
        self
    }

    /// Override one input value
    pub fn input_value(mut self, kind: impl Into<String>, value: impl Into<String>) -> Self {
        self.input_values.insert(kind.into(), value.into());
        self
    }

    /// Value for `kind`, falling back to the `string` value
    pub fn value_for(&self, kind: &str) -> String {
        self.input_values
            .get(kind)
            .or_else(|| self.input_values.get("string"))
            .cloned()
            .unwrap_or_default()
    }
}
