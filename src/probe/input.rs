// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Form control filling

use std::collections::BTreeMap;

use regex::{Regex, RegexBuilder};
use tracing::{debug, trace};

use crate::browser::ProbeConfig;
use crate::dom::Element;

/// Controls the filler looks at
pub const FILLABLE_CONTROLS: &str = "input, select, textarea";

/// Picks and writes values for form controls
#[derive(Debug, Clone)]
pub struct InputFiller {
    rules: Vec<(Regex, String)>,
    values: BTreeMap<String, String>,
}

impl InputFiller {
    /// Compile the name rules; malformed patterns are dropped
    pub fn new(config: &ProbeConfig) -> Self {
        let rules = config
            .input_name_match_value
            .iter()
            .filter_map(|rule| {
                match RegexBuilder::new(&rule.name).case_insensitive(true).build() {
                    Ok(regex) => Some((regex, rule.value.clone())),
                    Err(e) => {
                        debug!("dropping input rule '{}': {}", rule.name, e);
                        None
                    }
                }
            })
            .collect();

        Self {
            rules,
            values: config.input_values.clone(),
        }
    }

    /// Number of usable name rules
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Value of kind `kind`, or the `string` value for unknown kinds
    pub fn value(&self, kind: &str) -> String {
        self.values
            .get(kind)
            .or_else(|| self.values.get("string"))
            .cloned()
            .unwrap_or_default()
    }

    /// Value for a field called `name`; the first matching rule wins
    pub fn value_for_name(&self, name: &str) -> String {
        self.rules
            .iter()
            .find(|(regex, _)| regex.is_match(name))
            .map(|(_, kind)| self.value(kind))
            .unwrap_or_else(|| self.value("string"))
    }

    /// Write a value into `control`. Returns false when the control was
    /// left untouched.
    pub fn fill(&self, control: &Element) -> bool {
        let name = control.get_attribute("name").unwrap_or_default();
        match control.local_name().as_str() {
            "textarea" => {
                control.set_value(self.value_for_name(&name));
                true
            }
            "select" => {
                let options = control.query_selector_all("option");
                let value = match options.last() {
                    Some(last) if options.len() > 1 => last
                        .get_attribute("value")
                        .unwrap_or_else(|| last.text_content()),
                    _ => self.value_for_name(&name),
                };
                control.set_value(value);
                true
            }
            "input" => self.fill_input(control, &name),
            _ => false,
        }
    }

    fn fill_input(&self, input: &Element, name: &str) -> bool {
        let kind = input.input_type();
        trace!("filling input '{}' of type {}", name, kind);
        match kind.as_str() {
            "text" | "search" => input.set_value(self.value_for_name(name)),
            "radio" | "checkbox" => input.set_checked(!input.checked()),
            "range" | "number" => input.set_value(self.numeric_value(input)),
            "password" | "color" | "date" | "email" | "month" | "time" | "url" | "week"
            | "tel" => input.set_value(self.value(&kind)),
            "datetime-local" => input.set_value(self.value("datetimeLocal")),
            _ => return false,
        }
        true
    }

    /// `min + step` when `min` is set, otherwise the `number` value
    fn numeric_value(&self, input: &Element) -> String {
        let min = input
            .get_attribute("min")
            .filter(|m| !m.trim().is_empty())
            .and_then(|m| m.trim().parse::<i64>().ok());
        match min {
            Some(min) => {
                let step = input
                    .get_attribute("step")
                    .and_then(|s| s.trim().parse::<i64>().ok())
                    .unwrap_or(1);
                (min + step).to_string()
            }
            None => self.value("number"),
        }
    }
}

/// Fillable controls under `root`, with `root` first when it is one
pub fn fillable_controls(root: &Element) -> Vec<Element> {
    let mut controls = Vec::new();
    if root.matches(FILLABLE_CONTROLS) {
        controls.push(root.clone());
    }
    controls.extend(root.query_selector_all(FILLABLE_CONTROLS));
    controls
}
