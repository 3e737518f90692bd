// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Element-specific DOM operations

use std::collections::HashMap;

use super::event::submit_form;
use super::activity::PageActivity;
use super::node::{Node, NodeType};
use super::selector::Selector;

/// Element node with extended operations
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Element {
    /// Inner node reference
    pub node: Node,
}

impl Element {
    /// Create a new element from a node
    pub fn new(node: Node) -> Option<Self> {
        if node.node_type() == NodeType::Element {
            Some(Self { node })
        } else {
            None
        }
    }

    /// Get the tag name (uppercase)
    pub fn tag_name(&self) -> String {
        self.node.tag_name().unwrap_or_default()
    }

    /// Get local name (lowercase)
    pub fn local_name(&self) -> String {
        self.node.local_name().unwrap_or_default()
    }

    /// Get element ID
    pub fn id(&self) -> Option<String> {
        self.node.get_attribute("id")
    }

    /// Get class list as vector
    pub fn class_list(&self) -> Vec<String> {
        self.node
            .get_attribute("class")
            .map(|c| c.split_whitespace().map(String::from).collect())
            .unwrap_or_default()
    }

    /// Check if element has a class
    pub fn has_class(&self, class: &str) -> bool {
        self.class_list().iter().any(|c| c == class)
    }

    /// Get all attributes
    pub fn attributes(&self) -> HashMap<String, String> {
        self.node.attributes()
    }

    /// Get parent element
    pub fn parent_element(&self) -> Option<Element> {
        self.node.parent().and_then(Element::new)
    }

    /// Get child elements (only element nodes)
    pub fn children(&self) -> Vec<Element> {
        self.node
            .children()
            .into_iter()
            .filter_map(Element::new)
            .collect()
    }

    /// Query selector all below this element
    pub fn query_selector_all(&self, selector: &str) -> Vec<Element> {
        let Ok(sel) = Selector::parse(selector) else {
            return Vec::new();
        };
        let mut results = Vec::new();
        let mut stack: Vec<Element> = self.children().into_iter().rev().collect();
        while let Some(el) = stack.pop() {
            if sel.matches(&el.node) {
                results.push(el.clone());
            }
            stack.extend(el.children().into_iter().rev());
        }
        results
    }

    /// Check if element matches a selector
    pub fn matches(&self, selector: &str) -> bool {
        Selector::parse(selector)
            .map(|sel| sel.matches(&self.node))
            .unwrap_or(false)
    }

    /// Get closest ancestor matching selector
    pub fn closest(&self, selector: &str) -> Option<Element> {
        let sel = Selector::parse(selector).ok()?;

        let mut current = Some(self.clone());
        while let Some(el) = current {
            if sel.matches(&el.node) {
                return Some(el);
            }
            current = el.parent_element();
        }
        None
    }

    /// `type` of an input, lowercased, defaulting to `text`
    pub fn input_type(&self) -> String {
        self.get_attribute("type")
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "text".to_string())
    }

    /// Get value for form elements
    pub fn value(&self) -> Option<String> {
        match self.local_name().as_str() {
            "input" => Some(self.get_attribute("value").unwrap_or_default()),
            "select" => Some(self.get_attribute("value").unwrap_or_else(|| {
                let options = self.query_selector_all("option");
                options
                    .iter()
                    .find(|o| o.has_attribute("selected"))
                    .or_else(|| options.first())
                    .map(|o| o.get_attribute("value").unwrap_or_else(|| o.text_content()))
                    .unwrap_or_default()
            })),
            "textarea" => Some(self.text_content()),
            _ => None,
        }
    }

    /// Set value for form elements
    pub fn set_value(&self, value: impl Into<String>) {
        match self.local_name().as_str() {
            "input" | "select" => self.set_attribute("value", value),
            "textarea" => self.set_text_content(value),
            _ => {}
        }
    }

    /// Check if checkbox/radio is checked
    pub fn checked(&self) -> bool {
        self.has_attribute("checked")
    }

    /// Set checked state
    pub fn set_checked(&self, checked: bool) {
        if checked {
            self.set_attribute("checked", "checked");
        } else {
            self.remove_attribute("checked");
        }
    }

    /// Check if element is disabled
    pub fn disabled(&self) -> bool {
        self.has_attribute("disabled")
    }

    /// Get href for links
    pub fn href(&self) -> Option<String> {
        self.get_attribute("href")
    }

    /// Get src for images, scripts, frames
    pub fn src(&self) -> Option<String> {
        self.get_attribute("src")
    }

    /// `<a>` or `<area>` with an `href`
    pub fn is_link(&self) -> bool {
        matches!(self.local_name().as_str(), "a" | "area") && self.has_attribute("href")
    }

    /// Element that submits its form when activated
    pub fn is_submit_control(&self) -> bool {
        match self.local_name().as_str() {
            "button" => matches!(
                self.get_attribute("type")
                    .map(|t| t.trim().to_lowercase())
                    .as_deref(),
                None | Some("") | Some("submit")
            ),
            "input" => matches!(self.input_type().as_str(), "submit" | "image"),
            _ => false,
        }
    }

    /// Element that belongs to a form owner
    pub fn is_form_associated(&self) -> bool {
        matches!(
            self.local_name().as_str(),
            "button" | "fieldset" | "input" | "object" | "output" | "select" | "textarea"
        )
    }

    /// Get the form owner of a form-associated element
    pub fn form(&self) -> Option<Element> {
        if !self.is_form_associated() {
            return None;
        }
        self.parent_element()?.closest("form")
    }

    /// `<iframe>` or `<frame>`
    pub fn is_frame(&self) -> bool {
        matches!(self.local_name().as_str(), "iframe" | "frame")
    }

    /// `form.submit()`: queues the submission without a `submit` event
    pub fn submit(&self) {
        if self.local_name() == "form" {
            self.owner_document().push_activity(PageActivity::SubmitForm {
                form: self.clone(),
                submitter: None,
            });
        }
    }

    /// `form.requestSubmit()`: fires `submit` first
    pub fn request_submit(&self) {
        if self.local_name() == "form" {
            submit_form(self, None);
        }
    }
}

impl std::ops::Deref for Element {
    type Target = Node;

    fn deref(&self) -> &Self::Target {
        &self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    #[test]
    fn test_element_class_list() {
        let doc = parse_html("<div class=\"foo bar baz\">test</div>").unwrap();
        let div = doc.query_selector("div").unwrap();
        let classes = div.class_list();
        assert!(classes.contains(&"foo".to_string()));
        assert!(classes.contains(&"bar".to_string()));
        assert!(classes.contains(&"baz".to_string()));
    }

    #[test]
    fn test_submit_controls() {
        let doc = parse_html(
            r#"<form>
                <button id="b1">Go</button>
                <button id="b2" type="button">No</button>
                <input id="i1" type="submit">
                <input id="i2" type="IMAGE">
                <input id="i3">
            </form>"#,
        )
        .unwrap();
        let is_submit = |id: &str| doc.get_element_by_id(id).unwrap().is_submit_control();
        assert!(is_submit("b1"));
        assert!(!is_submit("b2"));
        assert!(is_submit("i1"));
        assert!(is_submit("i2"));
        assert!(!is_submit("i3"));
    }

    #[test]
    fn test_form_owner() {
        let doc = parse_html(
            "<form id='f'><div><input id='in'></div><a id='a' href='#'>x</a></form>",
        )
        .unwrap();
        let input = doc.get_element_by_id("in").unwrap();
        assert_eq!(input.form().and_then(|f| f.id()), Some("f".to_string()));
        // anchors are not form-associated
        assert!(doc.get_element_by_id("a").unwrap().form().is_none());
    }

    #[test]
    fn test_textarea_value() {
        let doc = parse_html("<textarea id='t'>old</textarea>").unwrap();
        let t = doc.get_element_by_id("t").unwrap();
        assert_eq!(t.value(), Some("old".to_string()));
        t.set_value("new");
        assert_eq!(t.value(), Some("new".to_string()));
    }

    #[test]
    fn test_select_value() {
        let doc = parse_html(
            "<select id='s'><option value='a'>A</option><option selected>B</option></select>",
        )
        .unwrap();
        let s = doc.get_element_by_id("s").unwrap();
        assert_eq!(s.value(), Some("B".to_string()));
        s.set_value("a");
        assert_eq!(s.value(), Some("a".to_string()));
    }

    #[test]
    fn test_form_submit_skips_submit_event() {
        let doc = parse_html("<form id='f'></form>").unwrap();
        let form = doc.get_element_by_id("f").unwrap();
        form.add_event_listener("submit", false, |e| e.prevent_default());
        form.submit();
        assert!(doc.take_activity().is_some());
        form.request_submit();
        assert!(doc.take_activity().is_none());
    }
}
