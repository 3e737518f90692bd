// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Form extraction and form-as-request encoding

use tracing::debug;

use crate::dom::Element;
use crate::network::{Request, RequestKind, Trigger};

/// Extracted form
#[derive(Debug, Clone)]
pub struct Form {
    /// The `<form>` element
    pub element: Element,
    /// Raw `action` attribute
    pub action: Option<String>,
    /// Upper-cased method, GET when missing
    pub method: String,
    /// Controls in document order
    pub fields: Vec<FormField>,
}

/// One control of a form
#[derive(Debug, Clone)]
pub struct FormField {
    /// `input`, `select` or `textarea`
    pub tag: String,
    /// Field name
    pub name: Option<String>,
    /// Input type (`text` for non-inputs)
    pub field_type: String,
    /// Current value
    pub value: String,
    /// Checked state for checkboxes and radios
    pub checked: bool,
}

impl FormField {
    /// Whether the field contributes a `name=value` pair
    pub fn is_successful(&self) -> bool {
        if self.name.as_deref().map_or(true, str::is_empty) {
            return false;
        }
        if self.tag != "input" {
            return true;
        }
        match self.field_type.as_str() {
            "button" | "submit" => false,
            "checkbox" | "radio" => self.checked,
            _ => true,
        }
    }
}

impl Form {
    /// Create a form from a DOM element
    pub fn from_element(element: &Element) -> Self {
        let fields = element
            .query_selector_all("input, select, textarea")
            .into_iter()
            .map(|control| {
                let tag = control.local_name();
                let field_type = if tag == "input" {
                    control.input_type()
                } else {
                    "text".to_string()
                };
                FormField {
                    name: control.get_attribute("name"),
                    field_type,
                    value: control.value().unwrap_or_default(),
                    checked: control.checked(),
                    tag,
                }
            })
            .collect();

        Self {
            element: element.clone(),
            action: element.get_attribute("action").filter(|a| !a.is_empty()),
            method: element
                .get_attribute("method")
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "GET".to_string())
                .to_uppercase(),
            fields,
        }
    }

    /// `name=value` pairs of successful controls, percent-encoded and joined with `&`
    pub fn encoded_data(&self) -> String {
        self.fields
            .iter()
            .filter(|f| f.is_successful())
            .map(|f| {
                format!(
                    "{}={}",
                    url_encode(f.name.as_deref().unwrap_or_default()),
                    url_encode(&f.value)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Action resolved against the document URL; the document URL when absent
    fn resolve_action(&self) -> String {
        let document = self.element.owner_document();
        match &self.action {
            Some(action) => match document.resolve_url(action) {
                Ok(url) => url.to_string(),
                Err(e) => {
                    debug!("unresolvable form action '{}': {}", action, e);
                    action.clone()
                }
            },
            None => document.url_string().unwrap_or_default(),
        }
    }

    /// The request this form submits. GET forms carry their data in the
    /// query string and no trigger; everything else is a POST with a body.
    pub fn to_request(&self, trigger: Option<Trigger>) -> Request {
        let action = self.resolve_action();
        let data = self.encoded_data();

        if self.method == "GET" {
            let url = match url::Url::parse(&action) {
                Ok(mut url) => {
                    url.set_query((!data.is_empty()).then_some(data.as_str()));
                    url.to_string()
                }
                Err(_) => action,
            };
            Request::new(RequestKind::Form, "GET", url, None, None)
        } else {
            Request::new(RequestKind::Form, "POST", action, Some(data), trigger)
        }
    }
}

/// Percent-encode like `encodeURIComponent`
fn url_encode(s: &str) -> String {
    let mut result = String::new();
    for c in s.chars() {
        match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '!' | '~' | '*' | '\'' | '('
            | ')' => result.push(c),
            _ => {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).bytes() {
                    result.push_str(&format!("%{:02X}", byte));
                }
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html_with_url;
    use url::Url;

    fn form(html: &str) -> Form {
        let doc = parse_html_with_url(html, Some(Url::parse("https://example.com/a/page#x").unwrap()))
            .unwrap();
        Form::from_element(&doc.query_selector("form").unwrap())
    }

    #[test]
    fn test_post_form_request() {
        let f = form(
            r#"<form action="/login" method="post">
                <input name="user" value="jo doe">
                <input type="password" name="pw" value="a&b">
                <input type="checkbox" name="remember">
                <input type="radio" name="r" value="1" checked>
                <input type="submit" name="go" value="Go">
                <textarea name="note">hi</textarea>
                <input value="anonymous">
            </form>"#,
        );
        let doc = f.element.owner_document();
        let trigger = Trigger::new(&doc.query_selector("input").unwrap(), "click");
        let req = f.to_request(Some(trigger));

        assert_eq!(req.kind, RequestKind::Form);
        assert_eq!(req.method, "POST");
        assert_eq!(req.url, "https://example.com/login");
        assert_eq!(req.data.as_deref(), Some("user=jo%20doe&pw=a%26b&r=1&note=hi"));
        assert!(req.trigger.is_some());
    }

    #[test]
    fn test_get_form_replaces_query() {
        let f = form(r#"<form action="search?old=1"><input name="q" value="x y"></form>"#);
        let req = f.to_request(None);
        assert_eq!(req.method, "GET");
        assert_eq!(req.url, "https://example.com/a/search?q=x%20y");
        assert!(req.data.is_none());
        assert!(req.trigger.is_none());
    }

    #[test]
    fn test_get_form_drops_trigger() {
        let f = form(r#"<form><input name="q" value="1"></form>"#);
        let doc = f.element.owner_document();
        let trigger = Trigger::new(&doc.query_selector("input").unwrap(), "click");
        assert!(f.to_request(Some(trigger)).trigger.is_none());
    }

    #[test]
    fn test_missing_action_uses_document_url() {
        let f = form(r#"<form method="POST"><select name="s"><option value="v" selected>v</option></select></form>"#);
        let req = f.to_request(None);
        assert_eq!(req.url, "https://example.com/a/page#x");
        assert_eq!(f.method, "POST");
    }

    #[test]
    fn test_other_methods_post() {
        let f = form(r#"<form method="put" action="/x"><input name="a" value="1"></form>"#);
        assert_eq!(f.to_request(None).method, "POST");
    }

    #[test]
    fn test_url_encode() {
        assert_eq!(url_encode("a b/c?d=é"), "a%20b%2Fc%3Fd%3D%C3%A9");
        assert_eq!(url_encode("it's(ok)*"), "it's(ok)*");
    }
}
