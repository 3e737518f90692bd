// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Element addressing
//!
//! Produces the CSS-like path the controller uses to name an element, and
//! resolves such paths back to live elements. Elements inside frames get a
//! compound address: `inframe/<outer> ; <inner> ; <target>`.

use lazy_static::lazy_static;
use regex::Regex;

use crate::dom::{Document, Element, Node};

/// Prefix of a cross-frame address
pub const FRAME_MARKER: &str = "inframe/";
/// Separator between per-frame segments
pub const FRAME_DELIMITER: &str = " ; ";
/// Separator between path steps
pub const CHILD_COMBINATOR: &str = " > ";

lazy_static! {
    static ref ID_PATTERN: Regex = Regex::new(r"(?i)^[a-z][a-z0-9\-_:.]*$").unwrap();
}

/// Document-level capabilities the addresser needs to climb frames
pub trait FrameHost {
    /// Frame element hosting this document, and the host it lives in
    fn hosting_frame(&self) -> Option<(Node, Box<dyn FrameHost>)>;

    /// Address of `node` within this document only
    fn address_locally(&self, node: &Node) -> String;
}

impl FrameHost for Document {
    fn hosting_frame(&self) -> Option<(Node, Box<dyn FrameHost>)> {
        let frame = Document::hosting_frame(self)?;
        let parent = frame.owner_document();
        Some((frame.node, Box::new(parent)))
    }

    fn address_locally(&self, node: &Node) -> String {
        local_address(node)
    }
}

/// Address of `element`, climbing through hosting frames
pub fn address_of(element: &Node) -> String {
    address_in(&element.owner_document(), element)
}

/// Address of `node` as seen from `host`
pub fn address_in(host: &dyn FrameHost, node: &Node) -> String {
    let local = host.address_locally(node);

    let mut segments = Vec::new();
    let mut ascent = host.hosting_frame();
    while let Some((frame, parent)) = ascent {
        segments.push(parent.address_locally(&frame));
        ascent = parent.hosting_frame();
    }

    if segments.is_empty() {
        return local;
    }
    segments.reverse();
    segments.push(local);
    format!("{}{}", FRAME_MARKER, segments.join(FRAME_DELIMITER))
}

/// Single-document address of a node
pub fn local_address(node: &Node) -> String {
    if !node.is_markup_or_graphics() {
        return String::new();
    }

    if let Some(id) = node.get_attribute("id") {
        if ID_PATTERN.is_match(&id) && id_is_unique(node, &id) {
            return format!("#{}", id);
        }
    }

    let name = node.local_name().unwrap_or_default();
    let position = same_tag_position(node, &name);
    let step = if position > 1 {
        format!("{}:nth-of-type({})", name, position)
    } else {
        name.clone()
    };

    let is_document_element = node
        .owner_document()
        .document_element()
        .map_or(false, |root| root.node.id == node.id);
    if is_document_element || name == "body" {
        return step;
    }

    match node.parent().filter(|p| p.is_element()) {
        Some(parent) => {
            let parent_address = local_address(&parent);
            if parent_address.is_empty() {
                step
            } else {
                format!("{}{}{}", parent_address, CHILD_COMBINATOR, step)
            }
        }
        None => step,
    }
}

/// The id must select exactly one element when queried as `#id`
fn id_is_unique(node: &Node, id: &str) -> bool {
    node.owner_document()
        .try_query_selector_all(&format!("#{}", id))
        .map_or(false, |found| found.len() == 1)
}

/// 1-based position among preceding element siblings with the same tag
fn same_tag_position(node: &Node, name: &str) -> usize {
    let mut position = 1;
    let mut sibling = node.prev_sibling();
    while let Some(s) = sibling {
        if s.is_element() && s.local_name().as_deref() == Some(name) {
            position += 1;
        }
        sibling = s.prev_sibling();
    }
    position
}

/// Resolve an address produced by [`address_of`] starting at `document`
pub fn resolve(document: &Document, address: &str) -> Option<Element> {
    let Some(path) = address.strip_prefix(FRAME_MARKER) else {
        return document.query_selector(address);
    };

    let mut segments: Vec<&str> = path.split(FRAME_DELIMITER).collect();
    let target = segments.pop()?;
    let mut current = document.clone();
    for segment in segments {
        let frame = current.query_selector(segment)?;
        current = current.frame_document(&frame)?;
    }
    current.query_selector(target)
}
