// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! DOM engine for HTML parsing and manipulation
//!
//! Provides a DOM-like interface built on top of html5ever, with event
//! propagation, child-list observation and frame links: the surface the
//! probe drives.

mod activity;
mod document;
mod element;
mod event;
mod node;
mod observer;
mod parser;
mod selector;

pub use activity::{PageActivity, WebSocket};
pub use document::Document;
pub use element::Element;
pub use event::{Event, EventKind, EventPhase, Handler, ListenerId};
pub use node::{Namespace, Node, NodeId, NodeType};
pub use observer::MutationObserver;
pub use parser::{parse_html, parse_html_with_url};
pub use selector::Selector;
