// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Child-list mutation observation

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::node::{DomTree, Node, NodeId};

/// Records nodes inserted below an observed root.
///
/// Only the inserted node itself is recorded, never its descendants.
/// Dropping the observer disconnects it.
pub struct MutationObserver {
    tree: Arc<DomTree>,
    records: Arc<Mutex<Vec<NodeId>>>,
}

impl MutationObserver {
    pub(crate) fn new(tree: Arc<DomTree>) -> Self {
        Self {
            tree,
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn slot(&self) -> Weak<Mutex<Vec<NodeId>>> {
        Arc::downgrade(&self.records)
    }

    /// Drain the inserted nodes recorded so far
    pub fn take_records(&self) -> Vec<Node> {
        std::mem::take(&mut *self.records.lock())
            .into_iter()
            .map(|id| Node::new(id, self.tree.clone()))
            .collect()
    }

    /// Number of undelivered records
    pub fn pending(&self) -> usize {
        self.records.lock().len()
    }
}

impl std::fmt::Debug for MutationObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationObserver")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::dom::parse_html;

    #[test]
    fn test_records_inserted_node_only() {
        let doc = parse_html("<body><div id='host'></div></body>").unwrap();
        let observer = doc.observe(&doc.root());

        let outer = doc.create_element("section");
        let inner = doc.create_element("span");
        outer.append_child(&inner);
        doc.get_element_by_id("host").unwrap().append_child(&outer);

        let records = observer.take_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, outer.node.id);
        assert_eq!(observer.pending(), 0);
    }

    #[test]
    fn test_ignores_insertions_outside_root() {
        let doc = parse_html("<div id='a'></div><div id='b'></div>").unwrap();
        let a = doc.get_element_by_id("a").unwrap();
        let observer = doc.observe(&a);

        doc.get_element_by_id("b")
            .unwrap()
            .append_child(&doc.create_element("p"));
        assert!(observer.take_records().is_empty());

        a.append_child(&doc.create_element("p"));
        assert_eq!(observer.take_records().len(), 1);
    }

    #[test]
    fn test_dropped_observer_stops_recording() {
        let doc = parse_html("<div></div>").unwrap();
        let observer = doc.observe(&doc.root());
        drop(observer);
        doc.body().unwrap().append_child(&doc.create_element("p"));
        assert!(doc.tree.observers.read().is_empty());
    }
}
