// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Mutation tracking: inserted elements reduced to subtree roots

use std::collections::{HashSet, VecDeque};

use tracing::trace;

use crate::dom::{Element, MutationObserver, Node, NodeId};

/// Accumulates inserted elements and hands them out one root at a time
#[derive(Debug)]
pub struct MutationTracker {
    observer: MutationObserver,
    seen: Vec<Node>,
    queue: VecDeque<Node>,
    total: u64,
}

impl MutationTracker {
    /// Track insertions recorded by `observer`
    pub fn new(observer: MutationObserver) -> Self {
        Self {
            observer,
            seen: Vec::new(),
            queue: VecDeque::new(),
            total: 0,
        }
    }

    /// Pull pending observer records into the accumulated set
    pub fn collect(&mut self) {
        for node in self.observer.take_records() {
            if !node.is_markup_or_graphics() {
                continue;
            }
            if self.seen.iter().any(|n| n.id == node.id) {
                continue;
            }
            trace!("new node {:?}", node.id);
            self.total += 1;
            self.seen.push(node);
        }
    }

    /// Reduce the accumulated set to roots, queue them, return the oldest
    pub fn pop_mutation(&mut self) -> Option<Element> {
        self.collect();
        let seen = std::mem::take(&mut self.seen);
        self.queue.extend(root_nodes(&seen));
        while let Some(node) = self.queue.pop_front() {
            if let Some(element) = Element::new(node) {
                return Some(element);
            }
        }
        None
    }

    /// Every qualifying node ever observed
    pub fn total_mutations(&self) -> u64 {
        self.total
    }

    /// Nodes accumulated but not yet reduced
    pub fn accumulated(&self) -> usize {
        self.seen.len() + self.observer.pending()
    }

    /// Roots waiting in the pop queue
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Track another observer instead; pending nodes are dropped
    pub fn rebind(&mut self, observer: MutationObserver) {
        self.observer = observer;
        self.reset();
    }

    /// Drop everything accumulated and queued; the lifetime counter stays
    pub fn reset(&mut self) {
        self.observer.take_records();
        self.seen.clear();
        self.queue.clear();
    }
}

/// Keep only nodes with no ancestor in the set; each node maps to its
/// highest ancestor present, first discovery order wins.
pub fn root_nodes(nodes: &[Node]) -> Vec<Node> {
    let members: HashSet<NodeId> = nodes.iter().map(|n| n.id).collect();
    let mut roots: Vec<Node> = Vec::new();

    for node in nodes {
        let mut root = node.clone();
        let mut current = node.parent();
        while let Some(ancestor) = current {
            if members.contains(&ancestor.id) {
                root = ancestor.clone();
            }
            current = ancestor.parent();
        }
        if !roots.iter().any(|r| r.id == root.id) {
            roots.push(root);
        }
    }

    roots
}
