// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Near-duplicate detection for new DOM
//!
//! Each subtree is reduced to its element count and a 32-bit simhash over
//! tag-and-class tokens. Two subtrees match when their element counts
//! differ by at most [`ELEMENTS_DIFF_THRESHOLD`] percent and their hashes
//! are at least [`SIMHASH_THRESHOLD`] similar.

use std::time::Instant;

use tracing::trace;

use crate::dom::Element;

/// Maximum element-count difference, in percent of the larger count
pub const ELEMENTS_DIFF_THRESHOLD: usize = 15;
/// Minimum simhash similarity
pub const SIMHASH_THRESHOLD: f64 = 0.75;

const CRC32_TABLE: [u32; 256] = crc32_table();

const fn crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0xEDB8_8320
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// CRC-32 (IEEE) of a token, one step per character
pub fn crc32(token: &str) -> u32 {
    let crc = token.chars().fold(0xFFFF_FFFFu32, |crc, c| {
        (crc >> 8) ^ CRC32_TABLE[((crc ^ c as u32) & 0xFF) as usize]
    });
    crc ^ 0xFFFF_FFFF
}

/// Overlapping windows of `width` tokens joined by a space. Shorter
/// inputs come back unchanged.
pub fn shingles(tokens: &[String], width: usize) -> Vec<String> {
    if tokens.len() < width || width == 0 {
        return tokens.to_vec();
    }
    tokens.windows(width).map(|w| w.join(" ")).collect()
}

/// 32-bit simhash over 2-token shingles
pub fn simhash(tokens: &[String]) -> u32 {
    let mut weights = [0i64; 32];
    for hash in shingles(tokens, 2).iter().map(|s| crc32(s)) {
        for (bit, weight) in weights.iter_mut().enumerate() {
            if hash & (1u32 << bit) == 0 {
                *weight -= 1;
            } else {
                *weight += 1;
            }
        }
    }
    weights
        .iter()
        .enumerate()
        .filter(|(_, w)| **w > 0)
        .fold(0u32, |sh, (bit, _)| sh | (1u32 << bit))
}

/// Shared set bits over combined set bits; two empty hashes are identical
pub fn similarity(x: u32, y: u32) -> f64 {
    let union = (x | y).count_ones();
    if union == 0 {
        return 1.0;
    }
    f64::from((x & y).count_ones()) / f64::from(union)
}

/// `tag` or `tag-class` for every element of the subtree, document order
pub fn dom_tokens(root: &Element) -> Vec<String> {
    std::iter::once(root.clone())
        .chain(root.query_selector_all("*"))
        .map(|el| {
            let tag = el.local_name().to_lowercase();
            let class = el.get_attribute("class").unwrap_or_default();
            match class.split_whitespace().next() {
                Some(first) => format!("{}-{}", tag, first),
                None => tag,
            }
        })
        .collect()
}

/// A subtree shape seen before
#[derive(Debug, Clone)]
pub struct DomShape {
    pub elements: usize,
    pub simhash: u32,
    pub first_seen_at: Instant,
    pub last_seen_at: Instant,
    pub seen_count: usize,
    /// Lifetime mutation count when the shape was first recorded
    pub total_mutations: u64,
}

impl DomShape {
    fn new(tokens: &[String], total_mutations: u64) -> Self {
        let now = Instant::now();
        Self {
            elements: tokens.len(),
            simhash: simhash(tokens),
            first_seen_at: now,
            last_seen_at: now,
            seen_count: 1,
            total_mutations,
        }
    }

    fn matches(&self, other: &DomShape) -> bool {
        let larger = self.elements.max(other.elements);
        if larger > 0 {
            let diff = self.elements.abs_diff(other.elements) * 100 / larger;
            if diff > ELEMENTS_DIFF_THRESHOLD {
                return false;
            }
        }
        similarity(self.simhash, other.simhash) >= SIMHASH_THRESHOLD
    }
}

/// What [`DomDeduplicator::add`] decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomVerdict {
    /// First of its shape
    Added,
    /// Matches a recorded shape
    Seen {
        seen_count: usize,
        last_seen_at: Instant,
        total_mutations: u64,
    },
}

impl DomVerdict {
    pub fn is_added(&self) -> bool {
        matches!(self, DomVerdict::Added)
    }
}

/// Recorded subtree shapes of the current page
#[derive(Debug, Clone, Default)]
pub struct DomDeduplicator {
    shapes: Vec<DomShape>,
}

impl DomDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a subtree given as tokens; see [`dom_tokens`]
    pub fn add(&mut self, tokens: &[String], total_mutations: u64) -> DomVerdict {
        let shape = DomShape::new(tokens, total_mutations);
        match self.shapes.iter_mut().find(|known| known.matches(&shape)) {
            Some(known) => {
                known.last_seen_at = shape.last_seen_at;
                known.seen_count += 1;
                trace!("dom shape seen {} times", known.seen_count);
                DomVerdict::Seen {
                    seen_count: known.seen_count,
                    last_seen_at: known.last_seen_at,
                    total_mutations: known.total_mutations,
                }
            }
            None => {
                self.shapes.push(shape);
                DomVerdict::Added
            }
        }
    }

    pub fn add_element(&mut self, root: &Element, total_mutations: u64) -> DomVerdict {
        self.add(&dom_tokens(root), total_mutations)
    }

    /// Forget every shape; called when the page changes
    pub fn reset(&mut self) {
        self.shapes.clear();
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Sum of seen counts over all shapes
    pub fn total_seen(&self) -> usize {
        self.shapes.iter().map(|s| s.seen_count).sum()
    }
}
