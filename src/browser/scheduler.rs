// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Host scheduler abstraction for cooperative, tick-counted waits
//!
//! - [`TokioScheduler`] yields to the runtime once per tick
//! - [`VirtualClock`] advances a counter and runs hooks due at that tick

use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

/// One zero-delay callback from the host scheduler
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Wait for the next tick
    async fn tick(&self);
}

/// Yields to the tokio runtime once per tick
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn tick(&self) {
        tokio::task::yield_now().await;
    }
}

/// Hook callback type
pub type TickHook = Box<dyn FnOnce() + Send>;

struct HookEntry {
    id: u64,
    due: u64,
    hook: TickHook,
}

impl PartialEq for HookEntry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for HookEntry {}

impl PartialOrd for HookEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HookEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reverse order for min-heap (earliest due first, then registration order)
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Deterministic clock for tests and replay
#[derive(Default)]
pub struct VirtualClock {
    now: AtomicU64,
    next_id: AtomicU64,
    hooks: Mutex<BinaryHeap<HookEntry>>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticks elapsed so far
    pub fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    /// Run `hook` when the clock reaches `tick`
    pub fn at(&self, tick: u64, hook: impl FnOnce() + Send + 'static) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.hooks.lock().push(HookEntry {
            id,
            due: tick,
            hook: Box::new(hook),
        });
    }

    /// Run `hook` `ticks` from now
    pub fn after(&self, ticks: u64, hook: impl FnOnce() + Send + 'static) {
        self.at(self.now() + ticks, hook);
    }

    /// Hooks not yet run
    pub fn pending_hooks(&self) -> usize {
        self.hooks.lock().len()
    }

    /// Advance one tick and run the hooks due by then
    pub fn advance(&self) {
        let now = self.now.fetch_add(1, Ordering::SeqCst) + 1;
        loop {
            let due = {
                let mut hooks = self.hooks.lock();
                match hooks.peek() {
                    Some(entry) if entry.due <= now => hooks.pop(),
                    _ => None,
                }
            };
            match due {
                Some(entry) => (entry.hook)(),
                None => break,
            }
        }
    }
}

impl std::fmt::Debug for VirtualClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualClock")
            .field("now", &self.now())
            .field("pending_hooks", &self.pending_hooks())
            .finish()
    }
}

#[async_trait]
impl Scheduler for VirtualClock {
    async fn tick(&self) {
        self.advance();
    }
}
