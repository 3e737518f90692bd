// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Page-level plumbing around the agent
//!
//! Configuration, page and frame loading, form extraction, the tick
//! scheduler behind the cooperative waits, near-duplicate DOM detection,
//! and the crawl step driver.

mod config;
mod dedup;
mod form;
mod frames;
mod scheduler;
mod session;

pub use config::{InputMatch, ProbeConfig};
pub use dedup::{dom_tokens, simhash, similarity, DomDeduplicator, DomShape, DomVerdict};
pub use form::{Form, FormField};
pub use frames::{frame_url, FrameLoader, FRAME_ELEMENTS};
pub use scheduler::{Scheduler, TickHook, TokioScheduler, VirtualClock};
pub use session::{CrawlStep, CrawlStepReport, EXCLUDED_ATTRIBUTE};
