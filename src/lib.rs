// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! # Sondi - In-page Crawler Agent
//!
//! An agent that lives inside a loaded page, exercises it like a user
//! would and reports every request the page makes back to a crawl
//! controller.
//!
//! ## Features
//!
//! - Stable element addresses, across frames
//! - Fire-once event triggering with causal attribution of requests
//! - Link and form submissions reported instead of followed
//! - Script (JSONP) fetches and socket sends waited out on a tick budget
//! - New DOM reduced to subtree roots for the next crawl step
//! - Controller veto on events, input filling, socket sends and postMessage
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use sondi::{CrawlStep, FrameLoader, HttpClient, LoggingController, Probe, ProbeConfig, TokioScheduler};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let loader = FrameLoader::new(HttpClient::new()?);
//!     let document = loader.load(&"https://example.com".parse()?).await?;
//!
//!     let mut probe = Probe::new(
//!         document,
//!         ProbeConfig::default(),
//!         Arc::new(LoggingController),
//!         Arc::new(TokioScheduler),
//!     );
//!     let report = CrawlStep::new().run(&mut probe).await;
//!
//!     for request in &report.requests {
//!         println!("{} {} {}", request.kind.as_str(), request.method, request.url);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod browser;
pub mod dom;
pub mod error;
pub mod http;
pub mod network;
pub mod probe;

// Re-exports for convenience

// Crawl driving
pub use browser::{CrawlStep, CrawlStepReport, FrameLoader, ProbeConfig, InputMatch};
pub use browser::{Form, FormField};
pub use browser::{DomDeduplicator, DomVerdict};
pub use browser::{Scheduler, TokioScheduler, VirtualClock};

// Agent
pub use probe::{Probe, FireOutcome, TriggerContext, TriggerLedger};
pub use probe::{address_of, resolve, MutationTracker, PendingKind, PendingTracker};
pub use probe::{EventDispatcher, Interception};

// Controller bridge
pub use probe::{
    BridgeMessage, ChannelController, Controller, ControllerResponse,
    LoggingController, ProbeEvent, RecordingController,
};

// DOM
pub use dom::{Document, Element, Node, parse_html, parse_html_with_url};

// Errors
pub use error::{Error, Result, ErrorContext};

// HTTP
pub use http::{HttpClient, Response};

// Requests
pub use network::{Request, RequestKind, Trigger, WireRequest};

/// Sondi version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
