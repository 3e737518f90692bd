// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! One crawl step over a loaded page
//!
//! Fills the form controls, fires every mapped event on every element,
//! waits out pending script loads and socket sends, and collects the
//! roots of whatever DOM the page built in response. Roots shaped like
//! DOM already seen on the page are reported as repeats.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use super::dedup::DomDeduplicator;
use crate::network::Request;
use crate::probe::{address_of, stringify_element, FireOutcome, Probe};

/// Elements carrying this attribute are never fired on
pub const EXCLUDED_ATTRIBUTE: &str = "data-sondi-excluded";

/// Outcome of one crawl step
#[derive(Debug, Clone, Default)]
pub struct CrawlStepReport {
    /// Controls that received a value
    pub filled: usize,
    /// Events dispatched
    pub fired: usize,
    /// Events the controller refused
    pub vetoed: usize,
    /// Addresses of new-DOM roots, oldest first
    pub new_roots: Vec<String>,
    /// Subset of `new_roots` resembling DOM seen earlier on the page
    pub repeated_roots: Vec<String>,
    /// Requests first captured during this step
    pub requests: Vec<Request>,
    /// Whether the stop flag cut the step short
    pub stopped: bool,
}

/// Drives a [`Probe`] through one crawl step. Clones share the stop
/// flag and the recorded DOM shapes.
#[derive(Debug, Clone, Default)]
pub struct CrawlStep {
    stop: Arc<AtomicBool>,
    dedup: Arc<Mutex<DomDeduplicator>>,
}

impl CrawlStep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared flag; setting it ends the step before the next element
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Forget recorded DOM shapes; call after navigating to another page
    pub fn reset_dedup(&self) {
        self.dedup.lock().reset();
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub async fn run(&self, probe: &mut Probe) -> CrawlStepReport {
        let mut report = CrawlStepReport::default();
        let already_captured = probe.captured_requests().len();

        for document in probe.documents() {
            let root = document.body().or_else(|| document.document_element());
            if let Some(root) = root {
                report.filled += probe.fill_input_values(&root).await;
            }
        }

        'walk: for document in probe.documents() {
            for element in document.query_selector_all("*") {
                if self.stopped() {
                    report.stopped = true;
                    break 'walk;
                }
                if element.has_attribute(EXCLUDED_ATTRIBUTE) {
                    debug!("skipping excluded {}", stringify_element(&element));
                    continue;
                }
                for event in probe.events_for_element(&element) {
                    match probe.trigger_element_event(&element, &event).await {
                        FireOutcome::Fired => report.fired += 1,
                        FireOutcome::Vetoed => report.vetoed += 1,
                        FireOutcome::Skipped | FireOutcome::AlreadyFired => {}
                    }
                }
            }
        }

        if !report.stopped {
            probe.wait_jsonp().await;
            probe.wait_websocket().await;
            probe.process_activity().await;
        }

        let total_mutations = probe.total_mutations();
        while let Some(root) = probe.pop_mutation() {
            let address = address_of(&root);
            if !self.dedup.lock().add_element(&root, total_mutations).is_added() {
                debug!("repeated dom at {}", address);
                report.repeated_roots.push(address.clone());
            }
            report.new_roots.push(address);
        }
        report.requests = probe.captured_requests()[already_captured..].to_vec();

        info!(
            "crawl step: {} filled, {} fired, {} vetoed, {} new root(s) ({} repeated), {} request(s)",
            report.filled,
            report.fired,
            report.vetoed,
            report.new_roots.len(),
            report.repeated_roots.len(),
            report.requests.len()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{ProbeConfig, VirtualClock};
    use crate::dom::{parse_html_with_url, Document};
    use crate::network::RequestKind;
    use crate::probe::{ControllerResponse, RecordingController};
    use url::Url;

    fn probe(html: &str) -> (Document, RecordingController, Probe) {
        let doc = parse_html_with_url(html, Some(Url::parse("https://example.com/").unwrap()))
            .unwrap();
        let controller = RecordingController::new();
        let probe = Probe::new(
            doc.clone(),
            ProbeConfig::default().ajax_timeout(3),
            Arc::new(controller.clone()),
            Arc::new(VirtualClock::new()),
        );
        (doc, controller, probe)
    }

    #[tokio::test]
    async fn test_step_reports_requests_and_roots() {
        let (doc, _, mut probe) = probe(
            r#"<body>
                 <a id="l" href="/next">next</a>
                 <button id="b">more</button>
                 <div id="list"></div>
               </body>"#,
        );
        let list = doc.get_element_by_id("list").unwrap();
        let target = doc.clone();
        doc.get_element_by_id("b")
            .unwrap()
            .add_event_listener("click", false, move |_| {
                list.append_child(&target.create_element("ul"));
            });

        let report = CrawlStep::new().run(&mut probe).await;

        assert!(!report.stopped);
        assert!(report.fired > 0);
        assert_eq!(report.new_roots, vec!["#list > ul"]);
        let navigations: Vec<_> = report
            .requests
            .iter()
            .filter(|r| r.kind == RequestKind::Navigation)
            .collect();
        assert_eq!(navigations.len(), 1);
        assert_eq!(navigations[0].url, "https://example.com/next");
    }

    #[tokio::test]
    async fn test_second_step_fires_nothing_new() {
        let (_, _, mut probe) = probe("<button>x</button><a href='/y'>y</a>");
        let step = CrawlStep::new();
        let first = step.run(&mut probe).await;
        let second = step.run(&mut probe).await;
        assert!(first.fired > 0);
        assert_eq!(second.fired, 0);
        assert!(second.requests.is_empty());
    }

    #[tokio::test]
    async fn test_excluded_elements_are_skipped() {
        let (doc, controller, mut probe) =
            probe("<button id='b' data-sondi-excluded>x</button>");
        CrawlStep::new().run(&mut probe).await;
        let button = doc.get_element_by_id("b").unwrap();
        assert!(!probe.ledger().has_fired(&button, "click"));
        assert!(controller.named("triggerevent").is_empty());
    }

    #[tokio::test]
    async fn test_stop_flag_ends_walk() {
        let (_, controller, mut probe) = probe("<button>x</button>");
        let step = CrawlStep::new();
        step.stop();
        let report = step.run(&mut probe).await;
        assert!(report.stopped);
        assert_eq!(report.fired, 0);
        assert!(controller.named("triggerevent").is_empty());
    }

    fn card_adder(doc: &Document, button: &str) {
        let list = doc.get_element_by_id("list").unwrap();
        let target = doc.clone();
        doc.get_element_by_id(button)
            .unwrap()
            .add_event_listener("click", false, move |_| {
                let card = target.create_element("div");
                card.set_attribute("class", "card");
                for tag in ["h2", "p", "a"] {
                    card.append_child(&target.create_element(tag));
                }
                list.append_child(&card);
            });
    }

    #[tokio::test]
    async fn test_repeated_dom_is_marked() {
        let html = "<button id='one'>1</button><button id='two'>2</button><div id='list'></div>";
        let step = CrawlStep::new();

        let (doc, _, mut first) = probe(html);
        card_adder(&doc, "one");
        card_adder(&doc, "two");
        let report = step.run(&mut first).await;
        assert_eq!(report.new_roots.len(), 2);
        assert_eq!(report.repeated_roots, vec![report.new_roots[1].clone()]);

        let (doc, _, mut next) = probe(html);
        card_adder(&doc, "one");
        step.reset_dedup();
        let report = step.run(&mut next).await;
        assert_eq!(report.new_roots.len(), 1);
        assert!(report.repeated_roots.is_empty());
    }

    #[tokio::test]
    async fn test_vetoes_are_counted() {
        let (_, controller, mut probe) = probe("<button>x</button>");
        controller.answer("triggerevent", ControllerResponse::veto());
        let report = CrawlStep::new().run(&mut probe).await;
        assert_eq!(report.fired, 0);
        assert!(report.vetoed > 0);
    }
}
