// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Sondi CLI - In-page Crawler Agent
//!
//! Loads a page with its frames and runs the agent over it.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use url::Url;

use sondi::{
    address_of, CrawlStep, Document, Form, FrameLoader, HttpClient, LoggingController, Probe,
    ProbeConfig, TokioScheduler,
};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sondi=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    let result = match args[1].as_str() {
        "probe" => match args.get(2) {
            Some(url) => probe_page(url, config_path(&args[3..])).await,
            None => usage_error("sondi probe <url> [--config <file.json>]"),
        },
        "selectors" => match args.get(2) {
            Some(url) => list_selectors(url).await,
            None => usage_error("sondi selectors <url>"),
        },
        "events" => match args.get(2) {
            Some(url) => list_events(url, config_path(&args[3..])).await,
            None => usage_error("sondi events <url> [--config <file.json>]"),
        },
        "forms" => match args.get(2) {
            Some(url) => list_forms(url).await,
            None => usage_error("sondi forms <url>"),
        },
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        "--version" | "-v" | "version" => {
            println!("sondi {}", sondi::VERSION);
            Ok(())
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            return ExitCode::from(1);
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    println!(
        r#"Sondi - In-page Crawler Agent

USAGE:
    sondi <COMMAND> [OPTIONS]

COMMANDS:
    probe <url>       Run one crawl step and print the captured requests
    selectors <url>   Print the address of every element
    events <url>      Print every element with the events it would receive
    forms <url>       Print the request each form would submit
    help              Show this help message
    version           Show version information

OPTIONS:
    --config <file>   JSON probe options (probe, events)

EXAMPLES:
    sondi probe https://example.com
    sondi probe https://example.com/app --config probe.json
    sondi selectors https://example.com

Set RUST_LOG=sondi=debug for per-event logging.
"#
    );
}

fn usage_error(usage: &str) -> anyhow::Result<()> {
    bail!("Usage: {}", usage)
}

fn config_path(rest: &[String]) -> Option<&str> {
    rest.iter()
        .position(|a| a == "--config")
        .and_then(|i| rest.get(i + 1))
        .map(String::as_str)
}

fn load_config(path: Option<&str>) -> anyhow::Result<ProbeConfig> {
    match path {
        Some(path) => ProbeConfig::from_file(path)
            .with_context(|| format!("reading options from {}", path)),
        None => Ok(ProbeConfig::default()),
    }
}

async fn load_page(url: &str) -> anyhow::Result<Document> {
    let url = Url::parse(url).with_context(|| format!("invalid URL '{}'", url))?;
    let loader = FrameLoader::new(HttpClient::new()?);
    let document = loader
        .load(&url)
        .await
        .with_context(|| format!("loading {}", url))?;
    Ok(document)
}

async fn probe_page(url: &str, config: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let document = load_page(url).await?;

    let mut probe = Probe::new(
        document,
        config,
        Arc::new(LoggingController),
        Arc::new(TokioScheduler),
    );
    let step = CrawlStep::new();
    let stop = step.stop_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.store(true, std::sync::atomic::Ordering::SeqCst);
        }
    });
    let report = step.run(&mut probe).await;

    for request in &report.requests {
        println!("{}", serde_json::to_string(&request.to_wire())?);
    }

    eprintln!("\n=== Crawl Step ===");
    eprintln!("Filled: {}", report.filled);
    eprintln!("Fired: {} ({} vetoed)", report.fired, report.vetoed);
    eprintln!("Requests: {}", report.requests.len());
    eprintln!("Mutations: {}", probe.total_mutations());
    if !report.new_roots.is_empty() {
        eprintln!("\n=== New DOM ({}) ===", report.new_roots.len());
        for root in &report.new_roots {
            if report.repeated_roots.contains(root) {
                eprintln!("  - {} (repeated)", root);
            } else {
                eprintln!("  - {}", root);
            }
        }
    }
    if report.stopped {
        eprintln!("\n[stopped early]");
    }
    Ok(())
}

async fn list_selectors(url: &str) -> anyhow::Result<()> {
    let document = load_page(url).await?;
    let probe = detached_probe(document, ProbeConfig::default());
    for doc in probe.documents() {
        for element in doc.query_selector_all("*") {
            println!("{}", address_of(&element));
        }
    }
    Ok(())
}

async fn list_events(url: &str, config: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let document = load_page(url).await?;
    let probe = detached_probe(document, config);
    for doc in probe.documents() {
        for element in doc.query_selector_all("*") {
            let events = probe.events_for_element(&element);
            if !events.is_empty() {
                println!("{}\t{}", address_of(&element), events.join(","));
            }
        }
    }
    Ok(())
}

async fn list_forms(url: &str) -> anyhow::Result<()> {
    let document = load_page(url).await?;
    let forms = document.forms();
    println!("=== Forms ({}) ===", forms.len());
    for element in &forms {
        let form = Form::from_element(element);
        let request = form.to_request(None);
        println!(
            "  - {} {} ({} fields) {}",
            request.method,
            request.url,
            form.fields.len(),
            address_of(element)
        );
    }
    Ok(())
}

fn detached_probe(document: Document, config: ProbeConfig) -> Probe {
    Probe::new(
        document,
        config,
        Arc::new(LoggingController),
        Arc::new(TokioScheduler),
    )
}
