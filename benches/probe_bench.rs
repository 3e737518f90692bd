// Copyright (c) 2026 Bountyy Oy. All rights reserved.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use sondi::dom::Node;
use sondi::probe::root_nodes;
use sondi::{address_of, parse_html, resolve};

fn page() -> String {
    let mut html = String::from("<html><body><div id=\"content\"><table>");
    for row in 0..50 {
        html.push_str("<tr>");
        for cell in 0..8 {
            html.push_str(&format!("<td><span class=\"c{}\">{}</span></td>", cell, row));
        }
        html.push_str("</tr>");
    }
    html.push_str("</table></div></body></html>");
    html
}

fn addressing_benchmark(c: &mut Criterion) {
    let doc = parse_html(&page()).unwrap();
    let spans = doc.query_selector_all("span");

    c.bench_function("address_of", |b| {
        b.iter(|| {
            for span in &spans {
                black_box(address_of(span));
            }
        })
    });

    let addresses: Vec<String> = spans.iter().map(|s| address_of(s)).collect();
    c.bench_function("resolve", |b| {
        b.iter(|| {
            for address in &addresses {
                black_box(resolve(&doc, address));
            }
        })
    });
}

fn root_reduction_benchmark(c: &mut Criterion) {
    let doc = parse_html(&page()).unwrap();
    let nodes: Vec<Node> = doc
        .query_selector_all("tr, td, span")
        .into_iter()
        .map(|el| el.node)
        .collect();

    c.bench_function("root_nodes", |b| b.iter(|| black_box(root_nodes(&nodes))));
}

criterion_group!(benches, addressing_benchmark, root_reduction_benchmark);
criterion_main!(benches);
