use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use flowdash_layout::config::RouteStyle;
use flowdash_layout::{Config, Dashboard, parse_graph};
use std::hint::black_box;

/// `lanes` lanes, each holding `adapters` adapters plus a foundation and a
/// mart, chained left to right by user edges between role children.
fn dashboard_source(lanes: usize, adapters: usize) -> String {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    for lane in 0..lanes {
        let mut children = Vec::new();
        for i in 0..adapters {
            children.push(format!(r#"{{"id":"ad{lane}_{i}","type":"adapter"}}"#));
            if i > 0 {
                edges.push(format!(
                    r#"{{"source":"transform_ad{lane}_{}","target":"staging_ad{lane}_{i}"}}"#,
                    i - 1
                ));
            }
        }
        children.push(format!(r#"{{"id":"fd{lane}","type":"foundation"}}"#));
        children.push(format!(r#"{{"id":"mt{lane}","type":"mart","layout":{{"orientation":"vertical"}}}}"#));
        if adapters > 0 {
            edges.push(format!(
                r#"{{"source":"transform_ad{lane}_{}","target":"raw_fd{lane}"}}"#,
                adapters - 1
            ));
        }
        edges.push(format!(r#"{{"source":"base_fd{lane}","target":"load_mt{lane}"}}"#));
        if lane > 0 {
            edges.push(format!(
                r#"{{"source":"report_mt{}","target":"raw_fd{lane}"}}"#,
                lane - 1
            ));
        }
        nodes.push(format!(
            r#"{{"id":"lane{lane}","type":"lane","children":[{{"id":"cols{lane}","type":"columns","children":[{}]}}]}}"#,
            children.join(",")
        ));
    }
    format!(
        r#"{{"nodes":[{}],"edges":[{}]}}"#,
        nodes.join(","),
        edges.join(",")
    )
}

fn fast_config() -> Config {
    let mut config = Config::default();
    config.layout.fast_text_metrics = true;
    config
}

fn bench_build_and_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_and_layout");
    for (lanes, adapters) in [(2usize, 4usize), (8, 8), (20, 12)] {
        let description = parse_graph(&dashboard_source(lanes, adapters)).expect("parse failed");
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("lanes_{lanes}_adapters_{adapters}")),
            &description,
            |b, description| {
                b.iter(|| {
                    let dashboard =
                        Dashboard::new(black_box(description), fast_config()).expect("build failed");
                    black_box(dashboard.layout().nodes.len());
                });
            },
        );
    }
    group.finish();
}

fn bench_edge_routing(c: &mut Criterion) {
    let mut group = c.benchmark_group("edge_routing");
    let description = parse_graph(&dashboard_source(12, 10)).expect("parse failed");
    let mut channel = fast_config();
    channel.edges.route_style = RouteStyle::Channel;
    let mut curved = fast_config();
    curved.edges.curved = true;
    for (name, config) in [("elbow", fast_config()), ("channel", channel), ("curved", curved)] {
        let dashboard = Dashboard::new(&description, config).expect("build failed");
        group.bench_function(name, |b| {
            b.iter(|| black_box(dashboard.layout().edges.len()));
        });
    }
    group.finish();
}

fn bench_toggle(c: &mut Criterion) {
    let mut group = c.benchmark_group("toggle_cascade");
    let description = parse_graph(&dashboard_source(12, 10)).expect("parse failed");
    let mut dashboard = Dashboard::new(&description, fast_config()).expect("build failed");
    group.bench_function("adapter", |b| {
        b.iter(|| {
            dashboard.toggle(black_box("ad6_5")).expect("toggle failed");
        });
    });
    group.bench_function("lane", |b| {
        b.iter(|| {
            dashboard.toggle(black_box("lane3")).expect("toggle failed");
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_build_and_layout,
    bench_edge_routing,
    bench_toggle
);
criterion_main!(benches);
