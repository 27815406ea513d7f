use std::path::Path;

use flowdash_layout::layout::geometry::Rect;
use flowdash_layout::layout_dump::layout_to_json;
use flowdash_layout::render::render_svg;
use flowdash_layout::{Config, Dashboard, Layout, Severity};

fn load_fixture(path: &Path) -> Dashboard {
    let input = std::fs::read_to_string(path).expect("fixture read failed");
    Dashboard::from_json(&input, Config::default()).expect("fixture build failed")
}

/// Inner rectangle of a container: its box minus margins and header band.
fn inner_rect(rect: &Rect, config: &Config) -> Rect {
    let margin = config.layout.container_margin;
    let header = config.layout.header_height;
    Rect::new(
        rect.x + margin.left,
        rect.y + header + margin.top,
        rect.width - margin.left - margin.right,
        rect.height - header - margin.top - margin.bottom,
    )
}

fn assert_structure(layout: &Layout, config: &Config, fixture: &str) {
    for node in &layout.nodes {
        assert!(
            node.width > 0.0 && node.height > 0.0,
            "{fixture}: `{}` has a degenerate size {}x{}",
            node.id,
            node.width,
            node.height
        );
        if node.hidden {
            continue;
        }
        let Some(parent) = node.parent.as_deref().and_then(|id| layout.node(id)) else {
            continue;
        };
        let inner = inner_rect(&parent.rect(), config);
        assert!(
            inner.contains_rect(&node.rect()),
            "{fixture}: `{}` {:?} escapes `{}` {:?}",
            node.id,
            node.rect(),
            parent.id,
            inner
        );
    }
    for edge in layout.visible_edges() {
        assert!(
            edge.points.len() >= 2,
            "{fixture}: edge `{}` has {} point(s)",
            edge.id,
            edge.points.len()
        );
    }
    assert!(
        layout
            .diagnostics
            .iter()
            .all(|diagnostic| diagnostic.severity() != Severity::Error),
        "{fixture}: unexpected errors {:?}",
        layout.diagnostics
    );
}

#[test]
fn layout_all_fixtures() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures");

    // Keep this list explicit so new fixtures must be added intentionally.
    let candidates = [
        "basic_nodes.json",
        "lanes_columns.json",
        "adapters.json",
        "foundation_mart.json",
        "edge_demo.json",
        "dashboard.json5",
    ];

    for rel in candidates {
        let path = root.join(rel);
        assert!(path.exists(), "fixture missing: {}", rel);
        let mut dashboard = load_fixture(&path);
        let layout = dashboard.layout();
        assert_structure(&layout, dashboard.config(), rel);

        dashboard.relayout();
        assert_eq!(dashboard.layout().nodes, layout.nodes, "{rel}: relayout moved nodes");

        let svg = render_svg(&layout, dashboard.config());
        assert!(svg.contains("<svg"), "{rel}: missing <svg tag");
        assert!(svg.contains("</svg>"), "{rel}: missing </svg tag");

        let json: serde_json::Value =
            serde_json::from_str(&layout_to_json(&layout).unwrap()).expect("dump is valid JSON");
        assert_eq!(
            json["nodes"].as_array().map(Vec::len),
            Some(layout.nodes.len()),
            "{rel}: dump lost nodes"
        );
    }
}

#[test]
fn every_container_survives_collapse_and_expand() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures");
    for rel in ["lanes_columns.json", "adapters.json", "dashboard.json5"] {
        let mut dashboard = load_fixture(&root.join(rel));
        let containers: Vec<String> = dashboard
            .layout()
            .nodes
            .iter()
            .filter(|node| node.kind.is_container())
            .map(|node| node.id.clone())
            .collect();
        for id in containers {
            let before = dashboard.layout();
            let was_collapsed = before.node(&id).unwrap().collapsed;
            dashboard.toggle(&id).unwrap();
            assert_structure(&dashboard.layout(), dashboard.config(), rel);
            dashboard.toggle(&id).unwrap();
            let after = dashboard.layout();
            assert_eq!(after.node(&id).unwrap().collapsed, was_collapsed);
            let visible = |layout: &Layout| layout.visible_nodes().cloned().collect::<Vec<_>>();
            assert_eq!(
                visible(&after),
                visible(&before),
                "{rel}: toggling `{id}` twice changed the layout"
            );
        }
    }
}

#[test]
fn fixtures_resolve_role_child_edges() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures");
    let dashboard = load_fixture(&root.join("adapters.json"));
    let layout = dashboard.layout();
    let edge = layout
        .edge("staging_adapter-collapsed--default--archive_adapter-arc")
        .expect("edge routed");
    assert_eq!(edge.source_anchor, "adapter-collapsed");
    assert_eq!(edge.target_anchor, "archive_adapter-arc");
    assert!(!edge.hidden);

    let dashboard = load_fixture(&root.join("edge_demo.json"));
    let layout = dashboard.layout();
    assert!(layout.edges.iter().all(|edge| edge.internal && edge.ghost.is_some()));
    assert_eq!(layout.edges.len(), 8 + 4 + 4 + 4 + 2 + 2);
}
