mod composite;
mod edge_demo;
pub mod geometry;
pub mod routing;
mod stack;
pub(crate) mod text;
pub(crate) mod types;
pub use types::*;

pub use edge_demo::demo_roles;
pub(crate) use composite::keeps_child_size;

use crate::config::{Config, FlowOrientation, LayoutConfig};
use crate::error::Diagnostics;
use crate::ir::{Diagram, NodeKey, NodeKind, NodeStatus};
use crate::text_metrics::TextMeasure;
use geometry::{Point, Rect, Size, bounding_box, change_direction, change_size_direction};

/// Everything a layout pass reads besides the tree itself.
pub struct LayoutContext<'a> {
    pub config: &'a Config,
    pub measure: &'a dyn TextMeasure,
    pub diagnostics: &'a mut Diagnostics,
}

impl<'a> LayoutContext<'a> {
    pub fn new(
        config: &'a Config,
        measure: &'a dyn TextMeasure,
        diagnostics: &'a mut Diagnostics,
    ) -> Self {
        Self {
            config,
            measure,
            diagnostics,
        }
    }
}

/// Full pass: every node bottom-up, then the top-level placement.
///
/// Descendants of collapsed containers are laid out too, so that expanding
/// one later only needs the upward cascade.
pub fn compute_layout(diagram: &mut Diagram, ctx: &mut LayoutContext<'_>) {
    tracing::debug!(nodes = diagram.len(), "full layout pass");
    for key in diagram.post_order() {
        layout_node(diagram, key, ctx);
    }
    place_roots(diagram, &ctx.config.layout);
}

/// Re-lays out `key` and each of its ancestors, then the top-level nodes.
pub fn cascade(diagram: &mut Diagram, key: NodeKey, ctx: &mut LayoutContext<'_>) {
    let chain: Vec<NodeKey> = std::iter::once(key).chain(diagram.ancestors(key)).collect();
    tracing::debug!(node = %diagram[key].id, depth = chain.len(), "layout cascade");
    for node in chain {
        layout_node(diagram, node, ctx);
    }
    place_roots(diagram, &ctx.config.layout);
}

/// Sizes one node whose children already carry valid sizes, and places those
/// children. Returns the node's new size.
pub fn layout_node(diagram: &mut Diagram, key: NodeKey, ctx: &mut LayoutContext<'_>) -> Size {
    let kind = diagram[key].kind;
    let size = if kind.is_container() && diagram[key].collapsed {
        badge_size(diagram, key, ctx)
    } else {
        match kind {
            NodeKind::Leaf(_) => clamp_leaf_width(diagram, key, text::leaf_size(diagram, key, ctx)),
            NodeKind::Lane => stack::layout_stack(diagram, key, false, ctx),
            NodeKind::Columns => stack::layout_stack(diagram, key, true, ctx),
            NodeKind::Adapter | NodeKind::Foundation | NodeKind::Mart => {
                composite::layout_composite(diagram, key, ctx)
            }
            NodeKind::EdgeDemo => edge_demo::layout_edge_demo(diagram, key, ctx),
        }
    };
    diagram[key].size = size;
    size
}

fn clamp_leaf_width(diagram: &Diagram, key: NodeKey, size: Size) -> Size {
    let options = &diagram[key].options;
    let mut width = size.width;
    if let Some(max) = options.max_width {
        width = width.min(max);
    }
    if let Some(min) = options.min_width {
        width = width.max(min);
    }
    Size::new(width, size.height)
}

/// Size of a collapsed container. Depends on the label, never on children.
fn badge_size(diagram: &Diagram, key: NodeKey, ctx: &mut LayoutContext<'_>) -> Size {
    let node = &diagram[key];
    let header = text::header_width(node, ctx);
    let layout = &ctx.config.layout;
    Size::new(
        layout
            .collapsed_width
            .max(header)
            .max(node.options.minimum_size.width),
        layout
            .collapsed_height
            .max(node.options.minimum_size.height),
    )
}

/// Container size for `content`, plus the inner rectangle (local coordinates)
/// children must be placed in.
pub(crate) fn container_frame(
    diagram: &Diagram,
    key: NodeKey,
    content: Size,
    ctx: &mut LayoutContext<'_>,
) -> (Size, Rect) {
    let node = &diagram[key];
    let header = text::header_width(node, ctx);
    let layout = &ctx.config.layout;
    let margin = layout.container_margin;
    let chrome_height = layout.header_height + margin.top + margin.bottom;

    let mut minimum = Size::new(
        header.max(layout.collapsed_width),
        chrome_height.max(layout.collapsed_height),
    )
    .max(node.options.minimum_size);
    if let Some(width) = node.options.min_width.or(node.width) {
        minimum.width = minimum.width.max(width);
    }
    if let Some(height) = node.height {
        minimum.height = minimum.height.max(height);
    }

    let size = Size::new(
        content.width + margin.left + margin.right,
        content.height + chrome_height,
    )
    .max(minimum);
    let inner = Rect::new(
        margin.left,
        layout.header_height + margin.top,
        size.width - margin.left - margin.right,
        size.height - chrome_height,
    );
    (size, inner)
}

/// Positions top-level nodes: explicit coordinates win, the rest are stacked
/// along the diagram orientation.
pub fn place_roots(diagram: &mut Diagram, config: &LayoutConfig) {
    let horizontal = config.orientation == FlowOrientation::Horizontal;
    let spacing = if horizontal {
        config.node_spacing.horizontal
    } else {
        config.node_spacing.vertical
    };
    let origin = Point::new(config.container_margin.left, config.container_margin.top);
    let mut cursor = 0.0;
    for root in diagram.roots().to_vec() {
        let node = &mut diagram[root];
        if let Some(position) = node.position {
            node.offset = position;
            continue;
        }
        node.offset = origin + change_direction(Point::new(0.0, cursor), horizontal);
        cursor += change_size_direction(node.size, horizontal).height + spacing;
    }
}

/// Status reported for `key`, aggregated over descendants when enabled.
pub fn effective_status(diagram: &Diagram, key: NodeKey, cascade: bool) -> NodeStatus {
    let node = &diagram[key];
    if !cascade || node.children.is_empty() {
        return node.status;
    }
    NodeStatus::aggregate(
        node.children
            .iter()
            .map(|child| effective_status(diagram, *child, cascade)),
    )
}

/// Global geometry of every node plus routed edges.
///
/// `diagnostics` holds what earlier stages reported; routing problems of this
/// pass are appended to the copy carried by the returned layout.
pub fn snapshot(diagram: &Diagram, config: &Config, diagnostics: &Diagnostics) -> Layout {
    let cascade_status = config.status.cascade_on_status_change;
    let nodes: Vec<NodeLayout> = diagram
        .pre_order()
        .into_iter()
        .map(|key| {
            let node = &diagram[key];
            let position = diagram.global_position(key);
            NodeLayout {
                id: node.id.clone(),
                label: node.label.clone(),
                kind: node.kind,
                display_mode: node.options.display_mode,
                x: position.x,
                y: position.y,
                width: node.size.width,
                height: node.size.height,
                parent: node.parent.map(|parent| diagram[parent].id.clone()),
                depth: diagram.depth(key),
                role: node.role,
                collapsed: node.collapsed,
                hidden: diagram.is_hidden(key),
                status: effective_status(diagram, key, cascade_status),
            }
        })
        .collect();

    let (edges, routing_errors) = routing::route_edges(diagram, &config.edges);
    let mut diagnostics = diagnostics.clone();
    diagnostics.extend(routing_errors);

    let root_rects: Vec<Rect> = diagram
        .roots()
        .iter()
        .map(|root| diagram.global_rect(*root))
        .collect();
    let bounds = bounding_box(&root_rects).unwrap_or_default();
    let margin = config.layout.container_margin;
    Layout {
        nodes,
        edges,
        bounds,
        width: bounds.right().max(0.0) + margin.right,
        height: bounds.bottom().max(0.0) + margin.bottom,
        diagnostics: diagnostics.into_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{LeafShape, Node};
    use crate::text_metrics::HeuristicMeasure;

    fn leaf(id: &str, width: f32, height: f32) -> Node {
        let mut node = Node::new(id, NodeKind::Leaf(LeafShape::Rect));
        node.width = Some(width);
        node.height = Some(height);
        node.options.size_mode = crate::ir::SizeMode::FixedSize;
        node
    }

    #[test]
    fn empty_container_has_positive_size() {
        let config = Config::default();
        let mut diagnostics = Diagnostics::new();
        let mut diagram = Diagram::new();
        let lane = diagram.insert(Node::new("empty", NodeKind::Lane), None).unwrap();
        let mut ctx = LayoutContext::new(&config, &HeuristicMeasure, &mut diagnostics);
        compute_layout(&mut diagram, &mut ctx);
        let size = diagram[lane].size;
        assert!(size.width > 0.0 && size.height > 0.0);
    }

    #[test]
    fn roots_stack_vertically_with_spacing() {
        let config = Config::default();
        let mut diagnostics = Diagnostics::new();
        let mut diagram = Diagram::new();
        let a = diagram.insert(leaf("a", 100.0, 30.0), None).unwrap();
        let b = diagram.insert(leaf("b", 100.0, 30.0), None).unwrap();
        let mut pinned = leaf("c", 10.0, 10.0);
        pinned.position = Some(Point::new(500.0, 400.0));
        let c = diagram.insert(pinned, None).unwrap();
        let mut ctx = LayoutContext::new(&config, &HeuristicMeasure, &mut diagnostics);
        compute_layout(&mut diagram, &mut ctx);
        assert_eq!(diagram[a].offset, Point::new(8.0, 8.0));
        assert_eq!(diagram[b].offset, Point::new(8.0, 48.0));
        assert_eq!(diagram[c].offset, Point::new(500.0, 400.0));
    }

    #[test]
    fn leaf_width_limits_apply() {
        let config = Config::default();
        let mut diagnostics = Diagnostics::new();
        let mut diagram = Diagram::new();
        let mut wide = leaf("wide", 300.0, 20.0);
        wide.options.max_width = Some(200.0);
        let wide = diagram.insert(wide, None).unwrap();
        let mut narrow = leaf("narrow", 40.0, 20.0);
        narrow.options.min_width = Some(90.0);
        let narrow = diagram.insert(narrow, None).unwrap();
        let mut ctx = LayoutContext::new(&config, &HeuristicMeasure, &mut diagnostics);
        compute_layout(&mut diagram, &mut ctx);
        assert_eq!(diagram[wide].size.width, 200.0);
        assert_eq!(diagram[narrow].size.width, 90.0);
    }

    #[test]
    fn snapshot_reports_global_coordinates() {
        let config = Config::default();
        let mut diagnostics = Diagnostics::new();
        let mut diagram = Diagram::new();
        let lane = diagram.insert(Node::new("lane", NodeKind::Lane), None).unwrap();
        diagram.insert(leaf("a", 100.0, 30.0), Some(lane)).unwrap();
        let mut ctx = LayoutContext::new(&config, &HeuristicMeasure, &mut diagnostics);
        compute_layout(&mut diagram, &mut ctx);
        let layout = snapshot(&diagram, &config, &diagnostics);
        let lane = layout.node("lane").unwrap();
        let a = layout.node("a").unwrap();
        assert_eq!(a.parent.as_deref(), Some("lane"));
        assert_eq!(a.depth, 1);
        assert!(lane.rect().contains_rect(&a.rect()));
        assert_eq!(a.y, lane.y + 20.0 + 8.0);
        assert_eq!(layout.width, lane.x + lane.width + 8.0);
    }
}
