use crate::config::LayoutConfig;
use crate::error::DiagramError;
use crate::ir::{Arrangement, Diagram, DisplayMode, Node, NodeKey, NodeKind, Orientation, Role};

use super::geometry::{Point, Rect, Size, bounding_box};
use super::{LayoutContext, container_frame};

/// Size of a role child inside a fixed composite.
///
/// Role and code display modes force the badge size. Full mode uses the full
/// size, except marts where explicit child sizes are honoured.
pub(crate) fn role_size(parent: &Node, child: &Node, config: &LayoutConfig) -> Size {
    let sizes = match parent.kind {
        NodeKind::Adapter => config.adapter,
        NodeKind::Foundation => config.foundation,
        NodeKind::Mart => config.mart,
        _ => return Size::new(config.leaf.width, config.leaf.height),
    };
    match parent.options.display_mode {
        DisplayMode::Role | DisplayMode::Code => sizes.role,
        DisplayMode::Full if keeps_child_size(parent) => Size::new(
            child.width.unwrap_or(sizes.full.width),
            child.height.unwrap_or(sizes.full.height),
        ),
        DisplayMode::Full => sizes.full,
    }
}

/// Whether role children of `parent` may carry their own size.
pub(crate) fn keeps_child_size(parent: &Node) -> bool {
    parent.kind == NodeKind::Mart && parent.options.display_mode == DisplayMode::Full
}

pub(super) fn layout_composite(
    diagram: &mut Diagram,
    key: NodeKey,
    ctx: &mut LayoutContext<'_>,
) -> Size {
    let placements = match diagram[key].kind {
        NodeKind::Adapter => adapter_template(diagram, key, ctx),
        _ => pair_template(diagram, key, ctx),
    };
    place_template(diagram, key, placements, ctx)
}

/// Applies template rectangles (any local frame) to the children of `key`,
/// normalised into the container's inner area. Returns the container size.
pub(super) fn place_template(
    diagram: &mut Diagram,
    key: NodeKey,
    placements: Vec<(NodeKey, Rect)>,
    ctx: &mut LayoutContext<'_>,
) -> Size {
    let rects: Vec<Rect> = placements.iter().map(|(_, rect)| *rect).collect();
    let bounds = bounding_box(&rects).unwrap_or_default();
    let (size, inner) = container_frame(diagram, key, bounds.size(), ctx);
    let shift = inner.origin() - bounds.origin()
        + Point::new(
            (inner.width - bounds.width).max(0.0) / 2.0,
            (inner.height - bounds.height).max(0.0) / 2.0,
        );
    for (child, rect) in placements {
        let node = &mut diagram[child];
        node.size = rect.size();
        node.offset = rect.origin() + shift;
    }
    size
}

fn spacing(ctx: &LayoutContext<'_>) -> (f32, f32) {
    let spacing = ctx.config.layout.node_spacing;
    (spacing.horizontal, spacing.vertical)
}

fn sized(diagram: &Diagram, key: NodeKey, origin: Point) -> Rect {
    Rect::from_origin(origin, diagram[key].size)
}

/// Children side by side, centred on a common horizontal axis.
fn row(diagram: &Diagram, keys: &[NodeKey], gap: f32) -> Vec<(NodeKey, Rect)> {
    let height = keys
        .iter()
        .map(|key| diagram[*key].size.height)
        .fold(0.0, f32::max);
    let mut x = 0.0;
    keys.iter()
        .map(|key| {
            let size = diagram[*key].size;
            let rect = Rect::from_origin(Point::new(x, (height - size.height) / 2.0), size);
            x += size.width + gap;
            (*key, rect)
        })
        .collect()
}

/// Children stacked top to bottom, centred on a common vertical axis.
fn column(diagram: &Diagram, keys: &[NodeKey], gap: f32) -> Vec<(NodeKey, Rect)> {
    let width = keys
        .iter()
        .map(|key| diagram[*key].size.width)
        .fold(0.0, f32::max);
    let mut y = 0.0;
    keys.iter()
        .map(|key| {
            let size = diagram[*key].size;
            let rect = Rect::from_origin(Point::new((width - size.width) / 2.0, y), size);
            y += size.height + gap;
            (*key, rect)
        })
        .collect()
}

fn adapter_template(
    diagram: &Diagram,
    key: NodeKey,
    ctx: &mut LayoutContext<'_>,
) -> Vec<(NodeKey, Rect)> {
    let (hs, vs) = spacing(ctx);
    let staging = diagram.role_child(key, Role::Staging);
    let archive = diagram.role_child(key, Role::Archive);
    let transform = diagram.role_child(key, Role::Transform);
    let node = &diagram[key];

    let (Some(s), Some(a), Some(t)) = (staging, archive, transform) else {
        let present: Vec<NodeKey> = [staging, archive, transform].into_iter().flatten().collect();
        return row(diagram, &present, hs);
    };

    let default = node.options.adapter_mode.default_arrangement();
    let arrangement = match node.options.arrangement.unwrap_or(default) {
        Arrangement::Line | Arrangement::Single => {
            let requested = node.options.arrangement.map_or(0, Arrangement::index);
            ctx.diagnostics.push(DiagramError::InvalidLayoutOption {
                id: node.id.clone(),
                option: "arrangement".to_string(),
                value: requested.to_string(),
                fallback: Arrangement::FullArchive.index().to_string(),
            });
            Arrangement::FullArchive
        }
        other => other,
    };

    let s_size = diagram[s].size;
    let a_size = diagram[a].size;
    let t_size = diagram[t].size;
    match arrangement {
        Arrangement::FullTransform => {
            let bottom = a_size.height + vs;
            vec![
                (s, sized(diagram, s, Point::new(0.0, bottom))),
                (t, sized(diagram, t, Point::new(s_size.width + hs, bottom))),
                (
                    a,
                    sized(diagram, a, Point::new((s_size.width - a_size.width) / 2.0, 0.0)),
                ),
            ]
        }
        Arrangement::FullStaging => {
            let fixed = ctx.config.layout.adapter.full;
            let right = s_size.width + hs;
            vec![
                (
                    s,
                    Rect::new(0.0, 0.0, s_size.width, fixed.height * 2.0 + vs),
                ),
                (a, Rect::from_origin(Point::new(right, 0.0), fixed)),
                (t, Rect::from_origin(Point::new(right, fixed.height + vs), fixed)),
            ]
        }
        _ => {
            // Archive spans from two thirds of staging to the right edge of transform.
            let bottom = a_size.height + vs;
            let archive_width = t_size.width + hs + s_size.width / 3.0;
            vec![
                (s, sized(diagram, s, Point::new(0.0, bottom))),
                (t, sized(diagram, t, Point::new(s_size.width + hs, bottom))),
                (
                    a,
                    Rect::new(
                        s_size.width * 2.0 / 3.0,
                        0.0,
                        archive_width,
                        a_size.height,
                    ),
                ),
            ]
        }
    }
}

/// Foundation and mart: two role slots placed per orientation.
fn pair_template(
    diagram: &Diagram,
    key: NodeKey,
    ctx: &mut LayoutContext<'_>,
) -> Vec<(NodeKey, Rect)> {
    let (hs, vs) = spacing(ctx);
    let node = &diagram[key];
    let roles = node.kind.roles();
    let mut present: Vec<NodeKey> = roles
        .iter()
        .filter_map(|role| diagram.role_child(key, *role))
        .collect();
    let orientation = node.options.orientation;
    if orientation.is_reversed() {
        present.reverse();
    }
    match orientation {
        Orientation::Horizontal | Orientation::HorizontalLine => row(diagram, &present, hs),
        Orientation::Vertical | Orientation::Rotate90 | Orientation::Rotate270 => {
            column(diagram, &present, vs)
        }
    }
}
