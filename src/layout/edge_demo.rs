use crate::ir::{DemoLayout, Diagram, NodeKey, Role};

use super::LayoutContext;
use super::composite::place_template;
use super::geometry::{Point, Rect, Size};

/// Neighbour slots generated around the `center` child for each demo layout.
pub fn demo_roles(layout: DemoLayout) -> &'static [Role] {
    match layout {
        DemoLayout::Grid => &[
            Role::Top,
            Role::TopRight,
            Role::Right,
            Role::BottomRight,
            Role::Bottom,
            Role::BottomLeft,
            Role::Left,
            Role::TopLeft,
        ],
        DemoLayout::HShifted | DemoLayout::VShifted | DemoLayout::VShifted2 => &[
            Role::TopLeft,
            Role::TopRight,
            Role::BottomLeft,
            Role::BottomRight,
        ],
        DemoLayout::StairUp => &[Role::BottomLeft, Role::TopRight],
        DemoLayout::StairDown => &[Role::TopLeft, Role::BottomRight],
    }
}

/// Center-to-center offset of a neighbour relative to the center child.
fn slot_offset(layout: DemoLayout, role: Role, center: Size, ctx: &LayoutContext<'_>) -> Point {
    let demo = &ctx.config.layout.edge_demo;
    let (sx, sy) = (demo.spacing.horizontal, demo.spacing.vertical);
    let across = center.width + sx;
    let down = center.height + sy;
    // Horizontal and vertical unit direction of each slot.
    let (ux, uy) = match role {
        Role::Top => (0.0, -1.0),
        Role::TopRight => (1.0, -1.0),
        Role::Right => (1.0, 0.0),
        Role::BottomRight => (1.0, 1.0),
        Role::Bottom => (0.0, 1.0),
        Role::BottomLeft => (-1.0, 1.0),
        Role::Left => (-1.0, 0.0),
        Role::TopLeft => (-1.0, -1.0),
        _ => (0.0, 0.0),
    };
    match layout {
        DemoLayout::Grid => Point::new(ux * across, uy * down),
        DemoLayout::HShifted => Point::new(ux * across, uy * center.height * demo.shift_ratio),
        DemoLayout::VShifted => Point::new(ux * center.width * demo.shift_ratio, uy * down),
        DemoLayout::VShifted2 => Point::new(ux * center.width * demo.shift2_ratio, uy * down),
        DemoLayout::StairUp | DemoLayout::StairDown => {
            Point::new(ux * center.width * (1.0 - demo.shift_ratio), uy * down)
        }
    }
}

pub(super) fn layout_edge_demo(
    diagram: &mut Diagram,
    key: NodeKey,
    ctx: &mut LayoutContext<'_>,
) -> Size {
    let layout = diagram[key].options.demo_layout;
    let Some(center) = diagram.role_child(key, Role::Center) else {
        return place_template(diagram, key, Vec::new(), ctx);
    };
    let center_size = diagram[center].size;
    let center_mid = Point::new(center_size.width / 2.0, center_size.height / 2.0);

    let mut placements = vec![(center, Rect::from_origin(Point::ORIGIN, center_size))];
    for role in demo_roles(layout) {
        let Some(child) = diagram.role_child(key, *role) else {
            continue;
        };
        let size = diagram[child].size;
        let mid = center_mid + slot_offset(layout, *role, center_size, ctx);
        let origin = Point::new(mid.x - size.width / 2.0, mid.y - size.height / 2.0);
        placements.push((child, Rect::from_origin(origin, size)));
    }
    place_template(diagram, key, placements, ctx)
}
