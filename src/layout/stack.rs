use crate::ir::{Diagram, NodeKey};

use super::geometry::{Point, Size, change_direction, change_size_direction};
use super::{LayoutContext, container_frame};

/// Lanes (`horizontal == false`) and columns (`horizontal == true`).
///
/// Works in a vertical frame where `y` is the stacking axis and `x` the cross
/// axis; columns go through [`change_direction`] on the way in and out.
pub(super) fn layout_stack(
    diagram: &mut Diagram,
    key: NodeKey,
    horizontal: bool,
    ctx: &mut LayoutContext<'_>,
) -> Size {
    let spacing = if horizontal {
        ctx.config.layout.node_spacing.horizontal
    } else {
        ctx.config.layout.node_spacing.vertical
    };
    let min_slot = if horizontal {
        diagram[key].options.minimum_column_width.max(0.0)
    } else {
        0.0
    };

    // (child, size in flow space, slot length along the stacking axis)
    let slots: Vec<(NodeKey, Size, f32)> = diagram
        .children(key)
        .iter()
        .map(|child| {
            let flow = change_size_direction(diagram[*child].size, horizontal);
            (*child, flow, flow.height.max(min_slot))
        })
        .collect();

    let cross = slots.iter().map(|(_, flow, _)| flow.width).fold(0.0, f32::max);
    let main = slots.iter().map(|(_, _, slot)| slot).sum::<f32>()
        + spacing * slots.len().saturating_sub(1) as f32;
    let content = change_size_direction(Size::new(cross, main), horizontal);

    let (size, inner) = container_frame(diagram, key, content, ctx);
    let available_cross = change_size_direction(inner.size(), horizontal).width;

    let mut cursor = 0.0;
    for (child, flow, slot) in slots {
        let align = diagram[child].options.align;
        let local = Point::new(
            align.offset(available_cross, flow.width),
            cursor + (slot - flow.height) / 2.0,
        );
        diagram[child].offset = inner.origin() + change_direction(local, horizontal);
        cursor += slot + spacing;
    }
    size
}
