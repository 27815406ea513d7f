use crate::error::DiagramError;
use crate::ir::{DisplayMode, LeafShape, Node, NodeKey, SizeMode};

use super::LayoutContext;
use super::composite;
use super::geometry::Size;

/// Label as rendered for the node's display mode.
pub(crate) fn display_text(node: &Node) -> &str {
    match (node.options.display_mode, node.code.as_deref()) {
        (DisplayMode::Code, Some(code)) if !code.is_empty() => code,
        _ => node.label.as_str(),
    }
}

/// Width of the widest line of `text`, `None` when the measurer gives up.
pub(crate) fn label_width(text: &str, ctx: &LayoutContext<'_>) -> Option<f32> {
    let font_size = ctx.config.layout.font_size;
    split_lines(text)
        .iter()
        .map(|line| ctx.measure.text_width(line, font_size))
        .try_fold(0.0f32, |widest, width| width.map(|width| widest.max(width)))
}

/// Intrinsic size of a leaf.
pub(super) fn leaf_size(diagram: &crate::ir::Diagram, key: NodeKey, ctx: &mut LayoutContext<'_>) -> Size {
    let node = &diagram[key];
    if let (Some(_), Some(parent)) = (node.role, node.parent) {
        let parent = &diagram[parent];
        if parent.kind.is_fixed_role() {
            return composite::role_size(parent, node, &ctx.config.layout);
        }
    }

    let leaf = &ctx.config.layout.leaf;
    let shape = match node.kind {
        crate::ir::NodeKind::Leaf(shape) => shape,
        _ => LeafShape::Rect,
    };
    if shape == LeafShape::Circle {
        let diameter = node.width.or(node.height).unwrap_or(leaf.circle_size);
        return Size::new(diameter, diameter);
    }

    let height = node.height.unwrap_or(leaf.height);
    let base_width = node.width.unwrap_or(leaf.width);
    if node.options.size_mode == SizeMode::FixedSize {
        return Size::new(base_width, height);
    }
    let Some(text_width) = label_width(display_text(node), ctx) else {
        ctx.diagnostics.push(DiagramError::MeasurementFailure {
            id: node.id.clone(),
        });
        return Size::new(base_width, height);
    };
    let padded = text_width + leaf.text_padding;
    let width = match node.options.size_mode {
        SizeMode::AutoSize => padded.max(leaf.auto_min_width),
        _ => base_width.max(padded),
    };
    Size::new(width, height)
}

/// Minimum width a container needs to show its header label.
pub(super) fn header_width(node: &Node, ctx: &mut LayoutContext<'_>) -> f32 {
    let layout = &ctx.config.layout;
    match label_width(display_text(node), ctx) {
        Some(width) => width + layout.header_padding,
        None => {
            ctx.diagnostics.push(DiagramError::MeasurementFailure {
                id: node.id.clone(),
            });
            layout.collapsed_width
        }
    }
}

fn char_width_factor(ch: char) -> f32 {
    // Advance widths as a fraction of the font size, proportional sans-serif stack.
    match ch {
        ' ' => 0.306,
        '\\' | '.' | ',' | ':' | ';' | '|' | '!' | '(' | ')' | '[' | ']' | '{' | '}' => 0.321,
        'A' => 0.652,
        'B' => 0.648,
        'C' => 0.734,
        'D' => 0.723,
        'E' => 0.594,
        'F' => 0.575,
        'G' | 'H' => 0.742,
        'I' => 0.272,
        'J' => 0.557,
        'K' => 0.648,
        'L' => 0.559,
        'M' => 0.903,
        'N' => 0.763,
        'O' => 0.754,
        'P' => 0.623,
        'Q' => 0.755,
        'R' => 0.637,
        'S' => 0.633,
        'T' => 0.599,
        'U' => 0.746,
        'V' => 0.661,
        'W' => 0.958,
        'X' => 0.655,
        'Y' => 0.646,
        'Z' => 0.621,
        'a' => 0.550,
        'b' => 0.603,
        'c' => 0.547,
        'd' => 0.609,
        'e' => 0.570,
        'f' => 0.340,
        'g' | 'h' => 0.600,
        'i' => 0.235,
        'j' => 0.227,
        'k' => 0.522,
        'l' => 0.239,
        'm' => 0.867,
        'n' => 0.585,
        'o' => 0.574,
        'p' => 0.595,
        'q' => 0.585,
        'r' => 0.364,
        's' => 0.523,
        't' => 0.305,
        'u' => 0.585,
        'v' => 0.545,
        'w' => 0.811,
        'x' => 0.538,
        'y' => 0.556,
        'z' => 0.550,
        '0' => 0.613,
        '1' => 0.396,
        '2' => 0.609,
        '3' => 0.597,
        '4' => 0.614,
        '5' => 0.586,
        '6' => 0.608,
        '7' => 0.559,
        '8' => 0.611,
        '9' => 0.595,
        '@' | '#' | '%' | '&' => 0.946,
        _ => 0.568,
    }
}


pub(crate) fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n').map(str::trim).collect()
}

pub(crate) fn fallback_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(char_width_factor).sum::<f32>() * font_size
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::Diagnostics;
    use crate::ir::{Diagram, NodeKind};
    use crate::text_metrics::{HeuristicMeasure, TextMeasure};

    struct Unmeasurable;

    impl TextMeasure for Unmeasurable {
        fn text_width(&self, _text: &str, _font_size: f32) -> Option<f32> {
            None
        }
    }

    fn leaf(label: &str, configure: impl FnOnce(&mut Node)) -> (Diagram, NodeKey) {
        let mut diagram = Diagram::new();
        let mut node = Node::new("n", NodeKind::Leaf(LeafShape::Rect));
        node.label = label.to_string();
        configure(&mut node);
        let key = diagram.insert(node, None).unwrap();
        (diagram, key)
    }

    #[test]
    fn split_lines_trims_whitespace() {
        assert_eq!(split_lines("  hello  \n  world  "), vec!["hello", "world"]);
    }

    #[test]
    fn char_width_factor_returns_positive_values() {
        for ch in ['a', 'Z', ' ', '0', '@', '\u{4e2d}'] {
            assert!(char_width_factor(ch) > 0.0, "char {:?} has zero width", ch);
        }
    }

    #[test]
    fn fallback_text_width_scales_with_font_size() {
        let w12 = fallback_text_width("Hello", 12.0);
        let w24 = fallback_text_width("Hello", 24.0);
        assert!((w24 - w12 * 2.0).abs() < 0.01);
    }

    #[test]
    fn short_labels_keep_default_width() {
        let config = Config::default();
        let mut diagnostics = Diagnostics::new();
        let mut ctx = LayoutContext::new(&config, &HeuristicMeasure, &mut diagnostics);
        let (diagram, key) = leaf("A", |_| {});
        assert_eq!(leaf_size(&diagram, key, &mut ctx), Size::new(150.0, 20.0));
    }

    #[test]
    fn long_labels_grow_rect_width() {
        let config = Config::default();
        let mut diagnostics = Diagnostics::new();
        let mut ctx = LayoutContext::new(&config, &HeuristicMeasure, &mut diagnostics);
        let label = "A rather long label for a dashboard node";
        let (diagram, key) = leaf(label, |_| {});
        let expected = fallback_text_width(label, 12.0) + 20.0;
        assert!(expected > 150.0);
        assert_eq!(leaf_size(&diagram, key, &mut ctx).width, expected);
    }

    #[test]
    fn auto_size_and_fixed_size_modes() {
        let config = Config::default();
        let mut diagnostics = Diagnostics::new();
        let mut ctx = LayoutContext::new(&config, &HeuristicMeasure, &mut diagnostics);
        let (diagram, key) = leaf("A", |node| node.options.size_mode = SizeMode::AutoSize);
        assert_eq!(leaf_size(&diagram, key, &mut ctx).width, 60.0);
        let (diagram, key) = leaf("A very very long label indeed", |node| {
            node.options.size_mode = SizeMode::FixedSize;
            node.width = Some(90.0);
        });
        assert_eq!(leaf_size(&diagram, key, &mut ctx), Size::new(90.0, 20.0));
    }

    #[test]
    fn measurement_failure_falls_back_to_default_size() {
        let config = Config::default();
        let mut diagnostics = Diagnostics::new();
        let mut ctx = LayoutContext::new(&config, &Unmeasurable, &mut diagnostics);
        let (diagram, key) = leaf("anything", |_| {});
        assert_eq!(leaf_size(&diagram, key, &mut ctx), Size::new(150.0, 20.0));
        assert_eq!(
            diagnostics.iter().next(),
            Some(&DiagramError::MeasurementFailure { id: "n".into() })
        );
    }

    #[test]
    fn code_display_mode_measures_code() {
        let mut node = Node::new("n", NodeKind::Leaf(LeafShape::Rect));
        node.label = "Long label".into();
        node.code = Some("C1".into());
        assert_eq!(display_text(&node), "Long label");
        node.options.display_mode = DisplayMode::Code;
        assert_eq!(display_text(&node), "C1");
    }
}
