use crate::config::Config;
use crate::ir::{LeafShape, NodeKind, NodeStatus};
use crate::layout::geometry::Point;
use crate::layout::{EdgeLayout, Layout, NodeLayout};
use anyhow::Result;
use std::path::Path;

/// Preview rendering of a layout. Containers are dashed frames with their
/// label in the header band, leaves are filled boxes (or circles), edges are
/// polylines in routing order.
pub fn render_svg(layout: &Layout, config: &Config) -> String {
    let render = &config.render;
    let pad = render.padding;
    let width = layout.width + pad * 2.0;
    let height = layout.height + pad * 2.0;
    let mut svg = String::new();

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.2}\" height=\"{height:.2}\" viewBox=\"0 0 {width:.2} {height:.2}\">",
    ));
    svg.push_str("<defs>");
    svg.push_str(&format!(
        "<marker id=\"arrow\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
        render.line_color
    ));
    if render.show_grid {
        let g = render.grid_size.max(1.0);
        svg.push_str(&format!(
            "<pattern id=\"grid\" width=\"{g:.2}\" height=\"{g:.2}\" patternUnits=\"userSpaceOnUse\"><path d=\"M {g:.2} 0 L 0 0 0 {g:.2}\" fill=\"none\" stroke=\"#EEEEEE\" stroke-width=\"0.5\"/></pattern>"
        ));
    }
    svg.push_str("</defs>");
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        render.background
    ));
    if render.show_grid {
        svg.push_str("<rect width=\"100%\" height=\"100%\" fill=\"url(#grid)\"/>");
    }
    svg.push_str(&format!("<g transform=\"translate({pad:.2} {pad:.2})\">"));

    // Parents come before children, so nested boxes paint on top.
    for node in layout.visible_nodes() {
        svg.push_str(&node_svg(node, config));
    }
    for edge in layout.visible_edges() {
        if let Some(ghost) = &edge.ghost {
            svg.push_str(&format!(
                "<path d=\"{}\" fill=\"none\" stroke=\"#BBBBBB\" stroke-width=\"1\" stroke-dasharray=\"2 3\"/>",
                points_to_path(ghost)
            ));
        }
        svg.push_str(&edge_svg(edge, config));
    }

    svg.push_str("</g></svg>");
    svg
}

fn node_svg(node: &NodeLayout, config: &Config) -> String {
    let font_size = config.layout.font_size;
    let font_family = escape_xml(&config.layout.font_family);
    let text_color = &config.render.text_color;
    let (fill, stroke) = status_colors(node.status);
    let mut out = String::new();

    if node.kind.is_container() && !node.collapsed {
        out.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"6\" ry=\"6\" fill=\"none\" stroke=\"{stroke}\" stroke-dasharray=\"6 4\" stroke-width=\"1.2\"/>",
            node.x, node.y, node.width, node.height
        ));
        let header = config.layout.header_height.max(font_size);
        out.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{font_family}\" font-size=\"{font_size}\" fill=\"{text_color}\" dominant-baseline=\"middle\">{}</text>",
            node.x + config.layout.container_margin.left,
            node.y + header / 2.0,
            escape_xml(&node.label)
        ));
        return out;
    }

    match node.kind {
        NodeKind::Leaf(LeafShape::Circle) => out.push_str(&format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" fill=\"{fill}\" stroke=\"{stroke}\" stroke-width=\"1.2\"/>",
            node.x + node.width / 2.0,
            node.y + node.height / 2.0,
            node.width.min(node.height) / 2.0
        )),
        _ => out.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"4\" ry=\"4\" fill=\"{fill}\" stroke=\"{stroke}\" stroke-width=\"1.2\"/>",
            node.x, node.y, node.width, node.height
        )),
    }
    out.push_str(&format!(
        "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" dominant-baseline=\"middle\" font-family=\"{font_family}\" font-size=\"{font_size}\" fill=\"{text_color}\">{}</text>",
        node.x + node.width / 2.0,
        node.y + node.height / 2.0,
        escape_xml(&node.label)
    ));
    out
}

fn edge_svg(edge: &EdgeLayout, config: &Config) -> String {
    let dash = if edge.internal {
        " stroke-dasharray=\"4 2\""
    } else {
        ""
    };
    format!(
        "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.4\"{dash} marker-end=\"url(#arrow)\" data-edge=\"{}\"/>",
        points_to_path(&edge.points),
        config.render.line_color,
        escape_xml(&edge.id)
    )
}

/// Fill and stroke per status.
fn status_colors(status: NodeStatus) -> (&'static str, &'static str) {
    match status {
        NodeStatus::Ready | NodeStatus::Updated => ("#E8F5E9", "#43A047"),
        NodeStatus::Updating => ("#E3F2FD", "#1E88E5"),
        NodeStatus::Delayed | NodeStatus::Warning => ("#FFF8E1", "#FB8C00"),
        NodeStatus::Error => ("#FFEBEE", "#E53935"),
        NodeStatus::Skipped | NodeStatus::Disabled => ("#F5F5F5", "#9E9E9E"),
        NodeStatus::Unknown | NodeStatus::Undetermined => ("#FFFFFF", "#607D8B"),
    }
}

fn points_to_path(points: &[Point]) -> String {
    let Some((first, rest)) = points.split_first() else {
        return String::new();
    };
    let mut d = format!("M {:.2} {:.2}", first.x, first.y);
    for point in rest {
        d.push_str(&format!(" L {:.2} {:.2}", point.x, point.y));
    }
    d
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, config: &Config) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = config
        .layout
        .font_family
        .split(',')
        .next()
        .map(|family| family.trim().trim_matches('"').to_string())
        .unwrap_or_else(|| "Arial".to_string());
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
