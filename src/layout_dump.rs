use crate::error::{DiagramError, Severity};
use crate::ir::{DisplayMode, NodeKind, NodeStatus, Role};
use crate::layout::geometry::Point;
use crate::layout::Layout;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Serializable view of a [`Layout`], the shape renderers consume.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    pub bounds: BoundsDump,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub diagnostics: Vec<DiagnosticDump>,
}

#[derive(Debug, Serialize)]
pub struct BoundsDump {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    pub display_mode: DisplayMode,
    #[serde(rename = "globalX")]
    pub global_x: f32,
    #[serde(rename = "globalY")]
    pub global_y: f32,
    pub width: f32,
    pub height: f32,
    pub parent: Option<String>,
    pub depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub collapsed: bool,
    pub hidden: bool,
    pub status: NodeStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDump {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_anchor: String,
    pub target_anchor: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub state: Option<String>,
    pub internal: bool,
    pub hidden: bool,
    pub points: Vec<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ghost: Option<Vec<Point>>,
}

#[derive(Debug, Serialize)]
pub struct DiagnosticDump {
    pub code: &'static str,
    pub severity: Severity,
    pub message: String,
}

impl From<&DiagramError> for DiagnosticDump {
    fn from(error: &DiagramError) -> Self {
        Self {
            code: error.code(),
            severity: error.severity(),
            message: error.to_string(),
        }
    }
}

impl LayoutDump {
    pub fn from_layout(layout: &Layout) -> Self {
        let nodes = layout
            .nodes
            .iter()
            .map(|node| NodeDump {
                id: node.id.clone(),
                label: node.label.clone(),
                kind: node.kind,
                display_mode: node.display_mode,
                global_x: node.x,
                global_y: node.y,
                width: node.width,
                height: node.height,
                parent: node.parent.clone(),
                depth: node.depth,
                role: node.role,
                collapsed: node.collapsed,
                hidden: node.hidden,
                status: node.status,
            })
            .collect();

        let edges = layout
            .edges
            .iter()
            .map(|edge| EdgeDump {
                id: edge.id.clone(),
                source: edge.source.clone(),
                target: edge.target.clone(),
                source_anchor: edge.source_anchor.clone(),
                target_anchor: edge.target_anchor.clone(),
                kind: edge.kind.clone(),
                state: edge.state.clone(),
                internal: edge.internal,
                hidden: edge.hidden,
                points: edge.points.clone(),
                ghost: edge.ghost.clone(),
            })
            .collect();

        LayoutDump {
            width: layout.width,
            height: layout.height,
            bounds: BoundsDump {
                x: layout.bounds.x,
                y: layout.bounds.y,
                width: layout.bounds.width,
                height: layout.bounds.height,
            },
            nodes,
            edges,
            diagnostics: layout.diagnostics.iter().map(DiagnosticDump::from).collect(),
        }
    }
}

pub fn layout_to_json(layout: &Layout) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&LayoutDump::from_layout(layout))?)
}

/// Writes the dump to `path`, or stdout when `path` is `None`.
pub fn write_layout_dump(path: Option<&Path>, layout: &Layout) -> anyhow::Result<()> {
    let dump = LayoutDump::from_layout(layout);
    match path {
        Some(path) => {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, &dump)?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            serde_json::to_writer_pretty(&mut writer, &dump)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dashboard::Dashboard;

    #[test]
    fn dump_uses_renderer_field_names() {
        let dash = Dashboard::from_json(
            r#"{"nodes":[{"id":"a","type":"node","x":0,"y":0},{"id":"b","type":"node","x":300,"y":0}],
               "edges":[{"source":"a","target":"b","type":"DataFlow","state":"Ready"}]}"#,
            Config::default(),
        )
        .unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&layout_to_json(&dash.layout()).unwrap()).unwrap();
        let node = &json["nodes"][0];
        assert_eq!(node["id"], "a");
        assert_eq!(node["globalX"], 0.0);
        assert_eq!(node["displayMode"], "full");
        assert_eq!(node["kind"], "rect");
        let edge = &json["edges"][0];
        assert_eq!(edge["id"], "a--DataFlow--b");
        assert_eq!(edge["type"], "DataFlow");
        assert_eq!(edge["points"][0]["x"], 150.0);
    }

    #[test]
    fn diagnostics_carry_code_and_severity() {
        let dash = Dashboard::from_json(
            r#"{"nodes":[{"id":"a","type":"blob"}]}"#,
            Config::default(),
        )
        .unwrap();
        let dump = LayoutDump::from_layout(&dash.layout());
        assert_eq!(dump.diagnostics.len(), 1);
        assert_eq!(dump.diagnostics[0].code, "InvalidNodeKind");
        assert_eq!(dump.diagnostics[0].severity, Severity::Error);
    }
}
