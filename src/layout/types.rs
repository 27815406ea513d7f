use crate::error::DiagramError;
use crate::ir::{DisplayMode, NodeKind, NodeStatus, Role};

use super::geometry::{Point, Rect};

#[derive(Debug, Clone, PartialEq)]
pub struct NodeLayout {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    pub display_mode: DisplayMode,
    /// Global top-left corner.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub parent: Option<String>,
    pub depth: usize,
    pub role: Option<Role>,
    pub collapsed: bool,
    /// Inside a collapsed ancestor.
    pub hidden: bool,
    pub status: NodeStatus,
}

impl NodeLayout {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSide {
    Left,
    Right,
    Top,
    Bottom,
}

impl EdgeSide {
    pub const ALL: [EdgeSide; 4] = [EdgeSide::Left, EdgeSide::Right, EdgeSide::Top, EdgeSide::Bottom];

    /// Left and right sides are left and entered horizontally.
    pub fn is_horizontal(self) -> bool {
        matches!(self, EdgeSide::Left | EdgeSide::Right)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeLayout {
    pub id: String,
    pub source: String,
    pub target: String,
    /// Nodes the path actually attaches to, after collapse redirection.
    pub source_anchor: String,
    pub target_anchor: String,
    pub kind: String,
    pub state: Option<String>,
    pub internal: bool,
    pub points: Vec<Point>,
    pub start_side: Option<EdgeSide>,
    pub end_side: Option<EdgeSide>,
    /// Straight center-to-center helper line.
    pub ghost: Option<Vec<Point>>,
    pub hidden: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Layout {
    /// Parents before children, top-level nodes in diagram order.
    pub nodes: Vec<NodeLayout>,
    pub edges: Vec<EdgeLayout>,
    /// Union of the visible top-level boxes.
    pub bounds: Rect,
    pub width: f32,
    pub height: f32,
    pub diagnostics: Vec<DiagramError>,
}

impl Layout {
    pub fn node(&self, id: &str) -> Option<&NodeLayout> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&EdgeLayout> {
        self.edges.iter().find(|edge| edge.id == id)
    }

    pub fn visible_nodes(&self) -> impl Iterator<Item = &NodeLayout> {
        self.nodes.iter().filter(|node| !node.hidden)
    }

    pub fn visible_edges(&self) -> impl Iterator<Item = &EdgeLayout> {
        self.edges.iter().filter(|edge| !edge.hidden)
    }
}
