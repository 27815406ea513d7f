use std::collections::HashMap;
use std::ops::{Index, IndexMut};

use serde::Serialize;

use crate::error::DiagramError;
use crate::layout::geometry::{Point, Rect, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LeafShape {
    Rect,
    Circle,
}

/// The closed set of node variants. Every component matches on this exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Leaf(LeafShape),
    Lane,
    Columns,
    Adapter,
    Foundation,
    Mart,
    EdgeDemo,
}

impl NodeKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "node" | "rect" | "leaf" => Some(Self::Leaf(LeafShape::Rect)),
            "circle" => Some(Self::Leaf(LeafShape::Circle)),
            "lane" => Some(Self::Lane),
            "columns" => Some(Self::Columns),
            "adapter" => Some(Self::Adapter),
            "foundation" => Some(Self::Foundation),
            "mart" => Some(Self::Mart),
            "edge-demo" => Some(Self::EdgeDemo),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Leaf(LeafShape::Rect) => "rect",
            Self::Leaf(LeafShape::Circle) => "circle",
            Self::Lane => "lane",
            Self::Columns => "columns",
            Self::Adapter => "adapter",
            Self::Foundation => "foundation",
            Self::Mart => "mart",
            Self::EdgeDemo => "edge-demo",
        }
    }

    pub fn is_container(self) -> bool {
        !matches!(self, Self::Leaf(_))
    }

    /// Composites whose children occupy predetermined role slots.
    pub fn is_fixed_role(self) -> bool {
        matches!(self, Self::Adapter | Self::Foundation | Self::Mart)
    }

    /// Role slots in canonical order; empty for open containers and leaves.
    pub fn roles(self) -> &'static [Role] {
        match self {
            Self::Adapter => &[Role::Staging, Role::Archive, Role::Transform],
            Self::Foundation => &[Role::Raw, Role::Base],
            Self::Mart => &[Role::Load, Role::Report],
            Self::EdgeDemo => &[
                Role::Center,
                Role::Top,
                Role::TopRight,
                Role::Right,
                Role::BottomRight,
                Role::Bottom,
                Role::BottomLeft,
                Role::Left,
                Role::TopLeft,
            ],
            _ => &[],
        }
    }
}

impl Serialize for NodeKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Semantic slot of a child inside a fixed composite or the edge demo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Staging,
    Archive,
    Transform,
    Raw,
    Base,
    Load,
    Report,
    Center,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
    TopLeft,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Staging => "staging",
            Self::Archive => "archive",
            Self::Transform => "transform",
            Self::Raw => "raw",
            Self::Base => "base",
            Self::Load => "load",
            Self::Report => "report",
            Self::Center => "center",
            Self::Top => "top",
            Self::TopRight => "top-right",
            Self::Right => "right",
            Self::BottomRight => "bottom-right",
            Self::Bottom => "bottom",
            Self::BottomLeft => "bottom-left",
            Self::Left => "left",
            Self::TopLeft => "top-left",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim().to_ascii_lowercase();
        [
            Self::Staging,
            Self::Archive,
            Self::Transform,
            Self::Raw,
            Self::Base,
            Self::Load,
            Self::Report,
            Self::Center,
            Self::Top,
            Self::TopRight,
            Self::Right,
            Self::BottomRight,
            Self::Bottom,
            Self::BottomLeft,
            Self::Left,
            Self::TopLeft,
        ]
        .into_iter()
        .find(|role| role.as_str() == token)
    }

    /// Role name with a leading capital, used for generated labels.
    pub fn title(self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None => String::new(),
        }
    }
}

/// Id of the child occupying `role` inside composite `parent_id`.
///
/// Edge descriptions address generated role children through this id, so the
/// builder and every caller must agree on it.
pub fn role_child_id(parent_id: &str, role: Role) -> String {
    format!("{}_{}", role.as_str(), parent_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Full,
    Role,
    Code,
}

impl DisplayMode {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "full" => Some(Self::Full),
            "role" => Some(Self::Role),
            "code" => Some(Self::Code),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Role => "role",
            Self::Code => "code",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Horizontal,
    HorizontalLine,
    Vertical,
    Rotate90,
    Rotate270,
}

impl Orientation {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "horizontal" => Some(Self::Horizontal),
            "horizontal_line" => Some(Self::HorizontalLine),
            "vertical" => Some(Self::Vertical),
            "rotate90" => Some(Self::Rotate90),
            "rotate270" => Some(Self::Rotate270),
            _ => None,
        }
    }

    /// True when role children are laid out side by side.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Horizontal | Self::HorizontalLine)
    }

    /// True when the second role is placed before the first.
    pub fn is_reversed(self) -> bool {
        matches!(self, Self::Rotate270)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdapterMode {
    #[default]
    Full,
    StagingArchive,
    StagingTransform,
    ArchiveOnly,
    Manual,
}

impl AdapterMode {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "full" => Some(Self::Full),
            "staging-archive" => Some(Self::StagingArchive),
            "staging-transform" => Some(Self::StagingTransform),
            "archive-only" => Some(Self::ArchiveOnly),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }

    /// Roles generated when absent. Manual mode generates nothing.
    pub fn roles(self) -> &'static [Role] {
        match self {
            Self::Full => &[Role::Staging, Role::Archive, Role::Transform],
            Self::StagingArchive => &[Role::Staging, Role::Archive],
            Self::StagingTransform => &[Role::Staging, Role::Transform],
            Self::ArchiveOnly => &[Role::Archive],
            Self::Manual => &[],
        }
    }

    pub fn default_arrangement(self) -> Arrangement {
        match self {
            Self::Full | Self::Manual => Arrangement::FullArchive,
            Self::StagingArchive | Self::StagingTransform => Arrangement::Line,
            Self::ArchiveOnly => Arrangement::Single,
        }
    }
}

/// Adapter placement templates, numbered 1 to 5 in graph descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrangement {
    /// Archive spans above staging and transform.
    FullArchive,
    /// Archive sits above staging.
    FullTransform,
    /// Staging spans the height of archive and transform.
    FullStaging,
    Line,
    Single,
}

impl Arrangement {
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            1 => Some(Self::FullArchive),
            2 => Some(Self::FullTransform),
            3 => Some(Self::FullStaging),
            4 => Some(Self::Line),
            5 => Some(Self::Single),
            _ => None,
        }
    }

    pub fn index(self) -> i64 {
        match self {
            Self::FullArchive => 1,
            Self::FullTransform => 2,
            Self::FullStaging => 3,
            Self::Line => 4,
            Self::Single => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DemoLayout {
    #[default]
    Grid,
    HShifted,
    VShifted,
    VShifted2,
    StairUp,
    StairDown,
}

impl DemoLayout {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "grid" => Some(Self::Grid),
            "h-shifted" => Some(Self::HShifted),
            "v-shifted" => Some(Self::VShifted),
            "v-shifted2" => Some(Self::VShifted2),
            "stair-up" => Some(Self::StairUp),
            "stair-down" => Some(Self::StairDown),
            _ => None,
        }
    }
}

/// How a leaf derives its intrinsic width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeMode {
    #[default]
    Default,
    AutoSize,
    FixedSize,
}

impl SizeMode {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "default" => Some(Self::Default),
            "auto-size" | "autosize" | "auto" => Some(Self::AutoSize),
            "fixed-size" | "fixed" => Some(Self::FixedSize),
            _ => None,
        }
    }
}

/// Cross-axis alignment of a child inside a lane or column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    Start,
    #[default]
    Center,
    End,
}

impl Align {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "start" | "left" | "top" => Some(Self::Start),
            "center" | "middle" => Some(Self::Center),
            "end" | "right" | "bottom" => Some(Self::End),
            _ => None,
        }
    }

    /// Offset of an item of `size` inside `available` space.
    pub fn offset(self, available: f32, size: f32) -> f32 {
        let free = (available - size).max(0.0);
        match self {
            Self::Start => 0.0,
            Self::Center => free / 2.0,
            Self::End => free,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize)]
pub enum NodeStatus {
    #[default]
    Undetermined,
    Unknown,
    Disabled,
    Ready,
    Updating,
    Updated,
    Skipped,
    Delayed,
    Warning,
    Error,
}

impl NodeStatus {
    /// Unrecognized strings map to `Unknown`.
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "undetermined" => Self::Undetermined,
            "disabled" => Self::Disabled,
            "ready" => Self::Ready,
            "updating" => Self::Updating,
            "updated" => Self::Updated,
            "skipped" => Self::Skipped,
            "delayed" => Self::Delayed,
            "warning" => Self::Warning,
            "error" => Self::Error,
            _ => Self::Unknown,
        }
    }

    /// Aggregation rank; higher wins. Statuses outside the table rank lowest.
    fn priority(self) -> u8 {
        match self {
            Self::Error => 8,
            Self::Warning => 7,
            Self::Delayed => 6,
            Self::Unknown => 5,
            Self::Updating => 4,
            Self::Updated => 3,
            Self::Skipped => 2,
            Self::Ready => 1,
            Self::Disabled | Self::Undetermined => 0,
        }
    }

    /// Highest-priority status of the set, `Unknown` when empty.
    pub fn aggregate(statuses: impl IntoIterator<Item = NodeStatus>) -> NodeStatus {
        statuses
            .into_iter()
            .max_by_key(|status| status.priority())
            .unwrap_or(NodeStatus::Unknown)
    }

    /// Containers whose aggregate is settled can be folded away.
    pub fn is_settled(self) -> bool {
        matches!(
            self,
            Self::Ready | Self::Disabled | Self::Updated | Self::Skipped
        )
    }
}

/// Durable per-node layout options, from the descriptor's `layout` object.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeOptions {
    pub display_mode: DisplayMode,
    pub orientation: Orientation,
    pub adapter_mode: AdapterMode,
    /// Foundation/mart: do not generate missing roles.
    pub manual: bool,
    pub arrangement: Option<Arrangement>,
    pub demo_layout: DemoLayout,
    pub minimum_column_width: f32,
    pub min_width: Option<f32>,
    pub max_width: Option<f32>,
    pub minimum_size: Size,
    pub size_mode: SizeMode,
    pub align: Align,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            display_mode: DisplayMode::Full,
            orientation: Orientation::Horizontal,
            adapter_mode: AdapterMode::Full,
            manual: false,
            arrangement: None,
            demo_layout: DemoLayout::Grid,
            minimum_column_width: 0.0,
            min_width: None,
            max_width: None,
            minimum_size: Size::ZERO,
            size_mode: SizeMode::Default,
            align: Align::Center,
        }
    }
}

/// Stable arena handle. Keys of removed nodes are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(usize);

#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    pub code: Option<String>,
    pub state: Option<String>,
    pub status: NodeStatus,
    pub role: Option<Role>,
    /// Created by the builder rather than the graph description.
    pub generated: bool,
    pub options: NodeOptions,
    pub width: Option<f32>,
    pub height: Option<f32>,
    /// Explicit top-level position (top-left).
    pub position: Option<Point>,
    pub collapsed: bool,
    pub parent: Option<NodeKey>,
    pub children: Vec<NodeKey>,
    /// Layout-derived, overwritten on every pass.
    pub size: Size,
    /// Layout-derived offset from the parent's top-left corner.
    pub offset: Point,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            kind,
            code: None,
            state: None,
            status: NodeStatus::Undetermined,
            role: None,
            generated: false,
            options: NodeOptions::default(),
            width: None,
            height: None,
            position: None,
            collapsed: false,
            parent: None,
            children: Vec::new(),
            size: Size::ZERO,
            offset: Point::ORIGIN,
        }
    }

    pub fn is_container(&self) -> bool {
        self.kind.is_container()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub source: String,
    pub target: String,
    /// Free-form type tag, used for styling only.
    pub kind: String,
    pub state: Option<String>,
    /// Generated between the role children of a composite.
    pub internal: bool,
}

pub const DEFAULT_EDGE_KIND: &str = "default";

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: DEFAULT_EDGE_KIND.to_string(),
            state: None,
            internal: false,
        }
    }

    pub fn id(&self) -> String {
        edge_id(&self.source, &self.kind, &self.target)
    }
}

pub fn edge_id(source: &str, kind: &str, target: &str) -> String {
    format!("{source}--{kind}--{target}")
}

/// Arena-backed node tree plus the diagram's edge list.
#[derive(Debug, Clone, Default)]
pub struct Diagram {
    nodes: Vec<Option<Node>>,
    roots: Vec<NodeKey>,
    pub edges: Vec<Edge>,
    index: HashMap<String, NodeKey>,
}

impl Diagram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `node` under `parent` (or as a top-level node) and returns its key.
    pub fn insert(
        &mut self,
        mut node: Node,
        parent: Option<NodeKey>,
    ) -> Result<NodeKey, DiagramError> {
        if self.index.contains_key(&node.id) {
            return Err(DiagramError::DuplicateId { id: node.id });
        }
        let key = NodeKey(self.nodes.len());
        node.parent = parent;
        node.children.clear();
        self.index.insert(node.id.clone(), key);
        self.nodes.push(Some(node));
        match parent {
            Some(parent) => self[parent].children.push(key),
            None => self.roots.push(key),
        }
        Ok(key)
    }

    /// Removes `key` and its whole subtree; returns the removed ids.
    pub fn remove(&mut self, key: NodeKey) -> Vec<String> {
        let doomed = self.descendants(key);
        match self[key].parent {
            Some(parent) => self[parent].children.retain(|child| *child != key),
            None => self.roots.retain(|root| *root != key),
        }
        let mut removed = Vec::with_capacity(doomed.len());
        for doomed_key in doomed {
            if let Some(node) = self.nodes[doomed_key.0].take() {
                removed.push(node.id);
            }
        }
        self.rebuild_index();
        removed
    }

    /// Recomputes the id index from the live arena.
    pub fn rebuild_index(&mut self) {
        self.index = self
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(slot, node)| node.as_ref().map(|node| (node.id.clone(), NodeKey(slot))))
            .collect();
    }

    pub fn key(&self, id: &str) -> Option<NodeKey> {
        self.index.get(id).copied()
    }

    pub fn get(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key.0).and_then(Option::as_mut)
    }

    pub fn node_by_id(&self, id: &str) -> Option<&Node> {
        self.key(id).and_then(|key| self.get(key))
    }

    pub fn roots(&self) -> &[NodeKey] {
        &self.roots
    }

    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        &self[key].children
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self[key].parent
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Live nodes in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(slot, node)| node.as_ref().map(|node| (NodeKey(slot), node)))
    }

    /// Strict ancestors, nearest first.
    pub fn ancestors(&self, key: NodeKey) -> Ancestors<'_> {
        Ancestors {
            diagram: self,
            next: self[key].parent,
        }
    }

    pub fn depth(&self, key: NodeKey) -> usize {
        self.ancestors(key).count()
    }

    /// `key` and all of its descendants, pre-order.
    pub fn descendants(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self[current].children.iter().rev().copied());
        }
        out
    }

    /// Every node, parents before children, top-level nodes in order.
    pub fn pre_order(&self) -> Vec<NodeKey> {
        self.roots
            .iter()
            .flat_map(|root| self.descendants(*root))
            .collect()
    }

    /// Every node, children before parents.
    pub fn post_order(&self) -> Vec<NodeKey> {
        let mut out = Vec::with_capacity(self.nodes.len());
        for root in &self.roots {
            self.collect_post_order(*root, &mut out);
        }
        out
    }

    fn collect_post_order(&self, key: NodeKey, out: &mut Vec<NodeKey>) {
        for child in &self[key].children {
            self.collect_post_order(*child, out);
        }
        out.push(key);
    }

    /// Sum of the offsets of `key` and its ancestors.
    pub fn global_position(&self, key: NodeKey) -> Point {
        let mut position = self[key].offset;
        for ancestor in self.ancestors(key) {
            position = position + self[ancestor].offset;
        }
        position
    }

    pub fn global_rect(&self, key: NodeKey) -> Rect {
        Rect::from_origin(self.global_position(key), self[key].size)
    }

    /// True when some strict ancestor is collapsed.
    pub fn is_hidden(&self, key: NodeKey) -> bool {
        self.ancestors(key).any(|ancestor| self[ancestor].collapsed)
    }

    /// Deepest node that is `a`, `b` or an ancestor of both.
    pub fn lowest_common_ancestor(&self, a: NodeKey, b: NodeKey) -> Option<NodeKey> {
        let chain_a: Vec<NodeKey> = std::iter::once(a).chain(self.ancestors(a)).collect();
        std::iter::once(b)
            .chain(self.ancestors(b))
            .find(|candidate| chain_a.contains(candidate))
    }

    pub fn role_child(&self, parent: NodeKey, role: Role) -> Option<NodeKey> {
        self[parent]
            .children
            .iter()
            .copied()
            .find(|child| self[*child].role == Some(role))
    }
}

impl Index<NodeKey> for Diagram {
    type Output = Node;

    fn index(&self, key: NodeKey) -> &Node {
        match self.get(key) {
            Some(node) => node,
            None => panic!("stale node key {key:?}"),
        }
    }
}

impl IndexMut<NodeKey> for Diagram {
    fn index_mut(&mut self, key: NodeKey) -> &mut Node {
        match self.get_mut(key) {
            Some(node) => node,
            None => panic!("stale node key {key:?}"),
        }
    }
}

pub struct Ancestors<'a> {
    diagram: &'a Diagram,
    next: Option<NodeKey>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeKey;

    fn next(&mut self) -> Option<NodeKey> {
        let current = self.next?;
        self.next = self.diagram[current].parent;
        Some(current)
    }
}
