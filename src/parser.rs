use crate::config::{Config, GraphSettings};
use crate::error::{BuildError, DiagramError, Diagnostics};
use crate::ir::{
    AdapterMode, Align, Arrangement, DEFAULT_EDGE_KIND, DemoLayout, Diagram, DisplayMode, Edge,
    LeafShape, Node, NodeKey, NodeKind, NodeStatus, Orientation, Role, SizeMode, role_child_id,
};
use crate::layout::demo_roles;
use crate::layout::geometry::{Point, Size};
use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;

static STAGING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)staging|stg").unwrap());
static ARCHIVE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)archive|\barc\b").unwrap());
static TRANSFORM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)transform|\btrf\b|\btrn\b|\btfm\b").unwrap());
static RAW_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\braw").unwrap());
static BASE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)base").unwrap());
static LOAD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)load").unwrap());
static REPORT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)report|rprt").unwrap());

/// Type tag and state of the edges generated inside composites.
pub const INTERNAL_EDGE_KIND: &str = "SSIS";
pub const INTERNAL_EDGE_STATE: &str = "Ready";

/// A whole graph description as found in fixture files.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GraphDescription {
    pub settings: GraphSettings,
    pub nodes: Vec<NodeDescriptor>,
    pub edges: Vec<EdgeDescriptor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeDescriptor {
    pub id: String,
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub code: Option<String>,
    pub status: Option<String>,
    pub state: Option<String>,
    pub layout: Option<LayoutField>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub children: Vec<NodeDescriptor>,
    /// Informational; the tree position is authoritative.
    pub parent_id: Option<String>,
    pub role: Option<String>,
    pub category: Option<String>,
    pub collapsed: Option<bool>,
}

impl NodeDescriptor {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: Some(kind.into()),
            ..Self::default()
        }
    }
}

/// `layout` is either a bare name (edge-demo layouts, size modes) or an object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LayoutField {
    Name(String),
    Options(LayoutDescriptor),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutDescriptor {
    pub mode: Option<String>,
    pub display_mode: Option<String>,
    pub arrangement: Option<ArrangementField>,
    pub orientation: Option<String>,
    pub minimum_column_width: Option<f32>,
    pub min_width: Option<f32>,
    pub max_width: Option<f32>,
    pub minimum_size: Option<SizeDescriptor>,
    pub layout_mode: Option<String>,
    pub align: Option<String>,
    /// Edge-demo layout name.
    #[serde(rename = "type")]
    pub demo: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ArrangementField {
    Index(i64),
    Name(String),
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct SizeDescriptor {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EdgeDescriptor {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub state: Option<String>,
}

impl From<&EdgeDescriptor> for Edge {
    fn from(desc: &EdgeDescriptor) -> Self {
        let mut edge = Edge::new(desc.source.clone(), desc.target.clone());
        edge.kind = desc
            .kind
            .clone()
            .filter(|kind| !kind.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_EDGE_KIND.to_string());
        edge.state = desc.state.clone();
        edge
    }
}

/// Parses a graph description. Strict JSON first, JSON5 as a fallback so
/// hand-written fixtures with comments and trailing commas load too.
pub fn parse_graph(input: &str) -> Result<GraphDescription> {
    match serde_json::from_str(input) {
        Ok(description) => Ok(description),
        Err(json_err) => json5::from_str(input).map_err(|json5_err| {
            anyhow::anyhow!("invalid graph description: {json_err} (as JSON5: {json5_err})")
        }),
    }
}

/// A freshly built diagram and the non-fatal problems found while building it.
#[derive(Debug, Clone)]
pub struct BuiltDiagram {
    pub diagram: Diagram,
    pub diagnostics: Diagnostics,
}

/// Turns a description into the arena tree, generating role children and
/// internal edges. `config` must already carry the description's settings.
///
/// Fails only on duplicate ids, all of which are reported together.
pub fn build_diagram(
    description: &GraphDescription,
    config: &Config,
) -> std::result::Result<BuiltDiagram, BuildError> {
    let mut diagram = Diagram::new();
    let mut diagnostics = Diagnostics::new();
    let mut builder = Builder::new(&mut diagram, &mut diagnostics, config);
    for node in &description.nodes {
        builder.add_node(node, None, None);
    }
    let Builder {
        duplicates,
        internal_edges,
        ..
    } = builder;
    if !duplicates.is_empty() {
        return Err(BuildError::DuplicateIds(duplicates));
    }

    let mut pairs: HashSet<(String, String)> = HashSet::new();
    for desc in &description.edges {
        let edge = Edge::from(desc);
        if !pairs.insert((edge.source.clone(), edge.target.clone())) {
            diagnostics.push(duplicate_edge(&edge));
            continue;
        }
        diagram.edges.push(edge);
    }
    for edge in internal_edges {
        if pairs.insert((edge.source.clone(), edge.target.clone())) {
            diagram.edges.push(edge);
        }
    }
    tracing::debug!(
        nodes = diagram.len(),
        edges = diagram.edges.len(),
        diagnostics = diagnostics.len(),
        "diagram built"
    );
    Ok(BuiltDiagram {
        diagram,
        diagnostics,
    })
}

/// Inserts `desc` and its subtree under `parent`. Either the whole subtree
/// goes in or nothing does.
pub(crate) fn graft(
    diagram: &mut Diagram,
    diagnostics: &mut Diagnostics,
    config: &Config,
    desc: &NodeDescriptor,
    parent: NodeKey,
    role: Option<Role>,
) -> std::result::Result<NodeKey, BuildError> {
    let mut local = Diagnostics::new();
    let mut builder = Builder::new(diagram, &mut local, config);
    let inserted = builder.add_node(desc, Some(parent), role);
    let Builder {
        duplicates,
        internal_edges,
        ..
    } = builder;
    match inserted {
        Some(key) if duplicates.is_empty() => {
            for edge in internal_edges {
                if !has_pair(diagram, &edge.source, &edge.target) {
                    diagram.edges.push(edge);
                }
            }
            diagnostics.extend(local.into_vec());
            Ok(key)
        }
        Some(key) => {
            diagram.remove(key);
            Err(BuildError::DuplicateIds(duplicates))
        }
        None => Err(BuildError::DuplicateIds(duplicates)),
    }
}

pub(crate) fn has_pair(diagram: &Diagram, source: &str, target: &str) -> bool {
    diagram
        .edges
        .iter()
        .any(|edge| edge.source == source && edge.target == target)
}

pub(crate) fn duplicate_edge(edge: &Edge) -> DiagramError {
    DiagramError::InvalidEdge {
        edge: edge.id(),
        reason: format!(
            "duplicate of an earlier edge from `{}` to `{}`",
            edge.source, edge.target
        ),
    }
}

/// Role a descriptor asks for, by explicit `role`, then `category`, label and
/// id keywords. Only roles in `allowed` are considered.
pub fn infer_role(desc: &NodeDescriptor, allowed: &[Role]) -> Option<Role> {
    if let Some(role) = desc.role.as_deref().and_then(Role::from_token)
        && allowed.contains(&role)
    {
        return Some(role);
    }
    [
        desc.role.as_deref(),
        desc.category.as_deref(),
        desc.label.as_deref(),
        Some(desc.id.as_str()),
    ]
    .into_iter()
    .flatten()
    .find_map(|text| {
        allowed
            .iter()
            .copied()
            .find(|role| role_keyword(*role).is_some_and(|re| re.is_match(text)))
    })
}

/// Role slots take leaves only, since composite templates dictate their size.
pub(crate) fn fits_role_slot(desc: &NodeDescriptor) -> bool {
    !desc
        .kind
        .as_deref()
        .and_then(NodeKind::from_token)
        .is_some_and(|kind| kind.is_container())
}

fn role_keyword(role: Role) -> Option<&'static Regex> {
    match role {
        Role::Staging => Some(&STAGING_RE),
        Role::Archive => Some(&ARCHIVE_RE),
        Role::Transform => Some(&TRANSFORM_RE),
        Role::Raw => Some(&RAW_RE),
        Role::Base => Some(&BASE_RE),
        Role::Load => Some(&LOAD_RE),
        Role::Report => Some(&REPORT_RE),
        _ => None,
    }
}

/// Roles a composite generates when they are missing.
pub fn generated_roles(node: &Node) -> &'static [Role] {
    match node.kind {
        NodeKind::Adapter => node.options.adapter_mode.roles(),
        NodeKind::Foundation | NodeKind::Mart if !node.options.manual => node.kind.roles(),
        _ => &[],
    }
}

/// Internal edges between the role children of a composite, as `(from, to)`.
pub fn internal_pairs(kind: NodeKind, demo: DemoLayout) -> Vec<(Role, Role)> {
    match kind {
        NodeKind::Adapter => vec![
            (Role::Staging, Role::Transform),
            (Role::Staging, Role::Archive),
        ],
        NodeKind::Foundation => vec![(Role::Raw, Role::Base)],
        NodeKind::Mart => vec![(Role::Load, Role::Report)],
        NodeKind::EdgeDemo => demo_roles(demo)
            .iter()
            .map(|role| (Role::Center, *role))
            .collect(),
        _ => Vec::new(),
    }
}

/// Internal edges of composite `key` between the role children it has now.
pub(crate) fn internal_edges(diagram: &Diagram, key: NodeKey) -> Vec<Edge> {
    let node = &diagram[key];
    internal_pairs(node.kind, node.options.demo_layout)
        .into_iter()
        .filter_map(|(from, to)| {
            let source = diagram.role_child(key, from)?;
            let target = diagram.role_child(key, to)?;
            let mut edge = Edge::new(diagram[source].id.clone(), diagram[target].id.clone());
            edge.kind = INTERNAL_EDGE_KIND.to_string();
            edge.state = Some(INTERNAL_EDGE_STATE.to_string());
            edge.internal = true;
            Some(edge)
        })
        .collect()
}

struct Builder<'a> {
    diagram: &'a mut Diagram,
    diagnostics: &'a mut Diagnostics,
    config: &'a Config,
    duplicates: Vec<DiagramError>,
    internal_edges: Vec<Edge>,
}

impl<'a> Builder<'a> {
    fn new(diagram: &'a mut Diagram, diagnostics: &'a mut Diagnostics, config: &'a Config) -> Self {
        Self {
            diagram,
            diagnostics,
            config,
            duplicates: Vec::new(),
            internal_edges: Vec::new(),
        }
    }

    fn add_node(
        &mut self,
        desc: &NodeDescriptor,
        parent: Option<NodeKey>,
        role: Option<Role>,
    ) -> Option<NodeKey> {
        let mut node = self.node_from(desc, parent.is_none());
        node.role = role;
        let node_id = node.id.clone();
        let key = match self.diagram.insert(node, parent) {
            Ok(key) => key,
            Err(err) => {
                self.duplicates.push(err);
                return None;
            }
        };

        let kind = self.diagram[key].kind;
        match kind {
            NodeKind::Lane | NodeKind::Columns => {
                for child in &desc.children {
                    self.add_node(child, Some(key), None);
                }
            }
            NodeKind::Adapter | NodeKind::Foundation | NodeKind::Mart => {
                self.add_role_children(key, desc);
                self.add_internal_edges(key);
            }
            NodeKind::EdgeDemo => {
                if !desc.children.is_empty() {
                    self.diagnostics.push(DiagramError::IgnoredChildren {
                        id: node_id,
                        count: desc.children.len(),
                    });
                }
                let demo = self.diagram[key].options.demo_layout;
                for role in std::iter::once(&Role::Center).chain(demo_roles(demo)) {
                    self.generate_role_child(key, *role);
                }
                self.add_internal_edges(key);
            }
            NodeKind::Leaf(_) => {
                if !desc.children.is_empty() {
                    self.diagnostics.push(DiagramError::IgnoredChildren {
                        id: node_id,
                        count: desc.children.len(),
                    });
                }
            }
        }
        Some(key)
    }

    fn add_role_children(&mut self, key: NodeKey, desc: &NodeDescriptor) {
        let allowed = self.diagram[key].kind.roles();
        for child in &desc.children {
            let role = infer_role(child, allowed)
                .filter(|_| fits_role_slot(child))
                .filter(|role| self.diagram.role_child(key, *role).is_none());
            match role {
                Some(role) => {
                    self.add_node(child, Some(key), Some(role));
                }
                None => self.diagnostics.push(DiagramError::InvalidRole {
                    parent: self.diagram[key].id.clone(),
                    child: child.id.clone(),
                }),
            }
        }
        for role in generated_roles(&self.diagram[key]) {
            if self.diagram.role_child(key, *role).is_none() {
                self.generate_role_child(key, *role);
            }
        }
    }

    fn generate_role_child(&mut self, parent: NodeKey, role: Role) {
        let child = generated_child(&self.diagram[parent], role);
        if let Err(err) = self.diagram.insert(child, Some(parent)) {
            self.duplicates.push(err);
        }
    }

    fn add_internal_edges(&mut self, key: NodeKey) {
        if self.config.edges.internal_edges {
            self.internal_edges.extend(internal_edges(self.diagram, key));
        }
    }

    fn node_from(&mut self, desc: &NodeDescriptor, top_level: bool) -> Node {
        let token = desc.kind.as_deref().unwrap_or_default();
        let kind = NodeKind::from_token(token).unwrap_or_else(|| {
            self.diagnostics.push(DiagramError::InvalidNodeKind {
                id: desc.id.clone(),
                kind: token.to_string(),
            });
            NodeKind::Leaf(LeafShape::Rect)
        });

        let mut node = Node::new(desc.id.clone(), kind);
        if let Some(label) = &desc.label {
            node.label = label.clone();
        }
        node.code = desc.code.clone();
        node.state = desc.state.clone();
        node.status = desc
            .status
            .as_deref()
            .or(desc.state.as_deref())
            .map(NodeStatus::from_token)
            .unwrap_or_default();
        node.width = desc.width;
        node.height = desc.height;
        node.collapsed = kind.is_container() && desc.collapsed.unwrap_or(false);
        if matches!(kind, NodeKind::Foundation | NodeKind::Mart) {
            node.options.display_mode = DisplayMode::Role;
        }
        if top_level && (desc.x.is_some() || desc.y.is_some()) {
            node.position = Some(Point::new(
                desc.x.unwrap_or_default(),
                desc.y.unwrap_or_default(),
            ));
        } else if desc.x.is_some() || desc.y.is_some() {
            tracing::debug!(node = %desc.id, "ignoring x/y of a nested node");
        }

        match &desc.layout {
            Some(LayoutField::Name(name)) => self.apply_layout_name(&mut node, name),
            Some(LayoutField::Options(layout)) => self.apply_layout(&mut node, layout),
            None => {}
        }
        node
    }

    fn apply_layout_name(&mut self, node: &mut Node, name: &str) {
        if node.kind == NodeKind::EdgeDemo {
            node.options.demo_layout = self.option(node, "layout", name, "grid", DemoLayout::from_token);
        } else {
            node.options.size_mode =
                self.option(node, "layoutMode", name, "default", SizeMode::from_token);
        }
    }

    fn apply_layout(&mut self, node: &mut Node, layout: &LayoutDescriptor) {
        if let Some(mode) = layout.mode.as_deref() {
            match node.kind {
                NodeKind::Adapter => {
                    node.options.adapter_mode =
                        self.option(node, "mode", mode, "full", AdapterMode::from_token);
                }
                NodeKind::Foundation | NodeKind::Mart => {
                    node.options.manual = mode.trim().eq_ignore_ascii_case("manual");
                }
                _ => {}
            }
        }
        if let Some(display) = layout.display_mode.as_deref() {
            let fallback = node.options.display_mode;
            node.options.display_mode = self
                .checked(node, "displayMode", display, fallback.as_str(), DisplayMode::from_token)
                .unwrap_or(fallback);
        }
        if let Some(orientation) = layout.orientation.as_deref() {
            node.options.orientation =
                self.option(node, "orientation", orientation, "horizontal", Orientation::from_token);
        }
        if let Some(arrangement) = &layout.arrangement {
            node.options.arrangement = self.arrangement(node, arrangement);
        }
        if let Some(width) = layout.minimum_column_width {
            node.options.minimum_column_width = width.max(0.0);
        }
        node.options.min_width = layout.min_width;
        node.options.max_width = layout.max_width;
        if let Some(size) = layout.minimum_size {
            node.options.minimum_size = Size::new(size.width.max(0.0), size.height.max(0.0));
        }
        if let Some(mode) = layout.layout_mode.as_deref() {
            node.options.size_mode =
                self.option(node, "layoutMode", mode, "default", SizeMode::from_token);
        }
        if let Some(align) = layout.align.as_deref() {
            node.options.align = self.option(node, "align", align, "center", Align::from_token);
        }
        if let Some(demo) = layout.demo.as_deref()
            && node.kind == NodeKind::EdgeDemo
        {
            node.options.demo_layout = self.option(node, "layout", demo, "grid", DemoLayout::from_token);
        }
    }

    fn arrangement(&mut self, node: &Node, field: &ArrangementField) -> Option<Arrangement> {
        let parsed = match field {
            ArrangementField::Index(index) => Arrangement::from_index(*index),
            ArrangementField::Name(name) if name.trim().eq_ignore_ascii_case("default") => {
                return None;
            }
            ArrangementField::Name(name) => {
                name.trim().parse::<i64>().ok().and_then(Arrangement::from_index)
            }
        };
        if parsed.is_none() {
            let value = match field {
                ArrangementField::Index(index) => index.to_string(),
                ArrangementField::Name(name) => name.clone(),
            };
            let fallback = node.options.adapter_mode.default_arrangement();
            self.diagnostics.push(DiagramError::InvalidLayoutOption {
                id: node.id.clone(),
                option: "arrangement".to_string(),
                value,
                fallback: fallback.index().to_string(),
            });
        }
        parsed
    }

    /// Parses `value`, reporting it and returning the default when invalid.
    fn option<T: Default>(
        &mut self,
        node: &Node,
        option: &str,
        value: &str,
        fallback: &str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> T {
        self.checked(node, option, value, fallback, parse)
            .unwrap_or_default()
    }

    fn checked<T>(
        &mut self,
        node: &Node,
        option: &str,
        value: &str,
        fallback: &str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Option<T> {
        let parsed = parse(value);
        if parsed.is_none() {
            self.diagnostics.push(DiagramError::InvalidLayoutOption {
                id: node.id.clone(),
                option: option.to_string(),
                value: value.to_string(),
                fallback: fallback.to_string(),
            });
        }
        parsed
    }
}

/// Rect leaf standing in for `role` inside `parent`.
pub fn generated_child(parent: &Node, role: Role) -> Node {
    let mut child = Node::new(
        role_child_id(&parent.id, role),
        NodeKind::Leaf(LeafShape::Rect),
    );
    child.label = match parent.options.display_mode {
        DisplayMode::Full if parent.kind != NodeKind::EdgeDemo => {
            format!("{} {}", role.title(), parent.label)
        }
        _ => role.as_str().to_string(),
    };
    child.code = parent.code.clone();
    child.role = Some(role);
    child.generated = true;
    child.status = parent.status;
    child
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn build(input: &str) -> BuiltDiagram {
        let description = parse_graph(input).unwrap();
        let mut config = Config::default();
        config.apply_settings(&description.settings);
        build_diagram(&description, &config).unwrap()
    }

    #[test]
    fn parses_json5_fixtures() {
        let description = parse_graph(
            r#"{
                // hand written
                nodes: [{ id: 'a', type: 'node', }],
                edges: [],
            }"#,
        )
        .unwrap();
        assert_eq!(description.nodes.len(), 1);
        assert_eq!(description.nodes[0].kind.as_deref(), Some("node"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_graph("nodes: [").is_err());
    }

    #[test]
    fn unknown_type_becomes_rect_leaf() {
        let built = build(r#"{"nodes":[{"id":"x","type":"hexagon"}]}"#);
        let node = built.diagram.node_by_id("x").unwrap();
        assert_eq!(node.kind, NodeKind::Leaf(LeafShape::Rect));
        assert_eq!(built.diagnostics.iter().next().unwrap().code(), "InvalidNodeKind");
    }

    #[test]
    fn adapter_generates_missing_roles_and_internal_edges() {
        let built = build(
            r#"{"nodes":[{"id":"ad","label":"Orders","code":"ORD","type":"adapter",
                "layout":{"mode":"full","displayMode":"full"}}]}"#,
        );
        let diagram = &built.diagram;
        let ad = diagram.key("ad").unwrap();
        assert_eq!(diagram.children(ad).len(), 3);
        let staging = diagram.node_by_id("staging_ad").unwrap();
        assert_eq!(staging.label, "Staging Orders");
        assert_eq!(staging.code.as_deref(), Some("ORD"));
        assert!(staging.generated);
        let internal: Vec<String> = diagram.edges.iter().map(Edge::id).collect();
        assert_eq!(
            internal,
            vec![
                "staging_ad--SSIS--transform_ad".to_string(),
                "staging_ad--SSIS--archive_ad".to_string()
            ]
        );
        assert!(diagram.edges.iter().all(|edge| edge.internal));
    }

    #[test]
    fn explicit_children_take_inferred_roles() {
        let built = build(
            r#"{"nodes":[{"id":"f","type":"foundation","children":[
                {"id":"f-raw","label":"Raw layer","type":"node"},
                {"id":"mystery","type":"node"}
            ]}]}"#,
        );
        let diagram = &built.diagram;
        let f = diagram.key("f").unwrap();
        let raw = diagram.role_child(f, Role::Raw).unwrap();
        assert_eq!(diagram[raw].id, "f-raw");
        let base = diagram.role_child(f, Role::Base).unwrap();
        assert_eq!(diagram[base].id, "base_f");
        assert_eq!(diagram[base].label, "base");
        assert!(diagram.node_by_id("mystery").is_none());
        assert!(built.diagnostics.iter().any(|d| d.code() == "InvalidRole"));
    }

    #[test]
    fn role_slots_take_leaves_only() {
        let built = build(
            r#"{"nodes":[{"id":"ad","type":"adapter","layout":{"arrangement":3},"children":[
                {"id":"archive-lane","type":"lane","role":"archive","children":[
                    {"id":"big","type":"node","width":400,"height":100,"layout":{"layoutMode":"fixed"}}
                ]}
            ]}]}"#,
        );
        let diagram = &built.diagram;
        let ad = diagram.key("ad").unwrap();
        let archive = diagram.role_child(ad, Role::Archive).unwrap();
        assert_eq!(diagram[archive].id, "archive_ad");
        assert!(matches!(diagram[archive].kind, NodeKind::Leaf(_)));
        assert!(diagram.node_by_id("archive-lane").is_none());
        assert!(diagram.node_by_id("big").is_none());
        assert!(built.diagnostics.iter().any(|d| *d
            == DiagramError::InvalidRole {
                parent: "ad".to_string(),
                child: "archive-lane".to_string(),
            }));
    }

    #[test]
    fn role_keywords() {
        let mut desc = NodeDescriptor::new("x", "node");
        desc.label = Some("STG orders".to_string());
        assert_eq!(infer_role(&desc, NodeKind::Adapter.roles()), Some(Role::Staging));
        desc.label = None;
        desc.category = Some("rprt".to_string());
        assert_eq!(infer_role(&desc, NodeKind::Mart.roles()), Some(Role::Report));
        desc.role = Some("load".to_string());
        assert_eq!(infer_role(&desc, NodeKind::Mart.roles()), Some(Role::Load));
        assert_eq!(infer_role(&desc, NodeKind::Foundation.roles()), None);
    }

    #[test]
    fn manual_modes_generate_nothing() {
        let built = build(
            r#"{"nodes":[
                {"id":"ad","type":"adapter","layout":{"mode":"manual"}},
                {"id":"m","type":"mart","layout":{"mode":"manual"}}
            ]}"#,
        );
        let diagram = &built.diagram;
        assert!(diagram.children(diagram.key("ad").unwrap()).is_empty());
        assert!(diagram.children(diagram.key("m").unwrap()).is_empty());
    }

    #[test]
    fn edge_demo_ignores_explicit_children() {
        let built = build(
            r#"{"nodes":[{"id":"demo","type":"edge-demo","layout":"stair-up",
                "children":[{"id":"c","type":"node"}]}]}"#,
        );
        let diagram = &built.diagram;
        let demo = diagram.key("demo").unwrap();
        assert_eq!(diagram.children(demo).len(), 3);
        assert!(diagram.node_by_id("c").is_none());
        assert!(diagram.node_by_id("top-right_demo").is_some());
        assert_eq!(diagram.edges.len(), 2);
        assert!(built.diagnostics.iter().any(|d| d.code() == "IgnoredChildren"));
    }

    #[test]
    fn duplicate_ids_are_reported_together() {
        let description = parse_graph(
            r#"{"nodes":[
                {"id":"a","type":"node"},
                {"id":"a","type":"node"},
                {"id":"lane","type":"lane","children":[{"id":"b","type":"node"},{"id":"b","type":"node"}]}
            ]}"#,
        )
        .unwrap();
        let err = build_diagram(&description, &Config::default()).unwrap_err();
        let BuildError::DuplicateIds(errors) = &err else {
            panic!("expected duplicate ids, got {err:?}");
        };
        assert_eq!(errors.len(), 2);
        assert_eq!(err.to_string(), "2 duplicate node id(s): a, b");
    }

    #[test]
    fn duplicate_edges_are_skipped() {
        let built = build(
            r#"{"nodes":[{"id":"a","type":"node"},{"id":"b","type":"node"}],
               "edges":[{"source":"a","target":"b","type":"DataFlow"},
                        {"source":"a","target":"b"}]}"#,
        );
        assert_eq!(built.diagram.edges.len(), 1);
        assert_eq!(built.diagram.edges[0].kind, "DataFlow");
        assert!(built.diagnostics.iter().any(|d| d.code() == "InvalidEdge"));
    }

    #[test]
    fn invalid_options_fall_back_with_diagnostic() {
        let built = build(
            r#"{"nodes":[{"id":"m","type":"mart","layout":{"orientation":"diagonal","arrangement":9}}]}"#,
        );
        let node = built.diagram.node_by_id("m").unwrap();
        assert_eq!(node.options.orientation, Orientation::Horizontal);
        assert_eq!(node.options.arrangement, None);
        let codes: Vec<_> = built.diagnostics.iter().map(DiagramError::code).collect();
        assert_eq!(codes, vec!["InvalidLayoutOption", "InvalidLayoutOption"]);
    }

    #[test]
    fn internal_edges_can_be_disabled() {
        let built = build(
            r#"{"settings":{"internalEdges":false},"nodes":[{"id":"f","type":"foundation"}]}"#,
        );
        assert!(built.diagram.edges.is_empty());
    }

    #[test]
    fn top_level_position_is_kept() {
        let built = build(
            r#"{"nodes":[{"id":"lane","type":"lane","x":40,"y":60,
                "children":[{"id":"a","type":"node","x":5,"y":5}]}]}"#,
        );
        let diagram = &built.diagram;
        assert_eq!(diagram.node_by_id("lane").unwrap().position, Some(Point::new(40.0, 60.0)));
        assert_eq!(diagram.node_by_id("a").unwrap().position, None);
    }
}
