//! Interactive state on top of a built diagram: collapse/expand, structural
//! edits and status changes, each followed by the smallest re-layout that
//! keeps every computed size valid.

use crate::config::Config;
use crate::error::{BuildError, DiagramError, Diagnostics, Result};
use crate::ir::{Diagram, Edge, NodeKey, NodeKind, NodeStatus};
use crate::layout::{self, Layout, LayoutContext};
use crate::parser::{
    self, BuiltDiagram, GraphDescription, NodeDescriptor, duplicate_edge, has_pair,
};
use crate::text_metrics::{TextMeasure, measurer_for};
use std::collections::HashSet;

/// Outcome of a collapse-state request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Collapsed,
    Expanded,
    /// Already in the requested state, or not a container.
    Unchanged,
}

pub struct Dashboard {
    diagram: Diagram,
    config: Config,
    measure: Box<dyn TextMeasure>,
    diagnostics: Diagnostics,
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("nodes", &self.diagram.len())
            .field("edges", &self.diagram.edges.len())
            .field("diagnostics", &self.diagnostics.len())
            .finish()
    }
}

impl Dashboard {
    /// Builds and lays out `description` with the text measurer `config` selects.
    pub fn new(description: &GraphDescription, config: Config) -> std::result::Result<Self, BuildError> {
        let measure = measurer_for(&config.layout);
        Self::with_measure(description, config, measure)
    }

    pub fn with_measure(
        description: &GraphDescription,
        mut config: Config,
        measure: Box<dyn TextMeasure>,
    ) -> std::result::Result<Self, BuildError> {
        config.apply_settings(&description.settings);
        let mut diagnostics = Diagnostics::new();
        diagnostics.extend(config.validate());
        let BuiltDiagram {
            diagram,
            diagnostics: built,
        } = parser::build_diagram(description, &config)?;
        diagnostics.extend(built.into_vec());

        let mut dashboard = Self {
            diagram,
            config,
            measure,
            diagnostics,
        };
        dashboard.relayout();
        Ok(dashboard)
    }

    /// Parses JSON (or JSON5) and builds the dashboard.
    pub fn from_json(input: &str, config: Config) -> anyhow::Result<Self> {
        let description = parser::parse_graph(input)?;
        Ok(Self::new(&description, config)?)
    }

    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Global geometry and routed edges for the current state.
    pub fn layout(&self) -> Layout {
        layout::snapshot(&self.diagram, &self.config, &self.diagnostics)
    }

    /// Full layout pass over every node.
    pub fn relayout(&mut self) {
        let Self {
            diagram,
            config,
            measure,
            diagnostics,
        } = self;
        let mut ctx = LayoutContext::new(config, measure.as_ref(), diagnostics);
        layout::compute_layout(diagram, &mut ctx);
    }

    fn cascade(&mut self, key: NodeKey) {
        let Self {
            diagram,
            config,
            measure,
            diagnostics,
        } = self;
        let mut ctx = LayoutContext::new(config, measure.as_ref(), diagnostics);
        layout::cascade(diagram, key, &mut ctx);
    }

    /// Lays out a freshly inserted subtree bottom-up, then its ancestors.
    fn layout_subtree(&mut self, key: NodeKey) {
        let Self {
            diagram,
            config,
            measure,
            diagnostics,
        } = self;
        let mut ctx = LayoutContext::new(config, measure.as_ref(), diagnostics);
        for node in diagram.descendants(key).into_iter().skip(1).rev() {
            layout::layout_node(diagram, node, &mut ctx);
        }
        layout::cascade(diagram, key, &mut ctx);
    }

    fn lookup(&self, id: &str) -> Result<NodeKey> {
        self.diagram
            .key(id)
            .ok_or_else(|| DiagramError::UnknownNode(id.to_string()))
    }

    pub fn toggle(&mut self, id: &str) -> Result<Transition> {
        let key = self.lookup(id)?;
        let collapsed = self.diagram[key].collapsed;
        self.set_collapsed(key, !collapsed)
    }

    pub fn collapse(&mut self, id: &str) -> Result<Transition> {
        let key = self.lookup(id)?;
        self.set_collapsed(key, true)
    }

    pub fn expand(&mut self, id: &str) -> Result<Transition> {
        let key = self.lookup(id)?;
        self.set_collapsed(key, false)
    }

    fn set_collapsed(&mut self, key: NodeKey, collapsed: bool) -> Result<Transition> {
        let node = &mut self.diagram[key];
        if !node.is_container() || node.collapsed == collapsed {
            return Ok(Transition::Unchanged);
        }
        node.collapsed = collapsed;
        tracing::debug!(node = %node.id, collapsed, "collapse state changed");
        self.cascade(key);
        Ok(if collapsed {
            Transition::Collapsed
        } else {
            Transition::Expanded
        })
    }

    /// Expands every collapsed ancestor of `id`; returns how many changed.
    pub fn reveal(&mut self, id: &str) -> Result<usize> {
        let key = self.lookup(id)?;
        let collapsed: Vec<NodeKey> = self
            .diagram
            .ancestors(key)
            .filter(|ancestor| self.diagram[*ancestor].collapsed)
            .collect();
        for ancestor in &collapsed {
            self.diagram[*ancestor].collapsed = false;
        }
        if let Some(parent) = self.diagram.parent(key)
            && !collapsed.is_empty()
        {
            self.cascade(parent);
        }
        Ok(collapsed.len())
    }

    /// Inserts `child` (with its subtree) into container `parent_id`.
    ///
    /// Lanes and columns take anything. Fixed composites accept a leaf only
    /// for a role they are missing; the edge demo accepts nothing.
    pub fn add_child(
        &mut self,
        parent_id: &str,
        child: &NodeDescriptor,
    ) -> std::result::Result<(), BuildError> {
        let parent = self.lookup(parent_id)?;
        let kind = self.diagram[parent].kind;
        let role = match kind {
            NodeKind::Leaf(_) => return Err(DiagramError::NotAContainer(parent_id.to_string()).into()),
            NodeKind::EdgeDemo => return Err(DiagramError::FixedLayout(parent_id.to_string()).into()),
            NodeKind::Lane | NodeKind::Columns => None,
            NodeKind::Adapter | NodeKind::Foundation | NodeKind::Mart => {
                if !parser::fits_role_slot(child) {
                    return Err(DiagramError::InvalidRole {
                        parent: parent_id.to_string(),
                        child: child.id.clone(),
                    }
                    .into());
                }
                let role = parser::infer_role(child, kind.roles())
                    .filter(|role| self.diagram.role_child(parent, *role).is_none())
                    .ok_or_else(|| DiagramError::FixedLayout(parent_id.to_string()))?;
                Some(role)
            }
        };

        let Self {
            diagram,
            config,
            diagnostics,
            ..
        } = self;
        let key = parser::graft(diagram, diagnostics, config, child, parent, role)?;
        if role.is_some() && config.edges.internal_edges {
            for edge in parser::internal_edges(diagram, parent) {
                if !has_pair(diagram, &edge.source, &edge.target) {
                    diagram.edges.push(edge);
                }
            }
        }
        tracing::debug!(parent = parent_id, child = %child.id, "child added");
        self.layout_subtree(key);
        Ok(())
    }

    /// Removes `id` and its subtree. Internal edges touching the subtree go
    /// too; user edges stay and surface as unresolved endpoints.
    pub fn remove_node(&mut self, id: &str) -> Result<Vec<String>> {
        let key = self.lookup(id)?;
        let parent = self.diagram.parent(key);
        let removed = self.diagram.remove(key);
        let gone: HashSet<&str> = removed.iter().map(String::as_str).collect();
        self.diagram.edges.retain(|edge| {
            !(edge.internal
                && (gone.contains(edge.source.as_str()) || gone.contains(edge.target.as_str())))
        });
        match parent {
            Some(parent) => self.cascade(parent),
            None => layout::place_roots(&mut self.diagram, &self.config.layout),
        }
        Ok(removed)
    }

    /// Overrides the intrinsic size of `id`; `None` clears an axis.
    ///
    /// Role children of fixed composites take their size from the template,
    /// except in full-mode marts.
    pub fn resize(&mut self, id: &str, width: Option<f32>, height: Option<f32>) -> Result<()> {
        let key = self.lookup(id)?;
        if let Some(parent) = self.diagram.parent(key) {
            let parent = &self.diagram[parent];
            if self.diagram[key].role.is_some()
                && parent.kind.is_fixed_role()
                && !layout::keeps_child_size(parent)
            {
                return Err(DiagramError::FixedLayout(parent.id.clone()));
            }
        }
        let node = &mut self.diagram[key];
        node.width = width;
        node.height = height;
        self.cascade(key);
        Ok(())
    }

    /// Pins a top-level node at `(x, y)`.
    pub fn move_to(&mut self, id: &str, x: f32, y: f32) -> Result<()> {
        let key = self.lookup(id)?;
        if self.diagram.parent(key).is_some() {
            return Err(DiagramError::NotTopLevel(id.to_string()));
        }
        self.diagram[key].position = Some(layout::geometry::Point::new(x, y));
        layout::place_roots(&mut self.diagram, &self.config.layout);
        Ok(())
    }

    /// Sets the status of `id`. With collapse-on-status enabled, `id` and each
    /// of its container ancestors collapse once everything below them has
    /// settled and expand otherwise.
    pub fn set_status(&mut self, id: &str, status: NodeStatus) -> Result<()> {
        let key = self.lookup(id)?;
        self.diagram[key].status = status;
        if !self.config.status.toggle_collapse_on_status_change {
            return Ok(());
        }
        let chain: Vec<NodeKey> = std::iter::once(key)
            .chain(self.diagram.ancestors(key))
            .filter(|node| self.diagram[*node].is_container())
            .collect();
        let mut changed = false;
        for node in chain {
            let settled = layout::effective_status(&self.diagram, node, true).is_settled();
            let container = &mut self.diagram[node];
            if container.collapsed != settled {
                container.collapsed = settled;
                changed = true;
            }
        }
        if changed {
            self.cascade(key);
        }
        Ok(())
    }

    /// Adds a user edge. Both endpoints must exist and the pair must be new.
    pub fn add_edge(&mut self, edge: Edge) -> Result<()> {
        if edge.source == edge.target {
            return Err(DiagramError::InvalidEdge {
                edge: edge.id(),
                reason: "source and target are the same node".to_string(),
            });
        }
        for endpoint in [&edge.source, &edge.target] {
            if self.diagram.key(endpoint).is_none() {
                return Err(DiagramError::UnresolvedEndpoint {
                    edge: edge.id(),
                    id: endpoint.clone(),
                });
            }
        }
        if has_pair(&self.diagram, &edge.source, &edge.target) {
            return Err(duplicate_edge(&edge));
        }
        self.diagram.edges.push(edge);
        Ok(())
    }

    /// Removes the edge with id `"{source}--{type}--{target}"`.
    pub fn remove_edge(&mut self, id: &str) -> bool {
        let before = self.diagram.edges.len();
        self.diagram.edges.retain(|edge| edge.id() != id);
        self.diagram.edges.len() != before
    }
}
