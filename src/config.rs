use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::DiagramError;
use crate::layout::geometry::Size;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    pub fn uniform(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(8.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Spacing {
    pub horizontal: f32,
    pub vertical: f32,
}

impl Default for Spacing {
    fn default() -> Self {
        Self {
            horizontal: 20.0,
            vertical: 10.0,
        }
    }
}

/// Default sizes for rect and circle leaves.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LeafConfig {
    pub width: f32,
    pub height: f32,
    pub circle_size: f32,
    /// Added to the measured label width.
    pub text_padding: f32,
    pub auto_min_width: f32,
}

impl Default for LeafConfig {
    fn default() -> Self {
        Self {
            width: 150.0,
            height: 20.0,
            circle_size: 60.0,
            text_padding: 20.0,
            auto_min_width: 60.0,
        }
    }
}

/// Role child sizes of a fixed composite, per display mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleSizes {
    pub full: Size,
    pub role: Size,
}

impl Default for RoleSizes {
    fn default() -> Self {
        Self {
            full: Size::new(150.0, 44.0),
            role: Size::new(80.0, 44.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EdgeDemoConfig {
    pub spacing: Spacing,
    pub shift_ratio: f32,
    pub shift2_ratio: f32,
}

impl Default for EdgeDemoConfig {
    fn default() -> Self {
        Self {
            spacing: Spacing {
                horizontal: 30.0,
                vertical: 20.0,
            },
            shift_ratio: 0.6,
            shift2_ratio: 0.8,
        }
    }
}

/// Direction in which top-level nodes without explicit coordinates are stacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowOrientation {
    #[default]
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub container_margin: Margins,
    pub node_spacing: Spacing,
    pub header_height: f32,
    /// Added to the measured header label to get a container's minimum width.
    pub header_padding: f32,
    pub collapsed_width: f32,
    pub collapsed_height: f32,
    pub font_family: String,
    pub font_size: f32,
    pub fast_text_metrics: bool,
    pub orientation: FlowOrientation,
    pub leaf: LeafConfig,
    pub adapter: RoleSizes,
    pub foundation: RoleSizes,
    pub mart: RoleSizes,
    pub edge_demo: EdgeDemoConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            container_margin: Margins::default(),
            node_spacing: Spacing::default(),
            header_height: 20.0,
            header_padding: 36.0,
            collapsed_width: 60.0,
            collapsed_height: 20.0,
            font_family: "Arial, Helvetica, sans-serif".to_string(),
            font_size: 12.0,
            fast_text_metrics: true,
            orientation: FlowOrientation::Vertical,
            leaf: LeafConfig::default(),
            adapter: RoleSizes::default(),
            foundation: RoleSizes {
                full: Size::new(150.0, 20.0),
                role: Size::new(80.0, 20.0),
            },
            mart: RoleSizes {
                full: Size::new(150.0, 44.0),
                role: Size::new(120.0, 44.0),
            },
            edge_demo: EdgeDemoConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteStyle {
    /// Closest facing sides: one bend between perpendicular sides, a Z
    /// between offset opposite sides.
    #[default]
    Elbow,
    /// Opposite sides only, always through the channel halfway between them.
    Channel,
}

impl RouteStyle {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "elbow" | "orthogonal" => Some(Self::Elbow),
            "channel" => Some(Self::Channel),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EdgeConfig {
    pub curved: bool,
    pub curve_margin: Option<f32>,
    /// Points sampled per spline segment.
    pub curve_samples: usize,
    pub route_style: RouteStyle,
    pub show_ghostlines: bool,
    pub show_edges: bool,
    pub internal_edges: bool,
}

/// Curve margin used when curves are on and none is configured.
pub const DEFAULT_CURVE_MARGIN: f32 = 0.1;

impl EdgeConfig {
    pub fn effective_curve_margin(&self) -> f32 {
        self.curve_margin.unwrap_or(DEFAULT_CURVE_MARGIN)
    }
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            curved: false,
            curve_margin: None,
            curve_samples: 12,
            route_style: RouteStyle::Elbow,
            show_ghostlines: false,
            show_edges: true,
            internal_edges: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatusConfig {
    pub cascade_on_status_change: bool,
    pub toggle_collapse_on_status_change: bool,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            cascade_on_status_change: true,
            toggle_collapse_on_status_change: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderConfig {
    pub background: String,
    pub show_grid: bool,
    pub grid_size: f32,
    pub padding: f32,
    pub line_color: String,
    pub text_color: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            background: "#FFFFFF".to_string(),
            show_grid: false,
            grid_size: 20.0,
            padding: 20.0,
            line_color: "#555555".to_string(),
            text_color: "#222222".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub layout: LayoutConfig,
    pub edges: EdgeConfig,
    pub status: StatusConfig,
    pub render: RenderConfig,
}

/// The `settings` block of a graph description. Every field is optional and
/// overrides the corresponding [`Config`] value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphSettings {
    pub show_grid: Option<bool>,
    pub show_ghostlines: Option<bool>,
    pub show_edges: Option<bool>,
    pub curved: Option<bool>,
    pub curve_margin: Option<f32>,
    pub node_spacing: Option<SpacingSettings>,
    pub container_margin: Option<MarginSettings>,
    pub orientation: Option<String>,
    pub edge_routing: Option<String>,
    pub internal_edges: Option<bool>,
    pub cascade_on_status_change: Option<bool>,
    pub toggle_collapse_on_status_change: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpacingSettings {
    pub horizontal: Option<f32>,
    pub vertical: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarginSettings {
    pub top: Option<f32>,
    pub right: Option<f32>,
    pub bottom: Option<f32>,
    pub left: Option<f32>,
}

impl Config {
    /// Applies graph-level settings on top of this config.
    pub fn apply_settings(&mut self, settings: &GraphSettings) {
        if let Some(v) = settings.show_grid {
            self.render.show_grid = v;
        }
        if let Some(v) = settings.show_ghostlines {
            self.edges.show_ghostlines = v;
        }
        if let Some(v) = settings.show_edges {
            self.edges.show_edges = v;
        }
        if let Some(v) = settings.curved {
            self.edges.curved = v;
        }
        if let Some(v) = settings.curve_margin {
            self.edges.curve_margin = Some(v);
        }
        if let Some(v) = settings.internal_edges {
            self.edges.internal_edges = v;
        }
        if let Some(spacing) = &settings.node_spacing {
            if let Some(v) = spacing.horizontal {
                self.layout.node_spacing.horizontal = v;
            }
            if let Some(v) = spacing.vertical {
                self.layout.node_spacing.vertical = v;
            }
        }
        if let Some(margin) = &settings.container_margin {
            let target = &mut self.layout.container_margin;
            if let Some(v) = margin.top {
                target.top = v;
            }
            if let Some(v) = margin.right {
                target.right = v;
            }
            if let Some(v) = margin.bottom {
                target.bottom = v;
            }
            if let Some(v) = margin.left {
                target.left = v;
            }
        }
        match settings.orientation.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("horizontal") => self.layout.orientation = FlowOrientation::Horizontal,
            Some("vertical") => self.layout.orientation = FlowOrientation::Vertical,
            Some(other) => tracing::debug!(orientation = other, "ignoring unknown orientation"),
            None => {}
        }
        if let Some(style) = settings.edge_routing.as_deref().and_then(RouteStyle::from_token) {
            self.edges.route_style = style;
        }
        if let Some(v) = settings.cascade_on_status_change {
            self.status.cascade_on_status_change = v;
        }
        if let Some(v) = settings.toggle_collapse_on_status_change {
            self.status.toggle_collapse_on_status_change = v;
        }
    }

    /// Clamps negative distances to zero, reporting each one.
    pub fn validate(&mut self) -> Vec<DiagramError> {
        let mut errors = Vec::new();
        let layout = &mut self.layout;
        let margin = &mut layout.container_margin;
        let demo = &mut layout.edge_demo.spacing;
        let fields: [(&str, &mut f32); 11] = [
            ("containerMargin.top", &mut margin.top),
            ("containerMargin.right", &mut margin.right),
            ("containerMargin.bottom", &mut margin.bottom),
            ("containerMargin.left", &mut margin.left),
            ("nodeSpacing.horizontal", &mut layout.node_spacing.horizontal),
            ("nodeSpacing.vertical", &mut layout.node_spacing.vertical),
            ("headerHeight", &mut layout.header_height),
            ("collapsedWidth", &mut layout.collapsed_width),
            ("collapsedHeight", &mut layout.collapsed_height),
            ("edgeDemo.spacing.horizontal", &mut demo.horizontal),
            ("edgeDemo.spacing.vertical", &mut demo.vertical),
        ];
        for (name, value) in fields {
            if *value < 0.0 {
                errors.push(DiagramError::InvalidSetting {
                    name: name.to_string(),
                    value: *value,
                });
                *value = 0.0;
            }
        }
        if let Some(value) = self.edges.curve_margin.filter(|v| *v < 0.0) {
            errors.push(DiagramError::InvalidSetting {
                name: "curveMargin".to_string(),
                value,
            });
            self.edges.curve_margin = Some(0.0);
        }
        errors
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    layout: Option<LayoutConfig>,
    edges: Option<EdgeConfig>,
    status: Option<StatusConfig>,
    render: Option<RenderConfig>,
    settings: Option<GraphSettings>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = serde_json::from_str(&contents)?;

    if let Some(layout) = parsed.layout {
        config.layout = layout;
    }
    if let Some(edges) = parsed.edges {
        config.edges = edges;
    }
    if let Some(status) = parsed.status {
        config.status = status;
    }
    if let Some(render) = parsed.render {
        config.render = render;
    }
    if let Some(settings) = parsed.settings {
        config.apply_settings(&settings);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dashboard_constants() {
        let config = Config::default();
        assert_eq!(config.layout.container_margin, Margins::uniform(8.0));
        assert_eq!(config.layout.node_spacing.horizontal, 20.0);
        assert_eq!(config.layout.node_spacing.vertical, 10.0);
        assert_eq!(config.layout.mart.role, Size::new(120.0, 44.0));
        assert!(!config.edges.curved);
        assert_eq!(config.edges.effective_curve_margin(), DEFAULT_CURVE_MARGIN);
        assert!(config.status.cascade_on_status_change);
    }

    #[test]
    fn settings_override_config() {
        let mut config = Config::default();
        let settings: GraphSettings = serde_json::from_str(
            r#"{"curved": true, "curveMargin": 0.3, "showGrid": true,
                "nodeSpacing": {"vertical": 4}, "orientation": "horizontal",
                "edgeRouting": "channel"}"#,
        )
        .unwrap();
        config.apply_settings(&settings);
        assert!(config.edges.curved);
        assert_eq!(config.edges.effective_curve_margin(), 0.3);
        assert!(config.render.show_grid);
        assert_eq!(config.layout.node_spacing.vertical, 4.0);
        assert_eq!(config.layout.node_spacing.horizontal, 20.0);
        assert_eq!(config.layout.orientation, FlowOrientation::Horizontal);
        assert_eq!(config.edges.route_style, RouteStyle::Channel);
    }

    #[test]
    fn validate_clamps_negative_values() {
        let mut config = Config::default();
        config.layout.node_spacing.vertical = -5.0;
        config.edges.curve_margin = Some(-1.0);
        let errors = config.validate();
        assert_eq!(errors.len(), 2);
        assert_eq!(config.layout.node_spacing.vertical, 0.0);
        assert_eq!(config.edges.curve_margin, Some(0.0));
    }

    #[test]
    fn load_config_reads_partial_file() {
        let path = std::env::temp_dir().join("flowdash-config-test.json");
        std::fs::write(
            &path,
            r#"{"layout": {"headerHeight": 0, "containerMargin": {"top": 4}},
                "settings": {"curved": true}}"#,
        )
        .unwrap();
        let config = load_config(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.layout.header_height, 0.0);
        assert_eq!(config.layout.container_margin.top, 4.0);
        assert_eq!(config.layout.container_margin.left, 8.0);
        assert_eq!(config.layout.node_spacing.vertical, 10.0);
        assert!(config.edges.curved);
    }
}
