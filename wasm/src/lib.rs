use flowdash_layout::layout_dump::layout_to_json;
use flowdash_layout::render::render_svg;
use flowdash_layout::{Config, Dashboard};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LayoutOptions {
    font_family: Option<String>,
    font_size: Option<f32>,
    /// Return a preview SVG instead of the layout JSON.
    svg: Option<bool>,
    collapse: Vec<String>,
    expand: Vec<String>,
}

fn build_config(options: &LayoutOptions) -> Config {
    let mut config = Config::default();
    if let Some(font_family) = &options.font_family {
        config.layout.font_family = font_family.clone();
    }
    if let Some(font_size) = options.font_size {
        config.layout.font_size = font_size;
    }
    // No system fonts in the browser.
    config.layout.fast_text_metrics = true;
    config
}

fn layout_with_options(input: &str, options: &LayoutOptions) -> Result<String, String> {
    let mut dashboard = Dashboard::from_json(input, build_config(options)).map_err(|e| e.to_string())?;
    for id in &options.collapse {
        dashboard.collapse(id).map_err(|e| e.to_string())?;
    }
    for id in &options.expand {
        dashboard.expand(id).map_err(|e| e.to_string())?;
    }
    let layout = dashboard.layout();
    if options.svg.unwrap_or(false) {
        return Ok(render_svg(&layout, dashboard.config()));
    }
    layout_to_json(&layout).map_err(|e| e.to_string())
}

/// Lays out a graph description and returns the layout JSON (or SVG when
/// `options_json` sets `"svg": true`).
#[wasm_bindgen]
pub fn layout_graph(input: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = if let Some(raw_options) = options_json {
        serde_json::from_str::<LayoutOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?
    } else {
        LayoutOptions::default()
    };
    layout_with_options(input, &options).map_err(|error| JsValue::from_str(&error))
}

#[cfg(test)]
mod tests {
    use crate::{LayoutOptions, layout_with_options};

    const GRAPH: &str = r#"{"nodes":[
        {"id":"lane","type":"lane","children":[{"id":"a","type":"node"},{"id":"b","type":"node"}]}
    ],"edges":[{"source":"a","target":"b"}]}"#;

    #[test]
    fn returns_layout_json_by_default() {
        let json = layout_with_options(GRAPH, &LayoutOptions::default()).unwrap();
        assert!(json.contains("\"globalX\""));
        assert!(json.contains("a--default--b"));
    }

    #[test]
    fn svg_and_collapse_options() {
        let options: LayoutOptions =
            serde_json::from_str(r#"{"svg":true,"collapse":["lane"]}"#).unwrap();
        let svg = layout_with_options(GRAPH, &options).unwrap();
        assert!(svg.starts_with("<svg"));
    }
}
