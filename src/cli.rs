use crate::config::load_config;
use crate::dashboard::Dashboard;
use crate::error::Severity;
use crate::layout_dump::write_layout_dump;
use crate::parser::parse_graph;
use crate::render::{render_svg, write_output_svg};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "flowdash",
    version,
    about = "Lay out flow-dashboard graphs: nested containers and routed edges"
)]
pub struct Args {
    /// Graph description (.json / .json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for JSON and SVG.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "json")]
    pub output_format: OutputFormat,

    /// Config JSON file (layout constants and/or graph settings)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Collapse this container before laying out (repeatable)
    #[arg(long = "collapse", value_name = "ID")]
    pub collapse: Vec<String>,

    /// Expand this container before laying out (repeatable)
    #[arg(long = "expand", value_name = "ID")]
    pub expand: Vec<String>,

    /// Route edges as curves
    #[arg(long = "curved")]
    pub curved: bool,

    /// Fail when any error-severity diagnostic was recorded
    #[arg(long = "strict")]
    pub strict: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Svg,
    Png,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    let input = read_input(args.input.as_deref())?;
    let mut description = parse_graph(&input)?;
    if args.curved {
        description.settings.curved = Some(true);
    }
    let mut dashboard = Dashboard::new(&description, config)?;
    for id in &args.collapse {
        dashboard.collapse(id)?;
    }
    for id in &args.expand {
        dashboard.expand(id)?;
    }

    let layout = dashboard.layout();
    let diagnostics = &layout.diagnostics;
    for diagnostic in diagnostics {
        eprintln!("{}: {}", severity_label(diagnostic.severity()), diagnostic);
    }
    if args.strict {
        let errors = diagnostics
            .iter()
            .filter(|d| d.severity() == Severity::Error)
            .count();
        if errors > 0 {
            return Err(anyhow::anyhow!(
                "{} error diagnostic(s) with --strict",
                errors
            ));
        }
    }

    match args.output_format {
        OutputFormat::Json => write_layout_dump(args.output.as_deref(), &layout)?,
        OutputFormat::Svg => {
            let svg = render_svg(&layout, dashboard.config());
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            write_png(&layout, dashboard.config(), &output)?;
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
fn write_png(layout: &crate::layout::Layout, config: &crate::config::Config, output: &Path) -> Result<()> {
    let svg = render_svg(layout, config);
    crate::render::write_output_png(&svg, output, config)
}

#[cfg(not(feature = "png"))]
fn write_png(_: &crate::layout::Layout, _: &crate::config::Config, _: &Path) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Warning => "warning",
        Severity::Error => "error",
    }
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!(
        "Output path required for {} output",
        ext
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeatable_flags() {
        let args = Args::parse_from([
            "flowdash", "-i", "graph.json", "-e", "svg", "--collapse", "a", "--collapse", "b",
            "--expand", "c", "--curved", "--strict",
        ]);
        assert_eq!(args.input.as_deref(), Some(Path::new("graph.json")));
        assert_eq!(args.output_format, OutputFormat::Svg);
        assert_eq!(args.collapse, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(args.expand, vec!["c".to_string()]);
        assert!(args.curved && args.strict);
    }

    #[test]
    fn json_is_the_default_format() {
        let args = Args::parse_from(["flowdash"]);
        assert_eq!(args.output_format, OutputFormat::Json);
        assert!(args.input.is_none());
    }

    #[test]
    fn png_needs_an_output_path() {
        let err = ensure_output(&None, "png").unwrap_err();
        assert_eq!(err.to_string(), "Output path required for png output");
    }
}
