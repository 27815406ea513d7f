#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;
pub mod render;
pub mod text_metrics;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, load_config};
pub use dashboard::{Dashboard, Transition};
pub use error::{BuildError, DiagramError, Diagnostics, Severity};
pub use ir::{Diagram, Edge, Node, NodeKind, NodeStatus, Role, role_child_id};
pub use layout::{EdgeLayout, Layout, NodeLayout};
pub use parser::{GraphDescription, NodeDescriptor, build_diagram, parse_graph};
