//! Dioxus UI components for flownode.
//!
//! Provides the diagram node renderer, its hover overlay and the pipe
//! edges between nodes.

mod pipe_edge;
mod svg_node;
mod tooltip;

pub use pipe_edge::PipeEdge;
pub use svg_node::SvgNode;
pub use tooltip::NodeTooltip;
