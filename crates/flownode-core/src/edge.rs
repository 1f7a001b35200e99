//! Styling of pipe edges between nodes.
//!
//! An edge is drawn as two copies of the same path: a static pipe and an
//! animated flow over it. Dotted edge types get a dash pattern; every
//! other type is drawn solid, even if the host passed a dash pattern.
//! Routing (the path geometry) belongs to the diagram host.

use serde::{Deserialize, Serialize};

/// Dash pattern used when a dotted edge has none of its own.
pub const DEFAULT_DASH: &str = "5,5";

/// Class shared by both paths of an edge.
pub const EDGE_PATH_CLASS: &str = "edge-path";

/// Edge types drawn with a dash pattern.
const DOTTED_KINDS: &[&str] = &["dotted", "dottedArrow"];

/// Which of the two paths of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeLayer {
    /// The static pipe.
    Pipe,
    /// The animated flow drawn over the pipe.
    Flow,
}

impl EdgeLayer {
    /// Both layers in drawing order.
    pub const ALL: [Self; 2] = [Self::Pipe, Self::Flow];

    const fn class(self) -> &'static str {
        match self {
            Self::Pipe => "flowingPipe",
            Self::Flow => "flowingPipeAnimated",
        }
    }
}

/// Resolved presentation of one edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeStyle {
    /// Edge type name from the host model, if any.
    pub kind: Option<String>,
    /// `stroke-dasharray` to apply, if any.
    pub dash_array: Option<String>,
}

impl EdgeStyle {
    /// Resolve the style of an edge of type `kind`.
    ///
    /// `dash_array` is the host's own pattern; it is kept for dotted types
    /// and dropped for all others.
    #[must_use]
    pub fn resolve(kind: Option<&str>, dash_array: Option<&str>) -> Self {
        let dotted = kind.is_some_and(|k| DOTTED_KINDS.contains(&k));
        let dash_array = dotted.then(|| dash_array.unwrap_or(DEFAULT_DASH).to_string());
        Self {
            kind: kind.filter(|k| !k.is_empty()).map(str::to_string),
            dash_array,
        }
    }

    /// Whether the edge is drawn dashed.
    #[must_use]
    pub const fn is_dotted(&self) -> bool {
        self.dash_array.is_some()
    }

    /// `class` attribute of one layer's path.
    #[must_use]
    pub fn class(&self, layer: EdgeLayer) -> String {
        match &self.kind {
            Some(kind) => format!("{EDGE_PATH_CLASS} {} edgeStoke-{kind}", layer.class()),
            None => format!("{EDGE_PATH_CLASS} {}", layer.class()),
        }
    }

    /// Inline `style` declarations for the paths.
    #[must_use]
    pub fn inline_style(&self) -> String {
        self.dash_array
            .as_ref()
            .map_or_else(String::new, |dash| format!("stroke-dasharray: {dash};"))
    }
}
