//! Animated pipe edge between two nodes.

use dioxus::prelude::*;
use flownode_core::{EdgeLayer, EdgeStyle};

/// Props for the [`PipeEdge`] component.
#[derive(Props, Clone, PartialEq)]
pub struct PipeEdgeProps {
    /// Edge id from the host model.
    id: String,
    /// Path data routed by the host.
    path: String,
    /// Edge type name (`dotted`, `dottedArrow`, ...).
    #[props(default)]
    kind: Option<String>,
    /// Dash pattern for dotted types; ignored for solid ones.
    #[props(default)]
    dash_array: Option<String>,
    /// `marker-end` reference, e.g. `url(#arrow)`.
    #[props(default)]
    marker_end: Option<String>,
}

/// A pipe edge: the static pipe with the animated flow drawn over it.
#[component]
pub fn PipeEdge(props: PipeEdgeProps) -> Element {
    let edge = EdgeStyle::resolve(props.kind.as_deref(), props.dash_array.as_deref());
    let style = edge.inline_style();

    rsx! {
        for layer in EdgeLayer::ALL {
            path {
                key: "{layer:?}",
                id: "{props.id}",
                class: edge.class(layer),
                style: "{style}",
                d: "{props.path}",
                "marker-end": props.marker_end.clone(),
            }
        }
    }
}
