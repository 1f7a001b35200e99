//! Diagram node that renders a recolored, container-filling SVG.

use std::cell::RefCell;
use std::rc::Rc;

use dioxus::prelude::*;
use flownode_core::{
    Completion, ErrorSink, NodeContent, NodeData, NodeIdentity, NodeRenderer, RenderConfig, SourceLoader,
    StyleSpec, TooltipModel, Update, UsvgMeasurer, ViewFlags,
};

use super::tooltip::NodeTooltip;
use crate::console::ConsoleSink;
use crate::fetch::FetchLoader;

/// Props for the [`SvgNode`] component.
#[derive(Props, Clone, PartialEq)]
pub struct SvgNodeProps {
    /// Unique node id within the diagram.
    id: String,
    /// Per-node data from the host model.
    data: NodeData,
    /// Node type name, used for the root id in gradient mode.
    #[props(default)]
    node_type: Option<String>,
    /// URL of the node's SVG.
    svg_path: String,
    /// Pipeline configuration, including the colors used when `data`
    /// leaves them unset. Falls back to a `RenderConfig` provided as
    /// context, then to the defaults.
    #[props(default)]
    config: Option<RenderConfig>,
    /// Node is in the highlighted set.
    #[props(default)]
    highlighted: bool,
    /// Node is selected.
    #[props(default)]
    selected: bool,
    /// Editor mode: plain tooltip, no selection styling, no blinking.
    #[props(default = true)]
    developer_mode: bool,
    /// Connection handles drawn over the node.
    children: Element,
}

/// A diagram node.
///
/// Loads `svg_path`, fits it to the node and applies the node colors.
/// Until the load finishes, or if it fails, the SVG is shown as a plain
/// `<img>` instead. Outside developer mode the node is wrapped in a
/// [`NodeTooltip`] with the failure summary.
///
/// Shared settings come from context when present: a [`RenderConfig`]
/// (unless the `config` prop is set) and a [`UsvgMeasurer`] built with
/// [`UsvgMeasurer::with_fontdb`].
#[component]
pub fn SvgNode(props: SvgNodeProps) -> Element {
    let SvgNodeProps {
        id,
        data,
        node_type,
        svg_path,
        config,
        highlighted,
        selected,
        developer_mode,
        children,
    } = props;

    let shared = try_use_context::<RenderConfig>();
    let config = config.or(shared).unwrap_or_default();
    let identity = NodeIdentity {
        id: id.clone(),
        kind: node_type,
    };

    // Hosts provide a measurer with bundled fonts so text labels count
    // toward the fitted box; the browser has no system font database.
    let measurer = try_use_context::<UsvgMeasurer>();

    let renderer = use_hook({
        let identity = identity.clone();
        let config = config.clone();
        move || {
            let sink: Rc<dyn ErrorSink> = Rc::new(ConsoleSink);
            Rc::new(RefCell::new(NodeRenderer::with_measurer(
                identity,
                config,
                measurer.unwrap_or_default(),
                sink,
            )))
        }
    });
    // Bumped when a load completes so the node re-renders.
    let mut revision = use_signal(|| 0_u64);
    let _ = revision();

    let flags = ViewFlags {
        highlighted,
        selected,
        developer_mode,
    };
    let style = StyleSpec::from_node(&data, flags, &config.defaults);

    // Unchanged inputs yield `Update::Unchanged`, so this runs on every
    // render. Identity and config changes reprocess held text in place;
    // this render already shows the result.
    let update = {
        let mut renderer = renderer.borrow_mut();
        renderer.set_identity(identity);
        renderer.set_config(config);
        renderer.request(&svg_path, style)
    };
    if let Update::Fetch(ticket) = update {
        let renderer = Rc::clone(&renderer);
        spawn(async move {
            let result = FetchLoader.load(ticket.locator()).await;
            if renderer.borrow_mut().complete(ticket, result) == Completion::Applied {
                *revision.write() += 1;
            }
        });
    }

    let (markup, img_highlighted, container_class) = {
        let renderer = renderer.borrow();
        let view = renderer.view(data.should_blink);
        match view.content {
            NodeContent::Inline(markup) => (Some(markup.to_string()), false, view.container_class),
            NodeContent::Fallback { highlighted, .. } => (None, highlighted, view.container_class),
            NodeContent::Pending => (None, highlighted, view.container_class),
        }
    };
    let title = if developer_mode {
        data.tooltip_content.clone()
    } else {
        None
    };

    let body = rsx! {
        SvgContent {
            id: id.clone(),
            markup,
            svg_path,
            highlighted: img_highlighted,
            container_class,
            title,
            {children}
        }
    };

    if developer_mode {
        return body;
    }

    let content = TooltipModel::from_node(&data, false);
    rsx! {
        NodeTooltip { node_id: id, content, {body} }
    }
}

#[component]
fn SvgContent(
    id: String,
    #[props(!optional)] markup: Option<String>,
    svg_path: String,
    highlighted: bool,
    container_class: &'static str,
    #[props(!optional)] title: Option<String>,
    children: Element,
) -> Element {
    rsx! {
        div {
            "data-tooltip-id": "tooltip-{id}",
            class: "{container_class}",
            title: title.unwrap_or_default(),
            style: "position: relative; width: 100%; flex: 1; min-height: 0; display: flex; flex-direction: column;",
            if let Some(markup) = markup {
                div {
                    style: "width: 100%; flex: 1; min-height: 0; pointer-events: none;",
                    dangerous_inner_html: "{markup}",
                }
            } else {
                img {
                    src: "{svg_path}",
                    alt: "Node",
                    class: if highlighted { "highlighted" } else { "" },
                    style: "width: 100%; flex: 1; min-height: 0; object-fit: contain;",
                }
            }
            {children}
        }
    }
}
