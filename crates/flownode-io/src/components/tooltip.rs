//! Hover overlay for a diagram node.
//!
//! [`NodeTooltip`] shows and hides its node's overlay through an
//! [`OverlayHandle`](flownode_core::OverlayHandle) on hover. The host shares one [`OverlayRegister`]
//! through context; without one, each tooltip gets a private register.

use std::rc::Rc;

use dioxus::prelude::*;
use flownode_core::tooltip::TTF_LABEL;
use flownode_core::{FailureSummary, OverlayRegister, TooltipModel};

/// Props for the [`NodeTooltip`] component.
#[derive(Props, Clone, PartialEq)]
pub struct NodeTooltipProps {
    /// Node id; at most one overlay per register is visible.
    node_id: String,
    /// What the overlay shows.
    content: TooltipModel,
    /// The node content the overlay is anchored to.
    children: Element,
}

/// Wraps node content with a hover overlay.
///
/// Hovering the wrapped content makes this node's overlay the active one.
/// Visibility is derived from the register's active id on every render,
/// so a changed `node_id` takes effect immediately.
#[component]
pub fn NodeTooltip(props: NodeTooltipProps) -> Element {
    let private = use_hook(OverlayRegister::new);
    let register = try_use_context::<OverlayRegister>().unwrap_or(private);

    let active = use_signal(|| register.active());
    // Held for the lifetime of the component; dropping it unsubscribes.
    let _subscription = use_hook({
        let register = register.clone();
        move || {
            Rc::new(register.subscribe(move |id| {
                let mut active = active;
                active.set(id.map(str::to_string));
            }))
        }
    });

    let visible = is_shown(active.read().as_deref(), &props.node_id);
    let enter = register.handle(props.node_id.clone());
    let leave = enter.clone();

    let cursor = if props.content.is_interactive() {
        "pointer"
    } else {
        "default"
    };

    rsx! {
        div {
            class: "node-tooltip-anchor",
            style: "position: relative; width: 100%; height: 100%; cursor: {cursor};",
            onmouseenter: move |_| enter.show(),
            onmouseleave: move |_| leave.hide(),
            {props.children}
            if visible {
                TooltipBody { content: props.content.clone() }
            }
        }
    }
}

fn is_shown(active: Option<&str>, node_id: &str) -> bool {
    active == Some(node_id)
}

#[component]
fn TooltipBody(content: TooltipModel) -> Element {
    match content {
        TooltipModel::Empty => rsx! {},
        TooltipModel::Plain(text) => rsx! {
            div { class: "node-tooltip",
                div { class: "node-tooltip-text",
                    span { "{text}" }
                }
            }
        },
        TooltipModel::FailureModes(FailureSummary {
            title,
            ttf,
            heading,
            items,
        }) => rsx! {
            div { class: "node-tooltip node-tooltip-failures",
                div { class: "node-tooltip-title",
                    span { "{title}" }
                }
                if let Some(ttf) = ttf {
                    div { class: "node-tooltip-row",
                        div { class: "node-tooltip-label", "{TTF_LABEL} :" }
                        div { "{ttf}" }
                    }
                }
                div { class: "node-tooltip-row",
                    div { class: "node-tooltip-label", "{heading} :" }
                    ul {
                        for item in items {
                            li { key: "{item}", "{item}" }
                        }
                    }
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_follows_the_current_node_id() {
        let register = OverlayRegister::new();
        register.handle("pump-1").show();
        let active = register.active();
        assert!(is_shown(active.as_deref(), "pump-1"));
        // The same node after its id changed.
        assert!(!is_shown(active.as_deref(), "pump-2"));

        register.handle("pump-2").show();
        assert!(is_shown(register.active().as_deref(), "pump-2"));
        register.handle("pump-1").hide();
        assert!(is_shown(register.active().as_deref(), "pump-2"));
    }
}
