//! Fill and stroke rewriting.
//!
//! All passes walk the root's descendants; the root's own paint attributes
//! are inherited defaults and stay as authored. Only elements that carry a
//! `fill` (or `stroke`) attribute are touched, and a value of `none` is a
//! real paint value that is never replaced.
//!
//! Pass order is fixed:
//!
//! 1. highlight class on the root;
//! 2. pre-selection stroke (selected, outside developer mode);
//! 3. paint: gradient sweep, or solid fill for ordinary nodes;
//! 4. stroke pass (ordinary nodes, or any node with a stroke override),
//!    ending with the selected-stroke override.
//!
//! The pre-selection pass runs before the stroke pass and is mostly
//! overwritten by it; the filter it sets survives on special nodes that
//! skip the stroke pass.

use serde::{Deserialize, Serialize};

use crate::theme::Palette;
use crate::tree::{Element, Node, SvgDocument};
use crate::types::{Color, Gradient, NodeIdentity, StyleSpec};

/// Class token added to the root of highlighted nodes.
pub const HIGHLIGHT_CLASS: &str = "highlighted";

/// Stroke width written by the stroke pass.
const STROKE_WIDTH: &str = "2";

/// Stroke width written by both selection treatments.
const SELECTED_STROKE_WIDTH: &str = "1px";

/// Which paint mode [`colorize`] used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaintMode {
    /// Fills were left as authored.
    #[default]
    Untouched,
    /// Fills reference the synthesized gradient.
    Gradient,
    /// Fills were replaced with a solid color.
    Solid,
}

/// What [`colorize`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorizeSummary {
    /// Paint mode applied to fills.
    pub paint: PaintMode,
    /// Elements whose `fill` was rewritten.
    pub fills_rewritten: usize,
    /// Elements restyled by the pre-selection pass.
    pub preselected: usize,
    /// Elements restyled by the stroke pass.
    pub strokes_rewritten: usize,
    /// Id of the synthesized gradient, in gradient mode.
    pub gradient_id: Option<String>,
}

/// Apply `style` to `doc` in place.
///
/// `is_special` must come from the classifier run on the raw text: it
/// suppresses solid fills and, without a stroke override, the stroke
/// pass. Gradients are applied regardless.
pub fn colorize(
    doc: &mut SvgDocument,
    style: &StyleSpec,
    is_special: bool,
    identity: &NodeIdentity,
    palette: &Palette,
) -> ColorizeSummary {
    let mut summary = ColorizeSummary::default();
    let root = doc.root_mut();

    if style.highlighted {
        root.add_class(HIGHLIGHT_CLASS);
    }

    if style.selection_active() {
        summary.preselected = for_each_stroked(root, |el| {
            el.set_attr("stroke-width", SELECTED_STROKE_WIDTH);
            el.set_attr("stroke", palette.preselect_stroke.as_str());
            el.set_style_property("filter", &palette.preselect_filter);
        });
    }

    if let Some(gradient) = &style.gradient {
        let gradient_id = identity.gradient_id();
        if let Some(root_id) = identity.root_id() {
            root.set_attr("id", root_id);
        }
        root.insert(0, Node::Element(gradient_defs(&gradient_id, gradient)));
        let paint = format!("url(#{gradient_id})");
        summary.fills_rewritten = for_each_filled(root, |el| el.set_attr("fill", paint.as_str()));
        summary.paint = PaintMode::Gradient;
        summary.gradient_id = Some(gradient_id);
    } else if let Some(fill) = style.fill_color.as_ref().filter(|_| !is_special) {
        summary.fills_rewritten = for_each_filled(root, |el| el.set_attr("fill", fill.as_str()));
        summary.paint = PaintMode::Solid;
    }

    if !is_special || style.stroke_color.is_some() {
        let stroke: &Color = style
            .stroke_color
            .as_ref()
            .unwrap_or(&palette.default_stroke);
        let selected = style.selection_active();
        summary.strokes_rewritten = for_each_stroked(root, |el| {
            el.set_attr("stroke", stroke.as_str());
            el.set_attr("stroke-width", STROKE_WIDTH);
            el.set_attr("vector-effect", "non-scaling-stroke");
            if selected {
                el.set_attr("stroke-width", SELECTED_STROKE_WIDTH);
                el.set_attr("stroke", palette.selected_stroke.as_str());
                el.set_style_property("filter", &palette.selected_filter);
            }
        });
    }

    log::debug!(
        "colorized {}: {:?}, {} fills, {} strokes",
        identity.id,
        summary.paint,
        summary.fills_rewritten,
        summary.strokes_rewritten,
    );
    summary
}

/// `<defs>` holding the three-stop sweep: `start` at 0% and 100%, `end`
/// at 50%, running top to bottom.
fn gradient_defs(id: &str, gradient: &Gradient) -> Element {
    let stop = |offset: &str, color: &Color| {
        Element::new("stop")
            .with_attr("offset", offset)
            .with_attr("stop-color", color.as_str())
    };
    let linear = Element::new("linearGradient")
        .with_attr("id", id)
        .with_attr("x1", "0%")
        .with_attr("y1", "0%")
        .with_attr("x2", "0%")
        .with_attr("y2", "100%")
        .with_child(stop("0%", &gradient.start))
        .with_child(stop("50%", &gradient.end))
        .with_child(stop("100%", &gradient.start));
    Element::new("defs").with_child(linear)
}

fn is_painted(el: &Element, attribute: &str) -> bool {
    el.attr(attribute).is_some_and(|value| value.trim() != "none")
}

fn for_each_filled(root: &mut Element, mut f: impl FnMut(&mut Element)) -> usize {
    for_each_painted(root, "fill", &mut f)
}

fn for_each_stroked(root: &mut Element, mut f: impl FnMut(&mut Element)) -> usize {
    for_each_painted(root, "stroke", &mut f)
}

fn for_each_painted(root: &mut Element, attribute: &str, f: &mut impl FnMut(&mut Element)) -> usize {
    let mut count = 0;
    root.for_each_descendant_mut(&mut |el| {
        if is_painted(el, attribute) {
            f(el);
            count += 1;
        }
    });
    count
}
