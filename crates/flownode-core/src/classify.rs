//! Special-node classification.
//!
//! Some icons carry hand-authored shading (symmetric gradients, masks,
//! rich palettes) that automatic recoloring would visually break. The
//! classifier inspects the **raw** SVG text, before any pass has touched
//! it, and decides whether solid fill recoloring must be suppressed.
//!
//! Rules are evaluated in order and short-circuit on the first match:
//!
//! 1. a `linearGradient`/`radialGradient` whose first and last stop colors
//!    are equal (case-insensitive) with at least
//!    [`ClassifierConfig::min_gradient_stops`] resolvable stops;
//! 2. any element carrying a `mask` attribute, or any `<mask>` element;
//! 3. at least [`ClassifierConfig::min_distinct_fills`] distinct `fill`
//!    values, ignoring `none` and `url(...)` references.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::sink::ErrorSink;
use crate::tree::{parse_xml, style_property};
use crate::types::{ParseError, Stage};

/// Tunable thresholds for the special-node heuristics.
///
/// The defaults were tuned against the production icon set; they are
/// configuration, not invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Minimum number of stops (and resolvable stop colors) for the
    /// symmetric-gradient rule.
    pub min_gradient_stops: usize,
    /// Minimum number of distinct fill colors for the color-richness rule.
    pub min_distinct_fills: usize,
}

impl ClassifierConfig {
    /// Default for [`min_gradient_stops`](Self::min_gradient_stops).
    pub const DEFAULT_MIN_GRADIENT_STOPS: usize = 3;
    /// Default for [`min_distinct_fills`](Self::min_distinct_fills).
    pub const DEFAULT_MIN_DISTINCT_FILLS: usize = 4;
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_gradient_stops: Self::DEFAULT_MIN_GRADIENT_STOPS,
            min_distinct_fills: Self::DEFAULT_MIN_DISTINCT_FILLS,
        }
    }
}

/// Which rule marked a document as special.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecialReason {
    /// A gradient starts and ends on the same color.
    SymmetricGradient {
        /// The gradient's `id`, if it has one.
        id: Option<String>,
    },
    /// The document uses masking.
    Mask,
    /// The document paints with many distinct fill colors.
    ColorRichness {
        /// Number of distinct fills found.
        distinct: usize,
    },
}

/// Outcome of classifying one SVG source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Classification {
    /// Whether solid fill recoloring is suppressed.
    pub special: bool,
    /// Rule that matched, when `special` is set.
    pub reason: Option<SpecialReason>,
}

impl Classification {
    const fn ordinary() -> Self {
        Self {
            special: false,
            reason: None,
        }
    }

    const fn special(reason: SpecialReason) -> Self {
        Self {
            special: true,
            reason: Some(reason),
        }
    }
}

/// Classify raw SVG text.
///
/// # Errors
///
/// Returns [`ParseError::Xml`] if the text is not well-formed XML.
pub fn classify(svg_text: &str, config: &ClassifierConfig) -> Result<Classification, ParseError> {
    let doc = parse_xml(svg_text)?;
    let root = doc.root_element();

    if let Some(reason) = symmetric_gradient(root, config.min_gradient_stops) {
        return Ok(Classification::special(reason));
    }

    if uses_mask(root) {
        return Ok(Classification::special(SpecialReason::Mask));
    }

    let distinct = distinct_fills(root);
    if distinct >= config.min_distinct_fills {
        return Ok(Classification::special(SpecialReason::ColorRichness {
            distinct,
        }));
    }

    Ok(Classification::ordinary())
}

/// Fail-open variant of [`classify`].
///
/// Parse errors are reported to `sink` and yield `false`, so a broken
/// analysis never blocks recoloring.
#[must_use]
pub fn is_special(svg_text: &str, config: &ClassifierConfig, sink: &dyn ErrorSink) -> bool {
    match classify(svg_text, config) {
        Ok(classification) => classification.special,
        Err(e) => {
            sink.report(None, Stage::Classify, &e);
            false
        }
    }
}

fn is_gradient(node: roxmltree::Node<'_, '_>) -> bool {
    node.is_element()
        && matches!(
            node.tag_name().name(),
            "linearGradient" | "radialGradient"
        )
}

fn stop_color<'a>(stop: roxmltree::Node<'a, '_>) -> Option<&'a str> {
    let color = match stop.attribute("stop-color") {
        Some(color) if !color.is_empty() => Some(color.trim()),
        _ => stop
            .attribute("style")
            .and_then(|style| style_property(style, "stop-color")),
    };
    color.filter(|color| !color.is_empty())
}

fn symmetric_gradient(root: roxmltree::Node<'_, '_>, min_stops: usize) -> Option<SpecialReason> {
    root.descendants().filter(|n| is_gradient(*n)).find_map(|gradient| {
        let stops: Vec<_> = gradient
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "stop")
            .collect();
        if stops.len() < min_stops {
            return None;
        }
        let colors: Vec<&str> = stops.iter().filter_map(|stop| stop_color(*stop)).collect();
        if colors.len() < min_stops {
            return None;
        }
        let first = colors.first()?.to_uppercase();
        let last = colors.last()?.to_uppercase();
        (first == last).then(|| SpecialReason::SymmetricGradient {
            id: gradient.attribute("id").map(str::to_string),
        })
    })
}

fn uses_mask(root: roxmltree::Node<'_, '_>) -> bool {
    root.descendants().any(|n| {
        n.is_element() && (n.has_attribute("mask") || n.tag_name().name() == "mask")
    })
}

fn distinct_fills(root: roxmltree::Node<'_, '_>) -> usize {
    root.descendants()
        .skip(1)
        .filter(|n| n.is_element())
        .filter_map(|n| n.attribute("fill"))
        .filter(|fill| *fill != "none" && !fill.starts_with("url("))
        .map(|fill| fill.trim().to_uppercase())
        .filter(|fill| !fill.is_empty() && fill != "NONE")
        .collect::<HashSet<_>>()
        .len()
}
