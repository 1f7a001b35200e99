//! Shared types for the flownode rendering pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::classify::ClassifierConfig;
use crate::geometry::GeometryConfig;
use crate::theme::Palette;

/// A CSS paint value (`#rrggbb`, `#rgb`, a named color, `rgb(...)`, ...).
///
/// Colors are carried through the pipeline verbatim; the pipeline never
/// parses them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    /// Wrap a paint value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The paint value as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Color {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Color {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Two-color input for the three-stop "sweep" gradient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gradient {
    /// Color at the 0% and 100% stops.
    pub start: Color,
    /// Color at the 50% stop.
    pub end: Color,
}

impl Gradient {
    /// Create a gradient from its two colors.
    #[must_use]
    pub fn new(start: impl Into<Color>, end: impl Into<Color>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

/// Styling parameters for one render of a node.
///
/// `gradient` wins over `fill_color` when both are present. Field names
/// serialize in camelCase so the host's per-node JSON deserializes
/// directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StyleSpec {
    /// Solid fill applied to every filled element (non-special nodes only).
    pub fill_color: Option<Color>,
    /// Stroke override. Also forces the stroke pass on special nodes.
    pub stroke_color: Option<Color>,
    /// Sweep gradient fill; applied even to special nodes.
    pub gradient: Option<Gradient>,
    /// Adds the `highlighted` class to the root element.
    pub highlighted: bool,
    /// Enables the selection stroke treatment (outside developer mode).
    pub selected: bool,
    /// Editor mode: disables selection styling and blinking.
    pub developer_mode: bool,
}

impl StyleSpec {
    /// Whether the selection stroke treatment applies.
    #[must_use]
    pub const fn selection_active(&self) -> bool {
        self.selected && !self.developer_mode
    }

    /// Build a style from the host's node data, view flags and defaults.
    ///
    /// Missing node and stroke colors fall back to `defaults`. A gradient
    /// is only formed when both of its ends are present.
    #[must_use]
    pub fn from_node(data: &NodeData, flags: ViewFlags, defaults: &NodeDefaults) -> Self {
        let gradient = match (&data.gradient_start, &data.gradient_end) {
            (Some(start), Some(end)) => Some(Gradient {
                start: start.clone(),
                end: end.clone(),
            }),
            _ => None,
        };
        Self {
            fill_color: data
                .node_color
                .clone()
                .or_else(|| defaults.node_color.clone()),
            stroke_color: data
                .stroke_color
                .clone()
                .or_else(|| defaults.stroke_color.clone()),
            gradient,
            highlighted: flags.highlighted,
            selected: flags.selected,
            developer_mode: flags.developer_mode,
        }
    }
}

/// View-level flags owned by the embedding view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewFlags {
    /// Node is part of the highlighted set.
    pub highlighted: bool,
    /// Node is selected.
    pub selected: bool,
    /// Editor mode.
    pub developer_mode: bool,
}

/// Host per-node data model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeData {
    /// Requested fill color.
    pub node_color: Option<Color>,
    /// Requested stroke color.
    pub stroke_color: Option<Color>,
    /// First (and last) gradient stop.
    pub gradient_start: Option<Color>,
    /// Middle gradient stop.
    pub gradient_end: Option<Color>,
    /// Free-form tooltip text (node name, tag, ...).
    pub tooltip_content: Option<String>,
    /// Active failure modes, shown as a numbered list in the overlay.
    pub failure_mode_names: Vec<String>,
    /// Estimated time to failure in days.
    pub ttf_days: Option<u32>,
    /// Whether the node should blink (ignored in developer mode).
    pub should_blink: bool,
}

/// Colors used when the node data does not provide its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeDefaults {
    /// Fill color for nodes without a `nodeColor`.
    pub node_color: Option<Color>,
    /// Stroke color for nodes without a `strokeColor`.
    pub stroke_color: Option<Color>,
}

impl NodeDefaults {
    /// Default node fill.
    pub const DEFAULT_NODE_COLOR: &'static str = "#d3d3d3";
    /// Default node stroke.
    pub const DEFAULT_STROKE_COLOR: &'static str = "#000000";

    /// Defaults that leave every color unset.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            node_color: None,
            stroke_color: None,
        }
    }
}

impl Default for NodeDefaults {
    fn default() -> Self {
        Self {
            node_color: Some(Color::from(Self::DEFAULT_NODE_COLOR)),
            stroke_color: Some(Color::from(Self::DEFAULT_STROKE_COLOR)),
        }
    }
}

/// Identity of the node being rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeIdentity {
    /// Unique node id within the diagram.
    pub id: String,
    /// Node type name (`Pump`, `RectangularTank`, ...), if known.
    pub kind: Option<String>,
}

impl NodeIdentity {
    /// Identity with an id only.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: None,
        }
    }

    /// Attach a node type name.
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Id of the synthesized gradient for this node.
    ///
    /// Characters that are not valid in an XML name are replaced with `_`
    /// so the `url(#...)` reference always resolves.
    #[must_use]
    pub fn gradient_id(&self) -> String {
        format!("customGradient-{}", sanitize_id(&self.id))
    }

    /// Id given to the root `<svg>` in gradient mode, if the kind is known.
    #[must_use]
    pub fn root_id(&self) -> Option<String> {
        self.kind
            .as_deref()
            .map(|kind| format!("svg-node-{}", sanitize_id(kind)))
    }
}

fn sanitize_id(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Axis-aligned box in the SVG's user-space units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Horizontal extent.
    pub width: f64,
    /// Vertical extent.
    pub height: f64,
}

impl BoundingBox {
    /// Create a bounding box.
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Grow the box by `padding` on every side.
    #[must_use]
    pub fn padded(self, padding: f64) -> Self {
        Self {
            x: self.x - padding,
            y: self.y - padding,
            width: 2.0f64.mul_add(padding, self.width),
            height: 2.0f64.mul_add(padding, self.height),
        }
    }

    /// Whether every component is finite and the extent is positive.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }

    /// Format as a `viewBox` attribute value.
    #[must_use]
    pub fn to_view_box(&self) -> String {
        format!(
            "{} {} {} {}",
            format_number(self.x),
            format_number(self.y),
            format_number(self.width),
            format_number(self.height),
        )
    }
}

/// Print a user-space number rounded to four decimals, without trailing
/// zeros or a negative zero.
#[must_use]
pub fn format_number(value: f64) -> String {
    let rounded = (value * 10_000.0).round() / 10_000.0 + 0.0;
    format!("{rounded}")
}

/// Complete configuration for the rendering pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Special-node detection thresholds.
    pub classifier: ClassifierConfig,
    /// `viewBox` padding and sizing mode.
    pub geometry: GeometryConfig,
    /// Theme colors and filters.
    pub palette: Palette,
    /// Colors used when node data leaves them unset.
    pub defaults: NodeDefaults,
}

/// Pipeline step, used as context when reporting recovered errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Loading the SVG text from its locator.
    Fetch,
    /// Parsing the SVG text into a tree.
    Parse,
    /// Special-node classification.
    Classify,
    /// Bounding box and `viewBox` rewrite.
    Normalize,
}

impl Stage {
    /// Lowercase stage name for log lines.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Parse => "parse",
            Self::Classify => "classify",
            Self::Normalize => "normalize",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The SVG text could not be turned into a tree.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Malformed XML.
    #[error("malformed SVG markup: {0}")]
    Xml(#[from] roxmltree::Error),

    /// Well-formed XML whose root is not `<svg>`.
    #[error("root element is <{found}>, expected <svg>")]
    NotSvg {
        /// Local name of the actual root element.
        found: String,
    },
}

/// The bounding box of the drawable content could not be measured.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    /// The measuring backend rejected the document.
    #[error("bounding box measurement failed: {0}")]
    Usvg(String),

    /// The document has nothing drawable.
    #[error("document has no drawable content")]
    EmptyContent,

    /// The measured box has no area or is not finite.
    #[error("degenerate bounding box ({width} x {height})")]
    Degenerate {
        /// Measured width.
        width: f64,
        /// Measured height.
        height: f64,
    },
}

/// The SVG source could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// Nothing exists at the locator.
    #[error("no SVG found at locator")]
    NotFound,

    /// The server answered with a non-success status.
    #[error("HTTP status {status}")]
    Http {
        /// Response status code.
        status: u16,
    },

    /// The request never completed.
    #[error("network error: {0}")]
    Network(String),

    /// Local read failure.
    #[error("I/O error: {0}")]
    Io(String),
}

/// A render could not produce markup; the view falls back to the bitmap.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Loading the source failed.
    #[error("failed to load {locator}: {source}")]
    Fetch {
        /// Locator that was requested.
        locator: String,
        /// Underlying load failure.
        #[source]
        source: LoadError,
    },

    /// The loaded text is not a usable SVG document.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl RenderError {
    /// Pipeline step that produced the error.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Fetch { .. } => Stage::Fetch,
            Self::Parse(_) => Stage::Parse,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- StyleSpec tests ---

    #[test]
    fn style_spec_deserializes_camel_case_host_json() {
        let json = r##"{
            "fillColor": "#ff0000",
            "strokeColor": "#00ff00",
            "gradient": { "start": "#111", "end": "#222" },
            "selected": true,
            "developerMode": true
        }"##;
        let style: StyleSpec = serde_json::from_str(json).unwrap();
        assert_eq!(style.fill_color, Some(Color::from("#ff0000")));
        assert_eq!(style.stroke_color, Some(Color::from("#00ff00")));
        assert_eq!(style.gradient, Some(Gradient::new("#111", "#222")));
        assert!(!style.highlighted);
        assert!(style.selected);
        assert!(style.developer_mode);
        assert!(!style.selection_active());
    }

    #[test]
    fn from_node_applies_defaults() {
        let style = StyleSpec::from_node(
            &NodeData::default(),
            ViewFlags::default(),
            &NodeDefaults::default(),
        );
        assert_eq!(style.fill_color, Some(Color::from("#d3d3d3")));
        assert_eq!(style.stroke_color, Some(Color::from("#000000")));
        assert!(style.gradient.is_none());
    }

    #[test]
    fn from_node_prefers_node_colors() {
        let data = NodeData {
            node_color: Some(Color::from("red")),
            stroke_color: Some(Color::from("blue")),
            ..NodeData::default()
        };
        let flags = ViewFlags {
            highlighted: true,
            ..ViewFlags::default()
        };
        let style = StyleSpec::from_node(&data, flags, &NodeDefaults::default());
        assert_eq!(style.fill_color, Some(Color::from("red")));
        assert_eq!(style.stroke_color, Some(Color::from("blue")));
        assert!(style.highlighted);
    }

    #[test]
    fn from_node_requires_both_gradient_ends() {
        let half = NodeData {
            gradient_start: Some(Color::from("#111")),
            ..NodeData::default()
        };
        let style = StyleSpec::from_node(&half, ViewFlags::default(), &NodeDefaults::none());
        assert!(style.gradient.is_none());
        assert!(style.fill_color.is_none());

        let full = NodeData {
            gradient_start: Some(Color::from("#111")),
            gradient_end: Some(Color::from("#222")),
            ..NodeData::default()
        };
        let style = StyleSpec::from_node(&full, ViewFlags::default(), &NodeDefaults::none());
        assert_eq!(style.gradient, Some(Gradient::new("#111", "#222")));
    }

    // --- NodeIdentity tests ---

    #[test]
    fn gradient_id_is_sanitized() {
        let identity = NodeIdentity::new("pump 1/a");
        assert_eq!(identity.gradient_id(), "customGradient-pump_1_a");
    }

    #[test]
    fn root_id_requires_kind() {
        assert_eq!(NodeIdentity::new("n1").root_id(), None);
        assert_eq!(
            NodeIdentity::new("n1").with_kind("Pump").root_id(),
            Some("svg-node-Pump".to_string()),
        );
    }

    // --- BoundingBox tests ---

    #[test]
    fn padded_view_box() {
        let bbox = BoundingBox::new(0.0, 0.0, 24.0, 24.0).padded(0.2);
        assert_eq!(bbox.to_view_box(), "-0.2 -0.2 24.4 24.4");
    }

    #[test]
    fn format_number_trims_float_noise() {
        assert_eq!(format_number(24.0), "24");
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(-0.000_01), "0");
        assert_eq!(format_number(f64::from(0.1f32)), "0.1");
    }

    #[test]
    fn degenerate_boxes_are_not_usable() {
        assert!(BoundingBox::new(0.0, 0.0, 1.0, 1.0).is_usable());
        assert!(!BoundingBox::new(0.0, 0.0, 0.0, 1.0).is_usable());
        assert!(!BoundingBox::new(f64::NAN, 0.0, 1.0, 1.0).is_usable());
    }

    // --- Error tests ---

    #[test]
    fn render_error_stage() {
        let err = RenderError::Fetch {
            locator: "/icons/pump.svg".to_string(),
            source: LoadError::Http { status: 404 },
        };
        assert_eq!(err.stage(), Stage::Fetch);
        assert_eq!(
            err.to_string(),
            "failed to load /icons/pump.svg: HTTP status 404"
        );
    }

    #[test]
    fn stages_name_the_recoverable_steps() {
        let names: Vec<String> = [Stage::Fetch, Stage::Parse, Stage::Classify, Stage::Normalize]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(names, ["fetch", "parse", "classify", "normalize"]);
    }

    #[test]
    fn not_svg_display() {
        let err = ParseError::NotSvg {
            found: "html".to_string(),
        };
        assert_eq!(err.to_string(), "root element is <html>, expected <svg>");
    }

    #[test]
    fn render_config_defaults_from_empty_json() {
        let config: RenderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, RenderConfig::default());
    }
}
