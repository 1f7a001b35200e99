//! Theme palette consumed by the color applicator.

use serde::{Deserialize, Serialize};

use crate::types::Color;

/// Stroke colors and filters used by the selection treatments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    /// Stroke used by the stroke pass when the style has no stroke color.
    pub default_stroke: Color,
    /// Stroke applied by the pre-selection pass.
    pub preselect_stroke: Color,
    /// CSS filter applied by the pre-selection pass.
    pub preselect_filter: String,
    /// Stroke applied to selected nodes by the stroke pass.
    pub selected_stroke: Color,
    /// CSS filter applied to selected nodes by the stroke pass.
    pub selected_filter: String,
}

impl Palette {
    /// Stroke pass fallback.
    pub const DEFAULT_STROKE: &'static str = "#000000";
    /// Pre-selection blue.
    pub const DEFAULT_PRESELECT_STROKE: &'static str = "#0066ff";
    /// Pre-selection glow.
    pub const DEFAULT_PRESELECT_FILTER: &'static str = "drop-shadow(0 0 1px rgba(0, 102, 255, 0.8))";
    /// Secondary gray used for selected strokes.
    pub const DEFAULT_SELECTED_STROKE: &'static str = "#939598";
    /// Light gray glow for selected strokes.
    pub const DEFAULT_SELECTED_FILTER: &'static str =
        "drop-shadow(0 0 1px rgba(216, 219, 222, 0.8))";
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            default_stroke: Color::from(Self::DEFAULT_STROKE),
            preselect_stroke: Color::from(Self::DEFAULT_PRESELECT_STROKE),
            preselect_filter: Self::DEFAULT_PRESELECT_FILTER.to_string(),
            selected_stroke: Color::from(Self::DEFAULT_SELECTED_STROKE),
            selected_filter: Self::DEFAULT_SELECTED_FILTER.to_string(),
        }
    }
}
