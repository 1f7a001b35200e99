//! Content of a node's hover overlay.

use serde::Serialize;

use crate::types::NodeData;

/// Label shown before the estimated time to failure.
pub const TTF_LABEL: &str = "Estimated TTF";

/// Title used when a failing node has no tooltip text.
const UNTITLED: &str = "-";

/// What the hover overlay of one node shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TooltipModel {
    /// Nothing to show.
    Empty,
    /// Centered free text.
    Plain(String),
    /// Failure summary.
    FailureModes(FailureSummary),
}

/// Failure summary for a node with active failure modes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureSummary {
    /// Node tooltip text, or `-`.
    pub title: String,
    /// `"N Days"` / `"1 Day"`, when a time to failure is known.
    pub ttf: Option<String>,
    /// `"Failure Mode"` or `"Failure Modes"`.
    pub heading: &'static str,
    /// Numbered entries: `"1. Bearing wear"`.
    pub items: Vec<String>,
}

impl TooltipModel {
    /// Build the overlay content for `data`.
    ///
    /// In developer mode only the free text is shown; failure details are
    /// for operators.
    #[must_use]
    pub fn from_node(data: &NodeData, developer_mode: bool) -> Self {
        if !developer_mode && !data.failure_mode_names.is_empty() {
            return Self::FailureModes(FailureSummary::new(data));
        }
        match data.tooltip_content.as_deref() {
            Some(text) if !text.is_empty() => Self::Plain(text.to_string()),
            _ => Self::Empty,
        }
    }

    /// Whether the node should advertise its overlay with a pointer cursor.
    #[must_use]
    pub const fn is_interactive(&self) -> bool {
        matches!(self, Self::FailureModes(_))
    }
}

impl FailureSummary {
    fn new(data: &NodeData) -> Self {
        let names = &data.failure_mode_names;
        Self {
            title: data
                .tooltip_content
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| UNTITLED.to_string()),
            ttf: data.ttf_days.filter(|d| *d > 0).map(format_days),
            heading: if names.len() > 1 {
                "Failure Modes"
            } else {
                "Failure Mode"
            },
            items: names
                .iter()
                .enumerate()
                .map(|(i, name)| format!("{}. {name}", i + 1))
                .collect(),
        }
    }
}

fn format_days(days: u32) -> String {
    if days > 1 {
        format!("{days} Days")
    } else {
        format!("{days} Day")
    }
}
