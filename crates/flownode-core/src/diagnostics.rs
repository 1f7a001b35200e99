//! Pipeline diagnostics: timing and counts for each stage.
//!
//! Collected by [`process_with_diagnostics`](crate::process_with_diagnostics)
//! for tuning the classifier and geometry settings against an icon set.
//! Time comes from an injected [`Clock`] so the core stays free of
//! platform timers.
//!
//! Durations are serialized as fractional seconds (`f64`), since
//! `std::time::Duration` does not implement serde traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::SpecialReason;
use crate::colorize::PaintMode;
use crate::types::BoundingBox;

/// Time source for stage timing.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Text to tree.
    pub parse: StageDiagnostics,
    /// Special-node classification of the raw text.
    pub classify: StageDiagnostics,
    /// `viewBox` rewrite.
    pub normalize: StageDiagnostics,
    /// Fill and stroke rewrite.
    pub colorize: StageDiagnostics,
    /// Tree to text.
    pub serialize: StageDiagnostics,
    /// Wall-clock duration of the whole run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Parsing metrics.
    Parse {
        /// Size of the input text.
        input_bytes: usize,
        /// Elements in the tree, root included.
        element_count: usize,
    },
    /// Classification metrics.
    Classify {
        /// Whether recoloring is suppressed.
        special: bool,
        /// Rule that matched.
        reason: Option<SpecialReason>,
    },
    /// Geometry metrics.
    Normalize {
        /// Box written to `viewBox`.
        view_box: BoundingBox,
        /// Measurement error that triggered the declared-size fallback.
        fallback: Option<String>,
    },
    /// Color metrics.
    Colorize {
        /// Paint mode applied to fills.
        paint: PaintMode,
        /// Elements whose `fill` was rewritten.
        fills_rewritten: usize,
        /// Elements restyled by the stroke pass.
        strokes_rewritten: usize,
    },
    /// Serialization metrics.
    Serialize {
        /// Size of the output markup.
        output_bytes: usize,
    },
}

/// High-level summary of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Size of the input text.
    pub input_bytes: usize,
    /// Size of the output markup.
    pub output_bytes: usize,
    /// Elements in the output tree, root included.
    pub element_count: usize,
    /// Whether the node was classified special.
    pub special: bool,
    /// Whether the declared-size geometry fallback was used.
    pub used_fallback: bool,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Input: {} bytes, {} elements",
            self.summary.input_bytes, self.summary.element_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<12} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(72));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<12} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Special: {}  |  Fallback geometry: {}  |  Output: {} bytes",
            yes_no(self.summary.special),
            yes_no(self.summary.used_fallback),
            self.summary.output_bytes,
        ));

        lines.join("\n")
    }

    /// Stages in execution order, with display names.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, &StageDiagnostics); 5] {
        [
            ("Parse", &self.parse),
            ("Classify", &self.classify),
            ("Normalize", &self.normalize),
            ("Colorize", &self.colorize),
            ("Serialize", &self.serialize),
        ]
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

const fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Parse {
            input_bytes,
            element_count,
        } => format!("{input_bytes} bytes -> {element_count} elements"),
        StageMetrics::Classify { special, reason } => match reason {
            Some(reason) if *special => format!("special ({reason:?})"),
            _ => "ordinary".to_string(),
        },
        StageMetrics::Normalize { view_box, fallback } => match fallback {
            Some(error) => format!("viewBox={} (fallback: {error})", view_box.to_view_box()),
            None => format!("viewBox={}", view_box.to_view_box()),
        },
        StageMetrics::Colorize {
            paint,
            fills_rewritten,
            strokes_rewritten,
        } => format!("{paint:?} fills={fills_rewritten} strokes={strokes_rewritten}"),
        StageMetrics::Serialize { output_bytes } => format!("{output_bytes} bytes"),
    }
}
