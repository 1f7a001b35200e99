//! The full text-to-text pipeline: parse, classify, normalize, colorize,
//! serialize.
//!
//! Only a parse failure stops a run. Classification fails open and a
//! geometry failure falls back to the declared size; both are reported to
//! the [`ErrorSink`] and the run continues.

use std::time::Duration;

use crate::classify::{Classification, classify};
use crate::colorize::{ColorizeSummary, colorize};
use crate::diagnostics::{Clock, PipelineDiagnostics, PipelineSummary, StageDiagnostics, StageMetrics};
use crate::geometry::{GeometryOutcome, MeasureBounds, normalize};
use crate::sink::ErrorSink;
use crate::tree::SvgDocument;
use crate::types::{NodeIdentity, RenderConfig, RenderError, Stage, StyleSpec};

/// Output of one successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct Processed {
    /// Serialized, transformed markup.
    pub markup: String,
    /// Classification of the raw input text.
    pub classification: Classification,
    /// What the geometry normalizer wrote.
    pub geometry: GeometryOutcome,
    /// What the color applicator changed.
    pub colorize: ColorizeSummary,
}

/// Run the pipeline on raw SVG text.
///
/// # Errors
///
/// Returns [`RenderError::Parse`] when the text is not an SVG document.
/// Every other failure is recovered and reported to `sink`.
pub fn process<M>(
    svg_text: &str,
    style: &StyleSpec,
    identity: &NodeIdentity,
    config: &RenderConfig,
    measurer: &M,
    sink: &dyn ErrorSink,
) -> Result<Processed, RenderError>
where
    M: MeasureBounds + ?Sized,
{
    run(svg_text, style, identity, config, measurer, sink, &FrozenClock).map(|(processed, _)| processed)
}

/// String-in, string-out variant of [`process`]: on any error the error
/// is reported and the input text is returned unchanged.
#[must_use]
pub fn process_or_original<M>(
    svg_text: &str,
    style: &StyleSpec,
    identity: &NodeIdentity,
    config: &RenderConfig,
    measurer: &M,
    sink: &dyn ErrorSink,
) -> String
where
    M: MeasureBounds + ?Sized,
{
    match process(svg_text, style, identity, config, measurer, sink) {
        Ok(processed) => processed.markup,
        Err(e) => {
            sink.report(None, e.stage(), &e);
            svg_text.to_string()
        }
    }
}

/// [`process`] with per-stage timing and counts.
///
/// # Errors
///
/// Same as [`process`].
pub fn process_with_diagnostics<M, C>(
    svg_text: &str,
    style: &StyleSpec,
    identity: &NodeIdentity,
    config: &RenderConfig,
    measurer: &M,
    sink: &dyn ErrorSink,
    clock: &C,
) -> Result<(Processed, PipelineDiagnostics), RenderError>
where
    M: MeasureBounds + ?Sized,
    C: Clock,
{
    run(svg_text, style, identity, config, measurer, sink, clock)
}

/// A clock that never advances, for runs nobody is timing.
struct FrozenClock;

impl Clock for FrozenClock {
    type Instant = ();

    fn now(&self) {}

    fn elapsed(&self, _since: &()) -> Duration {
        Duration::ZERO
    }
}

fn element_count(doc: &SvgDocument) -> usize {
    1 + doc.root().descendants().count()
}

#[allow(clippy::too_many_lines)]
fn run<M, C>(
    svg_text: &str,
    style: &StyleSpec,
    identity: &NodeIdentity,
    config: &RenderConfig,
    measurer: &M,
    sink: &dyn ErrorSink,
    clock: &C,
) -> Result<(Processed, PipelineDiagnostics), RenderError>
where
    M: MeasureBounds + ?Sized,
    C: Clock,
{
    let total_start = clock.now();

    // --- Parse ---
    let start = clock.now();
    let mut doc = SvgDocument::parse(svg_text)?;
    let parse = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Parse {
            input_bytes: svg_text.len(),
            element_count: element_count(&doc),
        },
    };

    // --- Classify (raw text, fail open) ---
    let start = clock.now();
    let classification = classify(svg_text, &config.classifier).unwrap_or_else(|e| {
        sink.report(None, Stage::Classify, &e);
        Classification::default()
    });
    let classify_stage = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Classify {
            special: classification.special,
            reason: classification.reason.clone(),
        },
    };

    // --- Normalize ---
    let start = clock.now();
    let geometry = normalize(&mut doc, &config.geometry, measurer);
    if let Some(e) = &geometry.fallback {
        sink.report(None, Stage::Normalize, e);
    }
    let normalize_stage = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Normalize {
            view_box: geometry.view_box,
            fallback: geometry.fallback.as_ref().map(ToString::to_string),
        },
    };

    // --- Colorize ---
    let start = clock.now();
    let summary = colorize(
        &mut doc,
        style,
        classification.special,
        identity,
        &config.palette,
    );
    let colorize_stage = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Colorize {
            paint: summary.paint,
            fills_rewritten: summary.fills_rewritten,
            strokes_rewritten: summary.strokes_rewritten,
        },
    };

    // --- Serialize ---
    let start = clock.now();
    let markup = doc.to_markup();
    let serialize = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Serialize {
            output_bytes: markup.len(),
        },
    };

    let diagnostics = PipelineDiagnostics {
        parse,
        classify: classify_stage,
        normalize: normalize_stage,
        colorize: colorize_stage,
        serialize,
        total_duration: clock.elapsed(&total_start),
        summary: PipelineSummary {
            input_bytes: svg_text.len(),
            output_bytes: markup.len(),
            element_count: element_count(&doc),
            special: classification.special,
            used_fallback: geometry.used_fallback(),
        },
    };

    log::debug!(
        "processed node {}: special={}, fallback={}",
        identity.id,
        classification.special,
        geometry.used_fallback(),
    );

    Ok((
        Processed {
            markup,
            classification,
            geometry,
            colorize: summary,
        },
        diagnostics,
    ))
}
