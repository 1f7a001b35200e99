//! flownode: normalize a node SVG from the command line.
//!
//! Runs the flownode pipeline (classify, fit the `viewBox`, recolor) on
//! an SVG file and writes the result. Useful for:
//!
//! - Checking how an icon will look inside a diagram node
//! - Finding out why an icon is (or is not) classified special
//! - Tuning padding, sizing and classifier thresholds
//! - Measuring per-stage durations
//!
//! # Usage
//!
//! ```text
//! cargo run --bin flownode -- [OPTIONS] <SVG_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::future::{Future, ready};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use flownode_core::diagnostics::{Clock, PipelineDiagnostics};
use flownode_core::{
    Color, GeometryConfig, LoadError, LogSink, NodeData, NodeIdentity, RenderConfig, SizingMode,
    SourceLoader, StyleSpec, UsvgMeasurer, ViewFlags,
};

/// Normalize a diagram-node SVG and report what the pipeline did.
///
/// Fits the `viewBox` to the drawn content, stretches the graphic to its
/// container and applies node colors, unless the icon's own palette is
/// rich enough to be preserved.
#[derive(Parser)]
#[command(name = "flownode", version)]
struct Cli {
    /// Path to the input SVG.
    svg_path: PathBuf,

    /// Solid fill color (defaults to the configured node color).
    #[arg(long)]
    fill: Option<String>,

    /// Stroke color (defaults to the configured stroke color).
    #[arg(long)]
    stroke: Option<String>,

    /// Gradient color at the 0% and 100% stops.
    #[arg(long, requires = "gradient_end")]
    gradient_start: Option<String>,

    /// Gradient color at the 50% stop.
    #[arg(long, requires = "gradient_start")]
    gradient_end: Option<String>,

    /// Add the `highlighted` class.
    #[arg(long)]
    highlighted: bool,

    /// Apply the selection stroke treatment.
    #[arg(long)]
    selected: bool,

    /// Editor mode (disables selection styling).
    #[arg(long)]
    developer_mode: bool,

    /// Node id, used for the gradient id.
    #[arg(long, default_value = "node")]
    node_id: String,

    /// Node type name, used for the root id in gradient mode.
    #[arg(long)]
    node_kind: Option<String>,

    /// `viewBox` padding in user-space units.
    #[arg(long, default_value_t = GeometryConfig::DEFAULT_PADDING)]
    padding: f64,

    /// How the output fills its container.
    #[arg(long, value_enum, default_value_t = Sizing::Attributes)]
    sizing: Sizing,

    /// Full style as a JSON string (camelCase `StyleSpec`).
    ///
    /// When provided, all color and flag options are ignored.
    #[arg(long)]
    style_json: Option<String>,

    /// Full render config as a JSON string.
    ///
    /// When provided, `--padding` and `--sizing` are ignored. Missing
    /// fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Only classify the input and print the result.
    #[arg(long)]
    classify: bool,

    /// Print diagnostics as JSON on stdout instead of the markup.
    #[arg(long)]
    json: bool,

    /// Print a human-readable diagnostics report on stderr.
    #[arg(long)]
    report: bool,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Write the processed SVG to a file.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Log pipeline decisions (same as `RUST_LOG=debug`).
    #[arg(long, short)]
    verbose: bool,
}

/// Sizing mode selection.
#[derive(Clone, Copy, ValueEnum)]
enum Sizing {
    /// `width="100%" height="100%"` attributes.
    Attributes,
    /// Inline `width: 100%; height: 100%` style, dimensions removed.
    InlineStyle,
}

impl From<Sizing> for SizingMode {
    fn from(sizing: Sizing) -> Self {
        match sizing {
            Sizing::Attributes => Self::Attributes,
            Sizing::InlineStyle => Self::InlineStyle,
        }
    }
}

/// Build a [`RenderConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// geometry flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<RenderConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(RenderConfig {
        geometry: GeometryConfig {
            padding: cli.padding,
            sizing: cli.sizing.into(),
        },
        ..RenderConfig::default()
    })
}

/// Build a [`StyleSpec`] from CLI arguments, filling unset colors from the
/// configured node defaults.
fn style_from_cli(cli: &Cli, config: &RenderConfig) -> Result<StyleSpec, String> {
    if let Some(ref json) = cli.style_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --style-json: {e}"));
    }

    let data = NodeData {
        node_color: cli.fill.as_deref().map(Color::from),
        stroke_color: cli.stroke.as_deref().map(Color::from),
        gradient_start: cli.gradient_start.as_deref().map(Color::from),
        gradient_end: cli.gradient_end.as_deref().map(Color::from),
        ..NodeData::default()
    };
    let flags = ViewFlags {
        highlighted: cli.highlighted,
        selected: cli.selected,
        developer_mode: cli.developer_mode,
    };
    Ok(StyleSpec::from_node(&data, flags, &config.defaults))
}

fn identity_from_cli(cli: &Cli) -> NodeIdentity {
    let identity = NodeIdentity::new(cli.node_id.as_str());
    match cli.node_kind {
        Some(ref kind) => identity.with_kind(kind.as_str()),
        None => identity,
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    let style = match style_from_cli(&cli, &config) {
        Ok(s) => s,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let locator = cli.svg_path.to_string_lossy().into_owned();
    let svg_text = match futures::executor::block_on(FsLoader.load(&locator)) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error loading {locator}: {e}");
            eprintln!("A diagram would show {locator} as a plain image instead.");
            return ExitCode::FAILURE;
        }
    };

    if cli.classify {
        return print_classification(&svg_text, &config);
    }

    let identity = identity_from_cli(&cli);
    log::info!("{locator}: {} bytes, style {style:?}", svg_text.len());

    let measurer = UsvgMeasurer::new();
    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        match flownode_core::process_with_diagnostics(
            &svg_text,
            &style,
            &identity,
            &config,
            &measurer,
            &LogSink,
            &StdClock,
        ) {
            Ok((processed, diagnostics)) => {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                }
                if cli.report {
                    eprintln!("{}", diagnostics.report());
                }

                // Emit markup on the first run only.
                if run == 0 {
                    if let Some(ref path) = cli.output {
                        write_output(path, &processed.markup);
                    } else if !cli.json {
                        println!("{}", processed.markup);
                    }
                }

                all_diagnostics.push(diagnostics);
            }
            Err(e) => {
                eprintln!("Error processing {locator}: {e}");
                eprintln!("A diagram would show {locator} as a plain image instead.");
                return ExitCode::FAILURE;
            }
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

fn print_classification(svg_text: &str, config: &RenderConfig) -> ExitCode {
    match flownode_core::classify(svg_text, &config.classifier) {
        Ok(classification) => {
            match serde_json::to_string_pretty(&classification) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Error serializing classification: {e}");
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Classification error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn write_output(path: &Path, markup: &str) {
    match std::fs::write(path, markup) {
        Ok(()) => eprintln!("SVG written to {} ({} bytes)", path.display(), markup.len()),
        Err(e) => eprintln!("Error writing SVG to {}: {e}", path.display()),
    }
}

/// [`SourceLoader`] reading from the local filesystem.
struct FsLoader;

impl SourceLoader for FsLoader {
    fn load(&self, locator: &str) -> impl Future<Output = Result<String, LoadError>> {
        ready(std::fs::read_to_string(locator).map_err(|e| match e.kind() {
            ErrorKind::NotFound => LoadError::NotFound,
            _ => LoadError::Io(e.to_string()),
        }))
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[PipelineDiagnostics]) {
    eprintln!();
    eprintln!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        eprintln!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    eprintln!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    eprintln!();
    eprintln!("{:<12} {:>12}", "Stage", "Mean (ms)");
    eprintln!("{}", "-".repeat(28));

    let Some(first) = all_diagnostics.first() else {
        return;
    };
    for (index, (name, _)) in first.stages().iter().enumerate() {
        let total: f64 = all_diagnostics
            .iter()
            .map(|d| d.stages()[index].1.duration.as_secs_f64() * 1000.0)
            .sum();
        let stage_mean = total / all_diagnostics.len() as f64;
        eprintln!("{name:<12} {stage_mean:>10.3}ms");
    }
}
