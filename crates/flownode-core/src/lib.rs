//! flownode-core: SVG color and geometry normalization for diagram nodes
//! (sans-IO).
//!
//! Takes the raw SVG of a process-flow node icon plus a small style and
//! produces markup that fills an arbitrary node slot:
//!
//! parse -> classify -> normalize geometry -> colorize -> serialize.
//!
//! This crate has **no I/O dependencies**. Loading sources
//! ([`SourceLoader`]), reporting recovered errors ([`ErrorSink`]), timing
//! ([`diagnostics::Clock`]) and bounding-box measurement
//! ([`MeasureBounds`]) are traits supplied by the host; browser and
//! filesystem implementations live in `flownode-io` and `flownode-cli`.

pub mod classify;
pub mod colorize;
pub mod diagnostics;
pub mod edge;
pub mod geometry;
pub mod overlay;
pub mod pipeline;
pub mod render;
pub mod sink;
pub mod theme;
pub mod tooltip;
pub mod tree;
pub mod types;

pub use classify::{Classification, ClassifierConfig, SpecialReason, classify, is_special};
pub use colorize::{ColorizeSummary, PaintMode, colorize};
pub use edge::{EdgeLayer, EdgeStyle};
pub use geometry::{GeometryConfig, GeometryOutcome, MeasureBounds, SizingMode, UsvgMeasurer, normalize};
pub use overlay::{OverlayHandle, OverlayRegister, Subscription};
pub use pipeline::{Processed, process, process_or_original, process_with_diagnostics};
pub use render::{
    BLINK_CLASS, Completion, NodeContent, NodeRenderer, NodeView, RenderTicket, SourceLoader, Update,
    blink_class,
};
pub use sink::{ErrorSink, LogSink, RecordingSink};
pub use theme::Palette;
pub use tooltip::{FailureSummary, TooltipModel};
pub use tree::SvgDocument;
pub use types::{
    BoundingBox, Color, GeometryError, Gradient, LoadError, NodeData, NodeDefaults, NodeIdentity, ParseError,
    RenderConfig, RenderError, Stage, StyleSpec, ViewFlags,
};
