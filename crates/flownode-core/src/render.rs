//! Per-node render state: fetch, process, and the stale-fetch guard.
//!
//! A [`NodeRenderer`] belongs to one visual node. The host feeds it the
//! current `(locator, style)` with [`NodeRenderer::request`]; a locator
//! change yields a [`RenderTicket`] that the host redeems with
//! [`NodeRenderer::complete`] once the load finishes. Every locator change
//! advances a generation counter, and a ticket from an older generation
//! is discarded on completion, so a slow load for a previous locator can
//! never overwrite the current one.
//!
//! The raw text of the current locator is kept, so style-only changes
//! re-run the pipeline without loading again.

use std::future::Future;
use std::rc::Rc;

use crate::geometry::{MeasureBounds, UsvgMeasurer};
use crate::pipeline::{Processed, process};
use crate::sink::{ErrorSink, WithLocator};
use crate::types::{LoadError, NodeIdentity, RenderConfig, RenderError, StyleSpec};

/// Class toggled on the node container while it blinks.
pub const BLINK_CLASS: &str = "node-blink";

/// Loads raw SVG text by locator.
pub trait SourceLoader {
    /// Load the text at `locator`.
    fn load(&self, locator: &str) -> impl Future<Output = Result<String, LoadError>>;
}

/// Permission to deliver one load result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTicket {
    generation: u64,
    locator: String,
}

impl RenderTicket {
    /// Locator to load.
    #[must_use]
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Generation the ticket was issued for.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// What the host must do after [`NodeRenderer::request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// Nothing changed.
    Unchanged,
    /// The view changed without a load; re-render.
    Restyled,
    /// Load the ticket's locator and pass the result to
    /// [`NodeRenderer::complete`].
    Fetch(RenderTicket),
}

/// Outcome of [`NodeRenderer::complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The result is now the node's content.
    Applied,
    /// The ticket was superseded; the result was dropped.
    Stale,
}

/// What the node container shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeContent<'a> {
    /// A load is in flight (hosts show the fallback image meanwhile).
    Pending,
    /// Processed markup to embed inline.
    Inline(&'a str),
    /// Load or parse failed: show `src` as an image, scaled with
    /// `object-fit: contain`.
    Fallback {
        /// Locator of the source, used directly as the image URL.
        src: &'a str,
        /// Whether the image carries the `highlighted` class.
        highlighted: bool,
    },
}

/// Everything the host needs to draw one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeView<'a> {
    /// Inner content.
    pub content: NodeContent<'a>,
    /// Class of the container element (`node-blink` or empty).
    pub container_class: &'static str,
}

/// Container class for a node: blinking is suppressed in developer mode.
#[must_use]
pub const fn blink_class(should_blink: bool, developer_mode: bool) -> &'static str {
    if should_blink && !developer_mode {
        BLINK_CLASS
    } else {
        ""
    }
}

#[derive(Debug)]
enum State {
    Idle,
    Loading { generation: u64 },
    Loaded { raw: String, output: Option<Processed> },
    Failed,
}

/// Render state of one node.
pub struct NodeRenderer<M = UsvgMeasurer> {
    identity: NodeIdentity,
    config: RenderConfig,
    measurer: M,
    sink: Rc<dyn ErrorSink>,
    locator: Option<String>,
    style: StyleSpec,
    generation: u64,
    state: State,
}

impl<M> std::fmt::Debug for NodeRenderer<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRenderer")
            .field("identity", &self.identity)
            .field("locator", &self.locator)
            .field("generation", &self.generation)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl NodeRenderer<UsvgMeasurer> {
    /// Renderer with the default configuration and measurer.
    #[must_use]
    pub fn new(identity: NodeIdentity, sink: Rc<dyn ErrorSink>) -> Self {
        Self::with_measurer(identity, RenderConfig::default(), UsvgMeasurer::new(), sink)
    }
}

impl<M: MeasureBounds> NodeRenderer<M> {
    /// Renderer with an explicit configuration and measurer.
    #[must_use]
    pub fn with_measurer(
        identity: NodeIdentity,
        config: RenderConfig,
        measurer: M,
        sink: Rc<dyn ErrorSink>,
    ) -> Self {
        Self {
            identity,
            config,
            measurer,
            sink,
            locator: None,
            style: StyleSpec::default(),
            generation: 0,
            state: State::Idle,
        }
    }

    /// The node this renderer draws.
    #[must_use]
    pub const fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    /// Configuration the pipeline runs with.
    #[must_use]
    pub const fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Style of the latest request.
    #[must_use]
    pub const fn style(&self) -> &StyleSpec {
        &self.style
    }

    /// Current generation; advances on every locator change.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a ticket is outstanding.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self.state, State::Loading { .. })
    }

    /// Pipeline output for the current inputs, if any.
    #[must_use]
    pub const fn processed(&self) -> Option<&Processed> {
        match &self.state {
            State::Loaded {
                output: Some(processed),
                ..
            } => Some(processed),
            _ => None,
        }
    }

    /// Feed the current inputs.
    ///
    /// A style change while a load is pending keeps the outstanding
    /// ticket valid; the result is processed with the latest style.
    pub fn request(&mut self, locator: &str, style: StyleSpec) -> Update {
        if self.locator.as_deref() != Some(locator) {
            self.generation += 1;
            self.locator = Some(locator.to_string());
            self.style = style;
            self.state = State::Loading {
                generation: self.generation,
            };
            log::debug!("node {}: loading {locator} (generation {})", self.identity.id, self.generation);
            return Update::Fetch(RenderTicket {
                generation: self.generation,
                locator: locator.to_string(),
            });
        }

        if self.style == style {
            return Update::Unchanged;
        }
        self.style = style;
        self.reprocess()
    }

    /// Rebind the renderer to another node identity.
    ///
    /// Held text is reprocessed so the gradient and root ids follow the
    /// new identity; an outstanding ticket stays valid.
    pub fn set_identity(&mut self, identity: NodeIdentity) -> Update {
        if self.identity == identity {
            return Update::Unchanged;
        }
        self.identity = identity;
        self.reprocess()
    }

    /// Replace the pipeline configuration, reprocessing held text.
    pub fn set_config(&mut self, config: RenderConfig) -> Update {
        if self.config == config {
            return Update::Unchanged;
        }
        self.config = config;
        self.reprocess()
    }

    /// Deliver the result of loading `ticket`'s locator.
    pub fn complete(&mut self, ticket: RenderTicket, result: Result<String, LoadError>) -> Completion {
        let current = matches!(
            self.state,
            State::Loading { generation } if generation == ticket.generation
        );
        if !current {
            log::debug!(
                "node {}: dropping stale load of {} (generation {}, current {})",
                self.identity.id,
                ticket.locator,
                ticket.generation,
                self.generation,
            );
            return Completion::Stale;
        }

        match result {
            Ok(raw) => self.apply_text(raw),
            Err(source) => {
                let error = RenderError::Fetch {
                    locator: ticket.locator.clone(),
                    source,
                };
                self.sink.report(Some(&ticket.locator), error.stage(), &error);
                self.state = State::Failed;
            }
        }
        Completion::Applied
    }

    /// Request, load if needed, and complete, in one call.
    ///
    /// Returns whether the view may have changed.
    #[allow(clippy::future_not_send)]
    pub async fn refresh<L>(&mut self, loader: &L, locator: &str, style: StyleSpec) -> bool
    where
        L: SourceLoader + ?Sized,
    {
        match self.request(locator, style) {
            Update::Unchanged => false,
            Update::Restyled => true,
            Update::Fetch(ticket) => {
                let result = loader.load(ticket.locator()).await;
                self.complete(ticket, result) == Completion::Applied
            }
        }
    }

    /// What to draw.
    #[must_use]
    pub fn view(&self, should_blink: bool) -> NodeView<'_> {
        let content = match (&self.state, self.locator.as_deref()) {
            (
                State::Loaded {
                    output: Some(processed),
                    ..
                },
                _,
            ) => NodeContent::Inline(&processed.markup),
            (State::Loaded { output: None, .. } | State::Failed, Some(src)) => NodeContent::Fallback {
                src,
                highlighted: self.style.highlighted,
            },
            _ => NodeContent::Pending,
        };
        NodeView {
            content,
            container_class: blink_class(should_blink, self.style.developer_mode),
        }
    }

    fn reprocess(&mut self) -> Update {
        let raw = match &self.state {
            State::Loading { .. } => return Update::Unchanged,
            State::Loaded { raw, .. } => Some(raw.clone()),
            State::Idle | State::Failed => None,
        };
        if let Some(raw) = raw {
            self.apply_text(raw);
        }
        Update::Restyled
    }

    fn apply_text(&mut self, raw: String) {
        let locator = self.locator.as_deref().unwrap_or_default();
        let sink = WithLocator::new(self.sink.as_ref(), locator);
        let output = match process(
            &raw,
            &self.style,
            &self.identity,
            &self.config,
            &self.measurer,
            &sink,
        ) {
            Ok(processed) => Some(processed),
            Err(e) => {
                sink.report(None, e.stage(), &e);
                None
            }
        };
        self.state = State::Loaded { raw, output };
    }
}
