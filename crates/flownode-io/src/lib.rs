//! flownode-io: Browser I/O and Dioxus components.
//!
//! Loads node SVGs with `window.fetch`, reports recovered errors to the
//! browser console, and provides the [`SvgNode`], [`NodeTooltip`] and
//! [`PipeEdge`] components that wire `flownode-core` into a Dioxus view.

pub mod components;
pub mod console;
pub mod fetch;

pub use components::{NodeTooltip, PipeEdge, SvgNode};
pub use console::ConsoleSink;
pub use fetch::FetchLoader;
