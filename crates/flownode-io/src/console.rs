//! Error reporting to the browser console.

use std::error::Error;

use flownode_core::{ErrorSink, Stage};
use wasm_bindgen::JsValue;

/// [`ErrorSink`] that writes `console.warn` lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl ErrorSink for ConsoleSink {
    fn report(&self, locator: Option<&str>, stage: Stage, error: &dyn Error) {
        let line = format_report(locator, stage, error);
        web_sys::console::warn_1(&JsValue::from_str(&line));
    }
}

fn format_report(locator: Option<&str>, stage: Stage, error: &dyn Error) -> String {
    match locator {
        Some(locator) => format!("[flownode] {stage} failed for {locator}: {error}"),
        None => format!("[flownode] {stage} failed: {error}"),
    }
}
