//! Reporting of recovered errors.
//!
//! Nothing in the pipeline propagates a failure to the embedding view;
//! instead every recovered error is handed to an [`ErrorSink`] together
//! with the locator and the [`Stage`] it happened in.

use std::cell::RefCell;
use std::error::Error;

use crate::types::Stage;

/// Receives non-fatal errors.
pub trait ErrorSink {
    /// Record one recovered error.
    fn report(&self, locator: Option<&str>, stage: Stage, error: &dyn Error);
}

/// Forwards reports to the [`log`] facade at `warn` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ErrorSink for LogSink {
    fn report(&self, locator: Option<&str>, stage: Stage, error: &dyn Error) {
        match locator {
            Some(locator) => log::warn!("{stage} failed for {locator}: {error}"),
            None => log::warn!("{stage} failed: {error}"),
        }
    }
}

/// Tags reports that arrive without a locator with a fixed one.
pub struct WithLocator<'a> {
    inner: &'a dyn ErrorSink,
    locator: &'a str,
}

impl<'a> WithLocator<'a> {
    /// Wrap `inner`, defaulting the locator to `locator`.
    #[must_use]
    pub const fn new(inner: &'a dyn ErrorSink, locator: &'a str) -> Self {
        Self { inner, locator }
    }
}

impl ErrorSink for WithLocator<'_> {
    fn report(&self, locator: Option<&str>, stage: Stage, error: &dyn Error) {
        self.inner
            .report(Some(locator.unwrap_or(self.locator)), stage, error);
    }
}

/// One recorded report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Locator of the source being rendered, if known.
    pub locator: Option<String>,
    /// Stage that failed.
    pub stage: Stage,
    /// `Display` text of the error.
    pub message: String,
}

/// Keeps reports in memory; useful for hosts that surface them and for
/// tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    reports: RefCell<Vec<Report>>,
}

impl RecordingSink {
    /// Snapshot of everything reported so far.
    #[must_use]
    pub fn reports(&self) -> Vec<Report> {
        self.reports.borrow().clone()
    }

    /// Whether anything was reported for `stage`.
    #[must_use]
    pub fn has_stage(&self, stage: Stage) -> bool {
        self.reports.borrow().iter().any(|r| r.stage == stage)
    }
}

impl ErrorSink for RecordingSink {
    fn report(&self, locator: Option<&str>, stage: Stage, error: &dyn Error) {
        self.reports.borrow_mut().push(Report {
            locator: locator.map(str::to_string),
            stage,
            message: error.to_string(),
        });
    }
}
