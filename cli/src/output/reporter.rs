//! Presentation-layer implementations of `ProgressReporter`.
//!
//! `TerminalReporter` prints one line per event and is safe to use while a
//! child process shares the terminal. `SpinnerReporter` animates the current
//! step and is used where no child process writes to the terminal.

use std::cell::RefCell;

use indicatif::ProgressBar;

use crate::application::ports::ProgressReporter;
use crate::output::{OutputContext, progress};

/// Line-per-event reporter.
///
/// - `step()` prints `"  → {message}"`
/// - `success()` prints `"  ✓ {message}"`
/// - `warn()` prints `"  ⚠ {message}"`
/// - `info()` prints `"  ℹ {message}"`
///
/// All suppressed when `ctx.quiet`.
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
}

impl<'a> TerminalReporter<'a> {
    /// Create a new `TerminalReporter` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        self.ctx.step(message);
    }

    fn success(&self, message: &str) {
        self.ctx.success(message);
    }

    fn warn(&self, message: &str) {
        self.ctx.warn(message);
    }

    fn info(&self, message: &str) {
        self.ctx.info(message);
    }
}

/// Spinner-per-step reporter. Falls back to plain lines without a TTY.
pub struct SpinnerReporter<'a> {
    ctx: &'a OutputContext,
    current: RefCell<Option<(ProgressBar, String)>>,
}

impl<'a> SpinnerReporter<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self {
            ctx,
            current: RefCell::new(None),
        }
    }

    fn finish_current(&self) {
        if let Some((pb, msg)) = self.current.borrow_mut().take() {
            progress::finish_ok(&pb, &msg);
        }
    }

    fn above(&self, print: impl FnOnce()) {
        match self.current.borrow().as_ref() {
            Some((pb, _)) => pb.suspend(print),
            None => print(),
        }
    }
}

impl ProgressReporter for SpinnerReporter<'_> {
    fn step(&self, message: &str) {
        if !self.ctx.show_progress() {
            TerminalReporter::new(self.ctx).step(message);
            return;
        }
        self.finish_current();
        *self.current.borrow_mut() = Some((progress::spinner(message), message.to_string()));
    }

    fn success(&self, message: &str) {
        self.finish_current();
        self.ctx.success(message);
    }

    fn warn(&self, message: &str) {
        self.above(|| self.ctx.warn(message));
    }

    fn info(&self, message: &str) {
        self.above(|| self.ctx.info(message));
    }
}

impl Drop for SpinnerReporter<'_> {
    fn drop(&mut self) {
        if let Some((pb, msg)) = self.current.get_mut().take() {
            progress::finish_error(&pb, &msg);
        }
    }
}
