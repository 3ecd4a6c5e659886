//! Terminal and JSON output.
//!
//! Application services never print; they report through
//! `ProgressReporter`, implemented here.

pub mod human;
pub mod json;
pub mod progress;
pub mod reporter;
pub mod styles;

use console::Term;
use owo_colors::OwoColorize as _;

use crate::domain::InstallState;

pub use human::HumanRenderer;
pub use reporter::{SpinnerReporter, TerminalReporter};
pub use styles::Styles;

/// Width of the key column in `kv` rows.
const KEY_WIDTH: usize = 8;

/// Styling and terminal state shared by every printer.
///
/// Status lines go to stdout; spinners draw on stderr, so progress is shown
/// only when stderr is a terminal.
pub struct OutputContext {
    pub styles: Styles,
    pub is_tty: bool,
    /// Suppress everything but errors (`--quiet`, and always under `--json`).
    pub quiet: bool,
}

impl OutputContext {
    /// Create output context based on CLI flags and environment.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stderr().is_term();
        let use_colors =
            !no_color && Term::stdout().is_term() && std::env::var_os("NO_COLOR").is_none();

        let mut styles = Styles::default();
        if use_colors {
            styles.colorize();
        }

        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    fn line(&self, marker: &str, style: owo_colors::Style, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", marker.style(style));
        }
    }

    /// `→ msg`, one transaction step.
    pub fn step(&self, msg: &str) {
        self.line("→", self.styles.step, msg);
    }

    pub fn success(&self, msg: &str) {
        self.line("✓", self.styles.success, msg);
    }

    pub fn warn(&self, msg: &str) {
        self.line("⚠", self.styles.warning, msg);
    }

    pub fn info(&self, msg: &str) {
        self.line("ℹ", self.styles.info, msg);
    }

    pub fn header(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.style(self.styles.header));
        }
    }

    /// `key:` padded to a common width, then `value`.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            let key = format!("{key}:");
            println!("  {}  {value}", format!("{key:<KEY_WIDTH$}").style(self.styles.dim));
        }
    }

    /// An install state in its color.
    #[must_use]
    pub fn state(&self, state: InstallState) -> String {
        state.to_string().style(self.styles.state(state)).to_string()
    }
}
