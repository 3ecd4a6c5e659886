//! Application context: unified state passed to every command handler.
//!
//! Also the operator-facing side of failures: `report_error` decides what a
//! terminal error prints and which exit code it maps to.

use anyhow::Result;

use crate::application::ports::Prompter;
use crate::domain::InstallError;
use crate::infra::logging::MemoryLog;
use crate::output::{HumanRenderer, OutputContext, json};

/// Environment variables that force non-interactive mode.
pub const NON_INTERACTIVE_ENV: &[&str] = &["CI", "OUTPOST_NON_INTERACTIVE"];

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// When `true`, never prompt.
    ///
    /// Set by the `CI` / `OUTPOST_NON_INTERACTIVE` environment variables;
    /// commands add their own `--non-interactive` flag on top.
    pub non_interactive: bool,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    #[must_use]
    pub fn new(flags: &OutputFlags) -> Self {
        let non_interactive = NON_INTERACTIVE_ENV
            .iter()
            .any(|var| std::env::var_os(var).is_some());

        let mode = if flags.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };

        Self {
            output: OutputContext::new(flags.no_color, flags.quiet || flags.json),
            mode,
            non_interactive,
        }
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    #[must_use]
    pub fn renderer(&self) -> HumanRenderer<'_> {
        HumanRenderer::new(&self.output)
    }
}

impl Prompter for AppContext {
    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true`, returns `default` without prompting.
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }

    fn input(&self, prompt: &str) -> Result<String> {
        if self.non_interactive {
            anyhow::bail!("cannot prompt for '{prompt}' in non-interactive mode");
        }
        let answer: String = dialoguer::Input::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?;
        Ok(answer)
    }
}

/// Exit code for a terminal error. A declined confirmation is not a failure.
#[must_use]
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<InstallError>() {
        Some(e) if e.is_cancellation() => 0,
        _ => 1,
    }
}

/// Print a terminal error and return the process exit code.
///
/// Human mode prints the full cause chain, a pointer to `--verbose`, and the
/// in-memory diagnostic log (unless it already went to stderr).
pub fn report_error(err: &anyhow::Error, json_mode: bool, verbose: bool, log: &MemoryLog) -> i32 {
    let code = exit_code(err);
    if json_mode {
        let kind = err
            .downcast_ref::<InstallError>()
            .map_or("error", InstallError::code);
        match json::format_error(&format!("{err:#}"), kind) {
            Ok(obj) => println!("{obj}"),
            Err(_) => eprintln!("Error: {err:#}"),
        }
        return code;
    }

    if code == 0 {
        eprintln!("{err}");
        return code;
    }

    eprintln!("Error: {err:#}");
    if !verbose && !log.is_empty() {
        eprintln!();
        eprintln!("Diagnostic log:");
        eprint!("{}", log.contents());
    }
    eprintln!();
    eprintln!("Re-run with --verbose for live diagnostics.");
    code
}
