//! Stylesheet for terminal output, built on owo-colors.

use owo_colors::Style;

use crate::domain::InstallState;

/// Colors for progress lines and install states. Plain until `colorize`.
#[derive(Default, Clone)]
pub struct Styles {
    pub success: Style,
    pub warning: Style,
    pub error: Style,
    pub info: Style,
    /// The `→` marker in front of transaction steps.
    pub step: Style,
    pub dim: Style,
    pub header: Style,
}

impl Styles {
    pub fn colorize(&mut self) {
        self.success = Style::new().green();
        self.warning = Style::new().yellow();
        self.error = Style::new().red();
        self.info = Style::new().blue();
        self.step = Style::new().cyan();
        self.dim = Style::new().dimmed();
        self.header = Style::new().bold().cyan();
    }

    /// Healthy installs read as success, broken ones as errors.
    #[must_use]
    pub fn state(&self, state: InstallState) -> Style {
        match state {
            InstallState::Installed | InstallState::PackageInstall => self.success,
            InstallState::Broken => self.error,
            InstallState::NotInstalled => self.dim,
        }
    }
}
