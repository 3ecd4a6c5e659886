//! Human-readable terminal renderer.

use crate::domain::{AgentStatus, InstallState};
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        if self.ctx.quiet {
            return;
        }
        println!("outpost {version}");
    }

    /// Render the `status` snapshot.
    pub fn render_status(&self, status: &AgentStatus) {
        if self.ctx.quiet {
            return;
        }
        self.ctx.header("Outpost Agent");
        self.ctx.kv("Path", &status.path.display().to_string());
        self.ctx.kv("Service", &status.service);
        self.ctx.kv("State", &self.ctx.state(status.report.state));
        if let Some(flavor) = &status.flavor {
            self.ctx.kv("Flavor", flavor);
        }
        if let Some(url) = &status.fleet_url {
            self.ctx.kv("Fleet", url);
        }
        if let Some(reason) = &status.report.reason {
            self.ctx.warn(reason);
        }
        match status.running {
            Some(true) => self.ctx.success("Agent is running"),
            Some(false) if status.report.state == InstallState::Installed => {
                self.ctx.warn("Agent is not running");
            }
            Some(false) => {}
            None => self.ctx.info("Run as root to check whether the agent is running"),
        }
    }
}
