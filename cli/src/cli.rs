//! CLI argument parsing with clap derive

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use crate::app::{AppContext, OutputFlags};
use crate::commands;

/// Install, enroll and remove the Outpost Agent service
#[derive(Parser)]
#[command(
    name = "outpost",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Stream diagnostics to stderr (repeat for more detail)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Install the agent as a system service
    Install(Box<commands::install::InstallArgs>),

    /// Remove the agent and its service
    Uninstall(commands::uninstall::UninstallArgs),

    /// Enroll the installed agent into Fleet
    Enroll(commands::enroll::EnrollArgs),

    /// Show installation state
    Status(commands::status::StatusArgs),

    /// Show version
    Version,

    /// Run the agent (service entry point)
    #[command(hide = true)]
    Run(commands::run::RunArgs),
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<()> {
        let Cli {
            json,
            quiet,
            no_color,
            verbose: _,
            command,
        } = self;
        let app = AppContext::new(&OutputFlags {
            no_color,
            quiet,
            json,
        });

        match command {
            Command::Install(args) => commands::install::run(&app, *args).await,
            Command::Uninstall(args) => commands::uninstall::run(&app, args).await,
            Command::Enroll(args) => commands::enroll::run(&app, args).await,
            Command::Status(args) => commands::status::run(&app, args).await,
            Command::Version => commands::version::run(&app),
            Command::Run(args) => commands::run::run(args).await,
        }
    }
}
