//! Outpost CLI - install, enroll and remove the Outpost Agent service

use clap::Parser;

use outpost_cli::app::report_error;
use outpost_cli::cli::Cli;
use outpost_cli::infra::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let log = logging::init(cli.verbose);
    let json = cli.json;
    let verbose = cli.verbose > 0;

    if let Err(e) = cli.run().await {
        let code = report_error(&e, json, verbose, &log);
        std::process::exit(code);
    }
}
