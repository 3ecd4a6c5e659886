//! Enrollment planning: decide before anything is mutated whether the
//! install ends with an `enroll` hand-off, collecting missing values from
//! the operator when the run is interactive.

use anyhow::Result;

use crate::application::ports::Prompter;
use crate::domain::enrollment::validate_protocol;
use crate::domain::{EnrollPlan, InstallError, InstallRequest};

pub const ENROLL_PROMPT: &str = "Do you want to enroll this Agent into Fleet?";
pub const URL_PROMPT: &str = "URL you want to enroll this Agent into:";
pub const TOKEN_PROMPT: &str = "Fleet enrollment token:";

/// Decide what the install does about enrollment.
///
/// Rules, first match wins:
/// 1. `--delay-enroll`: delayed.
/// 2. `--fleet-server-es` set: enroll (bootstrap a fleet server).
/// 3. `--url` and `--enrollment-token` both set: enroll.
/// 4. `--force`: standalone.
/// 5. non-interactive: a missing `--url` / `--enrollment-token` is an error.
/// 6. interactive: ask whether to enroll, then prompt for missing values.
///
/// # Errors
///
/// `InstallError::Validation` for missing or malformed values,
/// `InstallError::ConfirmationDeclined` when a prompted value is left empty,
/// `InstallError::Prompt` when the terminal cannot be read.
pub fn plan_enrollment(req: &InstallRequest, prompter: &impl Prompter) -> Result<EnrollPlan> {
    let flags = &req.enrollment;
    if flags.delay_enroll {
        return Ok(EnrollPlan::Delayed);
    }
    if flags.fleet_server_es().is_some() {
        return Ok(EnrollPlan::Enroll {
            args: flags.to_args(flags.url(), flags.token()),
        });
    }
    if flags.url().is_some() && flags.token().is_some() {
        return Ok(EnrollPlan::Enroll {
            args: flags.to_args(flags.url(), flags.token()),
        });
    }
    if req.force {
        tracing::info!("no enrollment arguments with --force, installing standalone");
        return Ok(EnrollPlan::Standalone);
    }

    if !req.non_interactive {
        let enroll = prompter
            .confirm(ENROLL_PROMPT, true)
            .map_err(InstallError::Prompt)?;
        if !enroll {
            return Ok(EnrollPlan::Standalone);
        }
    }

    let url = match flags.url() {
        Some(url) => url.to_string(),
        None if req.non_interactive => {
            return Err(InstallError::validation(
                "missing required --url argument used to enroll the agent",
            )
            .into());
        }
        None => {
            let answer = ask(prompter, URL_PROMPT)?;
            if answer.is_empty() {
                return Err(InstallError::declined(
                    "enrollment cancelled because no URL was provided",
                )
                .into());
            }
            validate_protocol("--url", &answer)?;
            answer
        }
    };

    let token = match flags.token() {
        Some(token) => token.to_string(),
        None if req.non_interactive => {
            return Err(InstallError::validation(
                "missing required --enrollment-token argument used to enroll the agent",
            )
            .into());
        }
        None => {
            let answer = ask(prompter, TOKEN_PROMPT)?;
            if answer.is_empty() {
                return Err(InstallError::declined(
                    "enrollment cancelled because no enrollment token was provided",
                )
                .into());
            }
            answer
        }
    };

    Ok(EnrollPlan::Enroll {
        args: flags.to_args(Some(&url), Some(&token)),
    })
}

fn ask(prompter: &impl Prompter, prompt: &str) -> Result<String, InstallError> {
    prompter
        .input(prompt)
        .map(|answer| answer.trim().to_string())
        .map_err(InstallError::Prompt)
}
