//! Map validated CLI arguments to the action the binary runs.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, github, ARG_PORT};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or invalid.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let auth_opts = auth::Options::parse(matches)?;
    let github_opts = github::Options::parse(matches);

    Ok(Action::Server(Args {
        port,
        base_url: auth_opts.base_url,
        auth_key: auth_opts.key,
        auth_salt: auth_opts.salt,
        github: github_opts.github,
        provider_timeout: github_opts.timeout,
    }))
}
