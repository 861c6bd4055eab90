use clap::{Arg, Command};
use secrecy::SecretString;
use std::time::Duration;

pub const ARG_GITHUB_CLIENT_ID: &str = "github-client-id";
pub const ARG_GITHUB_CLIENT_SECRET: &str = "github-client-secret";
pub const ARG_PROVIDER_TIMEOUT: &str = "provider-timeout-seconds";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_GITHUB_CLIENT_ID)
                .long(ARG_GITHUB_CLIENT_ID)
                .help("GitHub OAuth app client id; enables GitHub login")
                .env("REXSL_AUTH_GITHUB_CLIENT_ID")
                .requires(ARG_GITHUB_CLIENT_SECRET),
        )
        .arg(
            Arg::new(ARG_GITHUB_CLIENT_SECRET)
                .long(ARG_GITHUB_CLIENT_SECRET)
                .help("GitHub OAuth app client secret")
                .env("REXSL_AUTH_GITHUB_CLIENT_SECRET")
                .hide_env_values(true)
                .requires(ARG_GITHUB_CLIENT_ID),
        )
        .arg(
            Arg::new(ARG_PROVIDER_TIMEOUT)
                .long(ARG_PROVIDER_TIMEOUT)
                .help("Timeout in seconds for calls to identity providers")
                .env("REXSL_AUTH_PROVIDER_TIMEOUT_SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}

#[derive(Debug)]
pub struct GitHubApp {
    pub client_id: String,
    pub client_secret: SecretString,
}

#[derive(Debug)]
pub struct Options {
    pub github: Option<GitHubApp>,
    pub timeout: Duration,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &clap::ArgMatches) -> Self {
        let client_id = matches.get_one::<String>(ARG_GITHUB_CLIENT_ID).cloned();
        let client_secret = matches.get_one::<String>(ARG_GITHUB_CLIENT_SECRET).cloned();

        let github = match (client_id, client_secret) {
            (Some(client_id), Some(client_secret)) => Some(GitHubApp {
                client_id,
                client_secret: SecretString::from(client_secret),
            }),
            _ => None,
        };

        let timeout = matches
            .get_one::<u64>(ARG_PROVIDER_TIMEOUT)
            .copied()
            .map_or(Duration::from_secs(10), Duration::from_secs);

        Self { github, timeout }
    }
}
