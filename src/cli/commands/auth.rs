use anyhow::{anyhow, Context, Result};
use clap::{Arg, Command};
use secrecy::SecretString;
use url::Url;

pub const ARG_BASE_URL: &str = "base-url";
pub const ARG_AUTH_KEY: &str = "auth-key";
pub const ARG_AUTH_SALT: &str = "auth-salt";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_BASE_URL)
                .long(ARG_BASE_URL)
                .help("Public base URL of the site, used to build absolute redirects")
                .long_help(
                    "Public base URL of the site. Redirect and link targets are built from it, the session cookie is scoped to its path and marked Secure when it is https.",
                )
                .env("REXSL_AUTH_BASE_URL")
                .default_value("http://localhost:8080"),
        )
        .arg(
            Arg::new(ARG_AUTH_KEY)
                .long(ARG_AUTH_KEY)
                .help("Secret key sealing the session cookie")
                .env("REXSL_AUTH_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_AUTH_SALT)
                .long(ARG_AUTH_SALT)
                .help("Salt mixed into the session cookie key; changing it logs everyone out")
                .env("REXSL_AUTH_SALT")
                .required(true),
        )
}

#[derive(Debug)]
pub struct Options {
    pub base_url: Url,
    pub key: SecretString,
    pub salt: String,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing or the base URL is invalid.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let base_url = matches
            .get_one::<String>(ARG_BASE_URL)
            .context("missing required argument: --base-url")?;
        let base_url =
            Url::parse(base_url).with_context(|| format!("Invalid base URL: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("Invalid base URL: {base_url}"));
        }

        let key = matches
            .get_one::<String>(ARG_AUTH_KEY)
            .cloned()
            .context("missing required argument: --auth-key")?;
        let salt = matches
            .get_one::<String>(ARG_AUTH_SALT)
            .cloned()
            .context("missing required argument: --auth-salt")?;

        Ok(Self {
            base_url,
            key: SecretString::from(key),
            salt,
        })
    }
}
