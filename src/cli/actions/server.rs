use crate::{
    api,
    auth::{AuthState, CookieCipher, OAuth2Config, OAuth2Provider, Providers},
    cli::commands::github::GitHubApp,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub base_url: Url,
    pub auth_key: SecretString,
    pub auth_salt: String,
    pub github: Option<GitHubApp>,
    pub provider_timeout: Duration,
}

/// Execute the server action.
/// # Errors
/// Returns an error if a provider can not be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Server args: {:?}", args);

    let state = state(
        args.base_url,
        args.auth_key,
        args.auth_salt,
        args.github,
        args.provider_timeout,
    )?;

    api::new(args.port, Arc::new(state)).await
}

/// Assemble the provider chain and cookie cipher.
///
/// # Errors
/// Returns an error if a provider HTTP client can not be built.
pub fn state(
    base_url: Url,
    auth_key: SecretString,
    auth_salt: String,
    github: Option<GitHubApp>,
    provider_timeout: Duration,
) -> Result<AuthState> {
    let mut providers = Providers::builder();

    if let Some(app) = github {
        let config = OAuth2Config::github(app.client_id, app.client_secret)
            .context("Invalid GitHub endpoints")?
            .with_timeout(provider_timeout);
        info!(
            "{} login enabled, timeout {:?}",
            config.name(),
            config.timeout()
        );
        let provider =
            OAuth2Provider::new(config).context("Failed to build GitHub HTTP client")?;
        providers = providers.with(provider);
    }

    let cipher = CookieCipher::new(auth_key, auth_salt);

    Ok(AuthState::new(providers.build(), cipher, base_url))
}
