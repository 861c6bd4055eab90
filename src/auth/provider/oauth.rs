//! OAuth2 authorization-code provider.
//!
//! Flow:
//! - Anonymous visitors are offered a link to the authorize endpoint with
//!   `redirect_uri` set to the current page.
//! - The service redirects back with a transient `code` query parameter.
//! - The code is exchanged at the token endpoint and the profile endpoint is
//!   read with the resulting access token.
//!
//! A rejected or expired code means "no credentials" and yields the anonymous
//! identity. Only an unreachable or failing service is an error.

use async_trait::async_trait;
use reqwest::{
    header::{ACCEPT, AUTHORIZATION},
    Client, StatusCode,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{Provider, ProviderError};
use crate::auth::{identity::Identity, page::Link, request::RequestContext};

/// Query parameter carrying the authorization code on the callback.
pub const CODE_PARAM: &str = "code";

const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

#[derive(Clone, Debug)]
pub struct OAuth2Config {
    name: String,
    client_id: String,
    client_secret: SecretString,
    authorize_url: Url,
    token_url: Url,
    profile_url: Url,
    scope: Option<String>,
    id_field: String,
    name_field: String,
    photo_field: String,
    timeout: Duration,
}

impl OAuth2Config {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
        authorize_url: Url,
        token_url: Url,
        profile_url: Url,
    ) -> Self {
        Self {
            name: name.into(),
            client_id: client_id.into(),
            client_secret,
            authorize_url,
            token_url,
            profile_url,
            scope: None,
            id_field: "id".to_string(),
            name_field: "name".to_string(),
            photo_field: "picture".to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        }
    }

    /// GitHub OAuth app endpoints and profile fields.
    ///
    /// # Errors
    /// Returns an error if the built-in endpoint URLs fail to parse.
    pub fn github(
        client_id: impl Into<String>,
        client_secret: SecretString,
    ) -> Result<Self, url::ParseError> {
        Ok(Self::new(
            "github",
            client_id,
            client_secret,
            Url::parse("https://github.com/login/oauth/authorize")?,
            Url::parse("https://github.com/login/oauth/access_token")?,
            Url::parse("https://api.github.com/user")?,
        )
        .with_scope("read:user")
        .with_photo_field("avatar_url"))
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    #[must_use]
    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    #[must_use]
    pub fn with_name_field(mut self, field: impl Into<String>) -> Self {
        self.name_field = field.into();
        self
    }

    #[must_use]
    pub fn with_photo_field(mut self, field: impl Into<String>) -> Self {
        self.photo_field = field.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[derive(Debug)]
pub struct OAuth2Provider {
    config: OAuth2Config,
    client: Client,
}

impl OAuth2Provider {
    /// # Errors
    /// Returns an error if the HTTP client can not be built.
    pub fn new(config: OAuth2Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(config.timeout())
            .build()?;
        Ok(Self { config, client })
    }

    fn transport(&self, err: reqwest::Error) -> ProviderError {
        ProviderError::Transport {
            provider: self.config.name.clone(),
            source: Box::new(err),
        }
    }

    fn protocol(&self, message: impl Into<String>) -> ProviderError {
        ProviderError::Protocol {
            provider: self.config.name.clone(),
            message: message.into(),
        }
    }

    /// Exchange the code; `Ok(None)` when the service rejected it.
    async fn access_token(
        &self,
        code: &str,
        redirect_uri: &Url,
    ) -> Result<Option<String>, ProviderError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret()),
            ("code", code),
            ("redirect_uri", redirect_uri.as_str()),
        ];

        let response = self
            .client
            .post(self.config.token_url.as_str())
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| self.transport(e))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(self.protocol(format!("token endpoint returned {status}")));
        }
        if !status.is_success() {
            warn!("{} rejected authorization code: {}", self.config.name, status);
            return Ok(None);
        }

        let json_response: Value = response.json().await.map_err(|e| self.transport(e))?;

        if let Some(token) = json_response["access_token"].as_str() {
            return Ok(Some(token.to_string()));
        }

        warn!(
            "{} rejected authorization code: {}",
            self.config.name,
            json_response["error"].as_str().unwrap_or("no access_token")
        );
        Ok(None)
    }

    async fn profile(&self, token: &str) -> Result<Identity, ProviderError> {
        let response = self
            .client
            .get(self.config.profile_url.as_str())
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await
            .map_err(|e| self.transport(e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!("{} rejected access token", self.config.name);
            return Ok(Identity::ANONYMOUS);
        }
        if !status.is_success() {
            return Err(self.protocol(format!("profile endpoint returned {status}")));
        }

        let json_response: Value = response.json().await.map_err(|e| self.transport(e))?;

        let id = match &json_response[self.config.id_field.as_str()] {
            Value::String(id) if !id.is_empty() => id.clone(),
            Value::Number(id) => id.to_string(),
            _ => {
                return Err(self.protocol(format!(
                    "profile has no '{}' field",
                    self.config.id_field
                )))
            }
        };
        let name = json_response[self.config.name_field.as_str()]
            .as_str()
            .unwrap_or_default();
        let photo = json_response[self.config.photo_field.as_str()]
            .as_str()
            .unwrap_or_default();

        Identity::new(format!("urn:{}:{id}", self.config.name), name, photo)
            .map_err(|e| self.protocol(e.to_string()))
    }
}

#[async_trait]
impl Provider for OAuth2Provider {
    fn name(&self) -> &str {
        &self.config.name
    }

    #[instrument(skip(self, request), fields(provider = %self.config.name))]
    async fn identity(&self, request: &RequestContext) -> Result<Identity, ProviderError> {
        let Some(code) = request.query_param(CODE_PARAM) else {
            return Ok(Identity::ANONYMOUS);
        };

        let redirect_uri = request.without_query();
        let Some(token) = self.access_token(&code, &redirect_uri).await? else {
            return Ok(Identity::ANONYMOUS);
        };

        let identity = self.profile(&token).await?;
        debug!("{} resolved {}", self.config.name, identity);
        Ok(identity)
    }

    fn link(&self, request: &RequestContext) -> Link {
        let mut href = self.config.authorize_url.clone();
        {
            let mut query = href.query_pairs_mut();
            query
                .append_pair("client_id", &self.config.client_id)
                .append_pair("redirect_uri", request.without_query().as_str());
            if let Some(scope) = &self.config.scope {
                query.append_pair("scope", scope);
            }
        }
        Link::new(format!("auth-{}", self.config.name), href)
    }
}
