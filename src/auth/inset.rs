//! Per-request session resolver.
//!
//! Resolution order:
//! 1. Providers, in registration order. The first non-anonymous identity
//!    ends the scan and turns into a `303 See Other` to the same URL without
//!    its query, carrying a fresh session cookie.
//! 2. The session cookie. A value that fails to decrypt is logged and treated
//!    as no session at all.
//! 3. Otherwise the visitor is anonymous.
//!
//! The result is computed at most once per [`AuthInset`], which lives for a
//! single request.

use axum::{
    http::{
        header::{InvalidHeaderValue, LOCATION, SET_COOKIE},
        HeaderMap, HeaderName, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};
use url::Url;

use super::{
    codec::{CookieCipher, EncodeError},
    cookie::{CookieSettings, AUTH_COOKIE},
    identity::Identity,
    page::{Document, Link},
    provider::{ProviderError, Providers},
    request::RequestContext,
};

/// Query parameter that logs the visitor out; its value is ignored.
pub const LOGOUT_FLAG: &str = "rexsl-logout";

/// Response header carrying the URN of the authenticated visitor.
pub const IDENTITY_HEADER: &str = "x-rexsl-identity";

/// Link relation of the logout entry point offered to authenticated visitors.
pub const LOGOUT_REL: &str = "auth-logout";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("failed to encode session cookie")]
    Encode(#[from] EncodeError),
    #[error("invalid header value")]
    Header(#[from] InvalidHeaderValue),
}

/// `303 See Other` with a session cookie attached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Redirect {
    location: Url,
    location_value: HeaderValue,
    cookie: HeaderValue,
}

impl Redirect {
    /// # Errors
    /// Returns an error if `location` is not a valid header value.
    pub fn new(location: Url, cookie: HeaderValue) -> Result<Self, InvalidHeaderValue> {
        let location_value = HeaderValue::from_str(location.as_str())?;
        Ok(Self {
            location,
            location_value,
            cookie,
        })
    }

    #[must_use]
    pub fn location(&self) -> &Url {
        &self.location
    }

    #[must_use]
    pub fn cookie(&self) -> &HeaderValue {
        &self.cookie
    }
}

impl IntoResponse for Redirect {
    fn into_response(self) -> Response {
        (
            StatusCode::SEE_OTHER,
            [(LOCATION, self.location_value), (SET_COOKIE, self.cookie)],
        )
            .into_response()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Identity taken from the session cookie, or anonymous.
    Identity(Identity),
    /// A provider just vouched for `identity`; the visitor must be redirected.
    Login { identity: Identity, redirect: Redirect },
}

impl Resolution {
    #[must_use]
    pub fn identity(&self) -> &Identity {
        match self {
            Self::Identity(identity) | Self::Login { identity, .. } => identity,
        }
    }
}

/// Result of [`AuthInset::contribute`].
#[must_use]
#[derive(Debug)]
pub enum Outcome {
    /// The document and headers were updated; render normally.
    Rendered,
    /// Normal rendering must be abandoned in favour of this redirect.
    Redirect(Redirect),
}

#[derive(Debug)]
pub struct AuthInset {
    request: RequestContext,
    providers: Providers,
    cipher: Arc<CookieCipher>,
    cookies: CookieSettings,
    resolved: Option<Resolution>,
}

impl AuthInset {
    #[must_use]
    pub fn new(
        request: RequestContext,
        providers: Providers,
        cipher: Arc<CookieCipher>,
        cookies: CookieSettings,
    ) -> Self {
        Self {
            request,
            providers,
            cipher,
            cookies,
            resolved: None,
        }
    }

    #[must_use]
    pub fn request(&self) -> &RequestContext {
        &self.request
    }

    /// Resolve the visitor, reusing the first result for the rest of the request.
    ///
    /// # Errors
    /// Returns [`AuthError::Provider`] if a provider could not reach its
    /// backing service. Failures are not cached.
    pub async fn resolve(&mut self) -> Result<Resolution, AuthError> {
        if let Some(resolution) = &self.resolved {
            return Ok(resolution.clone());
        }
        let resolution = self.scan().await?;
        self.resolved = Some(resolution.clone());
        Ok(resolution)
    }

    /// Shorthand for the identity part of [`AuthInset::resolve`].
    ///
    /// # Errors
    /// See [`AuthInset::resolve`].
    pub async fn identity(&mut self) -> Result<Identity, AuthError> {
        Ok(self.resolve().await?.identity().clone())
    }

    /// Add the auth contribution to `document` and the response `headers`.
    ///
    /// Anonymous visitors get every provider's login link. Authenticated
    /// visitors get their identity, a logout link, a refreshed session cookie
    /// and the [`IDENTITY_HEADER`]. A login redirect or the [`LOGOUT_FLAG`]
    /// replaces all of that with [`Outcome::Redirect`].
    ///
    /// # Errors
    /// See [`AuthInset::resolve`]; also fails if the cookie can not be encoded.
    pub async fn contribute<D>(
        &mut self,
        document: &mut D,
        headers: &mut HeaderMap,
    ) -> Result<Outcome, AuthError>
    where
        D: Document + ?Sized,
    {
        let identity = match self.resolve().await? {
            Resolution::Login { redirect, .. } => return Ok(Outcome::Redirect(redirect)),
            Resolution::Identity(identity) => identity,
        };

        if self.request.has_query_param(LOGOUT_FLAG) {
            debug!("logout requested by {}", identity);
            let redirect = Redirect::new(self.request.without_query(), self.cookies.expired()?)?;
            return Ok(Outcome::Redirect(redirect));
        }

        if identity.is_anonymous() {
            for provider in self.providers.iter() {
                document.link(provider.link(&self.request));
            }
            return Ok(Outcome::Rendered);
        }

        document.append_identity(&identity);
        document.link(Link::new(
            LOGOUT_REL,
            self.request.with_query_flag(LOGOUT_FLAG),
        ));
        headers.append(SET_COOKIE, self.session_cookie(&identity)?);
        headers.insert(
            HeaderName::from_static(IDENTITY_HEADER),
            HeaderValue::from_str(identity.urn())?,
        );

        Ok(Outcome::Rendered)
    }

    async fn scan(&self) -> Result<Resolution, AuthError> {
        for provider in self.providers.iter() {
            let identity = provider.identity(&self.request).await.map_err(|err| {
                error!("Provider {} failed: {}", provider.name(), err);
                err
            })?;

            if !identity.is_anonymous() {
                debug!("{} authenticated by {}", identity, provider.name());
                let redirect =
                    Redirect::new(self.request.without_query(), self.session_cookie(&identity)?)?;
                return Ok(Resolution::Login { identity, redirect });
            }
        }

        Ok(Resolution::Identity(self.from_cookie()))
    }

    fn from_cookie(&self) -> Identity {
        let Some(cookie) = self.request.cookie(AUTH_COOKIE) else {
            return Identity::ANONYMOUS;
        };

        match self.cipher.decrypt(cookie) {
            Ok(identity) => identity,
            Err(err) => {
                warn!(
                    cookie,
                    remote_addr = ?self.request.remote_addr(),
                    path = self.request.path(),
                    "Failed to decrypt session cookie: {}",
                    err
                );
                Identity::ANONYMOUS
            }
        }
    }

    fn session_cookie(&self, identity: &Identity) -> Result<HeaderValue, AuthError> {
        let value = self.cipher.encrypt(identity)?;
        Ok(self.cookies.session(&value)?)
    }
}

// Two resolvers are interchangeable when they serve the same request with the
// same key and salt.
impl PartialEq for AuthInset {
    fn eq(&self, other: &Self) -> bool {
        self.request == other.request && *self.cipher == *other.cipher
    }
}
