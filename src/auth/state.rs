use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use std::{net::SocketAddr, sync::Arc};
use tracing::error;
use url::Url;

use super::{
    codec::CookieCipher, cookie::CookieSettings, inset::AuthInset, provider::Providers,
    request::RequestContext,
};

/// Process-wide auth configuration, shared by every request.
#[derive(Debug)]
pub struct AuthState {
    providers: Providers,
    cipher: Arc<CookieCipher>,
    cookies: CookieSettings,
    base_url: Url,
}

impl AuthState {
    #[must_use]
    pub fn new(providers: Providers, cipher: CookieCipher, base_url: Url) -> Self {
        Self {
            providers,
            cipher: Arc::new(cipher),
            cookies: CookieSettings::from_base_url(&base_url),
            base_url,
        }
    }

    #[must_use]
    pub fn providers(&self) -> &Providers {
        &self.providers
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn cookies(&self) -> &CookieSettings {
        &self.cookies
    }

    /// Fresh resolver for one request.
    #[must_use]
    pub fn inset(&self, request: RequestContext) -> AuthInset {
        AuthInset::new(
            request,
            self.providers.clone(),
            Arc::clone(&self.cipher),
            self.cookies.clone(),
        )
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthInset
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(auth) = parts.extensions.get::<Arc<AuthState>>().cloned() else {
            error!("AuthState extension is missing from the router");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"));
        };

        let remote_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        let request = RequestContext::from_parts(parts, auth.base_url(), remote_addr);

        Ok(auth.inset(request))
    }
}
