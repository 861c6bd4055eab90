//! Per-request view consumed by the resolver and its providers.

use axum::http::{header::COOKIE, request::Parts, HeaderMap, Method};
use std::net::SocketAddr;
use url::Url;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestContext {
    method: Method,
    url: Url,
    headers: HeaderMap,
    remote_addr: Option<SocketAddr>,
}

impl RequestContext {
    #[must_use]
    pub fn new(
        method: Method,
        url: Url,
        headers: HeaderMap,
        remote_addr: Option<SocketAddr>,
    ) -> Self {
        Self {
            method,
            url,
            headers,
            remote_addr,
        }
    }

    /// Rebuild the absolute request URL from `base` plus the path and query
    /// the server actually received.
    #[must_use]
    pub fn from_parts(parts: &Parts, base: &Url, remote_addr: Option<SocketAddr>) -> Self {
        let mut url = base.clone();
        url.set_path(parts.uri.path());
        url.set_query(parts.uri.query());
        url.set_fragment(None);
        Self::new(
            parts.method.clone(),
            url,
            parts.headers.clone(),
            remote_addr,
        )
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn path(&self) -> &str {
        self.url.path()
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Value of the first cookie called `name`, across all `Cookie` headers.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|header| header.to_str().ok())
            .flat_map(|value| value.split(';'))
            .find_map(|pair| {
                let (key, val) = pair.trim().split_once('=')?;
                (key.trim() == name).then(|| val.trim())
            })
    }

    #[must_use]
    pub fn has_query_param(&self, name: &str) -> bool {
        self.url.query_pairs().any(|(key, _)| key == name)
    }

    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    /// The request URL with its query and fragment removed.
    #[must_use]
    pub fn without_query(&self) -> Url {
        let mut url = self.url.clone();
        url.set_query(None);
        url.set_fragment(None);
        url
    }

    /// The request URL with `name=true` appended to its query.
    #[must_use]
    pub fn with_query_flag(&self, name: &str) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut().append_pair(name, "true");
        url
    }
}
