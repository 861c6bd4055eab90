#![allow(clippy::unwrap_used)]

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{COOKIE, LOCATION, SET_COOKIE},
        Request, StatusCode,
    },
    response::Response,
    Router,
};
use rexsl_auth::{
    api,
    auth::{
        AuthState, CookieCipher, Identity, Link, Provider, ProviderError, Providers,
        RequestContext, AUTH_COOKIE, IDENTITY_HEADER,
    },
};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const BASE_URL: &str = "http://localhost:8080/";

/// Vouches for `urn:test:<name>` when the request carries `?user=<name>`.
struct QueryProvider;

#[async_trait]
impl Provider for QueryProvider {
    fn name(&self) -> &str {
        "query"
    }

    async fn identity(&self, request: &RequestContext) -> Result<Identity, ProviderError> {
        let Some(user) = request.query_param("user") else {
            return Ok(Identity::ANONYMOUS);
        };
        Identity::new(format!("urn:test:{user}"), user, "").map_err(|err| {
            ProviderError::Protocol {
                provider: "query".to_string(),
                message: err.to_string(),
            }
        })
    }

    fn link(&self, request: &RequestContext) -> Link {
        let mut href = request.without_query();
        href.set_query(Some("user=guest"));
        Link::new("auth-query", href)
    }
}

/// Always fails, as if its backing service were down.
struct Unreachable;

#[async_trait]
impl Provider for Unreachable {
    fn name(&self) -> &str {
        "unreachable"
    }

    async fn identity(&self, _request: &RequestContext) -> Result<Identity, ProviderError> {
        Err(ProviderError::Transport {
            provider: "unreachable".to_string(),
            source: Box::new(std::io::Error::other("connection refused")),
        })
    }

    fn link(&self, request: &RequestContext) -> Link {
        Link::new("auth-unreachable", request.without_query())
    }
}

fn cipher() -> CookieCipher {
    CookieCipher::new(SecretString::from("K".to_string()), "S")
}

fn app(providers: Providers) -> Router {
    let state = AuthState::new(providers, cipher(), url::Url::parse(BASE_URL).unwrap());
    api::router(Arc::new(state))
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut request = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(COOKIE, format!("{AUTH_COOKIE}={cookie}"));
    }
    request.body(Body::empty()).unwrap()
}

async fn json_body(response: Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn set_cookie(response: &Response) -> &str {
    response.headers().get(SET_COOKIE).unwrap().to_str().unwrap()
}

fn cookie_value(set_cookie: &str) -> &str {
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix("Rexsl-Auth="))
        .unwrap()
}

#[tokio::test]
async fn session_cookie_identifies_visitor() -> Result<()> {
    let jane = Identity::new("urn:test:1", "Jane", "")?;
    let cookie = cipher().encrypt(&jane)?;

    let response = app(Providers::default())
        .oneshot(get("/", Some(&cookie)))
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(IDENTITY_HEADER).unwrap(), "urn:test:1");
    assert!(response.headers().get("x-request-id").is_some());
    let refreshed = cookie_value(set_cookie(&response)).to_string();
    assert_eq!(cipher().decrypt(&refreshed)?, jane);

    let page = json_body(response).await;
    assert_eq!(
        page["identity"],
        json!({"urn": "urn:test:1", "name": "Jane", "photo": ""})
    );
    assert_eq!(
        page["links"],
        json!([{"rel": "auth-logout", "href": "http://localhost:8080/?rexsl-logout=true"}])
    );
    Ok(())
}

#[tokio::test]
async fn provider_login_redirects_without_query() -> Result<()> {
    let providers = Providers::builder().with(QueryProvider).build();

    let response = app(providers)
        .oneshot(get("/?user=bob&x=1", None))
        .await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(LOCATION).unwrap(),
        "http://localhost:8080/"
    );
    let cookie = set_cookie(&response);
    assert!(cookie.contains("HttpOnly"));
    assert!(!cookie.contains("Max-Age"));
    assert_eq!(cipher().decrypt(cookie_value(cookie))?.urn(), "urn:test:bob");
    Ok(())
}

#[tokio::test]
async fn login_then_follow_redirect() -> Result<()> {
    let app = app(Providers::builder().with(QueryProvider).build());

    let login = app.clone().oneshot(get("/?user=bob", None)).await?;
    let cookie = cookie_value(set_cookie(&login)).to_string();

    let page = app.oneshot(get("/", Some(&cookie))).await?;
    assert_eq!(page.status(), StatusCode::OK);
    assert_eq!(page.headers().get(IDENTITY_HEADER).unwrap(), "urn:test:bob");
    Ok(())
}

#[tokio::test]
async fn anonymous_visitor_gets_login_links() -> Result<()> {
    let providers = Providers::builder().with(QueryProvider).build();

    let response = app(providers).oneshot(get("/", None)).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(SET_COOKIE).is_none());
    assert!(response.headers().get(IDENTITY_HEADER).is_none());
    assert_eq!(
        json_body(response).await,
        json!({
            "links": [{"rel": "auth-query", "href": "http://localhost:8080/?user=guest"}],
            "identity": null
        })
    );
    Ok(())
}

#[tokio::test]
async fn tampered_cookie_reads_as_anonymous() -> Result<()> {
    let mut cookie = cipher().encrypt(&Identity::new("urn:test:1", "Jane", "")?)?;
    let last = cookie.pop().unwrap();
    cookie.push(if last == 'A' { 'B' } else { 'A' });

    let response = app(Providers::default())
        .oneshot(get("/", Some(&cookie)))
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(IDENTITY_HEADER).is_none());
    assert_eq!(json_body(response).await["identity"], Value::Null);
    Ok(())
}

#[tokio::test]
async fn logout_expires_cookie() -> Result<()> {
    let cookie = cipher().encrypt(&Identity::new("urn:test:1", "Jane", "")?)?;

    let response = app(Providers::default())
        .oneshot(get("/?rexsl-logout=true", Some(&cookie)))
        .await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(LOCATION).unwrap(),
        "http://localhost:8080/"
    );
    let cleared = set_cookie(&response);
    assert!(cleared.starts_with("Rexsl-Auth=;"));
    assert!(cleared.contains("Max-Age=0"));
    Ok(())
}

#[tokio::test]
async fn provider_failure_is_server_error() -> Result<()> {
    let providers = Providers::builder().with(Unreachable).build();

    let response = app(providers).oneshot(get("/", None)).await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    Ok(())
}

#[tokio::test]
async fn health_reports_name_and_version() -> Result<()> {
    let response = app(Providers::default())
        .oneshot(get("/health", None))
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    Ok(())
}
