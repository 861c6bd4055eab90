//! # rexsl-auth
//!
//! Cookie-based session authentication for page-rendering web apps.
//!
//! Every request gets an [`auth::AuthInset`] that works out who the visitor is:
//!
//! 1. Each registered [`auth::Provider`] is asked in order. The first one to
//!    vouch for an identity (for example an OAuth callback carrying a `code`)
//!    wins, and the visitor is redirected to the same page without its query
//!    string while a fresh session cookie is set.
//! 2. Otherwise the `Rexsl-Auth` cookie is decrypted. It carries the identity
//!    sealed with ChaCha20-Poly1305 under a key derived from the configured
//!    key and salt, so a tampered or foreign cookie simply reads as anonymous.
//! 3. Otherwise the visitor is anonymous and the page advertises every
//!    provider's login link.
//!
//! Authenticated pages carry the identity, a logout link, a refreshed cookie
//! and the `X-Rexsl-Identity` header. Adding `rexsl-logout` to any URL clears
//! the cookie.

pub mod api;
pub mod auth;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
