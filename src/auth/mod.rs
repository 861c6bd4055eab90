//! Cookie-based session authentication.

pub mod codec;
pub mod cookie;
pub mod identity;
pub mod inset;
pub mod page;
pub mod provider;
pub mod request;
pub mod state;

pub use codec::{CookieCipher, DecodeFailure, EncodeError, MAX_COOKIE_LEN};
pub use cookie::{CookieSettings, AUTH_COOKIE};
pub use identity::{Identity, IdentityError};
pub use inset::{AuthError, AuthInset, Outcome, Redirect, Resolution, IDENTITY_HEADER, LOGOUT_FLAG};
pub use page::{Document, Link, Page};
pub use provider::{Always, OAuth2Config, OAuth2Provider, Provider, ProviderError, Providers};
pub use request::RequestContext;
pub use state::AuthState;
