//! Resolved principal carried by the session cookie.
//!
//! An [`Identity`] is either [`Identity::ANONYMOUS`] or a principal with a
//! non-empty URN. Construction goes through [`Identity::new`], which is the
//! only way to obtain a non-anonymous value, so nothing else can compare
//! equal to the anonymous sentinel.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// RFC 8141: "urn:" NID ":" NSS
const URN_PATTERN: &str = r"(?i)^urn:[a-z0-9][a-z0-9-]{0,31}:\S+$";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("identity urn is empty")]
    EmptyUrn,
    #[error("invalid identity urn: {0}")]
    InvalidUrn(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Identity {
    urn: String,
    name: String,
    photo: String,
}

impl Identity {
    /// The visitor nobody has vouched for.
    pub const ANONYMOUS: Self = Self {
        urn: String::new(),
        name: String::new(),
        photo: String::new(),
    };

    /// Build a resolved identity.
    ///
    /// # Errors
    /// Returns an error if `urn` is empty or not of the form `urn:<nid>:<nss>`.
    pub fn new(
        urn: impl Into<String>,
        name: impl Into<String>,
        photo: impl Into<String>,
    ) -> Result<Self, IdentityError> {
        let urn = urn.into();
        if urn.trim().is_empty() {
            return Err(IdentityError::EmptyUrn);
        }
        if !Regex::new(URN_PATTERN).is_ok_and(|regex| regex.is_match(&urn)) {
            return Err(IdentityError::InvalidUrn(urn));
        }
        Ok(Self {
            urn,
            name: name.into(),
            photo: photo.into(),
        })
    }

    #[must_use]
    pub fn urn(&self) -> &str {
        &self.urn
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Avatar reference, empty when the provider had none.
    #[must_use]
    pub fn photo(&self) -> &str {
        &self.photo
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        *self == Self::ANONYMOUS
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::ANONYMOUS
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_anonymous() {
            write!(f, "anonymous")
        } else {
            write!(f, "{}", self.urn)
        }
    }
}

/// Wire shape of an identity inside the cookie payload.
///
/// Deserialized records are re-validated through [`Identity::new`].
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct IdentityRecord {
    pub urn: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub photo: String,
}

impl From<&Identity> for IdentityRecord {
    fn from(identity: &Identity) -> Self {
        Self {
            urn: identity.urn.clone(),
            name: identity.name.clone(),
            photo: identity.photo.clone(),
        }
    }
}

impl TryFrom<IdentityRecord> for Identity {
    type Error = IdentityError;

    fn try_from(record: IdentityRecord) -> Result<Self, Self::Error> {
        Self::new(record.urn, record.name, record.photo)
    }
}
