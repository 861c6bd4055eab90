//! Session cookie encryption.
//!
//! Layout of an encoded identity, before base64url (unpadded) encoding:
//! `version (1 byte) || nonce (12 bytes) || ChaCha20-Poly1305 ciphertext`.
//!
//! The cipher key is derived from the configured key and salt; the salt is
//! also bound as associated data, so a payload produced under a different key
//! or salt fails the integrity check instead of decoding into some identity.

use base64ct::{Base64UrlUnpadded, Encoding};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

use super::identity::{Identity, IdentityError, IdentityRecord};

const VERSION: u8 = 1;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const DOMAIN: &str = "rexsl-auth:v1";

/// Longest cookie value ever produced. Browsers silently drop cookies over
/// 4096 bytes including name and attributes.
pub const MAX_COOKIE_LEN: usize = 4000;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("anonymous identity can not be encoded")]
    Anonymous,
    #[error("failed to serialize identity")]
    Serialize(#[from] serde_json::Error),
    #[error("encryption failure")]
    Cipher,
    #[error("encoded identity is {0} bytes, over the {MAX_COOKIE_LEN} byte cookie limit")]
    TooLarge(usize),
}

/// Reasons a cookie value did not decode into an identity.
///
/// Every variant means "no session"; none of them should fail the request.
#[derive(Debug, Error)]
pub enum DecodeFailure {
    #[error("cookie value is not canonical base64url")]
    Malformed,
    #[error("cookie value is too short")]
    Truncated,
    #[error("unsupported payload version {0}")]
    UnsupportedVersion(u8),
    #[error("integrity check failed")]
    Integrity,
    #[error("invalid identity payload")]
    Payload(#[from] serde_json::Error),
    #[error("invalid identity in payload")]
    InvalidIdentity(#[from] IdentityError),
}

/// Symmetric codec turning an [`Identity`] into a cookie-safe string and back.
#[derive(Clone)]
pub struct CookieCipher {
    key: SecretString,
    salt: String,
    derived: [u8; 32],
}

impl CookieCipher {
    #[must_use]
    pub fn new(key: SecretString, salt: impl Into<String>) -> Self {
        let salt = salt.into();
        let derived = derive_key(key.expose_secret(), &salt);
        Self { key, salt, derived }
    }

    /// Encrypt `identity` into a printable cookie value.
    ///
    /// Every call draws a fresh nonce, so encoding the same identity twice
    /// yields different strings.
    ///
    /// # Errors
    /// Returns [`EncodeError::Anonymous`] for the anonymous identity, which is
    /// never written to a cookie, and [`EncodeError::TooLarge`] when the value
    /// would exceed [`MAX_COOKIE_LEN`].
    #[allow(deprecated)]
    pub fn encrypt(&self, identity: &Identity) -> Result<String, EncodeError> {
        if identity.is_anonymous() {
            return Err(EncodeError::Anonymous);
        }
        let plaintext = serde_json::to_vec(&IdentityRecord::from(identity))?;

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.derived));

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let aad = self.aad();
        let ciphertext = cipher
            .encrypt(
                nonce,
                Payload {
                    msg: &plaintext,
                    aad: aad.as_bytes(),
                },
            )
            .map_err(|_| EncodeError::Cipher)?;

        let mut raw = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
        raw.push(VERSION);
        raw.extend_from_slice(&nonce_bytes);
        raw.extend_from_slice(&ciphertext);

        let text = Base64UrlUnpadded::encode_string(&raw);
        if text.len() > MAX_COOKIE_LEN {
            return Err(EncodeError::TooLarge(text.len()));
        }
        Ok(text)
    }

    /// Decrypt a cookie value produced by [`CookieCipher::encrypt`].
    ///
    /// # Errors
    /// Returns a [`DecodeFailure`] if the text is malformed, was tampered with,
    /// or was produced under a different key or salt.
    #[allow(deprecated)]
    pub fn decrypt(&self, text: &str) -> Result<Identity, DecodeFailure> {
        let raw = Base64UrlUnpadded::decode_vec(text).map_err(|_| DecodeFailure::Malformed)?;
        // Reject alternative spellings of the same bytes.
        if Base64UrlUnpadded::encode_string(&raw) != text {
            return Err(DecodeFailure::Malformed);
        }

        let Some((&version, rest)) = raw.split_first() else {
            return Err(DecodeFailure::Truncated);
        };
        if version != VERSION {
            return Err(DecodeFailure::UnsupportedVersion(version));
        }
        if rest.len() < NONCE_LEN + TAG_LEN {
            return Err(DecodeFailure::Truncated);
        }

        let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.derived));
        let aad = self.aad();
        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(nonce_bytes),
                Payload {
                    msg: ciphertext,
                    aad: aad.as_bytes(),
                },
            )
            .map_err(|_| DecodeFailure::Integrity)?;

        let record: IdentityRecord = serde_json::from_slice(&plaintext)?;
        Ok(Identity::try_from(record)?)
    }

    fn aad(&self) -> String {
        format!("{DOMAIN}|{}", self.salt)
    }
}

impl PartialEq for CookieCipher {
    fn eq(&self, other: &Self) -> bool {
        self.salt == other.salt && self.key.expose_secret() == other.key.expose_secret()
    }
}

impl Eq for CookieCipher {}

impl fmt::Debug for CookieCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieCipher")
            .field("key", &"***")
            .field("salt", &self.salt)
            .finish()
    }
}

/// Encrypt `identity` with a one-off cipher for `key` and `salt`.
///
/// # Errors
/// See [`CookieCipher::encrypt`].
pub fn encrypt(identity: &Identity, key: &str, salt: &str) -> Result<String, EncodeError> {
    CookieCipher::new(SecretString::from(key.to_string()), salt).encrypt(identity)
}

/// Decrypt `text` with a one-off cipher for `key` and `salt`.
///
/// # Errors
/// See [`CookieCipher::decrypt`].
pub fn decrypt(text: &str, key: &str, salt: &str) -> Result<Identity, DecodeFailure> {
    CookieCipher::new(SecretString::from(key.to_string()), salt).decrypt(text)
}

fn derive_key(key: &str, salt: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN.as_bytes());
    hasher.update((key.len() as u64).to_be_bytes());
    hasher.update(key.as_bytes());
    hasher.update(salt.as_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn jane() -> Result<Identity> {
        Ok(Identity::new(
            "urn:test:1",
            "Jane",
            "https://img.example.com/jane.png",
        )?)
    }

    fn cipher(key: &str, salt: &str) -> CookieCipher {
        CookieCipher::new(SecretString::from(key.to_string()), salt)
    }

    #[test]
    fn encrypt_decrypt_roundtrip() -> Result<()> {
        let identity = jane()?;
        let cipher = cipher("secret-key", "salt");
        let text = cipher.encrypt(&identity)?;
        assert_eq!(cipher.decrypt(&text)?, identity);
        Ok(())
    }

    #[test]
    fn roundtrip_keeps_empty_and_unicode_fields() -> Result<()> {
        let cipher = cipher("k", "s");
        for identity in [
            Identity::new("urn:test:2", "", "")?,
            Identity::new("urn:facebook:1234", "Jürgen Ñandú 名前", "")?,
        ] {
            let text = cipher.encrypt(&identity)?;
            assert_eq!(cipher.decrypt(&text)?, identity);
        }
        Ok(())
    }

    #[test]
    fn encryption_is_randomized() -> Result<()> {
        let identity = jane()?;
        let cipher = cipher("secret-key", "salt");
        assert_ne!(cipher.encrypt(&identity)?, cipher.encrypt(&identity)?);
        Ok(())
    }

    #[test]
    fn encoded_value_is_cookie_safe() -> Result<()> {
        let text = cipher("secret-key", "salt").encrypt(&jane()?)?;
        assert!(!text.is_empty());
        assert!(text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        Ok(())
    }

    #[test]
    fn anonymous_is_never_encoded() {
        let result = cipher("secret-key", "salt").encrypt(&Identity::ANONYMOUS);
        assert!(matches!(result, Err(EncodeError::Anonymous)));
    }

    #[test]
    fn oversized_identity_is_rejected() -> Result<()> {
        let cipher = cipher("secret-key", "salt");
        let long = Identity::new("urn:test:1", "x".repeat(MAX_COOKIE_LEN), "")?;
        assert!(matches!(
            cipher.encrypt(&long),
            Err(EncodeError::TooLarge(len)) if len > MAX_COOKIE_LEN
        ));

        // 2900 name bytes seal to just under the limit.
        let fits = Identity::new("urn:test:1", "x".repeat(2900), "")?;
        let text = cipher.encrypt(&fits)?;
        assert!(text.len() <= MAX_COOKIE_LEN);
        assert_eq!(cipher.decrypt(&text)?, fits);
        Ok(())
    }

    #[test]
    fn decrypt_fails_with_other_key() -> Result<()> {
        let text = cipher("key-a", "salt").encrypt(&jane()?)?;
        let result = cipher("key-b", "salt").decrypt(&text);
        assert!(matches!(result, Err(DecodeFailure::Integrity)));
        Ok(())
    }

    #[test]
    fn decrypt_fails_with_other_salt() -> Result<()> {
        let text = cipher("key", "salt-a").encrypt(&jane()?)?;
        let result = cipher("key", "salt-b").decrypt(&text);
        assert!(matches!(result, Err(DecodeFailure::Integrity)));
        Ok(())
    }

    #[test]
    fn key_and_salt_boundary_is_unambiguous() -> Result<()> {
        let text = cipher("ab", "c").encrypt(&jane()?)?;
        assert!(cipher("a", "bc").decrypt(&text).is_err());
        Ok(())
    }

    #[test]
    fn flipping_any_payload_byte_fails() -> Result<()> {
        let cipher = cipher("secret-key", "salt");
        let text = cipher.encrypt(&jane()?)?;
        let raw = Base64UrlUnpadded::decode_vec(&text).map_err(|e| anyhow::anyhow!("{e}"))?;

        for index in 0..raw.len() {
            let mut tampered = raw.clone();
            if let Some(byte) = tampered.get_mut(index) {
                *byte ^= 0x01;
            }
            let tampered = Base64UrlUnpadded::encode_string(&tampered);
            assert!(
                cipher.decrypt(&tampered).is_err(),
                "tampered byte {index} decoded"
            );
        }
        Ok(())
    }

    #[test]
    fn replacing_any_character_fails() -> Result<()> {
        let cipher = cipher("secret-key", "salt");
        let text = cipher.encrypt(&jane()?)?;

        for index in 0..text.len() {
            let mut chars: Vec<char> = text.chars().collect();
            if let Some(c) = chars.get_mut(index) {
                *c = if *c == 'A' { 'B' } else { 'A' };
            }
            let tampered: String = chars.into_iter().collect();
            assert!(
                cipher.decrypt(&tampered).is_err(),
                "tampered character {index} decoded"
            );
        }
        Ok(())
    }

    #[test]
    fn truncated_payload_fails() -> Result<()> {
        let cipher = cipher("secret-key", "salt");
        let text = cipher.encrypt(&jane()?)?;
        let raw = Base64UrlUnpadded::decode_vec(&text).map_err(|e| anyhow::anyhow!("{e}"))?;
        let short = Base64UrlUnpadded::encode_string(raw.get(..20).unwrap_or_default());

        assert!(matches!(cipher.decrypt(""), Err(DecodeFailure::Truncated)));
        assert!(matches!(
            cipher.decrypt(&short),
            Err(DecodeFailure::Truncated)
        ));
        Ok(())
    }

    #[test]
    fn garbage_is_malformed() {
        let cipher = cipher("secret-key", "salt");
        for text in ["not base64!", "a+b/c==", "%%%"] {
            assert!(matches!(
                cipher.decrypt(text),
                Err(DecodeFailure::Malformed)
            ));
        }
    }

    #[test]
    fn unknown_version_is_rejected() -> Result<()> {
        let cipher = cipher("secret-key", "salt");
        let text = cipher.encrypt(&jane()?)?;
        let mut raw = Base64UrlUnpadded::decode_vec(&text).map_err(|e| anyhow::anyhow!("{e}"))?;
        if let Some(version) = raw.first_mut() {
            *version = 9;
        }
        let result = cipher.decrypt(&Base64UrlUnpadded::encode_string(&raw));
        assert!(matches!(result, Err(DecodeFailure::UnsupportedVersion(9))));
        Ok(())
    }

    #[test]
    fn free_helpers_match_cipher() -> Result<()> {
        let identity = jane()?;
        let text = encrypt(&identity, "K", "S")?;
        assert_eq!(decrypt(&text, "K", "S")?, identity);
        assert!(decrypt(&text, "K", "T").is_err());
        Ok(())
    }

    #[test]
    fn debug_redacts_key() {
        let output = format!("{:?}", cipher("super-secret", "salt"));
        assert!(!output.contains("super-secret"));
        assert!(output.contains("salt"));
    }

    #[test]
    fn equality_follows_key_and_salt() {
        assert_eq!(cipher("k", "s"), cipher("k", "s"));
        assert_ne!(cipher("k", "s"), cipher("k", "t"));
        assert_ne!(cipher("k", "s"), cipher("j", "s"));
    }
}
