//! # Subscription Signatures
//!
//! A subscription token is a capability for one ordered tag sequence:
//!
//! ```text
//! token = hex(PBKDF2-HMAC-SHA256(password = join(tags, "|"),
//!                                salt     = secret,
//!                                rounds   = 10,
//!                                length   = 16 bytes))
//! ```
//!
//! Whoever holds the shared secret (the application backend) hands clients
//! tokens for exactly the tag sets they may receive. The secret itself never
//! leaves the server.
//!
//! ## Separator collisions
//!
//! Tags are stripped of `|` before joining. Without that, `["a|b"]` and
//! `["a", "b"]` would join to the same password and share a token.

use crate::domain::errors::SubscriptionError;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use std::fmt;
use subtle::ConstantTimeEq;

/// Separator used to join tags into the PBKDF2 password.
pub const TAG_SEPARATOR: char = '|';

/// PBKDF2 iteration count.
pub const PBKDF2_ROUNDS: u32 = 10;

/// Derived key length in bytes (hex token is twice as long).
pub const TOKEN_LENGTH: usize = 16;

/// Remove every separator character from a tag.
pub fn sanitize_tag(tag: &str) -> String {
    tag.replace(TAG_SEPARATOR, "")
}

/// Sanitize a tag list, preserving order and duplicates.
pub fn sanitize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    tags.iter().map(|tag| sanitize_tag(tag.as_ref())).collect()
}

/// Derive the token for an ordered tag sequence.
///
/// Order matters: `["a", "b"]` and `["b", "a"]` produce different tokens.
pub fn derive_token<S: AsRef<str>>(tags: &[S], secret: &[u8]) -> String {
    let password = sanitize_tags(tags).join(&TAG_SEPARATOR.to_string());

    let mut key = [0u8; TOKEN_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), secret, PBKDF2_ROUNDS, &mut key);
    hex::encode(key)
}

/// Verifies client-supplied tokens against the shared secret.
///
/// An empty secret disables verification entirely.
#[derive(Clone, Default)]
pub struct SignatureVerifier {
    secret: Vec<u8>,
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Whether tokens are checked at all.
    pub fn is_enabled(&self) -> bool {
        !self.secret.is_empty()
    }

    /// The token a client must present for `tags`.
    pub fn expected_token<S: AsRef<str>>(&self, tags: &[S]) -> String {
        derive_token(tags, &self.secret)
    }

    /// Check `token` against the one derived for `tags`.
    ///
    /// Comparison is exact (case-sensitive hex) and constant-time.
    pub fn verify<S: AsRef<str>>(&self, tags: &[S], token: &str) -> Result<(), SubscriptionError> {
        if !self.is_enabled() {
            return Ok(());
        }

        let expected = self.expected_token(tags);
        let matches = expected.len() == token.len()
            && bool::from(expected.as_bytes().ct_eq(token.as_bytes()));

        if matches {
            Ok(())
        } else {
            Err(SubscriptionError::Unauthorized)
        }
    }
}

impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
