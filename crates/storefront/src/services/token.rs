//! Signed, time-limited account activation tokens.
//!
//! A token has the form `<payload>.<signature>`, both parts base64url
//! without padding. The payload is the JSON object
//! `{"confirm": <user id>, "iat": <issued at>, "exp": <expires at>}` (Unix
//! seconds) and the signature is HMAC-SHA256 over a fixed salt followed by
//! the encoded payload, keyed with the application secret.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use freshmall_core::UserId;

type HmacSha256 = Hmac<Sha256>;

/// Domain-separates activation signatures from anything else signed with
/// the same secret.
const SALT: &str = "freshmall.activation.";

/// How long an activation link stays valid.
pub const ACTIVATION_TTL: Duration = Duration::seconds(3600);

/// Reasons an activation token is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The token is not `<payload>.<signature>` or the payload is unreadable.
    #[error("malformed token")]
    Malformed,

    /// The signature does not match the payload.
    #[error("bad token signature")]
    BadSignature,

    /// The token was valid but its lifetime has passed.
    #[error("token expired")]
    Expired,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    confirm: i32,
    iat: i64,
    exp: i64,
}

/// Issues and checks activation tokens.
#[derive(Clone)]
pub struct ActivationSigner {
    key: SecretString,
    ttl: Duration,
}

impl std::fmt::Debug for ActivationSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivationSigner")
            .field("key", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl ActivationSigner {
    /// Create a signer with the default one hour lifetime.
    #[must_use]
    pub const fn new(key: SecretString) -> Self {
        Self {
            key,
            ttl: ACTIVATION_TTL,
        }
    }

    /// Override the token lifetime.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sign an activation token for `user_id`, valid from now.
    #[must_use]
    pub fn sign(&self, user_id: UserId) -> String {
        self.sign_at(user_id, Utc::now())
    }

    /// Sign an activation token for `user_id`, issued at `now`.
    #[must_use]
    pub fn sign_at(&self, user_id: UserId, now: DateTime<Utc>) -> String {
        let claims = Claims {
            confirm: user_id.as_i32(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        // Serializing three integers cannot fail.
        let json = serde_json::to_vec(&claims).unwrap_or_default();
        let payload = URL_SAFE_NO_PAD.encode(json);

        let mut mac = self.mac();
        mac.update(SALT.as_bytes());
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{payload}.{signature}")
    }

    /// Check a token and return the user it activates.
    ///
    /// # Errors
    ///
    /// See [`ActivationSigner::verify_at`].
    pub fn verify(&self, token: &str) -> Result<UserId, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Check a token as of `now`.
    ///
    /// The signature is checked before the payload is decoded, so a tampered
    /// token always reports `BadSignature` rather than `Malformed`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Malformed` if the token cannot be split or decoded.
    /// Returns `TokenError::BadSignature` if the signature does not verify.
    /// Returns `TokenError::Expired` if `now` is at or past the expiry.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, TokenError> {
        let (payload, signature) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        if payload.is_empty() || signature.is_empty() {
            return Err(TokenError::Malformed);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;

        let mut mac = self.mac();
        mac.update(SALT.as_bytes());
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims = serde_json::from_slice(&json).map_err(|_| TokenError::Malformed)?;

        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(UserId::new(claims.confirm))
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(self.key.expose_secret().as_bytes())
            .expect("HMAC accepts keys of any length")
    }
}
