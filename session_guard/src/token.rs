//! HMAC-signed opaque tokens.
//!
//! Wire format (dot separated, every part base64url without padding except the
//! expiration):
//!
//! ```text
//! <payload>.<signature>
//! <payload>.<expires_at_unix_secs>.<signature>
//! ```
//!
//! The signature is HMAC-SHA256 over everything before the last dot, so the
//! expiration is covered by it.

use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use crate::utils::{base64url_decode, base64url_encode};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("No secret is configured for signing tokens")]
    MissingSecret,

    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token expired")]
    Expired,
}

/// Signs `payload` with `secret`. Deterministic for a given payload and secret.
pub fn sign_token(payload: &str, secret: &[u8]) -> Result<String, TokenError> {
    let message = base64url_encode(payload.as_bytes());
    sign_message(message, secret)
}

/// Signs `payload` with an embedded expiration.
pub fn sign_token_with_expiry(
    payload: &str,
    secret: &[u8],
    expires_at: DateTime<Utc>,
) -> Result<String, TokenError> {
    let message = format!(
        "{}.{}",
        base64url_encode(payload.as_bytes()),
        expires_at.timestamp()
    );
    sign_message(message, secret)
}

/// Verifies `token` against `secret` and returns the payload it carries.
pub fn verify_signed_token(token: &str, secret: &[u8]) -> Result<String, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }

    let (message, signature) = token
        .rsplit_once('.')
        .ok_or_else(|| TokenError::Malformed("missing signature".to_string()))?;
    let signature = base64url_decode(signature)
        .map_err(|_| TokenError::Malformed("undecodable signature".to_string()))?;

    let mut mac = new_mac(secret)?;
    mac.update(message.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| TokenError::InvalidSignature)?;

    let (encoded_payload, expires_at) = match message.split_once('.') {
        Some((payload, expiry)) => (payload, Some(parse_expiry(expiry)?)),
        None => (message, None),
    };

    if let Some(expires_at) = expires_at {
        if Utc::now() >= expires_at {
            tracing::debug!("Signed token expired at {}", expires_at);
            return Err(TokenError::Expired);
        }
    }

    let payload = base64url_decode(encoded_payload)
        .map_err(|_| TokenError::Malformed("undecodable payload".to_string()))?;
    String::from_utf8(payload).map_err(|_| TokenError::Malformed("payload is not UTF-8".to_string()))
}

fn sign_message(message: String, secret: &[u8]) -> Result<String, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }
    let mut mac = new_mac(secret)?;
    mac.update(message.as_bytes());
    let signature = base64url_encode(&mac.finalize().into_bytes());
    Ok(format!("{message}.{signature}"))
}

fn new_mac(secret: &[u8]) -> Result<HmacSha256, TokenError> {
    // HMAC accepts keys of any length; the error arm is unreachable in practice
    HmacSha256::new_from_slice(secret).map_err(|_| TokenError::MissingSecret)
}

fn parse_expiry(raw: &str) -> Result<DateTime<Utc>, TokenError> {
    let secs = raw
        .parse::<i64>()
        .map_err(|_| TokenError::Malformed("invalid expiration".to_string()))?;
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| TokenError::Malformed("expiration out of range".to_string()))
}

/// Token signer bound to an optional server secret.
#[derive(Clone)]
pub struct TokenCodec {
    secret: Option<Vec<u8>>,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl TokenCodec {
    pub fn new(secret: Option<&str>) -> Self {
        Self {
            secret: secret
                .filter(|s| !s.is_empty())
                .map(|s| s.as_bytes().to_vec()),
        }
    }

    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    fn secret(&self) -> Result<&[u8], TokenError> {
        self.secret.as_deref().ok_or(TokenError::MissingSecret)
    }

    pub fn sign(&self, payload: &str) -> Result<String, TokenError> {
        sign_token(payload, self.secret()?)
    }

    pub fn sign_with_expiry(
        &self,
        payload: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        sign_token_with_expiry(payload, self.secret()?, expires_at)
    }

    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        verify_signed_token(token, self.secret()?)
    }
}
