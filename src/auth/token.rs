//! Session tokens: compact HS256 JWS (`header.claims.signature`, base64url
//! without padding) signed with a process-wide key.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::ports::clock::Clock;

type HmacSha256 = Hmac<Sha256>;

const HEADER_JSON: &str = r#"{"alg":"HS256","typ":"JWT"}"#;
const MIN_SECRET_LEN: usize = 32;

/// Secrets that have appeared in sample configs and docs. Startup with any of
/// these is refused.
const EXAMPLE_SECRETS: &[&str] = &[
    "your-secret-key",
    "secret",
    "changeme",
    "change-me",
    "change_me",
    "replace-me",
    "replace-with-a-long-random-secret",
    "replace-with-a-long-random-secret-of-32-bytes-or-more",
    "example",
    "example-secret",
    "default",
    "jwt-secret",
    "supersecret",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigningKeyError {
    #[error(
        "Session signing secret is not set. Provide --session-secret or PROMO_CMS_SESSION_SECRET"
    )]
    Missing,
    #[error(
        "Session signing secret is too short ({len} bytes, need at least {})",
        MIN_SECRET_LEN
    )]
    TooShort { len: usize },
    #[error("Session signing secret is an example value and must be replaced")]
    ExampleValue,
    #[error("Session signing secret cannot be used as an HMAC key")]
    Unusable,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token uses an unsupported algorithm")]
    UnsupportedAlgorithm,
    #[error("token signature does not match")]
    BadSignature,
    #[error("token has expired")]
    Expired,
}

#[derive(Clone)]
pub struct SigningKey(HmacSha256);

impl SigningKey {
    pub fn from_secret(secret: Option<&str>) -> Result<Self, SigningKeyError> {
        let secret = secret.map(str::trim).unwrap_or_default();
        if secret.is_empty() {
            return Err(SigningKeyError::Missing);
        }
        let lowered = secret.to_ascii_lowercase();
        if EXAMPLE_SECRETS.contains(&lowered.as_str()) {
            return Err(SigningKeyError::ExampleValue);
        }
        if secret.len() < MIN_SECRET_LEN {
            return Err(SigningKeyError::TooShort { len: secret.len() });
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| SigningKeyError::Unusable)?;
        Ok(Self(mac))
    }

    fn mac(&self) -> HmacSha256 {
        self.0.clone()
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey(..)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Admin identity
    pub sub: String,
    pub role: String,
    /// Issued-at, seconds since the epoch
    pub iat: i64,
    /// Expiry, seconds since the epoch
    pub exp: i64,
}

impl Claims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

#[derive(Deserialize)]
struct Header {
    alg: String,
}

pub struct TokenSigner {
    key: SigningKey,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenSigner {
    pub fn new(key: SigningKey, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { key, ttl, clock }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, subject: &str, role: &str) -> IssuedToken {
        let now = self.clock.now();
        let claims = Claims {
            sub: subject.to_string(),
            role: role.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        let token = self.sign(&claims);
        IssuedToken { token, claims }
    }

    pub fn sign(&self, claims: &Claims) -> String {
        // Serializing a struct of strings and integers cannot fail
        let claims_json = serde_json::to_vec(claims).unwrap_or_default();
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(HEADER_JSON),
            URL_SAFE_NO_PAD.encode(claims_json)
        );
        let mut mac = self.key.mac();
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature))
    }

    /// Check signature first, then expiry. Claims are only decoded from a
    /// correctly signed token.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };

        let header_json = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|_| TokenError::Malformed)?;
        let header: Header =
            serde_json::from_slice(&header_json).map_err(|_| TokenError::Malformed)?;
        if header.alg != "HS256" {
            return Err(TokenError::UnsupportedAlgorithm);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::Malformed)?;
        let signing_input_len = header_b64.len() + 1 + claims_b64.len();
        let mut mac = self.key.mac();
        mac.update(&token.as_bytes()[..signing_input_len]);
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims_json = URL_SAFE_NO_PAD
            .decode(claims_b64)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims =
            serde_json::from_slice(&claims_json).map_err(|_| TokenError::Malformed)?;

        if self.clock.now().timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}
