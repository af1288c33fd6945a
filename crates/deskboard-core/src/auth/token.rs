//! Access token decoding and claim validation.
//!
//! Tokens are three dot-separated base64url segments (header, payload,
//! signature). The signature cannot be verified client-side; what the client
//! can check is structure, issuer, audience and expiry. Anything that fails
//! to decode is simply not usable.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Why a token was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("expected 3 segments, found {0}")]
    SegmentCount(usize),

    #[error("segment is not valid base64url: {0}")]
    Encoding(String),

    #[error("segment is not a JSON object: {0}")]
    Json(String),

    #[error("issuer mismatch (got {0:?})")]
    Issuer(String),

    #[error("audience mismatch")]
    Audience,

    #[error("token expired at {0}")]
    Expired(i64),
}

/// `aud` may be a single string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn contains(&self, expected: &str) -> bool {
        match self {
            Audience::One(aud) => aud == expected,
            Audience::Many(auds) => auds.iter().any(|a| a == expected),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub aud: Audience,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A decoded access token. Holds the raw string for re-use as a bearer
/// credential alongside its parsed claims.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessToken {
    raw: String,
    claims: Claims,
}

impl AccessToken {
    /// Structural decode only; claims are not checked here.
    pub fn decode(raw: &str) -> Result<Self, TokenError> {
        let segments: Vec<&str> = raw.split('.').collect();
        if segments.len() != 3 {
            return Err(TokenError::SegmentCount(segments.len()));
        }

        // The header must at least be a JSON object.
        let _: Map<String, Value> = decode_segment(segments[0])?;
        let claims: Claims = decode_segment(segments[1])?;
        decode_signature(segments[2])?;

        Ok(Self {
            raw: raw.to_string(),
            claims,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn subject(&self) -> Option<&str> {
        self.claims.sub.as_deref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.claims.exp, 0)
    }

    /// Seconds left before expiry (never negative).
    pub fn seconds_until_expiry(&self, now: i64) -> i64 {
        (self.claims.exp - now).max(0)
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.claims.exp <= now
    }
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    // Some issuers pad their segments even though base64url in JWTs should not.
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| TokenError::Encoding(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| TokenError::Json(e.to_string()))
}

/// The signature is opaque here, but it must be present and well-formed.
fn decode_signature(segment: &str) -> Result<(), TokenError> {
    if segment.is_empty() {
        return Err(TokenError::Encoding("empty signature segment".to_string()));
    }
    URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map(|_| ())
        .map_err(|e| TokenError::Encoding(e.to_string()))
}

/// Checks a decoded token against the expected issuer and audience.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenValidator {
    issuer: String,
    audience: String,
}

impl TokenValidator {
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    /// Decode `raw` and check issuer, audience and `exp > now`.
    pub fn validate(&self, raw: &str, now: i64) -> Result<AccessToken, TokenError> {
        let token = AccessToken::decode(raw)?;
        self.check(&token, now)?;
        Ok(token)
    }

    pub fn check(&self, token: &AccessToken, now: i64) -> Result<(), TokenError> {
        let claims = token.claims();
        if claims.iss != self.issuer {
            return Err(TokenError::Issuer(claims.iss.clone()));
        }
        if !claims.aud.contains(&self.audience) {
            return Err(TokenError::Audience);
        }
        if token.is_expired(now) {
            return Err(TokenError::Expired(claims.exp));
        }
        Ok(())
    }
}
