//! Bearer credential and its local validity check
//!
//! A credential is an opaque JWT-shaped token: three dot-separated segments,
//! the middle one a base64 JSON payload carrying an `exp` claim in epoch
//! seconds. The signature is never checked here; the backend is the only
//! authority. Locally we only decide whether a token is worth sending.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);

/// Opaque bearer token issued at login
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token, as sent in the `Authorization` header
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the token has exactly three dot-separated segments
    pub fn is_well_formed(&self) -> bool {
        self.0.split('.').count() == 3
    }

    /// `exp` claim in epoch seconds, if the payload can be decoded
    pub fn expires_at(&self) -> Option<f64> {
        let mut segments = self.0.split('.');
        let (_, payload, _) = (segments.next()?, segments.next()?, segments.next()?);
        if segments.next().is_some() {
            return None;
        }

        let bytes = URL_SAFE_LENIENT
            .decode(payload)
            .or_else(|_| STANDARD_LENIENT.decode(payload))
            .ok()?;
        let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
        claims.get("exp")?.as_f64()
    }

    /// Local validity check against an explicit clock (epoch seconds).
    ///
    /// Usable only if well-formed and `exp` lies strictly more than `margin`
    /// after `now`.
    pub fn is_usable_at(&self, now: i64, margin: Duration) -> bool {
        if !self.is_well_formed() {
            return false;
        }
        match self.expires_at() {
            Some(exp) => exp > (now as f64) + margin.as_secs_f64(),
            None => false,
        }
    }

    /// Local validity check against the wall clock
    pub fn is_usable(&self, margin: Duration) -> bool {
        self.is_usable_at(chrono::Utc::now().timestamp(), margin)
    }
}

impl From<String> for Credential {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&mask_token(&self.0)).finish()
    }
}

/// Mask a token for logs: first 8 + last 4 characters visible
pub fn mask_token(token: &str) -> String {
    if token.is_empty() {
        return String::new();
    }
    if token.len() <= 12 || !token.is_ascii() {
        return "****".to_string();
    }
    format!("{}****{}", &token[..8], &token[token.len() - 4..])
}
