//! Unverified token decoding and claim narrowing.
//!
//! Before any cryptography runs, the gateway decodes the token's structure
//! (header and payload, not the signature) and progressively filters the
//! provider table down to the records consistent with the token's issuer,
//! audience, and algorithm. Each step short-circuits: an empty result names
//! the claim that failed, so operator logs can tell a wrong audience from a
//! wrong issuer even though callers only ever see a generic 401.
//!
//! # Invariants
//! - Nothing decoded here is trusted. The narrowed candidates feed the
//!   signature verifier, which makes the actual accept decision.
//! - Narrowing preserves the provider table's original order.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::Value;

use super::provider::ProviderTrust;

/// Error produced while decoding a token's structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimError {
    /// The token is not a structurally valid JWT or its payload is not a
    /// JSON object.
    MalformedToken,
    /// The payload's `sub` claim is absent or not a string.
    InvalidSubject,
}

impl std::fmt::Display for ClaimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedToken => write!(f, "malformed token"),
            Self::InvalidSubject => write!(f, "invalid subject"),
        }
    }
}

impl std::error::Error for ClaimError {}

/// The claim that emptied the candidate set during narrowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrowError {
    /// No trust record matches the token's issuer.
    Issuer,
    /// No surviving record matches the token's audience.
    Audience,
    /// No surviving record declares the token's algorithm.
    Algorithm,
}

impl std::fmt::Display for NarrowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Issuer => write!(f, "invalid issuer"),
            Self::Audience => write!(f, "invalid audience"),
            Self::Algorithm => write!(f, "invalid algorithm"),
        }
    }
}

impl std::error::Error for NarrowError {}

/// Claims read from a token without checking its signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnverifiedClaims {
    /// The `alg` value from the token header, as written.
    pub algorithm: String,
    /// The `sub` claim. Always a string; any other shape is rejected
    /// before an `UnverifiedClaims` is constructed.
    pub subject: String,
    /// The `iss` claim, when present as a string.
    pub issuer: Option<String>,
    /// The `aud` claim, when present as a string. Array audiences never
    /// exact-match a configured audience and are treated as absent.
    pub audience: Option<String>,
}

impl UnverifiedClaims {
    /// Decode a compact JWT's header and payload without verifying the
    /// signature.
    ///
    /// # Errors
    /// Returns `ClaimError::MalformedToken` if the token does not have three
    /// base64url segments, the header or payload is not valid JSON, the
    /// header lacks a string `alg`, or the payload is not a JSON object.
    /// Returns `ClaimError::InvalidSubject` if `sub` is absent or not a
    /// string.
    pub fn decode(token: &str) -> Result<Self, ClaimError> {
        let mut segments = token.split('.');
        let (Some(header), Some(payload), Some(_signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(ClaimError::MalformedToken);
        };

        let header = decode_json_segment(header)?;
        let Some(algorithm) = header.get("alg").and_then(Value::as_str) else {
            return Err(ClaimError::MalformedToken);
        };

        let payload = decode_json_segment(payload)?;
        let Some(claims) = payload.as_object() else {
            return Err(ClaimError::MalformedToken);
        };

        let Some(subject) = claims.get("sub").and_then(Value::as_str) else {
            return Err(ClaimError::InvalidSubject);
        };

        Ok(Self {
            algorithm: algorithm.to_string(),
            subject: subject.to_string(),
            issuer: claims.get("iss").and_then(Value::as_str).map(String::from),
            audience: claims.get("aud").and_then(Value::as_str).map(String::from),
        })
    }
}

fn decode_json_segment(segment: &str) -> Result<Value, ClaimError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| ClaimError::MalformedToken)?;
    serde_json::from_slice(&bytes).map_err(|_| ClaimError::MalformedToken)
}

/// Filter the provider table down to records consistent with the token's
/// issuer, audience, and algorithm, in that order.
///
/// # Errors
/// Returns the first narrowing step whose result was empty.
pub fn narrow_candidates<'a>(
    providers: &'a [ProviderTrust],
    claims: &UnverifiedClaims,
) -> Result<Vec<&'a ProviderTrust>, NarrowError> {
    let by_issuer: Vec<&ProviderTrust> = providers
        .iter()
        .filter(|trust| claims.issuer.as_deref() == Some(trust.issuer.as_str()))
        .collect();
    if by_issuer.is_empty() {
        return Err(NarrowError::Issuer);
    }

    let by_audience: Vec<&ProviderTrust> = by_issuer
        .into_iter()
        .filter(|trust| claims.audience.as_deref() == Some(trust.audience.as_str()))
        .collect();
    if by_audience.is_empty() {
        return Err(NarrowError::Audience);
    }

    let by_algorithm: Vec<&ProviderTrust> = by_audience
        .into_iter()
        .filter(|trust| trust.algorithm.name() == claims.algorithm)
        .collect();
    if by_algorithm.is_empty() {
        return Err(NarrowError::Algorithm);
    }

    Ok(by_algorithm)
}
