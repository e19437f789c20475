//! Request-time authentication gateway.
//!
//! Orchestrates the per-request state machine: pre-flight pass-through,
//! bearer extraction, structural decode, claim narrowing, signature
//! verification, and principal attachment. Terminal on the first rejection.
//!
//! Every rejection answers 401 with a short plain-text reason. The internal
//! reasons are distinguishable for operator logs; exhausting the candidate
//! keys always reads "Invalid signature" so callers cannot learn which key
//! came closest.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Method, Request, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::claims::{ClaimError, NarrowError, UnverifiedClaims, narrow_candidates};
use super::provider::AuthConfiguration;
use super::verify::verify_signature;
use crate::diagnostics::Diagnostics;

/// The verified identity attached to a request after successful
/// authentication.
///
/// Owned by the single request it is attached to; built fresh per
/// verification and dropped when the request completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Subject claim of the verified token.
    pub id: String,
    /// `provider` label of the trust record whose key verified the token.
    pub provider: String,
    /// Display name claim, or empty when the token carries none.
    pub display_name: String,
}

/// Shared state for the gateway middleware.
#[derive(Clone)]
pub struct GatewayState {
    /// Immutable trust snapshot produced at startup.
    pub configuration: Arc<AuthConfiguration>,
    /// Sink for operational diagnostics.
    pub diagnostics: Arc<dyn Diagnostics>,
}

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    NoToken,
    InvalidToken,
    InvalidSubject,
    InvalidIssuer,
    InvalidAudience,
    InvalidAlgorithm,
    InvalidSignature,
}

impl Rejection {
    const fn body(self) -> &'static str {
        match self {
            Self::NoToken => "No token",
            Self::InvalidToken => "Invalid token",
            Self::InvalidSubject => "Invalid subject",
            Self::InvalidIssuer => "Invalid issuer",
            Self::InvalidAudience => "Invalid audience",
            Self::InvalidAlgorithm => "Invalid algorithm",
            Self::InvalidSignature => "Invalid signature",
        }
    }
}

impl From<ClaimError> for Rejection {
    fn from(error: ClaimError) -> Self {
        match error {
            ClaimError::MalformedToken => Self::InvalidToken,
            ClaimError::InvalidSubject => Self::InvalidSubject,
        }
    }
}

impl From<NarrowError> for Rejection {
    fn from(error: NarrowError) -> Self {
        match error {
            NarrowError::Issuer => Self::InvalidIssuer,
            NarrowError::Audience => Self::InvalidAudience,
            NarrowError::Algorithm => Self::InvalidAlgorithm,
        }
    }
}

/// Gateway middleware entry point.
///
/// Layer with `axum::middleware::from_fn_with_state(state, authenticate)`
/// over the routes the gateway protects.
pub async fn authenticate(
    State(gateway): State<GatewayState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    // Pre-flight negotiation carries no credentials and is never gated.
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let Some(token) = authorization.and_then(parse_bearer) else {
        // Absent header and a non-bearer header are the same case: the
        // caller supplied no usable token.
        if gateway.configuration.allow_anonymous {
            return next.run(request).await;
        }
        gateway.diagnostics.warn("no access token provided");
        return reject(Rejection::NoToken);
    };

    match check_token(&gateway, token) {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(rejection) => {
            gateway
                .diagnostics
                .warn(&format!("rejected request: {}", rejection.body()));
            reject(rejection)
        }
    }
}

/// Run decode, narrowing, and verification for one bearer token.
fn check_token(gateway: &GatewayState, token: &str) -> Result<Principal, Rejection> {
    let claims = UnverifiedClaims::decode(token)?;
    let candidates = narrow_candidates(&gateway.configuration.providers, &claims)?;
    let verified = verify_signature(&candidates, token).map_err(|_| Rejection::InvalidSignature)?;

    Ok(Principal {
        id: verified.claims.sub,
        provider: verified.provider,
        display_name: verified.claims.display_name.unwrap_or_default(),
    })
}

/// Extract the token from a `Bearer <token>` authorization value.
fn parse_bearer(authorization: &str) -> Option<&str> {
    authorization.strip_prefix("Bearer ")
}

fn reject(rejection: Rejection) -> Response {
    let mut response = (StatusCode::UNAUTHORIZED, rejection.body()).into_response();
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}
