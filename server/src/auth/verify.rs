//! Signature verification against narrowed trust candidates.
//!
//! Key rotation means several trust records can share an issuer, audience,
//! and algorithm; nothing but a successful verification identifies which key
//! signed a token. The verifier therefore tries each candidate in table
//! order and stops at the first key that validates the signature.
//!
//! # Invariants
//! - Each attempt is constrained to exactly the one algorithm the candidate
//!   declares, never a broader set, so a token cannot talk the verifier into
//!   a different algorithm than the operator configured.
//! - The key family comes from the static algorithm classification, not from
//!   anything the token claims.
//! - Exhausting the candidates yields one uniform outcome. Which candidate
//!   came closest is never revealed.

use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;

use super::algorithm::KeyFamily;
use super::provider::{KeyMaterial, ProviderTrust, decode_public_key};

/// Tolerance applied to time-based claims (`exp`, `nbf`) during
/// verification, in seconds.
pub const CLOCK_SKEW_LEEWAY_SECS: u64 = 30;

/// Uniform failure outcome when no candidate key validates the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoMatch;

impl std::fmt::Display for NoMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid signature")
    }
}

impl std::error::Error for NoMatch {}

/// Claims extracted from a token whose signature has been verified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VerifiedClaims {
    /// Subject claim identifying the caller.
    pub sub: String,
    /// Optional display name claim propagated to the principal.
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Successful verification result: the verified claims and the trust record
/// whose key validated the signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    /// Claims from the now-trusted payload.
    pub claims: VerifiedClaims,
    /// `provider` field of the matching trust record.
    pub provider: String,
}

/// Try each candidate's key until one validates the token's signature.
///
/// Candidates whose key material does not match their algorithm's family, or
/// whose key cannot be built, are skipped; load-time validation makes both
/// unreachable, but verification must not crash on them.
///
/// # Errors
/// Returns [`NoMatch`] when no candidate verifies. The reason each
/// individual candidate failed is deliberately not reported.
pub fn verify_signature(
    candidates: &[&ProviderTrust],
    token: &str,
) -> Result<VerifiedToken, NoMatch> {
    for candidate in candidates {
        let Some(key) = decoding_key(candidate) else {
            continue;
        };

        let mut validation = Validation::new(candidate.algorithm.to_jwt());
        validation.leeway = CLOCK_SKEW_LEEWAY_SECS;
        validation.set_issuer(&[&candidate.issuer]);
        validation.set_audience(&[&candidate.audience]);
        validation.set_required_spec_claims(&["sub"]);

        if let Ok(data) = decode::<VerifiedClaims>(token, &key, &validation) {
            return Ok(VerifiedToken {
                claims: data.claims,
                provider: candidate.provider.clone(),
            });
        }
    }

    Err(NoMatch)
}

/// Build the decoding key for a candidate according to its algorithm's key
/// family. Returns `None` when the key material does not fit the family.
fn decoding_key(candidate: &ProviderTrust) -> Option<DecodingKey> {
    match (candidate.algorithm.family(), &candidate.key) {
        (KeyFamily::PublicKey, KeyMaterial::PublicKey(pem)) => {
            decode_public_key(candidate.algorithm, pem).ok()
        }
        (KeyFamily::SharedSecret, KeyMaterial::SharedKey(secret)) => {
            Some(DecodingKey::from_secret(secret))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::algorithm::SigningAlgorithm;
    use crate::testing::{
        EC_PRIVATE_KEY_PEM, EC_PUBLIC_KEY_PEM, RSA_PRIVATE_KEY_PEM, RSA_PUBLIC_KEY_PEM,
        SECOND_RSA_PRIVATE_KEY_PEM, SECOND_RSA_PUBLIC_KEY_PEM, TEST_AUDIENCE, TEST_ISSUER,
        ec_signing_key, hs256_token, rs256_token, rsa_signing_key, sign_claims, standard_claims,
    };
    use jsonwebtoken::{Algorithm, EncodingKey};
    use serde_json::json;

    fn hs256_trust(provider: &str, secret: &[u8]) -> ProviderTrust {
        ProviderTrust::new(
            provider.to_string(),
            TEST_ISSUER.to_string(),
            TEST_AUDIENCE.to_string(),
            SigningAlgorithm::Hs256,
            KeyMaterial::SharedKey(secret.to_vec()),
        )
        .expect("valid trust record")
    }

    fn rs256_trust(provider: &str) -> ProviderTrust {
        ProviderTrust::new(
            provider.to_string(),
            TEST_ISSUER.to_string(),
            TEST_AUDIENCE.to_string(),
            SigningAlgorithm::Rs256,
            KeyMaterial::PublicKey(RSA_PUBLIC_KEY_PEM.to_string()),
        )
        .expect("valid trust record")
    }

    fn now_secs() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("clock after epoch")
            .as_secs()
    }

    #[test]
    fn test_rs256_token_verifies() {
        let trust = rs256_trust("rsa-idp");
        let token = rs256_token("user-1");

        let verified = verify_signature(&[&trust], &token).expect("valid signature");
        assert_eq!(verified.claims.sub, "user-1");
        assert_eq!(verified.provider, "rsa-idp");
        assert!(verified.claims.display_name.is_none());
    }

    #[test]
    fn test_es256_token_verifies() {
        let trust = ProviderTrust::new(
            "ec-idp".to_string(),
            TEST_ISSUER.to_string(),
            TEST_AUDIENCE.to_string(),
            SigningAlgorithm::Es256,
            KeyMaterial::PublicKey(EC_PUBLIC_KEY_PEM.to_string()),
        )
        .expect("valid trust record");
        let token = sign_claims(
            Algorithm::ES256,
            &standard_claims("user-1"),
            &ec_signing_key(EC_PRIVATE_KEY_PEM),
        );

        let verified = verify_signature(&[&trust], &token).expect("valid signature");
        assert_eq!(verified.claims.sub, "user-1");
        assert_eq!(verified.provider, "ec-idp");
    }

    #[test]
    fn test_ps256_token_verifies() {
        // RSA-PSS records carry the same RSA key material as the PKCS#1
        // v1.5 variants.
        let trust = ProviderTrust::new(
            "pss-idp".to_string(),
            TEST_ISSUER.to_string(),
            TEST_AUDIENCE.to_string(),
            SigningAlgorithm::Ps256,
            KeyMaterial::PublicKey(RSA_PUBLIC_KEY_PEM.to_string()),
        )
        .expect("valid trust record");
        let token = sign_claims(
            Algorithm::PS256,
            &standard_claims("user-1"),
            &rsa_signing_key(RSA_PRIVATE_KEY_PEM),
        );

        let verified = verify_signature(&[&trust], &token).expect("valid signature");
        assert_eq!(verified.provider, "pss-idp");
    }

    #[test]
    fn test_token_without_exp_verifies() {
        // Only `sub` is required; a token with no expiry is accepted.
        let trust = hs256_trust("idp", b"a-secret-that-is-long-enough");
        let token = sign_claims(
            Algorithm::HS256,
            &json!({
                "iss": TEST_ISSUER,
                "aud": TEST_AUDIENCE,
                "sub": "user-1",
            }),
            &EncodingKey::from_secret(b"a-secret-that-is-long-enough"),
        );

        assert!(verify_signature(&[&trust], &token).is_ok());
    }

    #[test]
    fn test_key_rotation_tries_candidates_in_order() {
        let first = hs256_trust("first-key", b"first-secret-that-is-long-enough");
        let second = hs256_trust("second-key", b"second-secret-that-is-long-enough");
        let token = hs256_token(b"second-secret-that-is-long-enough", "user-1");

        let verified = verify_signature(&[&first, &second], &token).expect("second key matches");
        assert_eq!(verified.provider, "second-key");
    }

    #[test]
    fn test_rsa_rotation_skips_stale_public_key() {
        let stale = ProviderTrust::new(
            "stale-key".to_string(),
            TEST_ISSUER.to_string(),
            TEST_AUDIENCE.to_string(),
            SigningAlgorithm::Rs256,
            KeyMaterial::PublicKey(SECOND_RSA_PUBLIC_KEY_PEM.to_string()),
        )
        .expect("valid trust record");
        let current = rs256_trust("current-key");
        let token = rs256_token("user-1");

        let verified =
            verify_signature(&[&stale, &current], &token).expect("current key matches");
        assert_eq!(verified.provider, "current-key");
    }

    #[test]
    fn test_tampered_signature_fails_with_correct_claims() {
        let trust = rs256_trust("rsa-idp");
        let token = sign_claims(
            Algorithm::RS256,
            &standard_claims("user-1"),
            &rsa_signing_key(SECOND_RSA_PRIVATE_KEY_PEM),
        );

        assert_eq!(verify_signature(&[&trust], &token), Err(NoMatch));
    }

    #[test]
    fn test_no_candidates_is_no_match() {
        let token = rs256_token("user-1");
        assert_eq!(verify_signature(&[], &token), Err(NoMatch));
    }

    #[test]
    fn test_expired_token_fails() {
        let trust = hs256_trust("idp", b"a-secret-that-is-long-enough");
        let token = sign_claims(
            Algorithm::HS256,
            &json!({
                "iss": TEST_ISSUER,
                "aud": TEST_AUDIENCE,
                "sub": "user-1",
                "exp": now_secs() - 300,
            }),
            &EncodingKey::from_secret(b"a-secret-that-is-long-enough"),
        );

        assert_eq!(verify_signature(&[&trust], &token), Err(NoMatch));
    }

    #[test]
    fn test_expiry_within_leeway_passes() {
        let trust = hs256_trust("idp", b"a-secret-that-is-long-enough");
        let token = sign_claims(
            Algorithm::HS256,
            &json!({
                "iss": TEST_ISSUER,
                "aud": TEST_AUDIENCE,
                "sub": "user-1",
                "exp": now_secs() - 10,
            }),
            &EncodingKey::from_secret(b"a-secret-that-is-long-enough"),
        );

        assert!(verify_signature(&[&trust], &token).is_ok());
    }

    #[test]
    fn test_display_name_claim_is_extracted() {
        let trust = hs256_trust("idp", b"a-secret-that-is-long-enough");
        let token = sign_claims(
            Algorithm::HS256,
            &json!({
                "iss": TEST_ISSUER,
                "aud": TEST_AUDIENCE,
                "sub": "user-1",
                "display_name": "User One",
                "exp": 4_102_444_800_u64,
            }),
            &EncodingKey::from_secret(b"a-secret-that-is-long-enough"),
        );

        let verified = verify_signature(&[&trust], &token).expect("valid signature");
        assert_eq!(verified.claims.display_name.as_deref(), Some("User One"));
    }

    #[test]
    fn test_reverification_is_idempotent() {
        let trust = rs256_trust("rsa-idp");
        let token = rs256_token("user-1");

        let first = verify_signature(&[&trust], &token).expect("valid signature");
        let second = verify_signature(&[&trust], &token).expect("valid signature");
        assert_eq!(first.claims.sub, second.claims.sub);
        assert_eq!(first.provider, second.provider);
    }

    #[test]
    fn test_mismatched_key_material_is_skipped() {
        // Construct the inconsistent record directly; ProviderTrust::new
        // would reject it at load time.
        let broken = ProviderTrust {
            provider: "broken".to_string(),
            issuer: TEST_ISSUER.to_string(),
            audience: TEST_AUDIENCE.to_string(),
            algorithm: SigningAlgorithm::Rs256,
            key: KeyMaterial::SharedKey(b"not-a-public-key".to_vec()),
        };
        let good = rs256_trust("rsa-idp");
        let token = rs256_token("user-1");

        let verified = verify_signature(&[&broken, &good], &token).expect("good key matches");
        assert_eq!(verified.provider, "rsa-idp");
    }

    #[test]
    fn test_hs256_token_against_rsa_record_fails() {
        // Even if narrowing were bypassed, a single-algorithm validation
        // refuses an HS256 token against an RS256 record.
        let trust = rs256_trust("rsa-idp");
        let token = hs256_token(RSA_PUBLIC_KEY_PEM.as_bytes(), "user-1");

        assert_eq!(verify_signature(&[&trust], &token), Err(NoMatch));
    }
}
