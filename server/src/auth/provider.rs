//! Provider trust records.
//!
//! A trust record describes one token issuer the gateway accepts: the exact
//! issuer and audience claims it must present, the single signing algorithm
//! it may use, and the key material that verifies its signatures.
//!
//! # Pre-conditions
//! - Key material must match the declared algorithm's key family.
//!
//! # Post-conditions
//! - `ProviderTrust` instances are immutable once created.
//!
//! # Invariants
//! - A record carries exactly one kind of key material, and it is always the
//!   kind the algorithm's family requires.
//! - Shared secrets are never empty.

use jsonwebtoken::DecodingKey;

use super::algorithm::{KeyFamily, SigningAlgorithm};

/// Error returned when a trust record's key material is invalid.
#[derive(Debug)]
pub enum TrustError {
    /// The algorithm requires a public key but a shared key was supplied,
    /// or the other way around.
    KeyFamilyMismatch {
        /// The declared algorithm.
        algorithm: SigningAlgorithm,
        /// The kind of key material that was supplied.
        supplied: &'static str,
    },
    /// The shared secret is empty.
    EmptySharedKey,
    /// The public key is not a valid PEM-encoded key for the algorithm.
    InvalidPublicKey(String),
}

impl std::fmt::Display for TrustError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeyFamilyMismatch { algorithm, supplied } => {
                write!(f, "algorithm {algorithm} cannot be verified with a {supplied}")
            }
            Self::EmptySharedKey => write!(f, "shared key must not be empty"),
            Self::InvalidPublicKey(reason) => write!(f, "invalid public key: {reason}"),
        }
    }
}

impl std::error::Error for TrustError {}

/// Key material attached to a trust record.
///
/// Exactly one variant is populated per record, matching the declared
/// algorithm's key family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    /// PEM-encoded public key for asymmetric verification.
    PublicKey(String),
    /// Shared secret bytes for HMAC verification.
    SharedKey(Vec<u8>),
}

impl KeyMaterial {
    /// The key family this material belongs to.
    #[must_use]
    pub const fn family(&self) -> KeyFamily {
        match self {
            Self::PublicKey(_) => KeyFamily::PublicKey,
            Self::SharedKey(_) => KeyFamily::SharedSecret,
        }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::PublicKey(_) => "public key",
            Self::SharedKey(_) => "shared key",
        }
    }
}

/// One provider the gateway trusts.
///
/// The `provider` field is an opaque label propagated to the resulting
/// principal; it takes no part in any trust decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderTrust {
    /// Opaque name of the issuing system.
    pub provider: String,
    /// Expected `iss` claim, exact match.
    pub issuer: String,
    /// Expected `aud` claim, exact match.
    pub audience: String,
    /// The one signing algorithm this record accepts.
    pub algorithm: SigningAlgorithm,
    /// Verification key for that algorithm.
    pub key: KeyMaterial,
}

impl ProviderTrust {
    /// Create a trust record, validating the key material against the
    /// algorithm's key family.
    ///
    /// # Errors
    /// Returns `TrustError::KeyFamilyMismatch` if the material kind does not
    /// match the family, `TrustError::EmptySharedKey` for an empty secret,
    /// and `TrustError::InvalidPublicKey` if a public key does not parse as
    /// PEM for the algorithm.
    pub fn new(
        provider: String,
        issuer: String,
        audience: String,
        algorithm: SigningAlgorithm,
        key: KeyMaterial,
    ) -> Result<Self, TrustError> {
        if key.family() != algorithm.family() {
            return Err(TrustError::KeyFamilyMismatch {
                algorithm,
                supplied: key.kind(),
            });
        }

        match &key {
            KeyMaterial::SharedKey(secret) => {
                if secret.is_empty() {
                    return Err(TrustError::EmptySharedKey);
                }
            }
            KeyMaterial::PublicKey(pem) => {
                // Parse once at load time so request-time failures are
                // limited to signature mismatches.
                decode_public_key(algorithm, pem)?;
            }
        }

        Ok(Self {
            provider,
            issuer,
            audience,
            algorithm,
            key,
        })
    }
}

/// Build a `jsonwebtoken` decoding key from a PEM public key.
///
/// ECDSA algorithms need the EC PEM parser; RSA and RSA-PSS share the RSA
/// parser.
pub(crate) fn decode_public_key(
    algorithm: SigningAlgorithm,
    pem: &str,
) -> Result<DecodingKey, TrustError> {
    let result = if algorithm.is_ecdsa() {
        DecodingKey::from_ec_pem(pem.as_bytes())
    } else {
        DecodingKey::from_rsa_pem(pem.as_bytes())
    };
    result.map_err(|e| TrustError::InvalidPublicKey(e.to_string()))
}

/// The immutable authentication snapshot produced at startup.
///
/// Built once by the configuration loader and shared read-only for the
/// process lifetime. Records keep the order in which the loader found them;
/// verification tries candidates in that order.
#[derive(Debug, Clone)]
pub struct AuthConfiguration {
    /// Ordered trust records. Several records may share an issuer and
    /// audience when a provider rotates keys.
    pub providers: Vec<ProviderTrust>,
    /// Whether requests without a token may proceed with no principal.
    pub allow_anonymous: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RSA_PUBLIC_KEY_PEM;

    #[test]
    fn test_new_hs256_with_shared_key() {
        let trust = ProviderTrust::new(
            "test-idp".to_string(),
            "https://idp.example".to_string(),
            "api".to_string(),
            SigningAlgorithm::Hs256,
            KeyMaterial::SharedKey(b"a-shared-secret".to_vec()),
        );
        assert!(trust.is_ok());
    }

    #[test]
    fn test_new_rs256_with_public_key() {
        let trust = ProviderTrust::new(
            "test-idp".to_string(),
            "https://idp.example".to_string(),
            "api".to_string(),
            SigningAlgorithm::Rs256,
            KeyMaterial::PublicKey(RSA_PUBLIC_KEY_PEM.to_string()),
        );
        assert!(trust.is_ok());
    }

    #[test]
    fn test_new_rejects_family_mismatch() {
        let result = ProviderTrust::new(
            "test-idp".to_string(),
            "https://idp.example".to_string(),
            "api".to_string(),
            SigningAlgorithm::Rs256,
            KeyMaterial::SharedKey(b"secret".to_vec()),
        );
        assert!(matches!(result, Err(TrustError::KeyFamilyMismatch { .. })));

        let result = ProviderTrust::new(
            "test-idp".to_string(),
            "https://idp.example".to_string(),
            "api".to_string(),
            SigningAlgorithm::Hs256,
            KeyMaterial::PublicKey(RSA_PUBLIC_KEY_PEM.to_string()),
        );
        assert!(matches!(result, Err(TrustError::KeyFamilyMismatch { .. })));
    }

    #[test]
    fn test_new_rejects_empty_shared_key() {
        let result = ProviderTrust::new(
            "test-idp".to_string(),
            "https://idp.example".to_string(),
            "api".to_string(),
            SigningAlgorithm::Hs512,
            KeyMaterial::SharedKey(Vec::new()),
        );
        assert!(matches!(result, Err(TrustError::EmptySharedKey)));
    }

    #[test]
    fn test_new_rejects_invalid_pem() {
        let result = ProviderTrust::new(
            "test-idp".to_string(),
            "https://idp.example".to_string(),
            "api".to_string(),
            SigningAlgorithm::Rs256,
            KeyMaterial::PublicKey("not a pem key".to_string()),
        );
        assert!(matches!(result, Err(TrustError::InvalidPublicKey(_))));
    }

    #[test]
    fn test_trust_error_display() {
        let mismatch = TrustError::KeyFamilyMismatch {
            algorithm: SigningAlgorithm::Rs256,
            supplied: "shared key",
        };
        assert_eq!(
            mismatch.to_string(),
            "algorithm RS256 cannot be verified with a shared key"
        );
        assert_eq!(
            TrustError::EmptySharedKey.to_string(),
            "shared key must not be empty"
        );
        assert!(
            TrustError::InvalidPublicKey("bad".to_string())
                .to_string()
                .contains("bad")
        );
    }
}
