//! Signing algorithm classification.
//!
//! Every trust record declares exactly one signing algorithm. Algorithms are
//! statically classified into a key family: asymmetric public-key algorithms
//! (RSA, ECDSA, RSA-PSS) or shared-secret HMAC algorithms. The family decides
//! which kind of key material a trust record must carry, and at request time
//! which kind of decoding key is built for verification.
//!
//! # Invariants
//! - Classification is a fixed table. It is never derived from configuration
//!   or from anything a token claims, so a forged `alg` header cannot steer
//!   verification toward an attacker-chosen key type.

use jsonwebtoken::Algorithm;

/// The two kinds of key material a signing algorithm can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    /// Asymmetric algorithms verified with a PEM-encoded public key.
    PublicKey,
    /// Symmetric HMAC algorithms verified with a shared secret.
    SharedSecret,
}

/// A JWT signing algorithm accepted by the gateway.
///
/// ES512 (P-521) is deliberately absent: the verification library's ECDSA
/// support stops at P-384, so a trust file declaring it is rejected at load
/// as an unsupported algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningAlgorithm {
    /// RSASSA-PKCS1-v1_5 using SHA-256.
    Rs256,
    /// RSASSA-PKCS1-v1_5 using SHA-384.
    Rs384,
    /// RSASSA-PKCS1-v1_5 using SHA-512.
    Rs512,
    /// ECDSA using P-256 and SHA-256.
    Es256,
    /// ECDSA using P-384 and SHA-384.
    Es384,
    /// RSASSA-PSS using SHA-256.
    Ps256,
    /// RSASSA-PSS using SHA-384.
    Ps384,
    /// RSASSA-PSS using SHA-512.
    Ps512,
    /// HMAC using SHA-256.
    Hs256,
    /// HMAC using SHA-384.
    Hs384,
    /// HMAC using SHA-512.
    Hs512,
}

impl SigningAlgorithm {
    /// Parse an algorithm name as it appears in trust files and token headers.
    ///
    /// Returns `None` for any name outside the two supported families.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "RS256" => Some(Self::Rs256),
            "RS384" => Some(Self::Rs384),
            "RS512" => Some(Self::Rs512),
            "ES256" => Some(Self::Es256),
            "ES384" => Some(Self::Es384),
            "PS256" => Some(Self::Ps256),
            "PS384" => Some(Self::Ps384),
            "PS512" => Some(Self::Ps512),
            "HS256" => Some(Self::Hs256),
            "HS384" => Some(Self::Hs384),
            "HS512" => Some(Self::Hs512),
            _ => None,
        }
    }

    /// The canonical name of this algorithm.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
            Self::Es256 => "ES256",
            Self::Es384 => "ES384",
            Self::Ps256 => "PS256",
            Self::Ps384 => "PS384",
            Self::Ps512 => "PS512",
            Self::Hs256 => "HS256",
            Self::Hs384 => "HS384",
            Self::Hs512 => "HS512",
        }
    }

    /// The key family this algorithm belongs to.
    ///
    /// This is the static classification table; it is the only place in the
    /// gateway that decides asymmetric versus symmetric.
    #[must_use]
    pub const fn family(self) -> KeyFamily {
        match self {
            Self::Rs256
            | Self::Rs384
            | Self::Rs512
            | Self::Es256
            | Self::Es384
            | Self::Ps256
            | Self::Ps384
            | Self::Ps512 => KeyFamily::PublicKey,
            Self::Hs256 | Self::Hs384 | Self::Hs512 => KeyFamily::SharedSecret,
        }
    }

    /// Whether this algorithm is an ECDSA variant.
    ///
    /// ECDSA public keys use a different PEM parser than RSA keys.
    #[must_use]
    pub const fn is_ecdsa(self) -> bool {
        matches!(self, Self::Es256 | Self::Es384)
    }

    /// The corresponding `jsonwebtoken` algorithm.
    #[must_use]
    pub const fn to_jwt(self) -> Algorithm {
        match self {
            Self::Rs256 => Algorithm::RS256,
            Self::Rs384 => Algorithm::RS384,
            Self::Rs512 => Algorithm::RS512,
            Self::Es256 => Algorithm::ES256,
            Self::Es384 => Algorithm::ES384,
            Self::Ps256 => Algorithm::PS256,
            Self::Ps384 => Algorithm::PS384,
            Self::Ps512 => Algorithm::PS512,
            Self::Hs256 => Algorithm::HS256,
            Self::Hs384 => Algorithm::HS384,
            Self::Hs512 => Algorithm::HS512,
        }
    }
}

impl std::fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
