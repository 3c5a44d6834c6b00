//! The fixed algorithm identifier namespace and its signing-scheme partition.

use std::fmt;
use std::str::FromStr;

use crate::error::SignerError;

/// Whether a signing algorithm uses a shared secret or a key pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningScheme {
    Symmetric,
    Asymmetric,
}

/// The fixed set of accepted algorithm identifiers. `none` is never a valid
/// member of this type — constructing one from the wire requires one of
/// these variants to parse, so the classic `alg: none` bypass has no path in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmId {
    Hs256,
    Hs384,
    Hs512,
    Rs256,
    Rs384,
    Rs512,
    Ps256,
    Ps384,
    Ps512,
    Es256,
    Es384,
    Es512,
    EdDsa,
}

impl AlgorithmId {
    pub fn scheme(self) -> SigningScheme {
        match self {
            AlgorithmId::Hs256 | AlgorithmId::Hs384 | AlgorithmId::Hs512 => {
                SigningScheme::Symmetric
            }
            _ => SigningScheme::Asymmetric,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlgorithmId::Hs256 => "HS256",
            AlgorithmId::Hs384 => "HS384",
            AlgorithmId::Hs512 => "HS512",
            AlgorithmId::Rs256 => "RS256",
            AlgorithmId::Rs384 => "RS384",
            AlgorithmId::Rs512 => "RS512",
            AlgorithmId::Ps256 => "PS256",
            AlgorithmId::Ps384 => "PS384",
            AlgorithmId::Ps512 => "PS512",
            AlgorithmId::Es256 => "ES256",
            AlgorithmId::Es384 => "ES384",
            AlgorithmId::Es512 => "ES512",
            AlgorithmId::EdDsa => "EdDSA",
        }
    }

    /// Maps to the `jsonwebtoken` crate's algorithm enum. `ES512` has no
    /// counterpart in `jsonwebtoken` 9.x; callers must reject it at
    /// construction rather than silently downgrade (see DESIGN.md O3).
    pub fn to_jsonwebtoken(self) -> Result<jsonwebtoken::Algorithm, SignerError> {
        use jsonwebtoken::Algorithm as A;
        Ok(match self {
            AlgorithmId::Hs256 => A::HS256,
            AlgorithmId::Hs384 => A::HS384,
            AlgorithmId::Hs512 => A::HS512,
            AlgorithmId::Rs256 => A::RS256,
            AlgorithmId::Rs384 => A::RS384,
            AlgorithmId::Rs512 => A::RS512,
            AlgorithmId::Ps256 => A::PS256,
            AlgorithmId::Ps384 => A::PS384,
            AlgorithmId::Ps512 => A::PS512,
            AlgorithmId::Es256 => A::ES256,
            AlgorithmId::Es384 => A::ES384,
            AlgorithmId::EdDsa => A::EdDSA,
            AlgorithmId::Es512 => {
                return Err(SignerError::InvalidConfig(
                    "ES512 is not supported by the underlying JWT library".to_string(),
                ))
            }
        })
    }
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlgorithmId {
    type Err = SignerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "HS256" => AlgorithmId::Hs256,
            "HS384" => AlgorithmId::Hs384,
            "HS512" => AlgorithmId::Hs512,
            "RS256" => AlgorithmId::Rs256,
            "RS384" => AlgorithmId::Rs384,
            "RS512" => AlgorithmId::Rs512,
            "PS256" => AlgorithmId::Ps256,
            "PS384" => AlgorithmId::Ps384,
            "PS512" => AlgorithmId::Ps512,
            "ES256" => AlgorithmId::Es256,
            "ES384" => AlgorithmId::Es384,
            "ES512" => AlgorithmId::Es512,
            "EdDSA" => AlgorithmId::EdDsa,
            other => {
                return Err(SignerError::InvalidConfig(format!(
                    "unknown or unsupported algorithm identifier: {other}"
                )))
            }
        })
    }
}
