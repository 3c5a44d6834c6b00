//! Deterministic binding of a claim map to a signed compact token string,
//! and the inverse with algorithm pinning.

use std::collections::BTreeMap;
use std::path::Path;

use jsonwebtoken::{decode, encode, Header, Validation};
use serde_json::Value;

use crate::algorithm::{AlgorithmId, SigningScheme};
use crate::error::SignerError;
use crate::keys::KeyMaterial;

/// A generic claim map: the representation the Claim Codec hands to and
/// receives from the Signer. Keyed by wire claim name (`jti`, `sub`, ...).
pub type ClaimMap = BTreeMap<String, Value>;

/// Configuration for constructing a [`Signer`].
pub struct SignerConfig {
    pub scheme: SigningScheme,
    pub algorithm: AlgorithmId,
    pub allowed_algorithms: Vec<AlgorithmId>,
}

/// Encapsulates one signing algorithm and its key material. Built once at
/// Maker construction and held for the lifetime of the process.
pub struct Signer {
    algorithm: AlgorithmId,
    jwt_algorithm: jsonwebtoken::Algorithm,
    keys: KeyMaterial,
}

impl Signer {
    /// Constructs a signer from raw symmetric key bytes.
    pub fn new_symmetric(config: &SignerConfig, key_bytes: &[u8]) -> Result<Self, SignerError> {
        Self::check_scheme_and_allowlist(config, SigningScheme::Symmetric)?;
        let keys = KeyMaterial::load_symmetric(key_bytes)?;
        let jwt_algorithm = config.algorithm.to_jsonwebtoken()?;
        Ok(Self {
            algorithm: config.algorithm,
            jwt_algorithm,
            keys,
        })
    }

    /// Constructs a signer from PEM key files on disk.
    pub fn new_asymmetric(
        config: &SignerConfig,
        private_key_path: &Path,
        public_key_path: &Path,
    ) -> Result<Self, SignerError> {
        Self::check_scheme_and_allowlist(config, SigningScheme::Asymmetric)?;
        let keys =
            KeyMaterial::load_asymmetric(config.algorithm, private_key_path, public_key_path)?;
        let jwt_algorithm = config.algorithm.to_jsonwebtoken()?;
        Ok(Self {
            algorithm: config.algorithm,
            jwt_algorithm,
            keys,
        })
    }

    fn check_scheme_and_allowlist(
        config: &SignerConfig,
        expected: SigningScheme,
    ) -> Result<(), SignerError> {
        if config.scheme != expected {
            return Err(SignerError::InvalidConfig(format!(
                "algorithm {} requires {:?} key material, configured scheme is {:?}",
                config.algorithm, expected, config.scheme
            )));
        }
        if config.algorithm.scheme() != config.scheme {
            return Err(SignerError::InvalidConfig(format!(
                "algorithm {} is not compatible with signing scheme {:?}",
                config.algorithm, config.scheme
            )));
        }
        if !config.allowed_algorithms.is_empty()
            && !config.allowed_algorithms.contains(&config.algorithm)
        {
            return Err(SignerError::InvalidConfig(format!(
                "algorithm {} is not present in the configured allow-list",
                config.algorithm
            )));
        }
        Ok(())
    }

    pub fn algorithm(&self) -> AlgorithmId {
        self.algorithm
    }

    /// Serializes a claim map into a signed three-part compact token.
    pub fn sign(&self, claims: &ClaimMap) -> Result<String, SignerError> {
        let header = Header::new(self.jwt_algorithm);
        encode(&header, claims, self.keys.encoding_key())
            .map_err(|e| SignerError::CryptoFailure(e.to_string()))
    }

    /// Verifies a signed compact token and returns its decoded claim map.
    ///
    /// Rejects any token whose advertised `alg` differs from the algorithm
    /// this signer was constructed with — there is no algorithm
    /// polymorphism on the receive side.
    pub fn verify(&self, token: &str) -> Result<ClaimMap, SignerError> {
        let header = jsonwebtoken::decode_header(token).map_err(|_| SignerError::Malformed)?;
        if header.alg != self.jwt_algorithm {
            return Err(SignerError::AlgorithmMismatch);
        }

        let mut validation = Validation::new(self.jwt_algorithm);
        // Time-window, issuer, and audience checks are the Maker's and
        // Codec's responsibility (§4.5/§4.2); the Signer only authenticates
        // the bytes and pins the algorithm.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<ClaimMap>(token, self.keys.decoding_key(), &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidToken
                | jsonwebtoken::errors::ErrorKind::Base64(_)
                | jsonwebtoken::errors::ErrorKind::Json(_) => SignerError::Malformed,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => SignerError::BadSignature,
                _ => SignerError::BadSignature,
            },
        )?;

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_key_path(name: &str) -> PathBuf {
        PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/test_keys")).join(name)
    }

    fn sample_claims() -> ClaimMap {
        let mut claims = ClaimMap::new();
        claims.insert("sub".into(), Value::String("user-1".into()));
        claims.insert("exp".into(), Value::Number(9999999999i64.into()));
        claims
    }

    #[test]
    fn hmac_sign_and_verify_round_trips() {
        let config = SignerConfig {
            scheme: SigningScheme::Symmetric,
            algorithm: AlgorithmId::Hs256,
            allowed_algorithms: vec![],
        };
        let signer = Signer::new_symmetric(&config, &[b'k'; 32]).unwrap();
        let token = signer.sign(&sample_claims()).unwrap();
        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.get("sub").unwrap(), "user-1");
    }

    #[test]
    fn algorithm_mismatch_is_rejected_on_verify() {
        let signing_config = SignerConfig {
            scheme: SigningScheme::Symmetric,
            algorithm: AlgorithmId::Hs256,
            allowed_algorithms: vec![],
        };
        let signer = Signer::new_symmetric(&signing_config, &[b'k'; 32]).unwrap();
        let token = signer.sign(&sample_claims()).unwrap();

        let verifying_config = SignerConfig {
            scheme: SigningScheme::Symmetric,
            algorithm: AlgorithmId::Hs512,
            allowed_algorithms: vec![],
        };
        let verifier = Signer::new_symmetric(&verifying_config, &[b'k'; 32]).unwrap();
        let err = verifier.verify(&token).unwrap_err();
        assert!(matches!(err, SignerError::AlgorithmMismatch));
    }

    #[test]
    fn tampered_payload_fails_bad_signature() {
        let config = SignerConfig {
            scheme: SigningScheme::Symmetric,
            algorithm: AlgorithmId::Hs256,
            allowed_algorithms: vec![],
        };
        let signer = Signer::new_symmetric(&config, &[b'k'; 32]).unwrap();
        let token = signer.sign(&sample_claims()).unwrap();

        let mut parts: Vec<&str> = token.split('.').collect();
        let tampered_payload = if parts[1].ends_with('A') {
            format!("{}B", &parts[1][..parts[1].len() - 1])
        } else {
            format!("{}A", &parts[1][..parts[1].len() - 1])
        };
        parts[1] = &tampered_payload;
        let tampered = parts.join(".");

        let err = signer.verify(&tampered).unwrap_err();
        assert!(matches!(err, SignerError::BadSignature | SignerError::Malformed));
    }

    #[test]
    fn disallowed_algorithm_rejected_at_construction() {
        let config = SignerConfig {
            scheme: SigningScheme::Symmetric,
            algorithm: AlgorithmId::Hs256,
            allowed_algorithms: vec![AlgorithmId::Hs512],
        };
        let err = Signer::new_symmetric(&config, &[b'k'; 32]).unwrap_err();
        assert!(matches!(err, SignerError::InvalidConfig(_)));
    }

    #[test]
    fn rsa_sign_and_verify_round_trips() {
        let config = SignerConfig {
            scheme: SigningScheme::Asymmetric,
            algorithm: AlgorithmId::Rs256,
            allowed_algorithms: vec![],
        };
        let signer = Signer::new_asymmetric(
            &config,
            &test_key_path("rsa_private_pkcs1.pem"),
            &test_key_path("rsa_public.pem"),
        )
        .unwrap();
        let token = signer.sign(&sample_claims()).unwrap();
        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.get("sub").unwrap(), "user-1");
    }

    #[test]
    fn rsa_certificate_as_public_key_verifies() {
        let config = SignerConfig {
            scheme: SigningScheme::Asymmetric,
            algorithm: AlgorithmId::Rs256,
            allowed_algorithms: vec![],
        };
        let signer = Signer::new_asymmetric(
            &config,
            &test_key_path("rsa_private_pkcs1.pem"),
            &test_key_path("rsa_cert.pem"),
        )
        .unwrap();
        let token = signer.sign(&sample_claims()).unwrap();
        assert!(signer.verify(&token).is_ok());
    }

    #[test]
    fn ed25519_sign_and_verify_round_trips() {
        let config = SignerConfig {
            scheme: SigningScheme::Asymmetric,
            algorithm: AlgorithmId::EdDsa,
            allowed_algorithms: vec![],
        };
        let signer = Signer::new_asymmetric(
            &config,
            &test_key_path("ed25519_private.pem"),
            &test_key_path("ed25519_public.pem"),
        )
        .unwrap();
        let token = signer.sign(&sample_claims()).unwrap();
        assert!(signer.verify(&token).is_ok());
    }

    #[test]
    fn ecdsa_p256_sign_and_verify_round_trips() {
        let config = SignerConfig {
            scheme: SigningScheme::Asymmetric,
            algorithm: AlgorithmId::Es256,
            allowed_algorithms: vec![],
        };
        let signer = Signer::new_asymmetric(
            &config,
            &test_key_path("ec_p256_private.pem"),
            &test_key_path("ec_p256_public.pem"),
        )
        .unwrap();
        let token = signer.sign(&sample_claims()).unwrap();
        assert!(signer.verify(&token).is_ok());
    }

    #[test]
    fn es512_cannot_be_constructed() {
        let config = SignerConfig {
            scheme: SigningScheme::Asymmetric,
            algorithm: AlgorithmId::Es512,
            allowed_algorithms: vec![],
        };
        let err = Signer::new_asymmetric(
            &config,
            &test_key_path("ec_p384_private.pem"),
            &test_key_path("ec_p384_public.pem"),
        )
        .unwrap_err();
        assert!(matches!(err, SignerError::InvalidConfig(_)));
    }
}
