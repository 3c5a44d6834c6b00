//! Key material loading for symmetric and asymmetric signing schemes.

use std::path::Path;

use jsonwebtoken::{DecodingKey, EncodingKey};

use crate::algorithm::{AlgorithmId, SigningScheme};
use crate::error::SignerError;

const MIN_SYMMETRIC_KEY_BYTES: usize = 32;

/// The key material a [`crate::signer::Signer`] holds. One variant per
/// scheme; each owns exactly the key shape the underlying primitive needs,
/// instead of an interface-typed field that could hold either.
pub enum KeyMaterial {
    Symmetric {
        encoding: EncodingKey,
        decoding: DecodingKey,
    },
    Asymmetric {
        encoding: EncodingKey,
        decoding: DecodingKey,
    },
}

impl KeyMaterial {
    pub fn encoding_key(&self) -> &EncodingKey {
        match self {
            KeyMaterial::Symmetric { encoding, .. } => encoding,
            KeyMaterial::Asymmetric { encoding, .. } => encoding,
        }
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        match self {
            KeyMaterial::Symmetric { decoding, .. } => decoding,
            KeyMaterial::Asymmetric { decoding, .. } => decoding,
        }
    }

    /// Loads symmetric key material from raw bytes supplied in configuration.
    pub fn load_symmetric(key_bytes: &[u8]) -> Result<Self, SignerError> {
        if key_bytes.len() < MIN_SYMMETRIC_KEY_BYTES {
            return Err(SignerError::InvalidConfig(format!(
                "symmetric key must be at least {MIN_SYMMETRIC_KEY_BYTES} bytes, got {}",
                key_bytes.len()
            )));
        }
        Ok(KeyMaterial::Symmetric {
            encoding: EncodingKey::from_secret(key_bytes),
            decoding: DecodingKey::from_secret(key_bytes),
        })
    }

    /// Loads asymmetric key material from PEM files on disk. The private
    /// key file's permissions are checked before it is read.
    pub fn load_asymmetric(
        algorithm: AlgorithmId,
        private_key_path: &Path,
        public_key_path: &Path,
    ) -> Result<Self, SignerError> {
        check_private_key_permissions(private_key_path)?;

        let private_pem = std::fs::read(private_key_path).map_err(|e| {
            SignerError::KeyLoadFailed(format!(
                "reading private key {}: {e}",
                private_key_path.display()
            ))
        })?;
        let public_pem = std::fs::read(public_key_path).map_err(|e| {
            SignerError::KeyLoadFailed(format!(
                "reading public key {}: {e}",
                public_key_path.display()
            ))
        })?;
        let public_pem = normalize_public_key_pem(&public_pem)?;

        let (encoding, decoding) = match algorithm {
            AlgorithmId::Rs256 | AlgorithmId::Rs384 | AlgorithmId::Rs512
            | AlgorithmId::Ps256 | AlgorithmId::Ps384 | AlgorithmId::Ps512 => (
                EncodingKey::from_rsa_pem(&private_pem)
                    .map_err(|e| SignerError::KeyLoadFailed(format!("RSA private key: {e}")))?,
                DecodingKey::from_rsa_pem(&public_pem)
                    .map_err(|e| SignerError::KeyLoadFailed(format!("RSA public key: {e}")))?,
            ),
            AlgorithmId::Es256 | AlgorithmId::Es384 | AlgorithmId::Es512 => (
                EncodingKey::from_ec_pem(&private_pem)
                    .map_err(|e| SignerError::KeyLoadFailed(format!("EC private key: {e}")))?,
                DecodingKey::from_ec_pem(&public_pem)
                    .map_err(|e| SignerError::KeyLoadFailed(format!("EC public key: {e}")))?,
            ),
            AlgorithmId::EdDsa => (
                EncodingKey::from_ed_pem(&private_pem)
                    .map_err(|e| SignerError::KeyLoadFailed(format!("Ed25519 private key: {e}")))?,
                DecodingKey::from_ed_pem(&public_pem)
                    .map_err(|e| SignerError::KeyLoadFailed(format!("Ed25519 public key: {e}")))?,
            ),
            AlgorithmId::Hs256 | AlgorithmId::Hs384 | AlgorithmId::Hs512 => {
                return Err(SignerError::InvalidConfig(
                    "symmetric algorithm cannot load asymmetric key material".to_string(),
                ))
            }
        };

        Ok(KeyMaterial::Asymmetric { encoding, decoding })
    }
}

/// Rejects private key files whose permission bits allow anything beyond
/// owner read/write. This check only applies on Unix; there is no portable
/// equivalent, so the check is a no-op elsewhere.
#[cfg(unix)]
fn check_private_key_permissions(path: &Path) -> Result<(), SignerError> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path).map_err(|e| {
        SignerError::KeyLoadFailed(format!("stat private key {}: {e}", path.display()))
    })?;
    let mode = metadata.permissions().mode();
    // Anything beyond owner rwx (the low three bits are meaningless for a
    // key file but we only forbid group/other access) trips the rejection.
    if mode & 0o077 != 0 {
        return Err(SignerError::InsecureKeyPermissions(format!(
            "{} has mode {:o}, expected no group/other access",
            path.display(),
            mode & 0o777
        )));
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_private_key_permissions(_path: &Path) -> Result<(), SignerError> {
    Ok(())
}

/// If the public key file is actually an X.509 certificate, extract the
/// embedded SubjectPublicKeyInfo and re-encode it as a standalone PEM public
/// key so the rest of the loading path can treat it uniformly. If it is
/// already a plain public key PEM, it is returned unchanged.
fn normalize_public_key_pem(pem_bytes: &[u8]) -> Result<Vec<u8>, SignerError> {
    let text = std::str::from_utf8(pem_bytes)
        .map_err(|e| SignerError::KeyLoadFailed(format!("public key file is not UTF-8: {e}")))?;

    if !text.contains("BEGIN CERTIFICATE") {
        return Ok(pem_bytes.to_vec());
    }

    let (_, pem) = x509_parser::pem::parse_x509_pem(pem_bytes)
        .map_err(|e| SignerError::KeyLoadFailed(format!("parsing certificate PEM: {e}")))?;
    let cert = pem
        .parse_x509()
        .map_err(|e| SignerError::KeyLoadFailed(format!("parsing certificate DER: {e}")))?;
    let spki_der = cert.public_key().raw;

    Ok(der_to_pem(spki_der, "PUBLIC KEY").into_bytes())
}

fn der_to_pem(der: &[u8], label: &str) -> String {
    use base64::Engine;
    let encoded = base64::engine::general_purpose::STANDARD.encode(der);
    let mut out = format!("-----BEGIN {label}-----\n");
    for chunk in encoded.as_bytes().chunks(64) {
        out.push_str(std::str::from_utf8(chunk).unwrap());
        out.push('\n');
    }
    out.push_str(&format!("-----END {label}-----\n"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_key_too_short_is_rejected() {
        let err = KeyMaterial::load_symmetric(&[b'k'; 31]).unwrap_err();
        assert!(matches!(err, SignerError::InvalidConfig(_)));
    }

    #[test]
    fn symmetric_key_minimum_length_is_accepted() {
        assert!(KeyMaterial::load_symmetric(&[b'k'; 32]).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn insecure_private_key_permissions_are_rejected() {
        let path =
            Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/test_keys/rsa_private_insecure.pem"));
        let err = check_private_key_permissions(path).unwrap_err();
        assert!(matches!(err, SignerError::InsecureKeyPermissions(_)));
    }

    #[cfg(unix)]
    #[test]
    fn owner_only_private_key_permissions_are_accepted() {
        let path = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/test_keys/rsa_private_pkcs1.pem"));
        assert!(check_private_key_permissions(path).is_ok());
    }

    #[test]
    fn certificate_public_key_is_normalized() {
        let cert_pem =
            std::fs::read(concat!(env!("CARGO_MANIFEST_DIR"), "/test_keys/rsa_cert.pem")).unwrap();
        let normalized = normalize_public_key_pem(&cert_pem).unwrap();
        let text = String::from_utf8(normalized).unwrap();
        assert!(text.starts_with("-----BEGIN PUBLIC KEY-----"));
    }

    #[test]
    fn plain_public_key_pem_passes_through() {
        let pub_pem =
            std::fs::read(concat!(env!("CARGO_MANIFEST_DIR"), "/test_keys/rsa_public.pem")).unwrap();
        let normalized = normalize_public_key_pem(&pub_pem).unwrap();
        assert_eq!(normalized, pub_pem);
    }
}
