//! Multi-algorithm JWT signing and verification with algorithm pinning.
//!
//! A [`Signer`] binds one signing algorithm to one piece of key material. It
//! has no notion of claims beyond a generic [`ClaimMap`] — claim typing and
//! validation live one layer up, in the claim codec.

pub mod algorithm;
pub mod error;
pub mod keys;
pub mod signer;

pub use algorithm::{AlgorithmId, SigningScheme};
pub use error::SignerError;
pub use keys::KeyMaterial;
pub use signer::{ClaimMap, Signer, SignerConfig};
