//! Hybrid encryption and key management.
//!
//! Log payloads are protected with an authenticated symmetric cipher using a
//! fresh random key per operation ([`symmetric`]); that key is then wrapped
//! for the intended recipient with an asymmetric public key
//! ([`asymmetric`]). The [`keys`] module keeps a durable key pair on disk
//! and the [`envelope`] module ties the layers together.
//!
//! All cryptographic failures fail closed: an error is returned, never
//! partial or degraded output.

pub mod asymmetric;
pub mod envelope;
pub mod keys;
pub mod symmetric;

use thiserror::Error;

pub use asymmetric::{KeyAlgorithm, KeyPair, PrivateKey, PublicKey};
pub use envelope::{open, seal, SealedLog};
pub use keys::KeyManager;
pub use symmetric::{KeyLength, SymmetricKey};

/// Errors produced by the encryption and key-management layer.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// I/O error during key file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Symmetric key length is not one of 128, 192, or 256 bits.
    #[error("unsupported symmetric key length: {0} bits")]
    UnsupportedSymmetricLength(u32),

    /// Asymmetric key length is not supported by the chosen algorithm.
    #[error("unsupported key length {bits} for {algorithm}")]
    UnsupportedKeyLength { algorithm: KeyAlgorithm, bits: u32 },

    /// The named key algorithm is not one of rsa, ecdsa, or ed25519.
    #[error("unsupported key algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Ciphertext is shorter than the nonce it must carry.
    #[error("ciphertext too short: {len} bytes, need at least {min}")]
    CiphertextTooShort { len: usize, min: usize },

    /// Ciphertext failed authentication during decryption.
    #[error("ciphertext authentication failed")]
    AuthenticationFailed,

    /// The symmetric cipher rejected the encryption request.
    #[error("encryption failed")]
    EncryptionFailed,

    /// Plaintext exceeds what the padding scheme allows for the key size.
    #[error("payload too large for {bits}-bit RSA key: {len} > {max} bytes")]
    PayloadTooLarge { bits: usize, len: usize, max: usize },

    /// The algorithm has no native key-wrapping operation.
    #[error("{algorithm} keys do not support key wrapping")]
    WrapUnsupported { algorithm: KeyAlgorithm },

    /// RSA operation failed.
    #[error("RSA error: {0}")]
    Rsa(#[from] rsa::Error),

    /// PKCS#1 encoding or decoding failed.
    #[error("PKCS#1 error: {0}")]
    Pkcs1(#[from] rsa::pkcs1::Error),

    /// PKCS#8 encoding or decoding failed.
    #[error("PKCS#8 error: {0}")]
    Pkcs8(#[from] pkcs8::Error),

    /// SPKI public-key encoding or decoding failed.
    #[error("SPKI error: {0}")]
    Spki(#[from] pkcs8::spki::Error),

    /// Elliptic-curve key handling failed.
    #[error("elliptic curve error: {0}")]
    EllipticCurve(#[from] elliptic_curve::Error),

    /// Key material is malformed for the expected algorithm.
    #[error("invalid key material: {0}")]
    InvalidKey(String),
}

/// Result type for cryptographic operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
