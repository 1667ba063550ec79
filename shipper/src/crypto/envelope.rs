//! End-to-end log protection.
//!
//! Ties the symmetric and asymmetric layers together: each payload is
//! encrypted under a fresh symmetric key, and when a recipient public key is
//! configured that key is wrapped alongside the ciphertext. The plaintext
//! symmetric key is never written to persistent storage.

use std::fs;
use std::path::Path;

use base64::prelude::*;
use tracing::debug;

use super::asymmetric::{PrivateKey, PublicKey};
use super::symmetric::{self, KeyLength, SymmetricKey};
use super::{CryptoError, Result};

/// An encrypted log payload, optionally paired with its wrapped key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedLog {
    /// `nonce || sealed-data` produced by the symmetric layer.
    pub ciphertext: Vec<u8>,

    /// The symmetric key wrapped for the recipient, absent when no public
    /// key was configured.
    pub wrapped_key: Option<Vec<u8>>,
}

impl SealedLog {
    /// Persists the ciphertext and, when present, the base64-encoded
    /// wrapped key, ready for handoff to the upload pipeline.
    pub fn write(&self, log_path: &Path, key_path: &Path) -> Result<()> {
        fs::write(log_path, &self.ciphertext)?;
        if let Some(wrapped) = &self.wrapped_key {
            let mut encoded = BASE64_STANDARD.encode(wrapped);
            encoded.push('\n');
            fs::write(key_path, encoded)?;
        }
        debug!(
            log = %log_path.display(),
            wrapped = self.wrapped_key.is_some(),
            "Wrote sealed log"
        );
        Ok(())
    }

    /// Reads a wrapped key persisted by [`write`](Self::write).
    pub fn read_wrapped_key(key_path: &Path) -> Result<Vec<u8>> {
        let encoded = fs::read_to_string(key_path)?;
        BASE64_STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidKey(format!("wrapped key is not base64: {e}")))
    }
}

/// Seals a payload under a fresh symmetric key.
///
/// When `recipient` is present the key is wrapped with it; otherwise the
/// wrapping step is skipped and only the ciphertext is returned.
pub fn seal(
    payload: &[u8],
    length: KeyLength,
    recipient: Option<&PublicKey>,
) -> Result<SealedLog> {
    let key = SymmetricKey::generate(length);
    let ciphertext = symmetric::encrypt(&key, payload)?;
    let wrapped_key = match recipient {
        Some(public) => Some(public.wrap_key(key.as_bytes())?),
        None => None,
    };
    Ok(SealedLog {
        ciphertext,
        wrapped_key,
    })
}

/// Opens a sealed log with the recipient's private key.
///
/// # Errors
///
/// Fails closed when the sealed log carries no wrapped key, when unwrapping
/// fails, or when the ciphertext does not authenticate.
pub fn open(sealed: &SealedLog, private: &PrivateKey) -> Result<Vec<u8>> {
    let wrapped = sealed
        .wrapped_key
        .as_ref()
        .ok_or_else(|| CryptoError::InvalidKey("sealed log carries no wrapped key".to_string()))?;
    let key_bytes = private.unwrap_key(wrapped)?;
    let key = SymmetricKey::from_bytes(&key_bytes)?;
    symmetric::decrypt(&key, &sealed.ciphertext)
}
