//! Symmetric content encryption.
//!
//! Payloads are sealed with AES-GCM using a freshly generated random key and
//! a freshly generated random 96-bit nonce per call. The ciphertext format
//! is `nonce || sealed-data`; decryption fails closed when the input is
//! shorter than the nonce or when authentication fails.

use aes_gcm::aead::generic_array::typenum::Unsigned;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, AeadCore, OsRng};
use aes_gcm::{Aes128Gcm, Aes256Gcm, KeyInit};
use rand_core::RngCore;
use zeroize::Zeroizing;

use super::{CryptoError, Result};

/// AES-GCM over a 192-bit key; the 128- and 256-bit widths have ready-made
/// aliases upstream.
type Aes192Gcm = aes_gcm::AesGcm<aes_gcm::aes::Aes192, aes_gcm::aead::consts::U12>;

/// Size of the nonce prepended to every ciphertext, in bytes.
pub const NONCE_SIZE: usize = 12;

/// Supported symmetric key lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLength {
    Bits128,
    Bits192,
    Bits256,
}

impl KeyLength {
    /// Validates a bit count from configuration.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::UnsupportedSymmetricLength` for anything other
    /// than 128, 192, or 256.
    pub fn from_bits(bits: u32) -> Result<Self> {
        match bits {
            128 => Ok(Self::Bits128),
            192 => Ok(Self::Bits192),
            256 => Ok(Self::Bits256),
            other => Err(CryptoError::UnsupportedSymmetricLength(other)),
        }
    }

    /// Returns the key length in bits.
    #[must_use]
    pub fn bits(self) -> u32 {
        match self {
            Self::Bits128 => 128,
            Self::Bits192 => 192,
            Self::Bits256 => 256,
        }
    }

    /// Returns the key length in bytes.
    #[must_use]
    pub fn bytes(self) -> usize {
        (self.bits() / 8) as usize
    }
}

impl Default for KeyLength {
    fn default() -> Self {
        Self::Bits256
    }
}

/// An ephemeral symmetric key.
///
/// Generated fresh per encryption operation and never persisted in
/// plaintext; the backing buffer is zeroed on drop.
pub struct SymmetricKey {
    bytes: Zeroizing<Vec<u8>>,
    length: KeyLength,
}

impl SymmetricKey {
    /// Generates a fresh random key using the operating system's
    /// cryptographically secure random number generator.
    #[must_use]
    pub fn generate(length: KeyLength) -> Self {
        let mut bytes = Zeroizing::new(vec![0u8; length.bytes()]);
        OsRng.fill_bytes(&mut bytes);
        Self { bytes, length }
    }

    /// Reconstructs a key from raw bytes, e.g. after unwrapping.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKey` if the byte count does not match a
    /// supported key length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let length = match bytes.len() {
            16 => KeyLength::Bits128,
            24 => KeyLength::Bits192,
            32 => KeyLength::Bits256,
            other => {
                return Err(CryptoError::InvalidKey(format!(
                    "expected 16, 24, or 32 key bytes, got {other}"
                )))
            }
        };
        Ok(Self {
            bytes: Zeroizing::new(bytes.to_vec()),
            length,
        })
    }

    /// Returns the raw key bytes, e.g. for wrapping.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the key length.
    #[must_use]
    pub fn length(&self) -> KeyLength {
        self.length
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of debug output.
        f.debug_struct("SymmetricKey")
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

/// Encrypts a payload, returning `nonce || sealed-data`.
///
/// A fresh random nonce is generated per call, so encrypting the same
/// payload twice yields different ciphertexts.
pub fn encrypt(key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    match key.length {
        KeyLength::Bits128 => seal_with::<Aes128Gcm>(key.as_bytes(), plaintext),
        KeyLength::Bits192 => seal_with::<Aes192Gcm>(key.as_bytes(), plaintext),
        KeyLength::Bits256 => seal_with::<Aes256Gcm>(key.as_bytes(), plaintext),
    }
}

/// Decrypts data produced by [`encrypt`].
///
/// # Errors
///
/// Fails closed: returns `CiphertextTooShort` when the input cannot carry a
/// nonce and `AuthenticationFailed` when the tag does not verify. No partial
/// plaintext is ever returned.
pub fn decrypt(key: &SymmetricKey, data: &[u8]) -> Result<Vec<u8>> {
    match key.length {
        KeyLength::Bits128 => open_with::<Aes128Gcm>(key.as_bytes(), data),
        KeyLength::Bits192 => open_with::<Aes192Gcm>(key.as_bytes(), data),
        KeyLength::Bits256 => open_with::<Aes256Gcm>(key.as_bytes(), data),
    }
}

fn seal_with<C>(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>>
where
    C: Aead + AeadCore + KeyInit,
{
    let cipher = C::new_from_slice(key)
        .map_err(|_| CryptoError::InvalidKey("key length does not match cipher".to_string()))?;
    let nonce = C::generate_nonce(&mut OsRng);
    let sealed = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut out = Vec::with_capacity(C::NonceSize::to_usize() + sealed.len());
    out.extend_from_slice(nonce.as_slice());
    out.extend_from_slice(&sealed);
    Ok(out)
}

fn open_with<C>(key: &[u8], data: &[u8]) -> Result<Vec<u8>>
where
    C: Aead + AeadCore + KeyInit,
{
    let nonce_len = C::NonceSize::to_usize();
    if data.len() < nonce_len {
        return Err(CryptoError::CiphertextTooShort {
            len: data.len(),
            min: nonce_len,
        });
    }

    let cipher = C::new_from_slice(key)
        .map_err(|_| CryptoError::InvalidKey("key length does not match cipher".to_string()))?;
    let (nonce, sealed) = data.split_at(nonce_len);
    cipher
        .decrypt(GenericArray::from_slice(nonce), sealed)
        .map_err(|_| CryptoError::AuthenticationFailed)
}
