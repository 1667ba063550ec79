//! Durable key-pair management.
//!
//! The key manager keeps one public/private PEM pair under a fixed
//! directory. The pair is created lazily on first need and never rotated
//! automatically. Writes are ordered so a failure never leaves a
//! half-written pair behind: the public key is persisted first and removed
//! again if persisting the private key fails.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::asymmetric::{KeyAlgorithm, KeyPair, PrivateKey, PublicKey};
use super::Result;

/// File name of the private key inside the key directory.
pub const PRIVATE_KEY_FILE: &str = "private.pem";

/// File name of the public key inside the key directory.
pub const PUBLIC_KEY_FILE: &str = "public.pem";

/// Manages the durable key pair used for key wrapping.
#[derive(Debug, Clone)]
pub struct KeyManager {
    dir: PathBuf,
    algorithm: KeyAlgorithm,
    bits: u32,
}

impl KeyManager {
    /// Creates a manager over the given directory and key parameters.
    ///
    /// No disk I/O happens here; the directory is created on first
    /// generation.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, algorithm: KeyAlgorithm, bits: u32) -> Self {
        Self {
            dir: dir.into(),
            algorithm,
            bits,
        }
    }

    /// Path of the private key file.
    #[must_use]
    pub fn private_key_path(&self) -> PathBuf {
        self.dir.join(PRIVATE_KEY_FILE)
    }

    /// Path of the public key file.
    #[must_use]
    pub fn public_key_path(&self) -> PathBuf {
        self.dir.join(PUBLIC_KEY_FILE)
    }

    /// Returns whether a complete pair exists on disk.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.private_key_path().is_file() && self.public_key_path().is_file()
    }

    /// Returns the key pair, generating and persisting one if none exists.
    ///
    /// # Errors
    ///
    /// Fails if generation, persistence, or loading fails. When persisting
    /// the private key fails, the just-written public key is removed so no
    /// half-written pair is left behind.
    pub fn ensure(&self) -> Result<KeyPair> {
        if self.exists() {
            return self.load();
        }

        let pair = KeyPair::generate(self.algorithm, self.bits)?;
        fs::create_dir_all(&self.dir)?;

        let public_path = self.public_key_path();
        let private_path = self.private_key_path();

        pair.public().save(&public_path)?;
        if let Err(e) = pair.private().save(&private_path) {
            if let Err(remove_err) = fs::remove_file(&public_path) {
                warn!(
                    path = %public_path.display(),
                    error = %remove_err,
                    "Failed to remove orphaned public key"
                );
            }
            return Err(e);
        }

        info!(
            dir = %self.dir.display(),
            algorithm = %self.algorithm,
            bits = self.bits,
            "Generated key pair"
        );
        Ok(pair)
    }

    /// Loads the existing pair from disk.
    pub fn load(&self) -> Result<KeyPair> {
        let private = PrivateKey::load(self.algorithm, &self.private_key_path())?;
        let public = PublicKey::load(self.algorithm, &self.public_key_path())?;
        Ok(KeyPair::from_parts(private, public))
    }

    /// Directory holding the pair.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
