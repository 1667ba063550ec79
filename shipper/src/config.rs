//! Configuration module for the Logship shipper.
//!
//! Configuration is injected into components by their constructors; this
//! module validates everything up front so unsupported algorithms or key
//! lengths fail before any network or disk I/O is attempted.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `LOGSHIP_UPLOAD_DIR` | Yes | - | Remote directory archives are shipped to |
//! | `LOGSHIP_SYM_KEY_BITS` | No | 256 | Symmetric key length (128/192/256) |
//! | `LOGSHIP_KEY_ALGORITHM` | No | rsa | Key-pair algorithm (rsa/ecdsa/ed25519) |
//! | `LOGSHIP_ASYM_KEY_BITS` | No | 2048 | Key-pair length for the algorithm |
//! | `LOGSHIP_PUBLIC_KEY_PATH` | No | - | Recipient public key; enables key wrapping |
//! | `LOGSHIP_KEY_DIR` | No | `~/.logship/keys` | Directory for the durable key pair |
//!
//! # Example
//!
//! ```no_run
//! use logship_shipper::config::ShipperConfig;
//!
//! std::env::set_var("LOGSHIP_UPLOAD_DIR", "/upload/logs");
//! let config = ShipperConfig::from_env().expect("Failed to load configuration");
//! println!("Shipping to {}", config.upload_dir);
//! ```

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use directories::BaseDirs;
use thiserror::Error;

use crate::crypto::asymmetric::{validate_key_length, KeyAlgorithm};
use crate::crypto::symmetric::KeyLength;

/// Default symmetric key length in bits.
const DEFAULT_SYM_KEY_BITS: u32 = 256;

/// Default key-pair algorithm.
const DEFAULT_KEY_ALGORITHM: KeyAlgorithm = KeyAlgorithm::Rsa;

/// Default key-pair length in bits.
const DEFAULT_ASYM_KEY_BITS: u32 = 2048;

/// Default key directory relative to home.
const DEFAULT_KEY_DIR: &str = ".logship/keys";

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Environment variable or parameter has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to determine home directory.
    #[error("failed to determine home directory")]
    NoHomeDirectory,
}

/// Configuration for the Logship shipper.
#[derive(Debug, Clone)]
pub struct ShipperConfig {
    /// Remote directory archives are shipped to. Normalized to forward
    /// slashes with a trailing slash when the remote path is derived.
    pub upload_dir: String,

    /// Symmetric key length used for content encryption.
    pub symmetric_key_length: KeyLength,

    /// Algorithm of the durable key pair.
    pub algorithm: KeyAlgorithm,

    /// Key-pair length for the algorithm (ignored for Ed25519).
    pub asymmetric_key_bits: u32,

    /// Recipient public key for key wrapping. When absent, sealed logs are
    /// shipped without a wrapped key.
    pub public_key_path: Option<PathBuf>,

    /// Directory holding the durable key pair.
    pub key_dir: PathBuf,
}

impl ShipperConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the upload directory is empty, the
    /// symmetric key length is not 128/192/256, or the asymmetric key length
    /// is unsupported for the algorithm.
    pub fn new(
        upload_dir: impl Into<String>,
        symmetric_key_bits: u32,
        algorithm: KeyAlgorithm,
        asymmetric_key_bits: u32,
        public_key_path: Option<PathBuf>,
        key_dir: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let upload_dir = upload_dir.into();
        if upload_dir.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "upload_dir".to_string(),
                message: "upload directory cannot be empty".to_string(),
            });
        }

        let symmetric_key_length =
            KeyLength::from_bits(symmetric_key_bits).map_err(|e| ConfigError::InvalidValue {
                key: "symmetric_key_bits".to_string(),
                message: e.to_string(),
            })?;

        validate_key_length(algorithm, asymmetric_key_bits).map_err(|e| {
            ConfigError::InvalidValue {
                key: "asymmetric_key_bits".to_string(),
                message: e.to_string(),
            }
        })?;

        Ok(Self {
            upload_dir,
            symmetric_key_length,
            algorithm,
            asymmetric_key_bits,
            public_key_path,
            key_dir: key_dir.into(),
        })
    }

    /// Creates a new `ShipperConfig` by parsing environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `LOGSHIP_UPLOAD_DIR` is not set, any value
    /// fails validation, or the home directory cannot be determined while a
    /// default key directory is needed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let upload_dir = env::var("LOGSHIP_UPLOAD_DIR")
            .map_err(|_| ConfigError::MissingEnvVar("LOGSHIP_UPLOAD_DIR".to_string()))?;

        let symmetric_key_bits = parse_env_u32("LOGSHIP_SYM_KEY_BITS", DEFAULT_SYM_KEY_BITS)?;

        let algorithm = match env::var("LOGSHIP_KEY_ALGORITHM") {
            Ok(val) => {
                KeyAlgorithm::from_str(&val).map_err(|e| ConfigError::InvalidValue {
                    key: "LOGSHIP_KEY_ALGORITHM".to_string(),
                    message: e.to_string(),
                })?
            }
            Err(_) => DEFAULT_KEY_ALGORITHM,
        };

        let asymmetric_key_bits = parse_env_u32("LOGSHIP_ASYM_KEY_BITS", DEFAULT_ASYM_KEY_BITS)?;

        let public_key_path = env::var("LOGSHIP_PUBLIC_KEY_PATH").ok().map(PathBuf::from);

        let key_dir = match env::var("LOGSHIP_KEY_DIR") {
            Ok(val) => PathBuf::from(val),
            Err(_) => {
                let base_dirs = BaseDirs::new().ok_or(ConfigError::NoHomeDirectory)?;
                base_dirs.home_dir().join(DEFAULT_KEY_DIR)
            }
        };

        Self::new(
            upload_dir,
            symmetric_key_bits,
            algorithm,
            asymmetric_key_bits,
            public_key_path,
            key_dir,
        )
    }
}

/// Parses an optional integer environment variable.
fn parse_env_u32(key: &str, default: u32) -> Result<u32, ConfigError> {
    match env::var(key) {
        Ok(val) => val.parse::<u32>().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected positive integer, got '{val}'"),
        }),
        Err(_) => Ok(default),
    }
}
