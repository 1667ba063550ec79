//! Error types for the Logship shipper.
//!
//! This module defines the crate-level error wrapper; each module keeps its
//! own focused error enum and converts into this one at the crate boundary.

use thiserror::Error;

use crate::config::ConfigError;
use crate::crypto::CryptoError;
use crate::pipeline::PipelineError;

/// Errors that can occur during shipper operations.
#[derive(Error, Debug)]
pub enum ShipperError {
    /// Configuration-related error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Cryptographic operation error.
    #[error("cryptographic error: {0}")]
    Crypto(#[from] CryptoError),

    /// Upload pipeline error.
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for shipper operations.
pub type Result<T> = std::result::Result<T, ShipperError>;
