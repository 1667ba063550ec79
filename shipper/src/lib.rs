//! Logship shipper - secure upload pipeline and hybrid log encryption.
//!
//! This crate takes structured log snapshots, protects them
//! cryptographically, packages them, and ships them to a remote object store
//! through the abstract
//! [`FileTransporter`](logship_transport::FileTransporter) capability.
//!
//! # Overview
//!
//! Payloads are sealed with AES-GCM under a fresh symmetric key; when a
//! recipient public key is configured, the key is wrapped with RSA-OAEP and
//! shipped alongside the ciphertext. The upload pipeline compresses the
//! sealed log (and optional key file) into a timestamp-named `tar.gz`
//! archive and transfers it, releasing every temporary resource whether the
//! run succeeds or fails.
//!
//! # Modules
//!
//! - [`crypto`]: Hybrid encryption and key management
//! - [`pipeline`]: The multi-step upload pipeline
//! - [`alert`]: Operational alert sinks
//! - [`config`]: Configuration from environment variables
//! - [`error`]: Error types for shipper operations

pub mod alert;
pub mod config;
pub mod crypto;
pub mod error;
pub mod pipeline;

pub use alert::{AlertSink, TracingAlertSink};
pub use config::{ConfigError, ShipperConfig};
pub use crypto::{
    open, seal, CryptoError, KeyAlgorithm, KeyLength, KeyManager, KeyPair, PrivateKey, PublicKey,
    SealedLog, SymmetricKey,
};
pub use error::{Result, ShipperError};
pub use pipeline::{
    CompressStep, PipelineError, TransferStep, UploadContext, UploadPipeline, UploadStep,
};
