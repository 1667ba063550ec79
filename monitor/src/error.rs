//! Error types for the Logship monitor.
//!
//! This module defines the error types used throughout the monitor crate,
//! providing structured error handling with clear, human-readable messages.

use thiserror::Error;

use logship_transport::TransportError;

use crate::config::ConfigError;

/// Errors that can occur during monitor operations.
///
/// Transient remote failures observed during the poll cycle are not surfaced
/// through this type; the cycle downgrades them to `Deleted` events so one
/// failing path never blocks the others.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Configuration-related error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Remote transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Local file I/O error (scratch downloads).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The event queue has been closed; the consumer is gone.
    #[error("event channel closed")]
    ChannelClosed,
}

/// A specialized `Result` type for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;
