//! Logship transport - the abstract remote-storage capability.
//!
//! This crate defines the [`FileTransporter`] trait consumed by the monitor
//! and shipper crates. Concrete transports (SFTP, S3-compatible stores, ...)
//! live outside the core; they implement the trait and map their wire errors
//! into [`TransportError`].
//!
//! Two usage patterns are supported:
//!
//! - Long-lived holders (the change monitor) keep a single
//!   `Arc<dyn FileTransporter>` for the lifetime of the poll loop.
//! - Per-operation holders (the upload pipeline) obtain a fresh handle from a
//!   [`TransporterFactory`] and close it before returning.
//!
//! The [`MemoryTransporter`] is an in-process implementation backed by a
//! shared map, used by tests and local development.
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use logship_transport::{FileTransporter, MemoryTransporter};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), logship_transport::TransportError> {
//! let store = MemoryTransporter::new();
//! store.put("/logs/app.json", b"{}".to_vec(), Utc::now()).await;
//!
//! let entries = store.list("/logs").await?;
//! assert_eq!(entries.len(), 1);
//! assert_eq!(entries[0].name, "app.json");
//! # Ok(())
//! # }
//! ```

mod memory;

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use memory::MemoryTransporter;

/// Errors produced by transport operations.
///
/// Implementations map their underlying wire errors into these variants so
/// callers can distinguish a missing remote object from a failed operation
/// while keeping the cause chain intact.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The remote path does not exist.
    #[error("remote path not found: {0}")]
    NotFound(String),

    /// Local file I/O failed while staging or receiving data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote operation failed for any other reason.
    #[error("transport failure: {0}")]
    Failed(String),
}

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Metadata for a single remote entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Base name of the entry.
    pub name: String,

    /// Full remote path of the entry.
    pub path: String,

    /// Size in bytes.
    pub size: u64,

    /// Last modification time reported by the remote store.
    pub mod_time: DateTime<Utc>,

    /// Whether the entry is a directory.
    ///
    /// Object-store style transports that have no directory objects report
    /// `false` for every entry.
    pub is_dir: bool,
}

/// The remote-storage capability this core depends on but does not implement.
///
/// All operations are expected to apply their own network-level timeouts;
/// the core adds none of its own. A failed `upload` must leave no partial
/// remote object behind.
#[async_trait]
pub trait FileTransporter: Send + Sync {
    /// Uploads a local file to the given remote path.
    async fn upload(&self, local: &Path, remote: &str) -> Result<()>;

    /// Downloads a remote object to the given local path.
    async fn download(&self, remote: &str, local: &Path) -> Result<()>;

    /// Lists the file entries under a remote prefix.
    ///
    /// Implementations may return nested paths; consumers match on the
    /// returned [`FileInfo::path`] rather than assuming a single level.
    async fn list(&self, remote: &str) -> Result<Vec<FileInfo>>;

    /// Deletes a remote object.
    async fn delete(&self, remote: &str) -> Result<()>;

    /// Returns the last modification time of a remote object.
    async fn last_modified(&self, remote: &str) -> Result<DateTime<Utc>>;

    /// Releases the underlying connection.
    ///
    /// Safe to call once per handle; subsequent operations on a closed
    /// handle are implementation-defined.
    async fn close(&self) -> Result<()>;
}

/// Opens fresh [`FileTransporter`] handles for callers that hold one per
/// operation rather than one per component.
#[async_trait]
pub trait TransporterFactory: Send + Sync {
    /// Opens a new transporter handle.
    async fn connect(&self) -> Result<Box<dyn FileTransporter>>;
}
