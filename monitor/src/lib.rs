//! Logship monitor - remote change detection.
//!
//! This crate watches remote object paths through the abstract
//! [`FileTransporter`](logship_transport::FileTransporter) capability and
//! raises typed change events for downstream consumers.
//!
//! # Overview
//!
//! The design is pull/poll based: a single background task re-evaluates
//! every watched path on a fixed interval, comparing the remote modification
//! time and a 14-digit timestamp token embedded in the path string. Detected
//! changes are delivered as [`ChangeEvent`]s through a bounded queue; the
//! poll task blocks rather than drop events when the queue is full.
//!
//! # Modules
//!
//! - [`types`]: Event and snapshot types for change detection
//! - [`watcher`]: The polling remote watcher
//! - [`config`]: Configuration from environment variables
//! - [`error`]: Error types for monitor operations

pub mod config;
pub mod error;
pub mod types;
pub mod watcher;

pub use config::{ConfigError, MonitorConfig};
pub use error::{MonitorError, Result};
pub use types::{ChangeEvent, ChangeKind, WatchedPath};
pub use watcher::{extract_path_time, RemoteWatcher, EVENT_QUEUE_CAPACITY};
