//! Event types for remote change detection.
//!
//! This module defines the schema shared with downstream consumers of the
//! monitor (e.g., a policy-sync component). All types serialize to camelCase
//! JSON.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of change detected on a watched remote path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// The path was registered for watching.
    Created,
    /// The remote object changed (by modification time, path-embedded time,
    /// or replacement by a newer sibling).
    Modified,
    /// The remote metadata could no longer be fetched.
    Deleted,
}

/// Snapshot of a remote path under watch.
///
/// One entry exists per watched path. The poll cycle updates the snapshot
/// whenever a change is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchedPath {
    /// The remote path under surveillance.
    pub path: String,

    /// Last modification time reported by the remote store.
    pub last_modified: DateTime<Utc>,

    /// Secondary change signal: a 14-digit `YYYYMMDDHHmmss` token embedded
    /// in the path, interpreted as local time. Absent when the path carries
    /// no such token.
    pub path_time: Option<NaiveDateTime>,

    /// Size of the remote object in bytes, as measured at the last
    /// confirmed change.
    pub size: u64,

    /// Whether a metadata-fetch outage has already been reported, so a
    /// persistent failure produces exactly one `Deleted` event.
    #[serde(skip)]
    pub(crate) missing: bool,
}

impl WatchedPath {
    /// Creates a snapshot for a freshly registered path.
    #[must_use]
    pub fn new(
        path: String,
        last_modified: DateTime<Utc>,
        path_time: Option<NaiveDateTime>,
        size: u64,
    ) -> Self {
        Self {
            path,
            last_modified,
            path_time,
            size,
            missing: false,
        }
    }
}

/// A change detected on a watched remote path.
///
/// Events are immutable, produced once per detected change, and delivered
/// through the monitor's bounded event queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// Classification of the change.
    pub kind: ChangeKind,

    /// The path the event refers to (the new path after a retarget).
    pub path: String,

    /// Snapshot of the watch at the time of the event, when available.
    pub snapshot: Option<WatchedPath>,

    /// When the change was detected.
    pub timestamp: DateTime<Utc>,

    /// The underlying failure, for `Deleted` events raised by a failed
    /// metadata fetch.
    pub error: Option<String>,
}

impl ChangeEvent {
    /// Creates a `Created` event for a newly registered watch.
    #[must_use]
    pub fn created(snapshot: WatchedPath) -> Self {
        Self {
            kind: ChangeKind::Created,
            path: snapshot.path.clone(),
            snapshot: Some(snapshot),
            timestamp: Utc::now(),
            error: None,
        }
    }

    /// Creates a `Modified` event carrying the updated snapshot.
    #[must_use]
    pub fn modified(snapshot: WatchedPath) -> Self {
        Self {
            kind: ChangeKind::Modified,
            path: snapshot.path.clone(),
            snapshot: Some(snapshot),
            timestamp: Utc::now(),
            error: None,
        }
    }

    /// Creates a `Deleted` event carrying the failure that triggered it.
    #[must_use]
    pub fn deleted(path: String, snapshot: Option<WatchedPath>, error: String) -> Self {
        Self {
            kind: ChangeKind::Deleted,
            path,
            snapshot,
            timestamp: Utc::now(),
            error: Some(error),
        }
    }
}
