//! Polling monitor for remote path changes.
//!
//! This module provides functionality to watch remote object paths for
//! changes and emit events when objects are created, modified, or disappear.
//!
//! # Architecture
//!
//! The watcher owns a set of [`WatchedPath`] snapshots guarded by an
//! `RwLock` and a background poll task that re-evaluates every watched path
//! on a fixed interval. Change detection uses two signals in priority order:
//! a 14-digit timestamp token embedded in the path string, then the raw
//! modification time reported by the transporter. When neither fires, the
//! directory one level above the path-time segment is scanned for a sibling
//! with the same base name and a later embedded time; if one exists the
//! watch is retargeted to it.
//!
//! Events are delivered through a bounded queue. The poll task blocks when
//! the queue is full, so slow consumers delay detection but never lose
//! events.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use logship_monitor::config::MonitorConfig;
//! use logship_monitor::watcher::RemoteWatcher;
//! use logship_transport::MemoryTransporter;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transporter = Arc::new(MemoryTransporter::new());
//!     let config = MonitorConfig::new(Duration::from_secs(30));
//!
//!     let mut watcher = RemoteWatcher::new(transporter, &config);
//!     let mut events = watcher.events().expect("first call");
//!
//!     watcher.add_watch("/policies/20240305150000/policy.json").await?;
//!     watcher.start();
//!
//!     while let Some(event) = events.recv().await {
//!         println!("{:?} {}", event.kind, event.path);
//!     }
//!
//!     watcher.stop().await;
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use tempfile::NamedTempFile;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use logship_transport::{FileInfo, FileTransporter};

use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::types::{ChangeEvent, WatchedPath};

/// Capacity of the bounded event queue.
pub const EVENT_QUEUE_CAPACITY: usize = 100;

/// Number of digits in a path-embedded timestamp token.
const PATH_TIME_DIGITS: usize = 14;

/// Format of a path-embedded timestamp token.
const PATH_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

type WatchMap = Arc<RwLock<HashMap<String, WatchedPath>>>;

/// Monitor for externally-produced changes on remote paths.
///
/// Exactly one background poll task runs per instance. All mutations of the
/// watched-path set happen under one lock whose critical sections are kept
/// small; the lock is never held across transporter calls.
pub struct RemoteWatcher {
    transporter: Arc<dyn FileTransporter>,
    watches: WatchMap,
    poll_interval: Duration,
    event_tx: Option<mpsc::Sender<ChangeEvent>>,
    event_rx: Option<mpsc::Receiver<ChangeEvent>>,
    stop_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl RemoteWatcher {
    /// Creates a new watcher over the given transporter.
    ///
    /// The watcher does nothing until [`start`](Self::start) is called;
    /// watches can be registered before or after starting.
    #[must_use]
    pub fn new(transporter: Arc<dyn FileTransporter>, config: &MonitorConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        Self {
            transporter,
            watches: Arc::new(RwLock::new(HashMap::new())),
            poll_interval: config.poll_interval,
            event_tx: Some(event_tx),
            event_rx: Some(event_rx),
            stop_tx: None,
            task: None,
        }
    }

    /// Returns the read side of the event queue.
    ///
    /// The queue has a single consumer; every call after the first returns
    /// `None`.
    pub fn events(&mut self) -> Option<mpsc::Receiver<ChangeEvent>> {
        self.event_rx.take()
    }

    /// Begins the poll loop as a background task and returns immediately.
    ///
    /// Callers must track running state themselves; calling `start` twice is
    /// undefined (this implementation ignores the second call).
    pub fn start(&mut self) {
        if self.task.is_some() {
            warn!("start() called while the poll task is already running");
            return;
        }
        let Some(event_tx) = self.event_tx.clone() else {
            warn!("start() called after stop(); event queue is closed");
            return;
        };

        let (stop_tx, stop_rx) = watch::channel(false);
        let transporter = Arc::clone(&self.transporter);
        let watches = Arc::clone(&self.watches);
        let poll_interval = self.poll_interval;

        self.task = Some(tokio::spawn(async move {
            poll_loop(transporter, watches, event_tx, poll_interval, stop_rx).await;
        }));
        self.stop_tx = Some(stop_tx);

        info!(poll_interval = ?self.poll_interval, "Started remote watcher");
    }

    /// Signals the poll task to exit, waits for it to finish, then closes
    /// the event queue.
    ///
    /// A poll cycle in progress runs to completion. Safe to call exactly
    /// once after a successful `start()`; calling it without `start()` just
    /// closes the queue.
    pub async fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Poll task terminated abnormally");
            }
        }
        // Dropping the sender only after the task has exited avoids
        // send-on-closed-queue races.
        self.event_tx = None;
        info!("Stopped remote watcher");
    }

    /// Registers a remote path for change surveillance.
    ///
    /// Resolves the path's current last-modified time, extracts an optional
    /// path-embedded time, and downloads the object to a scratch location
    /// solely to record its size. Emits a `Created` event on success.
    ///
    /// # Errors
    ///
    /// Fails if the remote metadata lookup or the sizing download fails; no
    /// watch is registered in that case.
    pub async fn add_watch(&self, path: &str) -> Result<()> {
        let last_modified = self.transporter.last_modified(path).await?;
        let path_time = extract_path_time(path);
        let size = fetch_size(self.transporter.as_ref(), path).await?;

        let snapshot = WatchedPath::new(path.to_string(), last_modified, path_time, size);
        {
            let mut watches = self.watches.write().await;
            watches.insert(path.to_string(), snapshot.clone());
        }

        info!(path, size, "Watching remote path");

        if let Some(tx) = &self.event_tx {
            tx.send(ChangeEvent::created(snapshot))
                .await
                .map_err(|_| MonitorError::ChannelClosed)?;
        }
        Ok(())
    }

    /// Removes a watched path. No error if the path was not watched.
    pub async fn remove_watch(&self, path: &str) {
        let removed = self.watches.write().await.remove(path).is_some();
        if removed {
            info!(path, "Stopped watching remote path");
        } else {
            debug!(path, "remove_watch on unwatched path");
        }
    }

    /// Returns the current number of watched paths.
    pub async fn watch_count(&self) -> usize {
        self.watches.read().await.len()
    }

    /// Returns the current snapshot for a watched path.
    pub async fn snapshot(&self, path: &str) -> Option<WatchedPath> {
        self.watches.read().await.get(path).cloned()
    }
}

/// Background poll loop; exits when the stop signal fires.
async fn poll_loop(
    transporter: Arc<dyn FileTransporter>,
    watches: WatchMap,
    events: mpsc::Sender<ChangeEvent>,
    poll_interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_poll_cycle(transporter.as_ref(), &watches, &events).await;
            }
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
        }
    }

    debug!("Poll task shutting down");
}

/// Runs one poll cycle over every watched path.
async fn run_poll_cycle(
    transporter: &dyn FileTransporter,
    watches: &RwLock<HashMap<String, WatchedPath>>,
    events: &mpsc::Sender<ChangeEvent>,
) {
    // Copy the key set so the lock is not held across network I/O.
    let paths: Vec<String> = watches.read().await.keys().cloned().collect();
    trace!(watched = paths.len(), "Running poll cycle");

    for path in paths {
        // Re-read the snapshot; the watch may have been removed or
        // retargeted since the key set was copied.
        let snapshot = match watches.read().await.get(&path) {
            Some(s) => s.clone(),
            None => continue,
        };

        if let Err(e) = poll_path(transporter, watches, events, &path, snapshot).await {
            // Only event delivery can fail here; the consumer is gone, so
            // the rest of the cycle has nobody to report to.
            warn!(error = %e, "Event delivery failed, abandoning cycle");
            return;
        }
    }
}

/// Evaluates one watched path and emits at most one event for it.
async fn poll_path(
    transporter: &dyn FileTransporter,
    watches: &RwLock<HashMap<String, WatchedPath>>,
    events: &mpsc::Sender<ChangeEvent>,
    path: &str,
    snapshot: WatchedPath,
) -> Result<()> {
    let mod_time = match transporter.last_modified(path).await {
        Ok(t) => t,
        Err(e) => {
            // The path stays registered: a transient failure must not
            // unregister it. Report the outage once until a fetch succeeds.
            if !snapshot.missing {
                debug!(path, error = %e, "Metadata fetch failed");
                if let Some(entry) = watches.write().await.get_mut(path) {
                    entry.missing = true;
                }
                events
                    .send(ChangeEvent::deleted(
                        path.to_string(),
                        Some(snapshot),
                        e.to_string(),
                    ))
                    .await
                    .map_err(|_| MonitorError::ChannelClosed)?;
            }
            return Ok(());
        }
    };

    if snapshot.missing {
        if let Some(entry) = watches.write().await.get_mut(path) {
            entry.missing = false;
        }
    }

    // Signal 1: the path-embedded time advanced (or appeared).
    let current_path_time = extract_path_time(path);
    let mut modified = match (current_path_time, snapshot.path_time) {
        (Some(current), Some(stored)) => current > stored,
        (Some(_), None) => true,
        _ => false,
    };

    // Signal 2: the raw modification time advanced.
    if !modified && mod_time > snapshot.last_modified {
        modified = true;
    }

    // Signal 3: a sibling with a later embedded time replaced the file.
    let mut target = path.to_string();
    let mut target_mod_time = mod_time;
    if !modified {
        if let Some(candidate) = find_retarget(transporter, path, snapshot.path_time).await {
            debug!(old = path, new = %candidate, "Retargeting watch to newer sibling");
            target_mod_time = transporter
                .last_modified(&candidate)
                .await
                .unwrap_or(mod_time);
            {
                let mut guard = watches.write().await;
                guard.remove(path);
                let mut moved = snapshot.clone();
                moved.path.clone_from(&candidate);
                guard.insert(candidate.clone(), moved);
            }
            target = candidate;
            modified = true;
        }
    }

    if !modified {
        return Ok(());
    }

    let size = match fetch_size(transporter, &target).await {
        Ok(size) => size,
        Err(e) => {
            // Leave the stored snapshot untouched so the change is
            // re-detected on the next cycle.
            warn!(path = %target, error = %e, "Failed to size modified object");
            return Ok(());
        }
    };

    let updated = WatchedPath::new(
        target.clone(),
        target_mod_time,
        extract_path_time(&target),
        size,
    );
    {
        let mut guard = watches.write().await;
        guard.insert(target.clone(), updated.clone());
    }

    info!(path = %target, size, "Remote change detected");

    events
        .send(ChangeEvent::modified(updated))
        .await
        .map_err(|_| MonitorError::ChannelClosed)
}

/// Downloads an object to a scratch file and returns its size.
///
/// The scratch file is deleted regardless of outcome.
async fn fetch_size(transporter: &dyn FileTransporter, path: &str) -> Result<u64> {
    let scratch = NamedTempFile::new()?;
    transporter.download(path, scratch.path()).await?;
    let size = scratch.as_file().metadata()?.len();
    Ok(size)
}

/// Scans one level above the path-time directory segment for a sibling entry
/// with the same base name and a later embedded time.
///
/// Returns `None` when the watched path carries no stored embedded time, the
/// grandparent cannot be derived, or the listing fails (a failed sibling
/// scan is not a change signal).
async fn find_retarget(
    transporter: &dyn FileTransporter,
    path: &str,
    stored_path_time: Option<NaiveDateTime>,
) -> Option<String> {
    let stored = stored_path_time?;
    let grandparent = parent_dir(parent_dir(path)?)?;
    let entries = match transporter.list(grandparent).await {
        Ok(entries) => entries,
        Err(e) => {
            trace!(dir = grandparent, error = %e, "Sibling scan failed");
            return None;
        }
    };
    select_retarget(&entries, path, base_name(path), stored)
}

/// Picks the sibling with the greatest embedded time strictly later than the
/// stored path time. Pure so it can be tested without a transporter.
fn select_retarget(
    entries: &[FileInfo],
    current: &str,
    base: &str,
    stored: NaiveDateTime,
) -> Option<String> {
    let mut best: Option<(NaiveDateTime, &str)> = None;
    for entry in entries {
        if entry.is_dir || entry.name != base || entry.path == current {
            continue;
        }
        let Some(time) = extract_path_time(&entry.path) else {
            continue;
        };
        if time <= stored {
            continue;
        }
        if best.map_or(true, |(t, _)| time > t) {
            best = Some((time, entry.path.as_str()));
        }
    }
    best.map(|(_, p)| p.to_string())
}

/// Extracts a path-embedded time from the first run of exactly 14
/// consecutive digits, parsed as `YYYYMMDDHHmmss` in local time.
///
/// Absence of such a run is a normal outcome; not every path carries an
/// embedded time. The heuristic is inherently ambiguous when an unrelated
/// 14-digit substring appears first; the leftmost match wins.
#[must_use]
pub fn extract_path_time(path: &str) -> Option<NaiveDateTime> {
    let bytes = path.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i - start == PATH_TIME_DIGITS {
                return NaiveDateTime::parse_from_str(&path[start..i], PATH_TIME_FORMAT).ok();
            }
        } else {
            i += 1;
        }
    }
    None
}

/// Returns the parent directory of a `/`-separated remote path.
fn parent_dir(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    let idx = trimmed.rfind('/')?;
    if idx == 0 {
        Some("/")
    } else {
        Some(&trimmed[..idx])
    }
}

/// Returns the base name of a `/`-separated remote path.
fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
