//! Integration tests for the poll-driven change detection cycle.
//!
//! These tests run the full watcher lifecycle (start → poll → stop) against
//! the in-memory transporter and assert the externally observable event
//! stream: one `Modified` per confirmed change, one `Deleted` per outage,
//! and retargeting when a sibling path with a later embedded time appears.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use logship_monitor::config::MonitorConfig;
use logship_monitor::types::{ChangeEvent, ChangeKind};
use logship_monitor::watcher::RemoteWatcher;
use logship_transport::MemoryTransporter;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Poll fast so tests complete quickly.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// How long to wait for an expected event before failing the test.
const EVENT_WAIT: Duration = Duration::from_secs(5);

/// Initialises test logging once per process.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Receives events until one of the given kind arrives.
async fn next_event_of(
    events: &mut mpsc::Receiver<ChangeEvent>,
    kind: ChangeKind,
) -> ChangeEvent {
    loop {
        let event = timeout(EVENT_WAIT, events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event queue closed unexpectedly");
        if event.kind == kind {
            return event;
        }
    }
}

#[tokio::test]
async fn modification_time_advance_emits_one_modified_event() {
    init_tracing();

    let store = MemoryTransporter::new();
    let t0 = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
    store.put("/logs/app.json", b"v1".to_vec(), t0).await;

    let mut watcher = RemoteWatcher::new(
        Arc::new(store.clone()),
        &MonitorConfig::new(POLL_INTERVAL),
    );
    let mut events = watcher.events().expect("first call");

    watcher.add_watch("/logs/app.json").await.unwrap();
    watcher.start();

    let created = next_event_of(&mut events, ChangeKind::Created).await;
    assert_eq!(created.path, "/logs/app.json");

    store
        .put(
            "/logs/app.json",
            b"v2-longer".to_vec(),
            t0 + chrono::Duration::seconds(30),
        )
        .await;

    let modified = next_event_of(&mut events, ChangeKind::Modified).await;
    assert_eq!(modified.path, "/logs/app.json");
    let snapshot = modified.snapshot.expect("modified event carries snapshot");
    assert_eq!(snapshot.size, b"v2-longer".len() as u64);
    assert_eq!(snapshot.last_modified, t0 + chrono::Duration::seconds(30));

    watcher.stop().await;

    // No further Modified events for the same change.
    let mut extra_modified = 0;
    while let Ok(Some(event)) = timeout(Duration::from_millis(100), events.recv()).await {
        if event.kind == ChangeKind::Modified {
            extra_modified += 1;
        }
    }
    assert_eq!(extra_modified, 0, "change must be reported exactly once");
}

#[tokio::test]
async fn failing_metadata_fetch_emits_one_deleted_event() {
    init_tracing();

    let store = MemoryTransporter::new();
    store.put("/logs/app.json", b"v1".to_vec(), Utc::now()).await;

    let mut watcher = RemoteWatcher::new(
        Arc::new(store.clone()),
        &MonitorConfig::new(POLL_INTERVAL),
    );
    let mut events = watcher.events().expect("first call");

    watcher.add_watch("/logs/app.json").await.unwrap();
    watcher.start();
    let _created = next_event_of(&mut events, ChangeKind::Created).await;

    store.remove("/logs/app.json").await;

    let deleted = next_event_of(&mut events, ChangeKind::Deleted).await;
    assert_eq!(deleted.path, "/logs/app.json");
    let error = deleted.error.expect("deleted event carries the failure");
    assert!(error.contains("/logs/app.json"));

    // Let several more cycles run; the outage must be reported exactly once
    // and the path must stay registered.
    tokio::time::sleep(POLL_INTERVAL * 6).await;
    watcher.stop().await;

    while let Some(event) = events.recv().await {
        assert_ne!(event.kind, ChangeKind::Deleted, "outage reported twice");
    }
    assert_eq!(watcher.watch_count().await, 1);
}

#[tokio::test]
async fn path_time_advance_wins_even_without_mod_time_change() {
    init_tracing();

    let store = MemoryTransporter::new();
    let t0 = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
    store
        .put("/policies/20240305150000/policy.json", b"p1".to_vec(), t0)
        .await;

    let mut watcher = RemoteWatcher::new(
        Arc::new(store.clone()),
        &MonitorConfig::new(POLL_INTERVAL),
    );
    let mut events = watcher.events().expect("first call");

    watcher
        .add_watch("/policies/20240305150000/policy.json")
        .await
        .unwrap();
    watcher.start();
    let _created = next_event_of(&mut events, ChangeKind::Created).await;

    // The replacement carries the same transporter-reported time T0; only
    // the path-embedded time advanced from 15:00:00 to 16:00:00.
    store
        .put("/policies/20240305160000/policy.json", b"p2-new".to_vec(), t0)
        .await;

    let modified = next_event_of(&mut events, ChangeKind::Modified).await;
    assert_eq!(modified.path, "/policies/20240305160000/policy.json");
    let snapshot = modified.snapshot.expect("snapshot present");
    assert_eq!(snapshot.size, b"p2-new".len() as u64);
    assert_eq!(
        snapshot.path_time.unwrap().format("%Y%m%d%H%M%S").to_string(),
        "20240305160000"
    );

    watcher.stop().await;

    // The watch now targets the new path; the old key is gone.
    assert!(watcher
        .snapshot("/policies/20240305160000/policy.json")
        .await
        .is_some());
    assert!(watcher
        .snapshot("/policies/20240305150000/policy.json")
        .await
        .is_none());
    assert_eq!(watcher.watch_count().await, 1);
}

#[tokio::test]
async fn retarget_reports_exactly_one_modified_event() {
    init_tracing();

    let store = MemoryTransporter::new();
    let t0 = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
    store
        .put("/policies/20240305150000/policy.json", b"p1".to_vec(), t0)
        .await;
    store
        .put("/policies/20240305160000/policy.json", b"p2".to_vec(), t0)
        .await;

    let mut watcher = RemoteWatcher::new(
        Arc::new(store.clone()),
        &MonitorConfig::new(POLL_INTERVAL),
    );
    let mut events = watcher.events().expect("first call");

    watcher
        .add_watch("/policies/20240305150000/policy.json")
        .await
        .unwrap();
    watcher.start();
    let _created = next_event_of(&mut events, ChangeKind::Created).await;

    let modified = next_event_of(&mut events, ChangeKind::Modified).await;
    assert_eq!(modified.path, "/policies/20240305160000/policy.json");

    // Several more cycles with nothing new: no further events.
    tokio::time::sleep(POLL_INTERVAL * 6).await;
    watcher.stop().await;

    while let Some(event) = events.recv().await {
        assert_ne!(event.kind, ChangeKind::Modified, "retarget reported twice");
    }
}

#[tokio::test]
async fn stop_closes_the_event_queue() {
    init_tracing();

    let store = MemoryTransporter::new();
    store.put("/logs/app.json", b"v1".to_vec(), Utc::now()).await;

    let mut watcher = RemoteWatcher::new(
        Arc::new(store.clone()),
        &MonitorConfig::new(POLL_INTERVAL),
    );
    let mut events = watcher.events().expect("first call");

    watcher.add_watch("/logs/app.json").await.unwrap();
    watcher.start();
    let _created = next_event_of(&mut events, ChangeKind::Created).await;

    watcher.stop().await;

    // Drain whatever the final cycle produced; the queue must then close.
    let closed = timeout(EVENT_WAIT, async {
        while events.recv().await.is_some() {}
    })
    .await;
    assert!(closed.is_ok(), "queue did not close after stop()");
}
