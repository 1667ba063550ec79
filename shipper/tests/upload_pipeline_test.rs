//! Integration tests for the secure upload flow.
//!
//! These tests exercise the public crate surface end to end: a key pair is
//! provisioned through the key manager, a log payload is sealed, the sealed
//! files are shipped through the pipeline, and the remote archive is fetched
//! back, unpacked, and opened with the recipient's private key.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use logship_shipper::config::ShipperConfig;
use logship_shipper::crypto::{self, KeyAlgorithm, KeyManager, SealedLog};
use logship_shipper::pipeline::UploadPipeline;
use logship_shipper::TracingAlertSink;
use logship_transport::MemoryTransporter;
use tempfile::TempDir;

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

fn test_config(key_dir: &Path) -> ShipperConfig {
    ShipperConfig::new(
        "upload\\logs",
        256,
        KeyAlgorithm::Rsa,
        1024,
        Some(key_dir.join("public.pem")),
        key_dir,
    )
    .unwrap()
}

/// Unpacks a `tar.gz` archive into (name, contents) pairs.
fn unpack_archive(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let decoder = flate2::read::GzDecoder::new(bytes);
    let mut archive = tar::Archive::new(decoder);
    let mut entries = Vec::new();
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        let name = entry.path().unwrap().to_string_lossy().into_owned();
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).unwrap();
        entries.push((name, contents));
    }
    entries.sort();
    entries
}

#[tokio::test]
async fn sealed_log_ships_and_opens_end_to_end() {
    init_tracing();

    let work_dir = TempDir::new().unwrap();
    let key_dir = work_dir.path().join("keys");
    let config = test_config(&key_dir);

    // Provision the durable pair and seal a payload for its public half.
    let manager = KeyManager::new(&key_dir, config.algorithm, config.asymmetric_key_bits);
    let pair = manager.ensure().unwrap();

    let payload = br#"{"entries":[{"level":"info","message":"snapshot"}]}"#;
    let sealed = crypto::seal(
        payload,
        config.symmetric_key_length,
        Some(pair.public()),
    )
    .unwrap();

    let log_path = work_dir.path().join("snapshot.enc");
    let key_path = work_dir.path().join("key.txt");
    sealed.write(&log_path, &key_path).unwrap();

    // Ship both files as one archive.
    let store = MemoryTransporter::new();
    let pipeline = UploadPipeline::new(
        Arc::new(store.clone()),
        config,
        Arc::new(TracingAlertSink),
    );
    let remote = pipeline.upload(&log_path, Some(&key_path)).await.unwrap();
    assert!(remote.starts_with("upload/logs/"), "backslash dir normalized");

    // Exactly one remote object, fetched back through the auxiliary API.
    assert_eq!(store.paths().await.len(), 1);
    let archive_bytes = pipeline.download_file(&remote).await.unwrap();

    let entries = unpack_archive(&archive_bytes);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].0, "key.txt");
    assert_eq!(entries[1].0, "snapshot.enc");

    // The recipient recovers the payload from the shipped artifacts.
    let shipped = SealedLog {
        ciphertext: entries[1].1.clone(),
        wrapped_key: Some(
            base64_decode(std::str::from_utf8(&entries[0].1).unwrap().trim()),
        ),
    };
    let opened = crypto::open(&shipped, manager.load().unwrap().private()).unwrap();
    assert_eq!(opened, payload);
}

#[tokio::test]
async fn upload_without_key_file_ships_single_entry_archive() {
    init_tracing();

    let work_dir = TempDir::new().unwrap();
    let config = test_config(&work_dir.path().join("keys"));

    // No public key configured for this flow: the sealed log has no wrapped
    // key and the archive carries only the log.
    let sealed = crypto::seal(b"unwrapped snapshot", config.symmetric_key_length, None).unwrap();
    assert!(sealed.wrapped_key.is_none());

    let log_path = work_dir.path().join("snapshot.enc");
    sealed
        .write(&log_path, &work_dir.path().join("key.txt"))
        .unwrap();

    let store = MemoryTransporter::new();
    let pipeline = UploadPipeline::new(
        Arc::new(store.clone()),
        config,
        Arc::new(TracingAlertSink),
    );
    let remote = pipeline.upload(&log_path, None).await.unwrap();

    assert_eq!(store.paths().await.len(), 1);
    let entries = unpack_archive(&store.get(&remote).await.unwrap());
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, "snapshot.enc");
}

#[tokio::test]
async fn failed_upload_leaves_no_remote_object() {
    init_tracing();

    let work_dir = TempDir::new().unwrap();
    let config = test_config(&work_dir.path().join("keys"));

    let store = MemoryTransporter::new();
    let pipeline = UploadPipeline::new(
        Arc::new(store.clone()),
        config,
        Arc::new(TracingAlertSink),
    );

    let err = pipeline
        .upload(&work_dir.path().join("missing.enc"), None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("missing.enc"));
    assert!(store.paths().await.is_empty());
}

fn base64_decode(s: &str) -> Vec<u8> {
    use base64::prelude::*;
    BASE64_STANDARD.decode(s).unwrap()
}
