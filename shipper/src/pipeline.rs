//! Secure upload pipeline.
//!
//! An upload is an ordered chain of steps operating on one shared
//! [`UploadContext`]: compress the log (and optional key file) into a
//! timestamp-named `tar.gz` archive inside an isolated temporary directory,
//! then transfer the archive to the configured remote directory. Every step
//! exposes an [`execute`](UploadStep::execute) operation and a
//! [`release`](UploadStep::release) cleanup hook; release hooks run
//! unconditionally once the chain finishes, on success and failure alike, so
//! no temporary state survives a failed run.
//!
//! Only the final transfer step touches the remote store, and a failed
//! transfer leaves no partial remote object by contract of the transporter,
//! so there is no remote state to roll back.
//!
//! Each upload invocation owns its context and temporary directory;
//! concurrent uploads are independent.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info, warn};

use logship_transport::{FileInfo, FileTransporter, TransportError, TransporterFactory};

use crate::alert::AlertSink;
use crate::config::ShipperConfig;

/// Format of the timestamp-derived archive name.
const ARCHIVE_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Prefix of the per-upload temporary directory.
const TEMP_DIR_PREFIX: &str = "logship-upload-";

/// Errors that can occur during an upload run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The log file to ship does not exist.
    #[error("log file not found: {0}")]
    LogNotFound(PathBuf),

    /// The key file to ship does not exist.
    #[error("key file not found: {0}")]
    KeyNotFound(PathBuf),

    /// Local file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote transfer failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The transfer step ran before compression produced an archive.
    #[error("transfer attempted before compression produced an archive")]
    MissingArchive,

    /// The chain finished without recording a remote path.
    #[error("upload finished without recording a remote path")]
    MissingRemotePath,
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Shared mutable state for one upload invocation.
///
/// Created once per [`UploadPipeline::upload`] call and owned exclusively by
/// that run; each step may read and extend it.
#[derive(Debug)]
pub struct UploadContext {
    /// The log file to ship.
    pub log_path: PathBuf,

    /// Optional key file shipped alongside the log.
    pub key_path: Option<PathBuf>,

    /// Timestamp the archive name is derived from.
    pub timestamp: DateTime<Local>,

    /// Path of the compressed archive, set by the compress step.
    pub archive_path: Option<PathBuf>,

    /// Remote path of the shipped archive, set by the transfer step.
    pub remote_path: Option<String>,

    /// Handle of the temporary directory; dropped by the compress step's
    /// release hook.
    temp_dir: Option<TempDir>,

    /// Location of the temporary directory, retained after release for
    /// logging and inspection.
    temp_path: Option<PathBuf>,
}

impl UploadContext {
    fn new(log_path: PathBuf, key_path: Option<PathBuf>) -> Self {
        Self {
            log_path,
            key_path,
            timestamp: Local::now(),
            archive_path: None,
            remote_path: None,
            temp_dir: None,
            temp_path: None,
        }
    }

    /// Location of the temporary directory used by this run, if compression
    /// got far enough to create one.
    #[must_use]
    pub fn temp_path(&self) -> Option<&Path> {
        self.temp_path.as_deref()
    }
}

/// One step of the upload chain.
#[async_trait]
pub trait UploadStep: Send + Sync {
    /// Step name for logs and alerts.
    fn name(&self) -> &'static str;

    /// Performs the step's work, extending the context.
    async fn execute(&self, ctx: &mut UploadContext) -> Result<()>;

    /// Releases any temporary resources the step acquired.
    ///
    /// Invoked unconditionally once the chain finishes, in reverse step
    /// order, whether the run succeeded or failed.
    fn release(&self, ctx: &mut UploadContext);
}

/// Builds the compressed archive inside an isolated temporary directory.
pub struct CompressStep;

#[async_trait]
impl UploadStep for CompressStep {
    fn name(&self) -> &'static str {
        "compress"
    }

    async fn execute(&self, ctx: &mut UploadContext) -> Result<()> {
        if !ctx.log_path.is_file() {
            return Err(PipelineError::LogNotFound(ctx.log_path.clone()));
        }
        if let Some(key_path) = &ctx.key_path {
            if !key_path.is_file() {
                return Err(PipelineError::KeyNotFound(key_path.clone()));
            }
        }

        let temp_dir = tempfile::Builder::new().prefix(TEMP_DIR_PREFIX).tempdir()?;
        ctx.temp_path = Some(temp_dir.path().to_path_buf());

        let archive_name = format!("{}.tar.gz", ctx.timestamp.format(ARCHIVE_TIME_FORMAT));
        let archive_path = temp_dir.path().join(&archive_name);
        build_archive(&archive_path, &ctx.log_path, ctx.key_path.as_deref())?;

        debug!(
            archive = %archive_path.display(),
            "Compressed upload archive"
        );
        ctx.temp_dir = Some(temp_dir);
        ctx.archive_path = Some(archive_path);
        Ok(())
    }

    fn release(&self, ctx: &mut UploadContext) {
        if let Some(temp_dir) = ctx.temp_dir.take() {
            if let Err(e) = temp_dir.close() {
                warn!(error = %e, "Failed to remove upload temp directory");
            }
        }
    }
}

/// Writes a `tar.gz` archive containing the log file and, when present, the
/// key file at archive root under their base names.
fn build_archive(archive: &Path, log: &Path, key: Option<&Path>) -> Result<()> {
    let file = std::fs::File::create(archive)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    builder.append_path_with_name(log, entry_name(log)?)?;
    if let Some(key) = key {
        builder.append_path_with_name(key, entry_name(key)?)?;
    }

    let encoder = builder.into_inner()?;
    encoder.finish()?;
    Ok(())
}

/// Base name a file enters the archive under.
fn entry_name(path: &Path) -> Result<&std::ffi::OsStr> {
    path.file_name()
        .ok_or_else(|| PipelineError::LogNotFound(path.to_path_buf()))
}

/// Ships the archive to the configured remote directory through a fresh
/// transporter handle.
pub struct TransferStep {
    factory: Arc<dyn TransporterFactory>,
    upload_dir: String,
}

impl TransferStep {
    /// Creates a transfer step targeting the given remote directory.
    #[must_use]
    pub fn new(factory: Arc<dyn TransporterFactory>, upload_dir: impl Into<String>) -> Self {
        Self {
            factory,
            upload_dir: upload_dir.into(),
        }
    }
}

#[async_trait]
impl UploadStep for TransferStep {
    fn name(&self) -> &'static str {
        "transfer"
    }

    async fn execute(&self, ctx: &mut UploadContext) -> Result<()> {
        let archive = ctx
            .archive_path
            .clone()
            .ok_or(PipelineError::MissingArchive)?;
        let archive_name = entry_name(&archive)?.to_string_lossy().into_owned();
        let remote = format!("{}{}", normalize_remote_dir(&self.upload_dir), archive_name);

        let transporter = self.factory.connect().await?;
        let uploaded = transporter.upload(&archive, &remote).await;
        if let Err(e) = transporter.close().await {
            warn!(error = %e, "Failed to close transporter");
        }
        uploaded?;

        info!(remote = %remote, "Shipped archive");
        ctx.remote_path = Some(remote);
        Ok(())
    }

    fn release(&self, _ctx: &mut UploadContext) {
        // The transfer step owns no temporary resources; a failed transfer
        // leaves no partial remote object by contract of the transporter.
    }
}

/// Normalizes a configured remote directory to forward slashes with exactly
/// one trailing slash.
#[must_use]
pub fn normalize_remote_dir(dir: &str) -> String {
    let mut normalized = dir.replace('\\', "/");
    while normalized.ends_with('/') {
        normalized.pop();
    }
    normalized.push('/');
    normalized
}

/// The multi-step secure upload pipeline.
///
/// Synchronous in the sense that one invocation runs its steps strictly in
/// order; concurrent invocations are independent and share nothing but the
/// transporter factory.
pub struct UploadPipeline {
    factory: Arc<dyn TransporterFactory>,
    config: ShipperConfig,
    alert: Arc<dyn AlertSink>,
}

impl UploadPipeline {
    /// Creates a pipeline with its dependencies injected.
    #[must_use]
    pub fn new(
        factory: Arc<dyn TransporterFactory>,
        config: ShipperConfig,
        alert: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            factory,
            config,
            alert,
        }
    }

    /// Ships a log file, and optionally a key file, as one compressed
    /// archive. Returns the remote path of the shipped archive.
    ///
    /// # Errors
    ///
    /// Any step failure aborts the chain and returns the original step
    /// error; the alert sink is notified and every release hook still runs,
    /// so no temporary directory is left behind.
    pub async fn upload(&self, log_path: &Path, key_path: Option<&Path>) -> Result<String> {
        let mut ctx = UploadContext::new(
            log_path.to_path_buf(),
            key_path.map(Path::to_path_buf),
        );
        let steps: Vec<Box<dyn UploadStep>> = vec![
            Box::new(CompressStep),
            Box::new(TransferStep::new(
                Arc::clone(&self.factory),
                self.config.upload_dir.clone(),
            )),
        ];

        let result = run_steps(&steps, &mut ctx).await;
        for step in steps.iter().rev() {
            step.release(&mut ctx);
        }

        match result {
            Ok(()) => ctx.remote_path.ok_or(PipelineError::MissingRemotePath),
            Err(e) => {
                self.alert.notify(&format!(
                    "upload of {} failed: {e}",
                    ctx.log_path.display()
                ));
                Err(e)
            }
        }
    }

    /// Lists the file entries under a remote directory.
    ///
    /// Opens its own transporter handle and closes it before returning; the
    /// pipeline holds no persistent connection state.
    pub async fn list_files(&self, dir: &str) -> Result<Vec<FileInfo>> {
        let transporter = self.factory.connect().await?;
        let listed = transporter.list(dir).await;
        close_handle(transporter.as_ref()).await;
        Ok(listed?)
    }

    /// Downloads a remote object and returns its bytes.
    pub async fn download_file(&self, remote: &str) -> Result<Vec<u8>> {
        let scratch = tempfile::NamedTempFile::new()?;
        let transporter = self.factory.connect().await?;
        let downloaded = transporter.download(remote, scratch.path()).await;
        close_handle(transporter.as_ref()).await;
        downloaded?;
        Ok(std::fs::read(scratch.path())?)
    }

    /// Uploads raw bytes to a remote path.
    pub async fn upload_file(&self, remote: &str, bytes: &[u8]) -> Result<()> {
        let scratch = tempfile::NamedTempFile::new()?;
        std::fs::write(scratch.path(), bytes)?;

        let transporter = self.factory.connect().await?;
        let uploaded = transporter.upload(scratch.path(), remote).await;
        close_handle(transporter.as_ref()).await;
        Ok(uploaded?)
    }
}

/// Executes the chain in order, stopping at the first failure.
async fn run_steps(steps: &[Box<dyn UploadStep>], ctx: &mut UploadContext) -> Result<()> {
    for step in steps {
        debug!(step = step.name(), "Executing upload step");
        step.execute(ctx).await?;
    }
    Ok(())
}

async fn close_handle(transporter: &dyn FileTransporter) {
    if let Err(e) = transporter.close().await {
        warn!(error = %e, "Failed to close transporter");
    }
}
