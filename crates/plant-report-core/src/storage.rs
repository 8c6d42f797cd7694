//! Transient on-disk files: uploaded images and generated reports.
//!
//! Both kinds of file are owned by a guard that deletes the file when it is
//! dropped, so every exit path of a request (success, error, panic unwinding)
//! leaves the shared `upload/` and `reports/` directories clean.
//!
//! Upload names come from `tempfile` (random suffix). Report names are
//! `report-<unix millis>-<8 hex>.pdf` and are opened with `create_new`, so two
//! reports finishing in the same millisecond still get distinct files.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::util::unix_millis;

/// Attempts before giving up on finding a free report name.
const MAX_NAME_ATTEMPTS: usize = 8;

// =============================================================================
// Uploads
// =============================================================================

/// Directory that receives uploaded images for the duration of one analysis.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write an upload to disk under a generated name.
    pub async fn persist(&self, bytes: &[u8]) -> Result<StoredUpload> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = tempfile::Builder::new()
            .prefix("upload-")
            .rand_bytes(12)
            .tempfile_in(&self.dir)?
            .into_temp_path();

        // `path` is removed on drop if the write fails
        tokio::fs::write(&path, bytes).await?;
        debug!("Stored upload at {} ({} bytes)", path.display(), bytes.len());

        Ok(StoredUpload { path })
    }
}

/// An uploaded file on disk. Deleted when dropped.
#[derive(Debug)]
pub struct StoredUpload {
    path: TempPath,
}

impl StoredUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the upload back fully into memory.
    pub async fn read(&self) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(&self.path).await?)
    }

    /// Delete the file now, reporting failures instead of ignoring them.
    pub fn close(self) -> Result<()> {
        self.path.close().map_err(Error::Io)
    }
}

// =============================================================================
// Reports
// =============================================================================

/// Directory that holds rendered reports until they are sent.
#[derive(Debug, Clone)]
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the reports directory if needed (idempotent).
    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Generate a candidate report file name.
    pub fn file_name() -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("report-{}-{}.pdf", unix_millis(), &suffix[..8])
    }

    /// Create a fresh, empty report file.
    ///
    /// Blocking: call from a blocking task. The returned guard owns the
    /// path, so a failed write still removes the file.
    pub fn create(&self) -> Result<(File, ReportFile)> {
        for _ in 0..MAX_NAME_ATTEMPTS {
            let name = Self::file_name();
            let path = self.dir.join(&name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    debug!("Created report file {}", path.display());
                    let report = ReportFile::new(path.clone(), name).inspect_err(|_| {
                        let _ = std::fs::remove_file(&path);
                    })?;
                    return Ok((file, report));
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!("Report name {} taken, retrying", name);
                }
                Err(e) => return Err(Error::Io(e)),
            }
        }

        Err(Error::PdfSave(format!(
            "no free report file name in {} after {MAX_NAME_ATTEMPTS} attempts",
            self.dir.display()
        )))
    }
}

/// A rendered report on disk. Deleted when dropped or consumed.
#[derive(Debug)]
pub struct ReportFile {
    path: TempPath,
    file_name: String,
}

impl ReportFile {
    fn new(path: PathBuf, file_name: String) -> Result<Self> {
        Ok(Self {
            path: TempPath::try_from_path(path)?,
            file_name,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name used for the download attachment.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Read the report and delete it from disk.
    ///
    /// A failed deletion is logged and otherwise ignored.
    pub async fn into_bytes(self) -> Result<Vec<u8>> {
        let bytes = tokio::fs::read(&self.path).await?;

        let path = self.path.display().to_string();
        if let Err(e) = self.path.close() {
            warn!("Failed to delete report {}: {}", path, e);
        }

        Ok(bytes)
    }
}
