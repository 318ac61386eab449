//! Storage for uploaded files that are waiting to be imported.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use time::OffsetDateTime;

use crate::Error;

/// Distinguishes uploads that arrive within the same clock tick.
static UPLOAD_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A directory where uploaded files are written before they are imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadDirectory {
    path: PathBuf,
}

impl UploadDirectory {
    /// Use `path` for uploads, creating the directory if it does not exist.
    ///
    /// # Errors
    /// Returns an [Error::FileIo] if the directory could not be created.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        fs::create_dir_all(&path)?;

        Ok(Self { path })
    }

    /// The directory uploads are written to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `data` to a new file and return its path.
    ///
    /// The file is named after `file_name` with a unique hex prefix, so
    /// uploading the same file twice gives two different paths.
    ///
    /// # Errors
    /// Returns an [Error::FileIo] if the file could not be written.
    pub fn store(&self, file_name: &str, data: &[u8]) -> Result<PathBuf, Error> {
        let count = UPLOAD_COUNTER.fetch_add(1, Ordering::Relaxed);
        let now = OffsetDateTime::now_utc().unix_timestamp_nanos();
        let prefix = md5::compute(format!("{now}-{count}-{file_name}"));

        let path = self
            .path
            .join(format!("{prefix:x}-{}", sanitise_file_name(file_name)));

        fs::write(&path, data)?;
        tracing::debug!("Stored upload '{}' at {}", file_name, path.display());

        Ok(path)
    }
}

/// Delete an uploaded file.
///
/// Failures are logged and otherwise ignored, the caller has already finished
/// with the file.
pub fn remove_upload(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed upload {}", path.display()),
        Err(error) => tracing::warn!("Could not remove upload {}: {error}", path.display()),
    }
}

/// Keep only the final path component and replace unusual characters.
fn sanitise_file_name(file_name: &str) -> String {
    let base_name = Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();

    let sanitised: String = base_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitised.is_empty() {
        "upload.csv".to_owned()
    } else {
        sanitised
    }
}
