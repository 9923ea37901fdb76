// File utilities for the speech relay
//
// Transient uploads live in the upload directory under a UUID name. A
// `TransientUpload` owns its file: removing it consumes the value, and a value
// dropped without an explicit removal (early return, cancelled request) removes
// the file on drop.

use log::{debug, error, info};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug)]
pub struct TransientUpload {
    id: String,
    path: PathBuf,
    removed: bool,
}

impl TransientUpload {
    /// Creates the file for a new upload under `base_dir` and returns it opened for writing
    pub async fn create(base_dir: &Path) -> io::Result<(Self, tokio::fs::File)> {
        let id = Uuid::new_v4().to_string();
        let path = base_dir.join(&id);
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        debug!("Created transient upload {}", path.display());
        Ok((
            Self {
                id,
                path,
                removed: false,
            },
            file,
        ))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the transient file. Failures are logged, never returned.
    pub fn remove(mut self) {
        self.removed = true;
        cleanup_file(&self.path);
    }
}

impl Drop for TransientUpload {
    fn drop(&mut self) {
        if !self.removed {
            cleanup_file(&self.path);
        }
    }
}

/// Remove a single file, logging the outcome
pub fn cleanup_file(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => info!("Removed transient file: {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Transient file already gone: {}", path.display())
        }
        Err(e) => error!("Failed to remove transient file {}: {}", path.display(), e),
    }
}
