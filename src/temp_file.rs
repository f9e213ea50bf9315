use std::{
    fs,
    path::{Path, PathBuf},
};

/// Removes the file on drop unless it was kept with [`TempFile::persist`].
///
/// Guards placeholders and partial transcode outputs so an early return
/// never leaves a half-written artifact behind.
pub struct TempFile {
    path: Option<PathBuf>,
}

impl TempFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or(Path::new(""))
    }

    /// Keep the file and hand its path to the caller
    pub fn persist(mut self) -> PathBuf {
        self.path.take().unwrap_or_default()
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if path.exists() {
                if let Err(e) = fs::remove_file(&path) {
                    log::warn!("Failed to remove file {}: {}", path.display(), e);
                }
            }
        }
    }
}
