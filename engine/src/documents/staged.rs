use std::io;
use std::path::{Path, PathBuf};

use axon_sdk::errors::{Result, TutorError};

/// A file staged on disk and owned by exactly one holder.
///
/// The file is deleted when the `StagedFile` is released or dropped, so every
/// exit path (success, caller error, collaborator failure) cleans it up.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    released: bool,
}

impl StagedFile {
    /// Take ownership of an existing file
    pub fn adopt(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            released: false,
        }
    }

    /// Write `bytes` to `dir/<unique prefix>_<file name>` and own the result.
    ///
    /// Only the final component of `filename` is used, so an upload name can
    /// never escape `dir`.
    pub async fn write(dir: &Path, filename: &str, bytes: &[u8]) -> Result<Self> {
        let name = safe_file_name(filename)?;
        tokio::fs::create_dir_all(dir).await?;

        let path = dir.join(format!("{}_{}", uuid::Uuid::new_v4().simple(), name));
        let staged = Self::adopt(&path);
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!("Staged {} bytes at {:?}", bytes.len(), path);
        Ok(staged)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the staged file now, reporting failure
    pub fn release(mut self) -> io::Result<()> {
        self.released = true;
        std::fs::remove_file(&self.path)
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Removed staged file {:?}", self.path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove staged file {:?}: {}", self.path, e),
        }
    }
}

/// Final path component of an upload name
pub fn safe_file_name(filename: &str) -> Result<&str> {
    Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| TutorError::UnsupportedInput(format!("Invalid file name '{}'", filename)))
}

/// Check that a conversation id can name its own staging subdirectory.
///
/// Only ASCII letters, digits, `-` and `_` are accepted, so the id is always a
/// single normal path component.
pub fn check_conversation_dir(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(TutorError::UnsupportedInput(format!(
            "Invalid conversation id '{}'",
            id
        )))
    }
}
