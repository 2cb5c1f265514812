//! Input resolution: normalise a user-supplied path and load the document.
//!
//! Paths are made absolute against the current directory before anything is
//! sent, so log lines and error messages name the same file no matter where
//! the batch was started from.

use crate::error::ParseFailure;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Make `path` absolute without touching the file system.
///
/// Unlike `canonicalize`, symlinks are kept and a missing file is not an
/// error here; reading it is what reports that.
pub fn absolutize(path: &Path) -> Result<PathBuf, ParseFailure> {
    std::path::absolute(path).map_err(|e| ParseFailure::Input {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Read the whole document into memory.
pub async fn read_document(path: &Path) -> Result<Vec<u8>, ParseFailure> {
    let bytes = tokio::fs::read(path).await.map_err(|e| ParseFailure::Input {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}

/// Title used for the Markdown `# heading`: the file name without extension.
pub fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string())
}
