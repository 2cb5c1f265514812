//! Parse requests, parse results, and their persistence.
//!
//! A [`ParseResult`] carries three representations of one document: the
//! requested content, Tika's metadata, and the raw HTML. [`save_output`]
//! writes all three next to each other under a shared base name:
//!
//! ```text
//! results/tika/scanned/invoice.md
//! results/tika/scanned/invoice.html
//! results/tika/scanned/invoice_metadata.json
//! ```

use crate::config::OutputFormat;
use crate::error::{ParseFailure, TikaError};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Document properties keyed by Tika's property names (`Author`,
/// `Content-Type`, `xmpTPg:NPages`, ...) plus the derived OCR flags.
pub type Metadata = serde_json::Map<String, Value>;

/// Key used for error entries inside [`Metadata`].
pub const METADATA_ERROR_KEY: &str = "error";

/// A single document to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRequest {
    path: PathBuf,
    format: OutputFormat,
}

impl ParseRequest {
    pub fn new(path: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }
}

/// Outcome of parsing one document.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// The requested representation, or why it could not be produced.
    pub content: Result<String, ParseFailure>,
    /// Tika metadata plus OCR flags. May hold an `error` entry.
    pub metadata: Metadata,
    /// Raw HTML from Tika; `None` whenever `content` is an error.
    pub html: Option<String>,
}

impl ParseResult {
    /// Result for a document that was never sent because the backend is down.
    pub fn backend_unavailable(reason: impl Into<String>) -> Self {
        Self {
            content: Err(ParseFailure::BackendUnavailable {
                reason: reason.into(),
            }),
            metadata: error_metadata("Tika server not available"),
            html: None,
        }
    }

    pub fn failed(failure: ParseFailure, metadata: Metadata) -> Self {
        Self {
            content: Err(failure),
            metadata,
            html: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.content.is_ok()
    }

    /// The failure, if any.
    pub fn failure(&self) -> Option<&ParseFailure> {
        self.content.as_ref().err()
    }
}

/// A metadata map holding only an `error` entry.
pub fn error_metadata(message: impl Into<String>) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(METADATA_ERROR_KEY.into(), Value::from(message.into()));
    metadata
}

/// Paths of the three artefacts written for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPaths {
    pub content: PathBuf,
    pub html: PathBuf,
    pub metadata: PathBuf,
}

impl SavedPaths {
    /// Artefact paths for `base` (a path without extension).
    pub fn for_base(base: &Path, format: OutputFormat) -> Self {
        let with_suffix = |suffix: &str| {
            let mut name = base.as_os_str().to_os_string();
            name.push(suffix);
            PathBuf::from(name)
        };
        Self {
            content: with_suffix(&format!(".{}", format.extension())),
            html: with_suffix(".html"),
            metadata: with_suffix("_metadata.json"),
        }
    }
}

/// Write content, HTML and metadata for one document.
///
/// `base` is the output path without extension, e.g.
/// `results/tika/scanned/invoice`. Parent directories are created. Every
/// file is written atomically (temp file + rename) so an interrupted batch
/// never leaves a half-written artefact behind.
pub async fn save_output(
    content: &str,
    metadata: &Metadata,
    html: &str,
    base: &Path,
    format: OutputFormat,
) -> Result<SavedPaths, TikaError> {
    let paths = SavedPaths::for_base(base, format);

    if let Some(parent) = base.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| TikaError::OutputWriteFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
    }

    let json = serde_json::to_string_pretty(metadata)?;

    write_atomic(&paths.content, content.as_bytes()).await?;
    write_atomic(&paths.html, html.as_bytes()).await?;
    write_atomic(&paths.metadata, json.as_bytes()).await?;

    debug!("Saved outputs for {}", base.display());
    Ok(paths)
}

async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), TikaError> {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, data)
        .await
        .map_err(|e| TikaError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(TikaError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        });
    }
    Ok(())
}
