//! Error types for the tika-pdf2md library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`TikaError`] is **fatal** for the operation that returned it, e.g.
//!   the backend never became ready or an output file could not be
//!   written. Returned as `Err(TikaError)`.
//!
//! * [`ParseFailure`] is **per document**. One document could not be
//!   converted, but the next one may well succeed. Stored inside
//!   [`crate::output::ParseResult::content`] so a batch can log it and move on.
//!
//! * [`TransportError`] is a classified network failure coming out of the
//!   [`crate::backend::TikaService`] seam. The readiness loop retries
//!   [`TransportError::Connect`] and gives up on everything else.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the tika-pdf2md library.
#[derive(Debug, Error)]
pub enum TikaError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The reqwest client could not be constructed (TLS backend etc.).
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    // ── Backend errors ────────────────────────────────────────────────────
    /// Readiness polling exhausted its budget without a healthy probe.
    #[error("Tika server not available at {url} after {attempts} attempts\nStart it with: docker compose up -d")]
    BackendUnavailable { url: String, attempts: u32 },

    /// A probe failed with something other than a refused connection.
    #[error("Tika health probe failed: {0}")]
    ProbeFailed(#[source] TransportError),

    /// `docker compose` could not be run or reported failure.
    #[error("Failed to start Tika container: {0}")]
    LaunchFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write one of the output artefacts.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Metadata could not be serialised to JSON.
    #[error("Failed to serialise metadata: {0}")]
    Serialize(#[from] serde_json::Error),

    /// None of the configured category directories exist.
    #[error("No document directories found under '{root}'")]
    DocumentsDirMissing { root: PathBuf },
}

/// A non-fatal error for a single document.
///
/// The `Display` output is the human-readable line the batch driver logs,
/// e.g. `Error parsing PDF: 500 - boom`.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ParseFailure {
    /// The readiness check failed; no request was sent for this document.
    #[error("Tika server not available: {reason}")]
    BackendUnavailable { reason: String },

    /// The content endpoint answered with a non-success status.
    #[error("Error parsing PDF: {status} - {body}")]
    ContentFetchFailed { status: u16, body: String },

    /// The content request never produced a response.
    #[error("Error processing {}: {message}", path.display())]
    Transport { path: PathBuf, message: String },

    /// The document itself could not be read from disk.
    #[error("Error processing {}: {message}", path.display())]
    Input { path: PathBuf, message: String },
}

/// Classified failure of a single HTTP exchange with the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection refused or otherwise not established. Retryable while
    /// waiting for the backend to come up.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request was sent but no answer arrived in time.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Anything else (protocol error, body decoding, ...).
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Whether the readiness loop should keep polling after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Connect(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        // Connect timeouts count as connection failures: the container is
        // usually still binding its port.
        if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}
