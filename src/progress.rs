//! Progress-callback trait for per-document batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] into
//! [`crate::batch::BatchDriver::run`] to receive events as the batch
//! processes each document. The CLI uses this to drive its progress bar;
//! library users can forward events anywhere they like.
//!
//! # Example
//!
//! ```rust
//! use tika_pdf2md::BatchProgressCallback;
//! use std::path::Path;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct FailureCounter(AtomicUsize);
//!
//! impl BatchProgressCallback for FailureCounter {
//!     fn on_document_error(&self, _index: usize, _total: usize, path: &Path, error: &str) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}: {}", path.display(), error);
//!     }
//! }
//! ```

use crate::batch::DocumentReport;
use std::path::Path;
use std::sync::Arc;

/// Called by the batch driver as it processes each document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `index` is 1-based.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once, after discovery and the readiness check.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called just before a document is sent to Tika.
    fn on_document_start(&self, index: usize, total: usize, path: &Path) {
        let _ = (index, total, path);
    }

    /// Called when a document was parsed and its outputs were written.
    ///
    /// `content_len` is the byte length of the primary content.
    fn on_document_complete(&self, index: usize, total: usize, path: &Path, content_len: usize) {
        let _ = (index, total, path, content_len);
    }

    /// Called when a document failed; the batch continues.
    fn on_document_error(&self, index: usize, total: usize, path: &Path, error: &str) {
        let _ = (index, total, path, error);
    }

    /// Called after `on_document_complete` / `on_document_error` with the
    /// full report: saved paths, content preview and key metadata.
    fn on_document_report(&self, index: usize, total: usize, report: &DocumentReport) {
        let _ = (index, total, report);
    }

    /// Called once after every document has been attempted.
    fn on_batch_complete(&self, total_documents: usize, success_count: usize) {
        let _ = (total_documents, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias for a shared callback.
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
