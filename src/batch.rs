//! Batch driver: parse every document under a set of category directories.
//!
//! ```text
//! documents/                      results/tika/
//! ├── scanned/invoice.pdf   ──▶   ├── scanned/invoice.{md,html,_metadata.json}
//! ├── text-based/paper.pdf  ──▶   ├── text-based/paper.{...}
//! └── mixed/...                   └── mixed/...
//! ```
//!
//! The backend must be ready before the first document: a failed readiness
//! check aborts the whole batch. After that every failure is contained to
//! its document, logged, and the batch moves on.

use crate::backend::TikaService;
use crate::config::OutputFormat;
use crate::error::TikaError;
use crate::output::{save_output, Metadata, ParseResult, SavedPaths};
use crate::parse::DocumentParser;
use crate::progress::ProgressCallback;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Metadata fields echoed to the log after each document.
pub const INTERESTING_FIELDS: [&str; 6] = [
    "Author",
    "Creation-Date",
    "Page-Count",
    "Content-Type",
    "OCR-Applied",
    "OCR-Language",
];

/// Category directories walked by default.
pub const DEFAULT_CATEGORIES: [&str; 3] = ["scanned", "text-based", "mixed"];

/// Where to find documents and where to put results.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Root holding one sub-directory per category. Default: `documents`.
    pub documents_root: PathBuf,
    /// Category sub-directories to walk, in order. Default: [`DEFAULT_CATEGORIES`].
    pub categories: Vec<String>,
    /// Root for the per-category result directories. Default: `results/tika`.
    pub results_root: PathBuf,
    /// Document extension, without the dot, matched case-insensitively. Default: `pdf`.
    pub extension: String,
    /// Primary output format. Default: Markdown.
    pub format: OutputFormat,
    /// Lines of content echoed to the log per document. Default: 10.
    pub preview_lines: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            documents_root: PathBuf::from("documents"),
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            results_root: PathBuf::from("results/tika"),
            extension: "pdf".to_string(),
            format: OutputFormat::Markdown,
            preview_lines: 10,
        }
    }
}

/// What happened to one document.
#[derive(Debug, Clone)]
pub struct DocumentReport {
    pub source: PathBuf,
    /// Written artefacts, or the human-readable reason for the failure.
    pub outcome: Result<SavedPaths, String>,
    /// Byte length of the content; 0 on failure.
    pub content_len: usize,
    /// First lines of the content; empty on failure.
    pub preview: String,
    /// [`INTERESTING_FIELDS`] present in the metadata, in that order.
    pub key_metadata: Vec<(String, String)>,
}

/// Per-document reports for a finished batch.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub reports: Vec<DocumentReport>,
}

impl BatchSummary {
    pub fn processed(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_err()).count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchDriver {
    config: BatchConfig,
}

impl BatchDriver {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// List matching documents directly under each category directory, sorted.
    ///
    /// Missing category directories are skipped.
    ///
    /// # Errors
    /// [`TikaError::DocumentsDirMissing`] when none of them exist.
    pub fn discover(&self) -> Result<Vec<PathBuf>, TikaError> {
        let mut found = Vec::new();
        let mut any_dir = false;

        for category in &self.config.categories {
            let dir = self.config.documents_root.join(category);
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(_) => {
                    warn!("Skipping missing directory {}", dir.display());
                    continue;
                }
            };
            any_dir = true;

            found.extend(
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| p.is_file() && self.has_extension(p)),
            );
        }

        if !any_dir {
            return Err(TikaError::DocumentsDirMissing {
                root: self.config.documents_root.clone(),
            });
        }

        found.sort();
        Ok(found)
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.config.extension))
    }

    /// Output base for `document`: `results_root/<category>/<stem>`.
    ///
    /// The category is the document's directory relative to the documents
    /// root; documents outside the root are grouped under `uncategorized`.
    pub fn output_base(&self, document: &Path) -> PathBuf {
        let category = document
            .parent()
            .and_then(|dir| dir.strip_prefix(&self.config.documents_root).ok())
            .filter(|rel| !rel.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("uncategorized"));
        let stem = document
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_else(|| "document".into());
        self.config.results_root.join(category).join(stem)
    }

    /// Run the batch.
    ///
    /// # Errors
    /// Only for batch-fatal conditions: the backend never became ready, or
    /// no document directory exists. Per-document failures are reported in
    /// the returned [`BatchSummary`].
    pub async fn run<S: TikaService>(
        &self,
        parser: &DocumentParser<S>,
        progress: Option<&ProgressCallback>,
    ) -> Result<BatchSummary, TikaError> {
        parser.ensure_ready().await?;

        let documents = self.discover()?;
        let total = documents.len();
        if total == 0 {
            warn!(
                "No .{} files found in the document directories",
                self.config.extension
            );
        } else {
            info!("Found {} files to process", total);
        }

        if let Some(cb) = progress {
            cb.on_batch_start(total);
        }

        let mut summary = BatchSummary::default();
        for (i, path) in documents.iter().enumerate() {
            let index = i + 1;
            info!("Processing {}/{}: {}", index, total, path.display());
            if let Some(cb) = progress {
                cb.on_document_start(index, total, path);
            }

            let result = parser.parse_path(path, self.config.format).await;
            let report = self.persist(path, result).await;

            if let Some(cb) = progress {
                match &report.outcome {
                    Ok(_) => cb.on_document_complete(index, total, path, report.content_len),
                    Err(e) => cb.on_document_error(index, total, path, e),
                }
                cb.on_document_report(index, total, &report);
            }
            summary.reports.push(report);
        }

        info!(
            "Batch complete: {}/{} documents processed",
            summary.processed(),
            total
        );
        if let Some(cb) = progress {
            cb.on_batch_complete(total, summary.processed());
        }
        Ok(summary)
    }

    /// Save one result and log its preview.
    async fn persist(&self, path: &Path, result: ParseResult) -> DocumentReport {
        let key_metadata = key_metadata(&result.metadata);

        let content = match result.content {
            Ok(content) => content,
            Err(failure) => {
                warn!("Error processing {}: {}", path.display(), failure);
                return DocumentReport {
                    source: path.to_path_buf(),
                    outcome: Err(failure.to_string()),
                    content_len: 0,
                    preview: String::new(),
                    key_metadata,
                };
            }
        };

        let base = self.output_base(path);
        let html = result.html.as_deref().unwrap_or_default();
        let outcome = save_output(&content, &result.metadata, html, &base, self.config.format)
            .await
            .map_err(|e| {
                warn!("{}", e);
                e.to_string()
            });

        let preview = preview(&content, self.config.preview_lines);
        if let Ok(ref saved) = outcome {
            info!("Preview:\n{}", preview);
            info!(
                "Content saved to: {}\nHTML saved to: {}\nMetadata saved to: {}",
                saved.content.display(),
                saved.html.display(),
                saved.metadata.display()
            );
            for (field, value) in &key_metadata {
                info!("{}: {}", field, value);
            }
        }

        DocumentReport {
            source: path.to_path_buf(),
            outcome,
            content_len: content.len(),
            preview,
            key_metadata,
        }
    }
}

/// First `lines` lines of `content`.
pub fn preview(content: &str, lines: usize) -> String {
    content.split('\n').take(lines).collect::<Vec<_>>().join("\n")
}

/// The [`INTERESTING_FIELDS`] present in `metadata`, rendered as strings.
pub fn key_metadata(metadata: &Metadata) -> Vec<(String, String)> {
    INTERESTING_FIELDS
        .iter()
        .filter_map(|field| {
            metadata.get(*field).map(|v| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (field.to_string(), value)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_takes_first_lines() {
        let content = (1..=20).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let p = preview(&content, 10);
        assert_eq!(p.lines().count(), 10);
        assert!(p.ends_with("line 10"));
        assert_eq!(preview("short", 10), "short");
    }

    #[test]
    fn key_metadata_keeps_allowlist_order() {
        let mut meta = Metadata::new();
        meta.insert("OCR-Applied".into(), Value::from("Yes"));
        meta.insert("Author".into(), Value::from("Ada"));
        meta.insert("Page-Count".into(), Value::from(12));
        meta.insert("X-Parsed-By".into(), Value::from("PDFParser"));

        let fields = key_metadata(&meta);

        assert_eq!(
            fields,
            vec![
                ("Author".to_string(), "Ada".to_string()),
                ("Page-Count".to_string(), "12".to_string()),
                ("OCR-Applied".to_string(), "Yes".to_string()),
            ]
        );
    }

    #[test]
    fn output_base_uses_category_and_stem() {
        let driver = BatchDriver::new(BatchConfig {
            documents_root: PathBuf::from("/data/documents"),
            results_root: PathBuf::from("/data/results/tika"),
            ..BatchConfig::default()
        });

        assert_eq!(
            driver.output_base(Path::new("/data/documents/scanned/invoice.pdf")),
            PathBuf::from("/data/results/tika/scanned/invoice")
        );
        assert_eq!(
            driver.output_base(Path::new("/elsewhere/memo.pdf")),
            PathBuf::from("/data/results/tika/uncategorized/memo")
        );
    }

    #[test]
    fn discover_filters_sorts_and_skips_missing() {
        let root = tempfile::tempdir().unwrap();
        let scanned = root.path().join("scanned");
        let mixed = root.path().join("mixed");
        std::fs::create_dir_all(&scanned).unwrap();
        std::fs::create_dir_all(mixed.join("nested")).unwrap();
        for f in ["b.pdf", "a.PDF", "notes.txt"] {
            std::fs::write(scanned.join(f), b"%PDF").unwrap();
        }
        std::fs::write(mixed.join("c.pdf"), b"%PDF").unwrap();
        std::fs::write(mixed.join("nested").join("deep.pdf"), b"%PDF").unwrap();

        let driver = BatchDriver::new(BatchConfig {
            documents_root: root.path().to_path_buf(),
            ..BatchConfig::default()
        });
        let found = driver.discover().unwrap();

        assert_eq!(
            found,
            vec![mixed.join("c.pdf"), scanned.join("a.PDF"), scanned.join("b.pdf")]
        );
    }

    #[test]
    fn discover_without_any_directory_fails() {
        let root = tempfile::tempdir().unwrap();
        let driver = BatchDriver::new(BatchConfig {
            documents_root: root.path().join("missing"),
            ..BatchConfig::default()
        });
        assert!(matches!(
            driver.discover(),
            Err(TikaError::DocumentsDirMissing { .. })
        ));
    }

    #[test]
    fn summary_counts() {
        let ok = DocumentReport {
            source: PathBuf::from("a.pdf"),
            outcome: Ok(SavedPaths::for_base(Path::new("r/a"), OutputFormat::Markdown)),
            content_len: 0,
            preview: String::new(),
            key_metadata: vec![],
        };
        let failed = DocumentReport {
            outcome: Err("boom".into()),
            ..ok.clone()
        };
        let summary = BatchSummary {
            reports: vec![ok, failed.clone(), failed],
        };
        assert_eq!(summary.processed(), 1);
        assert_eq!(summary.failed(), 2);
    }
}
