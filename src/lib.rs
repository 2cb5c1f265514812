//! # tika-pdf2md
//!
//! Extract text, HTML and metadata from PDF documents through an Apache Tika
//! server and turn the result into readable Markdown.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Ready    probe GET /tika until the server answers (once per process)
//!  ├─ 2. Meta     PUT /meta  → JSON properties (non-fatal on failure)
//!  ├─ 3. Content  PUT /tika  → XHTML, OCR strategy header, OCR response flags
//!  ├─ 4. Format   Markdown (enhanced) / HTML / plain text
//!  └─ 5. Output   content + .html + _metadata.json next to each other
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tika_pdf2md::{DocumentParser, OutputFormat, ParserConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let parser = DocumentParser::new(ParserConfig::default())?;
//!     let result = parser.parse_path("invoice.pdf", OutputFormat::Markdown).await;
//!     match result.content {
//!         Ok(markdown) => println!("{markdown}"),
//!         Err(e) => eprintln!("{e}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `tika2md` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! tika-pdf2md = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod batch;
pub mod config;
pub mod error;
pub mod output;
pub mod parse;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{
    BackendHealth, BackendState, ComposeLauncher, ServiceCapabilities, ServiceResponse,
    TikaClient, TikaService,
};
pub use batch::{BatchConfig, BatchDriver, BatchSummary, DocumentReport};
pub use config::{LaunchMode, OcrStrategy, OutputFormat, ParserConfig, ParserConfigBuilder};
pub use error::{ParseFailure, TikaError, TransportError};
pub use output::{save_output, Metadata, ParseRequest, ParseResult, SavedPaths};
pub use parse::DocumentParser;
pub use pipeline::markdown::enhance;
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
