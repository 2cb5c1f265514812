//! Configuration types for Tika-backed document parsing.
//!
//! All parser behaviour is controlled through [`ParserConfig`], built via its
//! [`ParserConfigBuilder`]. Batch-level settings (which directories to walk,
//! where to write results) live separately in [`crate::batch::BatchConfig`]
//! because a single parser can serve several batches.

use crate::error::TikaError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default address of a locally running Tika server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:9998";

/// Configuration for a [`crate::parse::DocumentParser`].
///
/// Built via [`ParserConfig::builder()`] or using
/// [`ParserConfig::default()`].
///
/// # Example
/// ```rust
/// use tika_pdf2md::{OcrStrategy, ParserConfig};
///
/// let config = ParserConfig::builder()
///     .base_url("http://tika.internal:9998")
///     .ocr_strategy(OcrStrategy::Auto)
///     .max_probe_attempts(20)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Base URL of the Tika server, without a trailing path. Default: `http://localhost:9998`.
    pub base_url: String,

    /// OCR strategy sent with every content request. Default: [`OcrStrategy::OcrOnly`].
    ///
    /// Forcing OCR makes scanned and text-based PDFs go through the same
    /// recognition path, at the cost of much slower parsing for documents
    /// that already carry a text layer.
    pub ocr_strategy: OcrStrategy,

    /// Health probes sent before giving up on the backend. Default: 10.
    pub max_probe_attempts: u32,

    /// Pause between failed probes in milliseconds. Default: 1000.
    pub probe_interval_ms: u64,

    /// Timeout for a single health probe in seconds. Default: 5.
    pub probe_timeout_secs: u64,

    /// Timeout for metadata and content requests in seconds. Default: 300.
    ///
    /// OCR of a long scanned document can take minutes, so this is generous;
    /// it exists so that a wedged server cannot block a batch forever.
    pub request_timeout_secs: u64,

    /// Fetch version and parser details once the backend is ready. Default: true.
    pub introspect: bool,

    /// How the backend process is brought up. Default: [`LaunchMode::External`].
    pub launch: LaunchMode,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            ocr_strategy: OcrStrategy::default(),
            max_probe_attempts: 10,
            probe_interval_ms: 1000,
            probe_timeout_secs: 5,
            request_timeout_secs: 300,
            introspect: true,
            launch: LaunchMode::default(),
        }
    }
}

impl ParserConfig {
    /// Create a new builder for `ParserConfig`.
    pub fn builder() -> ParserConfigBuilder {
        ParserConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Builder for [`ParserConfig`].
#[derive(Debug)]
pub struct ParserConfigBuilder {
    config: ParserConfig,
}

impl ParserConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn ocr_strategy(mut self, strategy: OcrStrategy) -> Self {
        self.config.ocr_strategy = strategy;
        self
    }

    pub fn max_probe_attempts(mut self, n: u32) -> Self {
        self.config.max_probe_attempts = n;
        self
    }

    pub fn probe_interval_ms(mut self, ms: u64) -> Self {
        self.config.probe_interval_ms = ms;
        self
    }

    pub fn probe_timeout_secs(mut self, secs: u64) -> Self {
        self.config.probe_timeout_secs = secs;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn introspect(mut self, v: bool) -> Self {
        self.config.introspect = v;
        self
    }

    pub fn launch(mut self, mode: LaunchMode) -> Self {
        self.config.launch = mode;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ParserConfig, TikaError> {
        let c = &self.config;
        if !c.base_url.starts_with("http://") && !c.base_url.starts_with("https://") {
            return Err(TikaError::InvalidConfig(format!(
                "Tika URL must start with http:// or https://, got '{}'",
                c.base_url
            )));
        }
        if c.max_probe_attempts == 0 {
            return Err(TikaError::InvalidConfig(
                "At least one health probe attempt is required".into(),
            ));
        }
        if c.probe_timeout_secs == 0 || c.request_timeout_secs == 0 {
            return Err(TikaError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Representation returned as the primary content of a parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Enhanced Markdown with a title heading. (default)
    #[default]
    Markdown,
    /// Tika's XHTML, untouched.
    Html,
    /// Prose text only: no links, images or emphasis markers.
    PlainText,
}

impl OutputFormat {
    /// File extension of the persisted content artefact.
    ///
    /// Only Markdown gets `.md`; every other format is stored as `.txt`
    /// because the raw HTML is always written to its own `.html` file.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Html | OutputFormat::PlainText => "txt",
        }
    }
}

/// Value of the `X-Tika-PDFOcrStrategy` request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OcrStrategy {
    /// Run OCR on every page and ignore the embedded text layer. (default)
    #[default]
    OcrOnly,
    /// Let Tika decide per page.
    Auto,
    /// Embedded text only.
    NoOcr,
    /// Embedded text and OCR output, concatenated.
    OcrAndText,
}

impl OcrStrategy {
    pub fn header_value(&self) -> &'static str {
        match self {
            OcrStrategy::OcrOnly => "ocr_only",
            OcrStrategy::Auto => "auto",
            OcrStrategy::NoOcr => "no_ocr",
            OcrStrategy::OcrAndText => "ocr_and_text_extraction",
        }
    }
}

/// How the Tika process gets started before readiness polling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaunchMode {
    /// The server is managed elsewhere; only poll. (default)
    #[default]
    External,
    /// Run `docker compose up -d` when the named service is not running.
    DockerCompose {
        service: String,
        project_dir: Option<PathBuf>,
    },
}
