//! Single-document parsing against a Tika server.
//!
//! [`DocumentParser::parse`] is the primary entry point of the library:
//!
//! ```text
//! ensure_ready ──▶ absolutise ──▶ PUT /meta ──▶ PUT /tika ──▶ OCR flags ──▶ format
//!   (hard gate)      + read       (non-fatal)    (fatal)                    md | html | text
//! ```
//!
//! Failures never escape as `Err`: each one is folded into the returned
//! [`ParseResult`] so a batch can log it and carry on with the next file.

use crate::backend::{BackendHealth, ServiceCapabilities, TikaClient, TikaService};
use crate::config::{OutputFormat, ParserConfig};
use crate::error::{ParseFailure, TikaError};
use crate::output::{error_metadata, Metadata, ParseRequest, ParseResult};
use crate::pipeline::{input, markdown, ocr, plaintext};
use serde_json::Value;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Parses documents through one Tika server.
///
/// Owns the backend's readiness state: the first parse waits for the server,
/// later ones go straight to the request.
#[derive(Debug)]
pub struct DocumentParser<S = TikaClient> {
    service: S,
    health: BackendHealth,
    config: ParserConfig,
}

impl DocumentParser<TikaClient> {
    /// Parser talking HTTP to `config.base_url`.
    pub fn new(config: ParserConfig) -> Result<Self, TikaError> {
        let client = TikaClient::new(&config)?;
        Ok(Self::with_service(client, config))
    }
}

impl<S: TikaService> DocumentParser<S> {
    /// Parser over any [`TikaService`] implementation.
    pub fn with_service(service: S, config: ParserConfig) -> Self {
        let health = BackendHealth::new(&config);
        Self {
            service,
            health,
            config,
        }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// See [`BackendHealth::ensure_ready`].
    pub async fn ensure_ready(&self) -> Result<(), TikaError> {
        self.health.ensure_ready(&self.service).await
    }

    /// Version and parser list, once the backend has been reached.
    pub fn capabilities(&self) -> Option<&ServiceCapabilities> {
        self.health.capabilities()
    }

    /// Parse `path` into `format`. Shorthand for [`DocumentParser::parse`].
    pub async fn parse_path(&self, path: impl AsRef<Path>, format: OutputFormat) -> ParseResult {
        self.parse(&ParseRequest::new(path.as_ref(), format)).await
    }

    /// Parse one document.
    ///
    /// # Returns
    /// Always a [`ParseResult`]. `content` is `Err` when the backend is
    /// unavailable, the file cannot be read, or the content request fails;
    /// in those cases `html` is `None`. A failed metadata request only adds
    /// an `error` entry to `metadata`.
    pub async fn parse(&self, request: &ParseRequest) -> ParseResult {
        if let Err(e) = self.ensure_ready().await {
            warn!("Skipping {}: {}", request.path().display(), e);
            return ParseResult::backend_unavailable(e.to_string());
        }

        let start = Instant::now();
        let path = match input::absolutize(request.path()) {
            Ok(p) => p,
            Err(failure) => return ParseResult::failed(failure, Metadata::new()),
        };
        info!("Parsing {}", path.display());

        let document = match input::read_document(&path).await {
            Ok(bytes) => bytes,
            Err(failure) => return ParseResult::failed(failure, Metadata::new()),
        };

        let mut metadata = self.fetch_metadata(&document).await;

        let response = match self
            .service
            .put_content(&document, self.config.ocr_strategy)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!("Content request for {} failed: {}", path.display(), e);
                let failure = ParseFailure::Transport {
                    path,
                    message: e.to_string(),
                };
                return ParseResult::failed(failure, metadata);
            }
        };

        ocr::apply_ocr_flags(&response.headers, &mut metadata);

        if !response.status.is_success() {
            warn!("Tika returned {} for {}", response.status, path.display());
            let failure = ParseFailure::ContentFetchFailed {
                status: response.status.as_u16(),
                body: response.body,
            };
            return ParseResult::failed(failure, metadata);
        }

        let html = response.body;
        let content = match request.format() {
            OutputFormat::Markdown => {
                markdown::enhance(&html, &input::title_from_path(request.path()))
            }
            OutputFormat::Html => html.clone(),
            OutputFormat::PlainText => plaintext::html_to_text(&html),
        };

        debug!(
            "Parsed {} in {}ms ({} bytes of HTML)",
            path.display(),
            start.elapsed().as_millis(),
            html.len()
        );

        ParseResult {
            content: Ok(content),
            metadata,
            html: Some(html),
        }
    }

    /// Fetch Tika metadata for a file without parsing its content.
    pub async fn extract_metadata(&self, path: impl AsRef<Path>) -> Metadata {
        if let Err(e) = self.ensure_ready().await {
            warn!("{}", e);
            return error_metadata("Tika server not available");
        }

        let document = match input::absolutize(path.as_ref()) {
            Ok(p) => input::read_document(&p).await,
            Err(failure) => Err(failure),
        };
        match document {
            Ok(bytes) => self.fetch_metadata(&bytes).await,
            Err(failure) => error_metadata(format!("Error extracting metadata: {failure}")),
        }
    }

    /// `PUT /meta`; every failure becomes an `error` entry.
    async fn fetch_metadata(&self, document: &[u8]) -> Metadata {
        let response = match self.service.put_metadata(document).await {
            Ok(r) => r,
            Err(e) => {
                warn!("Metadata request failed: {}", e);
                return error_metadata(format!("Error extracting metadata: {e}"));
            }
        };

        if !response.status.is_success() {
            warn!("Metadata request returned {}", response.status);
            return error_metadata(format!(
                "Failed to extract metadata: {}",
                response.status.as_u16()
            ));
        }

        match serde_json::from_str::<Value>(&response.body) {
            Ok(Value::Object(map)) => map,
            Ok(other) => error_metadata(format!(
                "Error extracting metadata: expected a JSON object, got {}",
                json_kind(&other)
            )),
            Err(e) => error_metadata(format!("Error extracting metadata: {e}")),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ServiceResponse;
    use crate::config::OcrStrategy;
    use crate::error::TransportError;
    use crate::output::METADATA_ERROR_KEY;
    use reqwest::header::{HeaderName, HeaderValue};
    use reqwest::StatusCode;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory Tika double with call counters.
    struct FakeTika {
        healthy: bool,
        metadata: Result<ServiceResponse, TransportError>,
        content: Result<ServiceResponse, TransportError>,
        probes: AtomicUsize,
        meta_calls: AtomicUsize,
        content_calls: AtomicUsize,
        last_ocr: Mutex<Option<OcrStrategy>>,
    }

    impl FakeTika {
        fn new(content: Result<ServiceResponse, TransportError>) -> Self {
            Self {
                healthy: true,
                metadata: Ok(ServiceResponse::ok(
                    r#"{"Author":"Ada","Content-Type":"application/pdf","xmpTPg:NPages":"2"}"#,
                )),
                content,
                probes: AtomicUsize::new(0),
                meta_calls: AtomicUsize::new(0),
                content_calls: AtomicUsize::new(0),
                last_ocr: Mutex::new(None),
            }
        }

        fn down() -> Self {
            Self {
                healthy: false,
                ..Self::new(Ok(ServiceResponse::ok("")))
            }
        }

        fn fetches(&self) -> usize {
            self.meta_calls.load(Ordering::SeqCst) + self.content_calls.load(Ordering::SeqCst)
        }
    }

    impl TikaService for FakeTika {
        async fn probe(&self) -> Result<StatusCode, TransportError> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            if self.healthy {
                Ok(StatusCode::OK)
            } else {
                Err(TransportError::Connect("connection refused".into()))
            }
        }

        async fn version(&self) -> Result<ServiceResponse, TransportError> {
            Ok(ServiceResponse::ok("Apache Tika 2.9.1"))
        }

        async fn parser_details(&self) -> Result<ServiceResponse, TransportError> {
            Ok(ServiceResponse::ok(r#"{"name":"org.apache.tika.parser.DefaultParser"}"#))
        }

        async fn put_metadata(&self, _: &[u8]) -> Result<ServiceResponse, TransportError> {
            self.meta_calls.fetch_add(1, Ordering::SeqCst);
            self.metadata.clone()
        }

        async fn put_content(
            &self,
            _: &[u8],
            ocr: OcrStrategy,
        ) -> Result<ServiceResponse, TransportError> {
            self.content_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_ocr.lock().unwrap() = Some(ocr);
            self.content.clone()
        }
    }

    fn html_response(body: &str, ocr_headers: &[(&str, &str)]) -> ServiceResponse {
        let mut resp = ServiceResponse::ok(body);
        for (k, v) in ocr_headers {
            resp.headers.insert(
                HeaderName::from_bytes(k.as_bytes()).unwrap(),
                HeaderValue::from_str(v).unwrap(),
            );
        }
        resp
    }

    fn config() -> ParserConfig {
        ParserConfig::builder()
            .max_probe_attempts(2)
            .probe_interval_ms(1)
            .build()
            .unwrap()
    }

    fn sample_pdf(dir: &tempfile::TempDir, name: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"%PDF-1.7\n%fake\n").unwrap();
        path
    }

    const HTML: &str = "<html><body><p>QUARTERLY RESULTS</p><p>Revenue grew by <em>12%</em>.</p></body></html>";

    #[tokio::test]
    async fn backend_down_makes_no_fetches() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = sample_pdf(&dir, "a.pdf");
        let parser = DocumentParser::with_service(FakeTika::down(), config());

        let result = parser.parse_path(&pdf, OutputFormat::Markdown).await;

        assert_eq!(parser.service().fetches(), 0);
        assert_eq!(parser.service().probes.load(Ordering::SeqCst), 2);
        assert!(matches!(
            result.content,
            Err(ParseFailure::BackendUnavailable { .. })
        ));
        assert!(result.html.is_none());
        assert_eq!(result.metadata[METADATA_ERROR_KEY], "Tika server not available");
    }

    #[tokio::test]
    async fn markdown_parse_with_ocr_flags() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = sample_pdf(&dir, "quarterly report.pdf");
        let content = html_response(
            HTML,
            &[("X-Tika-OCRed-Content", "true"), ("X-Tika-OCR-Language", "eng")],
        );
        let parser = DocumentParser::with_service(FakeTika::new(Ok(content)), config());

        let result = parser.parse_path(&pdf, OutputFormat::Markdown).await;

        let md = result.content.as_ref().expect("parse succeeds");
        assert!(md.starts_with("# quarterly report\n\n"), "{md}");
        assert!(md.contains("## QUARTERLY RESULTS"), "{md}");
        assert_eq!(result.html.as_deref(), Some(HTML));
        assert_eq!(result.metadata["Author"], "Ada");
        assert_eq!(result.metadata["OCR-Applied"], "Yes");
        assert_eq!(result.metadata["OCR-Language"], "eng");
        assert_eq!(
            *parser.service().last_ocr.lock().unwrap(),
            Some(OcrStrategy::OcrOnly)
        );
    }

    #[tokio::test]
    async fn readiness_checked_once_across_documents() {
        let dir = tempfile::tempdir().unwrap();
        let a = sample_pdf(&dir, "a.pdf");
        let b = sample_pdf(&dir, "b.pdf");
        let parser =
            DocumentParser::with_service(FakeTika::new(Ok(html_response(HTML, &[]))), config());

        parser.parse_path(&a, OutputFormat::Html).await;
        parser.parse_path(&b, OutputFormat::Html).await;

        assert_eq!(parser.service().probes.load(Ordering::SeqCst), 1);
        assert_eq!(parser.service().content_calls.load(Ordering::SeqCst), 2);
        assert!(parser.capabilities().is_some());
    }

    #[tokio::test]
    async fn html_format_is_passthrough_and_no_ocr_header_means_no() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = sample_pdf(&dir, "a.pdf");
        let parser =
            DocumentParser::with_service(FakeTika::new(Ok(html_response(HTML, &[]))), config());

        let result = parser.parse_path(&pdf, OutputFormat::Html).await;

        assert_eq!(result.content.as_deref(), Ok(HTML));
        assert_eq!(result.metadata["OCR-Applied"], "No");
        assert!(!result.metadata.contains_key("OCR-Language"));
    }

    #[tokio::test]
    async fn plain_text_format_strips_emphasis() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = sample_pdf(&dir, "a.pdf");
        let parser =
            DocumentParser::with_service(FakeTika::new(Ok(html_response(HTML, &[]))), config());

        let result = parser.parse_path(&pdf, OutputFormat::PlainText).await;

        let text = result.content.unwrap();
        assert!(text.contains("Revenue grew by 12%."), "{text}");
        assert!(!text.contains('*'));
        assert!(result.html.is_some());
    }

    #[tokio::test]
    async fn content_failure_500_boom() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = sample_pdf(&dir, "a.pdf");
        let failing = ServiceResponse::with_status(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        let parser = DocumentParser::with_service(FakeTika::new(Ok(failing)), config());

        let result = parser.parse_path(&pdf, OutputFormat::Markdown).await;

        let err = result.content.as_ref().unwrap_err().to_string();
        assert!(err.contains("500"), "{err}");
        assert!(err.contains("boom"), "{err}");
        assert!(result.html.is_none());
        assert_eq!(result.metadata["Author"], "Ada", "metadata survives");
    }

    #[tokio::test]
    async fn content_transport_error_keeps_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = sample_pdf(&dir, "a.pdf");
        let parser = DocumentParser::with_service(
            FakeTika::new(Err(TransportError::Other("connection reset by peer".into()))),
            config(),
        );

        let result = parser.parse_path(&pdf, OutputFormat::Markdown).await;

        match &result.content {
            Err(ParseFailure::Transport { path, message }) => {
                assert!(path.is_absolute());
                assert!(message.contains("connection reset"));
            }
            other => panic!("expected transport failure, got {other:?}"),
        }
        assert!(result.html.is_none());
        assert_eq!(result.metadata["Author"], "Ada");
    }

    #[tokio::test]
    async fn metadata_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = sample_pdf(&dir, "a.pdf");
        let mut fake = FakeTika::new(Ok(html_response(HTML, &[])));
        fake.metadata = Ok(ServiceResponse::with_status(StatusCode::UNPROCESSABLE_ENTITY, ""));
        let parser = DocumentParser::with_service(fake, config());

        let result = parser.parse_path(&pdf, OutputFormat::Markdown).await;

        assert!(result.is_ok());
        assert_eq!(result.metadata[METADATA_ERROR_KEY], "Failed to extract metadata: 422");
        assert_eq!(result.metadata["OCR-Applied"], "No");
    }

    #[tokio::test]
    async fn metadata_non_object_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = sample_pdf(&dir, "a.pdf");
        let mut fake = FakeTika::new(Ok(html_response(HTML, &[])));
        fake.metadata = Ok(ServiceResponse::ok("[1,2]"));
        let parser = DocumentParser::with_service(fake, config());

        let meta = parser.extract_metadata(&pdf).await;

        let err = meta[METADATA_ERROR_KEY].as_str().unwrap();
        assert!(err.contains("an array"), "{err}");
    }

    #[tokio::test]
    async fn missing_file_is_reported_without_fetch() {
        let parser =
            DocumentParser::with_service(FakeTika::new(Ok(html_response(HTML, &[]))), config());

        let result = parser
            .parse_path("/no/such/dir/missing.pdf", OutputFormat::Markdown)
            .await;

        assert!(matches!(result.content, Err(ParseFailure::Input { .. })));
        assert_eq!(parser.service().fetches(), 0);
    }

    #[tokio::test]
    async fn configured_ocr_strategy_is_sent() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = sample_pdf(&dir, "a.pdf");
        let config = ParserConfig::builder()
            .ocr_strategy(OcrStrategy::NoOcr)
            .build()
            .unwrap();
        let parser =
            DocumentParser::with_service(FakeTika::new(Ok(html_response(HTML, &[]))), config);

        parser.parse_path(&pdf, OutputFormat::Html).await;

        assert_eq!(
            *parser.service().last_ocr.lock().unwrap(),
            Some(OcrStrategy::NoOcr)
        );
    }
}
