//! CLI binary for tika-pdf2md.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ParserConfig` / `BatchConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tika_pdf2md::{
    BatchConfig, BatchDriver, BatchProgressCallback, DocumentParser, DocumentReport, LaunchMode,
    OcrStrategy, OutputFormat, ParserConfig, ProgressCallback,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the batch, one log line per document.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_batch_start` tells us how many documents there are.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Waiting for Tika…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Parsing");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .unwrap()
            .remove(&index)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.activate_bar(total_documents);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Parsing {total_documents} documents…"))
        ));
    }

    fn on_document_start(&self, index: usize, _total: usize, path: &Path) {
        self.start_times
            .lock()
            .unwrap()
            .insert(index, Instant::now());
        self.bar.set_message(file_label(path));
    }

    fn on_document_complete(&self, index: usize, total: usize, path: &Path, content_len: usize) {
        let elapsed = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<32}  {:<8}  {}",
            green("✓"),
            index,
            total,
            file_label(path),
            dim(&format!("{content_len:>6} chars")),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, index: usize, total: usize, path: &Path, error: &str) {
        let elapsed = self.elapsed_secs(index);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<32}  {}  {}",
            red("✗"),
            index,
            total,
            file_label(path),
            red(&msg),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_report(&self, _index: usize, _total: usize, report: &DocumentReport) {
        let Ok(saved) = &report.outcome else {
            return;
        };
        for line in report.preview.lines() {
            self.bar.println(format!("      {}", dim(line)));
        }
        for (field, value) in &report.key_metadata {
            self.bar.println(format!("      {}: {}", bold(field), value));
        }
        self.bar
            .println(format!("      {} {}", dim("→"), saved.content.display()));
    }

    fn on_batch_complete(&self, total_documents: usize, success_count: usize) {
        let failed = total_documents.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} documents parsed successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} documents parsed  ({} failed)",
                if failed == total_documents {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_documents,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Batch: documents/{scanned,text-based,mixed}/*.pdf → results/tika/
  tika2md

  # Single file to stdout
  tika2md invoice.pdf

  # Plain text, JSON with metadata
  tika2md --format text --json invoice.pdf > invoice.json

  # Start the docker compose service if it is not running
  tika2md --auto-start --compose-service tika

  # What does the server support?
  tika2md --capabilities

ENVIRONMENT VARIABLES:
  TIKA_URL                Tika server base URL (default http://localhost:9998)
  TIKA2MD_DOCUMENTS_DIR   Batch documents root
  TIKA2MD_RESULTS_DIR     Batch results root
  RUST_LOG                Overrides the log filter
"#;

/// Extract PDF content and metadata through Apache Tika.
#[derive(Parser, Debug)]
#[command(
    name = "tika2md",
    version,
    about = "Extract PDF content and metadata through Apache Tika",
    long_about = "Send PDF documents to an Apache Tika server and save the extracted content \
as enhanced Markdown, HTML or plain text, together with Tika's metadata. Without file \
arguments every PDF under the category directories is processed.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF files to parse to stdout. Without any, run the batch.
    files: Vec<PathBuf>,

    /// Tika server base URL.
    #[arg(long, env = "TIKA_URL", default_value = tika_pdf2md::config::DEFAULT_BASE_URL)]
    url: String,

    /// Output format: markdown, html, text.
    #[arg(long, env = "TIKA2MD_FORMAT", value_enum, default_value = "markdown")]
    format: FormatArg,

    /// OCR strategy sent to Tika.
    #[arg(long, env = "TIKA2MD_OCR_STRATEGY", value_enum, default_value = "ocr-only")]
    ocr_strategy: OcrArg,

    /// Batch documents root.
    #[arg(long, env = "TIKA2MD_DOCUMENTS_DIR", default_value = "documents")]
    documents_dir: PathBuf,

    /// Batch results root.
    #[arg(long, env = "TIKA2MD_RESULTS_DIR", default_value = "results/tika")]
    results_dir: PathBuf,

    /// Category sub-directory to walk (repeatable). Default: scanned, text-based, mixed.
    #[arg(long = "category")]
    categories: Vec<String>,

    /// Content lines echoed to the log per document.
    #[arg(long, default_value_t = 10)]
    preview_lines: usize,

    /// Health probes before giving up on the server.
    #[arg(long, env = "TIKA2MD_MAX_ATTEMPTS", default_value_t = 10,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: u32,

    /// Pause between failed probes in milliseconds.
    #[arg(long, default_value_t = 1000)]
    probe_interval_ms: u64,

    /// Metadata/content request timeout in seconds.
    #[arg(long, env = "TIKA2MD_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// Run `docker compose up -d` when the Tika service is not running.
    #[arg(long)]
    auto_start: bool,

    /// docker compose service name used with --auto-start.
    #[arg(long, default_value = "tika")]
    compose_service: String,

    /// Print server version and parser list, then exit.
    #[arg(long)]
    capabilities: bool,

    /// Single-file mode: print content and metadata as JSON.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "TIKA2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "TIKA2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "TIKA2MD_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Markdown,
    Html,
    Text,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Markdown => OutputFormat::Markdown,
            FormatArg::Html => OutputFormat::Html,
            FormatArg::Text => OutputFormat::PlainText,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OcrArg {
    OcrOnly,
    Auto,
    NoOcr,
    OcrAndText,
}

impl From<OcrArg> for OcrStrategy {
    fn from(v: OcrArg) -> Self {
        match v {
            OcrArg::OcrOnly => OcrStrategy::OcrOnly,
            OcrArg::Auto => OcrStrategy::Auto,
            OcrArg::NoOcr => OcrStrategy::NoOcr,
            OcrArg::OcrAndText => OcrStrategy::OcrAndText,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Batch previews are INFO logs; with the progress bar active they are
    // printed above the bar by the callback instead.
    let batch_mode = cli.files.is_empty() && !cli.capabilities;
    let show_progress = batch_mode && !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    let parser = DocumentParser::new(config).context("Failed to create Tika client")?;

    // ── Capabilities ─────────────────────────────────────────────────────
    if cli.capabilities {
        parser
            .ensure_ready()
            .await
            .context("Tika server not available")?;
        let caps = parser.capabilities().cloned().unwrap_or_default();
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&caps).context("Failed to serialize capabilities")?
            );
        } else {
            println!("Server:   {}", parser.config().base_url);
            println!("Version:  {}", caps.version.as_deref().unwrap_or("unknown"));
            if let Some(parsers) = caps.parsers {
                println!(
                    "Parsers:\n{}",
                    serde_json::to_string_pretty(&parsers)
                        .context("Failed to serialize parser list")?
                );
            }
        }
        return Ok(());
    }

    // ── Single-file mode ─────────────────────────────────────────────────
    if !cli.files.is_empty() {
        return parse_files(&cli, &parser).await;
    }

    // ── Batch mode ───────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as ProgressCallback)
    } else {
        None
    };

    let driver = BatchDriver::new(build_batch_config(&cli));
    let summary = driver
        .run(&parser, progress_cb.as_ref())
        .await
        .context("Batch failed")?;

    if !cli.quiet && !show_progress {
        eprintln!(
            "Parsed {}/{} documents into {}",
            summary.processed(),
            summary.reports.len(),
            driver.config().results_root.display()
        );
        if summary.failed() > 0 {
            eprintln!("  {} documents failed", summary.failed());
        }
    }

    Ok(())
}

/// Parse each file to stdout. Fails if any file failed.
async fn parse_files(cli: &Cli, parser: &DocumentParser) -> Result<()> {
    let format: OutputFormat = cli.format.into();
    let stdout = io::stdout();
    let mut failed = 0usize;

    for path in &cli.files {
        let result = parser.parse_path(path, format).await;

        if cli.json {
            let value = serde_json::json!({
                "source": path,
                "content": result.content.as_ref().ok(),
                "error": result.failure(),
                "metadata": result.metadata,
            });
            let json = serde_json::to_string_pretty(&value).context("Failed to serialise output")?;
            println!("{json}");
            if !result.is_ok() {
                failed += 1;
            }
            continue;
        }

        match result.content {
            Ok(content) => {
                let mut handle = stdout.lock();
                handle
                    .write_all(content.as_bytes())
                    .context("Failed to write to stdout")?;
                if !content.ends_with('\n') {
                    handle.write_all(b"\n").ok();
                }
            }
            Err(e) => {
                failed += 1;
                if !cli.quiet {
                    eprintln!("{} {}", red("✗"), e);
                }
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} documents failed", cli.files.len());
    }
    Ok(())
}

/// Map CLI args to `ParserConfig`.
fn build_config(cli: &Cli) -> Result<ParserConfig> {
    let mut builder = ParserConfig::builder()
        .base_url(cli.url.clone())
        .ocr_strategy(cli.ocr_strategy.into())
        .max_probe_attempts(cli.max_attempts)
        .probe_interval_ms(cli.probe_interval_ms)
        .request_timeout_secs(cli.timeout)
        .introspect(cli.capabilities || !cli.quiet);

    if cli.auto_start {
        builder = builder.launch(LaunchMode::DockerCompose {
            service: cli.compose_service.clone(),
            project_dir: None,
        });
    }

    builder.build().context("Invalid configuration")
}

/// Map CLI args to `BatchConfig`.
fn build_batch_config(cli: &Cli) -> BatchConfig {
    let mut config = BatchConfig {
        documents_root: cli.documents_dir.clone(),
        results_root: cli.results_dir.clone(),
        format: cli.format.into(),
        preview_lines: cli.preview_lines,
        ..BatchConfig::default()
    };
    if !cli.categories.is_empty() {
        config.categories = cli.categories.clone();
    }
    config
}
