//! Markdown enhancement: Tika XHTML → readable Markdown.
//!
//! ## Why a second pass?
//!
//! The raw HTML→Markdown conversion of OCR output is noisy: separator rows
//! with no table around them, section titles shouted in capitals, long runs
//! of empty paragraphs. [`enhance`] converts with [`html2md`] and then runs a
//! single forward pass over the lines that fixes exactly those three things.
//!
//! ## The line scanner
//!
//! The pass is a two-state machine:
//!
//! ```text
//!          line with '|'
//! Normal ───────────────▶ InTable
//!   ▲                        │
//!   └────────────────────────┘
//!     line without '|': emit a blank line, then handle it as Normal
//! ```
//!
//! Each input line is looked at once and never revisited, so memory use is
//! bounded by the output size.

use once_cell::sync::Lazy;
use regex::Regex;

/// Alt text given to images that have none.
pub const DEFAULT_IMAGE_ALT: &str = "image";

/// Shouted lines up to this many characters stay as they are (acronyms, labels).
const MAX_UNPROMOTED_LEN: usize = 4;

/// Convert Tika XHTML to Markdown and tidy it up.
///
/// The result starts with `# {title}` followed by a blank line.
pub fn enhance(html: &str, title: &str) -> String {
    let html = fill_missing_alt(&strip_non_content(html));
    let converted = html2md::parse_html(&html);
    let markdown = format!("# {title}\n\n{converted}");
    normalize_lines(&markdown)
}

// ── Pre-conversion: document head ───────────────────────────────────────────

static RE_PROLOG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<\?xml\b.*?\?>|<!DOCTYPE[^>]*>").unwrap());
static RE_NON_CONTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)<head\b[^>]*/>|<head\b[^>]*>.*?</head\s*>|<style\b[^>]*>.*?</style\s*>|<script\b[^>]*>.*?</script\s*>",
    )
    .unwrap()
});

/// Drop the XML prolog, doctype, `<head>`, `<style>` and `<script>` blocks.
///
/// Tika's XHTML carries the document title and `<meta>` properties in the
/// head; html2md would render their text into the body.
pub(crate) fn strip_non_content(html: &str) -> String {
    let html = RE_PROLOG.replace_all(html, "");
    RE_NON_CONTENT.replace_all(&html, "").into_owned()
}

// ── Pre-conversion: default alt text ────────────────────────────────────────

static RE_IMG_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<img\b([^>]*?)(/?)>").unwrap());
static RE_ALT_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\balt\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());

/// Give every `<img>` without a usable `alt` attribute `alt="image"`.
fn fill_missing_alt(html: &str) -> String {
    RE_IMG_TAG
        .replace_all(html, |caps: &regex::Captures<'_>| {
            let attrs = &caps[1];
            let has_alt = RE_ALT_ATTR
                .captures(attrs)
                .and_then(|c| c.get(1).or_else(|| c.get(2)))
                .is_some_and(|m| !m.as_str().trim().is_empty());
            if has_alt {
                return caps[0].to_string();
            }
            let attrs = RE_ALT_ATTR.replace_all(attrs, "");
            format!(
                "<img{} alt=\"{}\"{}>",
                attrs.trim_end(),
                DEFAULT_IMAGE_ALT,
                &caps[2]
            )
        })
        .into_owned()
}

// ── Post-conversion: line scanner ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    InTable,
}

/// Accumulates output lines; never lets two blank lines touch.
struct LineScanner {
    state: ScanState,
    out: Vec<String>,
}

impl LineScanner {
    fn new() -> Self {
        Self {
            state: ScanState::Normal,
            out: Vec::new(),
        }
    }

    fn last_is_blank(&self) -> bool {
        self.out.last().is_none_or(|l| l.is_empty())
    }

    fn push_blank(&mut self) {
        if !self.last_is_blank() {
            self.out.push(String::new());
        }
    }

    fn push(&mut self, line: &str) {
        self.out.push(line.to_string());
    }

    fn feed(&mut self, raw: &str) {
        let line = raw.trim_end();

        if line.is_empty() {
            // A blank line also ends a table, and that exit blank is the
            // same single blank line.
            self.state = ScanState::Normal;
            self.push_blank();
            return;
        }

        if is_table_line(line) {
            match self.state {
                ScanState::Normal => {
                    self.state = ScanState::InTable;
                    if has_no_letters(line) {
                        return;
                    }
                }
                ScanState::InTable => {
                    if is_separator_row(line) {
                        return;
                    }
                }
            }
            self.push(line);
            return;
        }

        if self.state == ScanState::InTable {
            self.state = ScanState::Normal;
            self.push_blank();
        }

        if is_shouted(line) && line.chars().count() > MAX_UNPROMOTED_LEN && !line.starts_with('#') {
            self.push_blank();
            self.push(&format!("## {line}"));
            self.push_blank();
            return;
        }

        self.push(line);
    }

    fn finish(self) -> String {
        self.out.join("\n")
    }
}

/// Run the enhancement pass over already-converted Markdown.
pub fn normalize_lines(markdown: &str) -> String {
    let mut scanner = LineScanner::new();
    for line in markdown.split('\n') {
        scanner.feed(line);
    }
    scanner.finish()
}

/// A `|` makes a table row, unless the line is a bare URL (anchors and
/// query strings may contain literal pipes).
fn is_table_line(line: &str) -> bool {
    line.contains('|') && !line.starts_with("http")
}

fn has_no_letters(line: &str) -> bool {
    !line.chars().any(char::is_alphabetic)
}

/// GFM header separator: `|`, `-`, `:` and spaces, with at least one `-`.
fn is_separator_row(line: &str) -> bool {
    line.contains('-')
        && line
            .chars()
            .all(|c| c == '|' || c == '-' || c == ':' || c.is_whitespace())
}

/// At least one cased character and no lowercase ones.
fn is_shouted(line: &str) -> bool {
    let mut cased = false;
    for c in line.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            cased = true;
        }
    }
    cased
}

// ── Tests ────────────────────────────────────────────────────────────────────
