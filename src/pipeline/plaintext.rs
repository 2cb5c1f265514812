//! Plain-text rendering of Tika XHTML.
//!
//! Keeps the prose only: link targets, images and emphasis markers are
//! dropped. [`html2text`]'s trivial decorator already renders links as their
//! text and emphasis without markers; images are removed up front because it
//! would otherwise keep their alt text.

use super::markdown::strip_non_content;
use html2text::render::text_renderer::TrivialDecorator;
use once_cell::sync::Lazy;
use regex::Regex;

/// Render width handed to html2text. Wide enough that paragraphs are not
/// re-wrapped in practice.
const RENDER_WIDTH: usize = 4096;

static RE_IMG_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<img\b[^>]*>").unwrap());

/// Convert HTML to plain prose text.
pub fn html_to_text(html: &str) -> String {
    let html = strip_non_content(html);
    let html = RE_IMG_TAG.replace_all(&html, "");
    let text =
        html2text::from_read_with_decorator(html.as_bytes(), RENDER_WIDTH, TrivialDecorator::new());
    text.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}
