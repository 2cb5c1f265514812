//! OCR bookkeeping: turn Tika's response headers into metadata flags.

use crate::output::Metadata;
use reqwest::header::HeaderMap;
use serde_json::Value;

/// Present on the content response when Tika ran OCR.
pub const OCR_CONTENT_HEADER: &str = "X-Tika-OCRed-Content";
/// Language Tesseract used, when reported.
pub const OCR_LANGUAGE_HEADER: &str = "X-Tika-OCR-Language";

pub const OCR_APPLIED_KEY: &str = "OCR-Applied";
pub const OCR_LANGUAGE_KEY: &str = "OCR-Language";

/// Record whether OCR was applied, and in which language.
///
/// The language is only copied when the OCR marker is present; a stray
/// language header on its own is ignored.
pub fn apply_ocr_flags(headers: &HeaderMap, metadata: &mut Metadata) {
    if !headers.contains_key(OCR_CONTENT_HEADER) {
        metadata.insert(OCR_APPLIED_KEY.into(), Value::from("No"));
        return;
    }

    metadata.insert(OCR_APPLIED_KEY.into(), Value::from("Yes"));
    if let Some(lang) = headers.get(OCR_LANGUAGE_HEADER) {
        let lang = String::from_utf8_lossy(lang.as_bytes()).into_owned();
        metadata.insert(OCR_LANGUAGE_KEY.into(), Value::from(lang));
    }
}
