//! Per-document transformation stages.
//!
//! Each submodule implements exactly one step, so each is independently
//! testable and none of them touches the network.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ (Tika) ──▶ ocr ──▶ markdown | plaintext | raw html
//! (path)               (flags)  (format dispatch)
//! ```
//!
//! 1. [`input`]    : absolutise the path, read the bytes, derive the title
//! 2. [`ocr`]      : turn OCR response headers into metadata flags
//! 3. [`markdown`] : HTML → Markdown plus the enhancement pass
//! 4. [`plaintext`]: HTML → prose text

pub mod input;
pub mod markdown;
pub mod ocr;
pub mod plaintext;
