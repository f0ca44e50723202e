//! Content quality heuristic: is extracted text worth keeping?
//!
//! The extraction pipeline must decide whether an embedded text layer is the
//! real document text or just noise (whitespace runs, stray digits from page
//! furniture, single glyphs from vector art). Optical recognition is slow and
//! lossy, so the bar is deliberately low: any plausibly sentence-like content
//! short-circuits the cascade.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-zA-Z]{2,}").unwrap());

/// Minimum trimmed length for text to count as meaningful.
const MIN_MEANINGFUL_LEN: usize = 20;

/// Minimum number of whitespace-separated tokens.
const MIN_TOKENS: usize = 2;

/// Whether `text` looks like real document content.
///
/// Three cheap checks, all required: more than [`MIN_MEANINGFUL_LEN`] chars
/// after trimming, at least one run of two or more ASCII letters, and more
/// than [`MIN_TOKENS`] whitespace-separated tokens.
pub fn is_meaningful(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.len() <= MIN_MEANINGFUL_LEN {
        return false;
    }
    if !RE_WORD.is_match(trimmed) {
        return false;
    }
    trimmed.split_whitespace().count() > MIN_TOKENS
}
