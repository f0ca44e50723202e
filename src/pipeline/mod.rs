//! Pipeline stages for the three document operations.
//!
//! Each submodule implements exactly one operation or one shared capability.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. a different recognition backend) without
//! touching other stages.
//!
//! ## Data flow
//!
//! ```text
//!             ┌─ compress ────▶ ghostscript ▶ qpdf ▶ in-process
//! input ──▶───┼─ merge/split ─▶ pdftk ▶ qpdf ▶ in-process
//!             └─ extract ─────▶ embedded text ▶ render + recognise ▶ degraded
//! ```
//!
//! 1. [`document`] — the in-process PDF engine (lopdf); terminal fallback for
//!    every chain, needs no external tools
//! 2. [`quality`] — decides whether extracted text is meaningful enough to
//!    skip optical recognition
//! 3. [`render`] — rasterise the first page via `pdftoppm`, falling back to
//!    ghostscript
//! 4. [`compress`] — quality-tiered size reduction
//! 5. [`merge_split`] — page assembly and extraction of page ranges
//! 6. [`extract`] — text extraction with the recognition cascade

use crate::error::PdfMillError;

pub mod compress;
pub mod document;
pub mod extract;
pub mod merge_split;
pub mod quality;
pub mod render;

/// PDF files open with this signature.
pub(crate) const PDF_MAGIC: &[u8] = b"%PDF-";

/// Reject non-PDF buffers before any strategy runs.
///
/// `context` names the buffer in the error ("input 2 of 3", "merge input").
pub(crate) fn require_pdf(context: &str, bytes: &[u8]) -> Result<(), PdfMillError> {
    if bytes.is_empty() {
        return Err(PdfMillError::EmptyInput);
    }
    if bytes.len() < PDF_MAGIC.len() || &bytes[..PDF_MAGIC.len()] != PDF_MAGIC {
        return Err(PdfMillError::NotAPdf {
            context: context.to_string(),
            magic: bytes[..bytes.len().min(8)].to_vec(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffers_are_rejected_first() {
        assert!(matches!(
            require_pdf("input", b""),
            Err(PdfMillError::EmptyInput)
        ));
    }

    #[test]
    fn non_pdf_magic_is_rejected_with_context() {
        let err = require_pdf("input 2", b"PK\x03\x04rest-of-a-zip").unwrap_err();
        match err {
            PdfMillError::NotAPdf { context, magic } => {
                assert_eq!(context, "input 2");
                assert_eq!(&magic[..2], b"PK");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn short_buffers_do_not_panic() {
        assert!(require_pdf("input", b"%PD").is_err());
    }

    #[test]
    fn pdf_magic_passes() {
        assert!(require_pdf("input", b"%PDF-1.7\n...").is_ok());
    }
}
