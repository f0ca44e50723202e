//! The in-process PDF engine, built on `lopdf`.
//!
//! Every cascade in this crate terminates here: when no external tool is
//! installed, these functions are what still works. They are deliberately
//! conservative — parse, manipulate the object graph, reserialize — and make
//! no attempt at the aggressive stream rewriting the external tools do.
//!
//! ## Why spawn_blocking?
//!
//! `lopdf` parses and serializes whole documents on the calling thread.
//! On multi-megabyte files that is tens of milliseconds of CPU-bound work,
//! enough to stall a Tokio worker, so every public entry point hands the
//! buffer to `tokio::task::spawn_blocking` and pairs with a `*_blocking`
//! implementation.

use crate::error::PdfMillError;
use crate::output::DocumentInfo;
use lopdf::{Document, Object, ObjectId};
use std::collections::BTreeMap;
use tracing::debug;

fn corrupt(e: impl std::fmt::Display) -> PdfMillError {
    PdfMillError::CorruptPdf {
        detail: e.to_string(),
    }
}

fn join_panic(e: tokio::task::JoinError) -> PdfMillError {
    PdfMillError::Internal(format!("PDF engine task panicked: {e}"))
}

fn load(bytes: &[u8]) -> Result<Document, PdfMillError> {
    let doc = Document::load_mem(bytes).map_err(corrupt)?;
    debug!(pages = doc.get_pages().len(), "parsed PDF");
    Ok(doc)
}

// ── Page count ────────────────────────────────────────────────────────────

/// Number of pages in the document.
pub async fn page_count(bytes: &[u8]) -> Result<usize, PdfMillError> {
    let owned = bytes.to_vec();
    tokio::task::spawn_blocking(move || page_count_blocking(&owned))
        .await
        .map_err(join_panic)?
}

fn page_count_blocking(bytes: &[u8]) -> Result<usize, PdfMillError> {
    Ok(load(bytes)?.get_pages().len())
}

// ── Text layer ────────────────────────────────────────────────────────────

/// Extract the embedded text layer, page by page.
///
/// Pages without a usable text layer (no text operators, exotic font
/// encodings) contribute an empty string rather than failing the whole
/// document. Returns the concatenated text and the page count. A document
/// that cannot be parsed at all is a hard error.
pub async fn extract_embedded_text(bytes: &[u8]) -> Result<(String, usize), PdfMillError> {
    let owned = bytes.to_vec();
    tokio::task::spawn_blocking(move || extract_embedded_text_blocking(&owned))
        .await
        .map_err(join_panic)?
}

fn extract_embedded_text_blocking(bytes: &[u8]) -> Result<(String, usize), PdfMillError> {
    let doc = load(bytes)?;
    let pages = doc.get_pages();
    let count = pages.len();

    let mut chunks = Vec::with_capacity(count);
    for number in pages.keys() {
        match doc.extract_text(&[*number]) {
            Ok(text) => chunks.push(text),
            Err(e) => {
                debug!(page = number, "no readable text layer: {e}");
                chunks.push(String::new());
            }
        }
    }

    Ok((chunks.join("\n"), count))
}

// ── Merge ─────────────────────────────────────────────────────────────────

/// Merge documents into one, preserving input order.
///
/// Follows the standard `lopdf` recipe: renumber each document into a
/// disjoint id space, pool the objects, then build a single page tree whose
/// Kids list every page. Renumbering gives later documents strictly higher
/// ids, so ordered iteration over the pooled pages reproduces input order.
pub async fn merge_documents(inputs: &[Vec<u8>]) -> Result<(Vec<u8>, usize), PdfMillError> {
    let owned: Vec<Vec<u8>> = inputs.to_vec();
    tokio::task::spawn_blocking(move || merge_documents_blocking(&owned))
        .await
        .map_err(join_panic)?
}

fn merge_documents_blocking(inputs: &[Vec<u8>]) -> Result<(Vec<u8>, usize), PdfMillError> {
    let mut merged = Document::with_version("1.5");
    let mut pooled_pages: BTreeMap<ObjectId, Object> = BTreeMap::new();
    let mut pooled_objects: BTreeMap<ObjectId, Object> = BTreeMap::new();
    let mut next_id = 1;

    for bytes in inputs {
        let mut doc = load(bytes)?;
        doc.renumber_objects_with(next_id);
        next_id = doc.max_id + 1;

        for (_, page_id) in doc.get_pages() {
            let page = doc.get_object(page_id).map_err(corrupt)?.to_owned();
            pooled_pages.insert(page_id, page);
        }
        pooled_objects.extend(doc.objects);
    }

    let mut catalog: Option<(ObjectId, Object)> = None;
    let mut page_tree: Option<(ObjectId, Object)> = None;

    for (object_id, object) in pooled_objects {
        match classify(&object) {
            ObjectKind::Catalog => {
                // First catalog wins; the rest only duplicate it.
                catalog.get_or_insert((object_id, object));
            }
            ObjectKind::PageTree => {
                // Fold page-tree dictionaries together under the first id so
                // inheritable attributes (Resources, MediaBox) survive.
                if let Ok(dict) = object.as_dict() {
                    let mut folded = dict.clone();
                    if let Some((_, Object::Dictionary(previous))) = &page_tree {
                        folded.extend(previous);
                    }
                    let id = page_tree.as_ref().map_or(object_id, |(id, _)| *id);
                    page_tree = Some((id, Object::Dictionary(folded)));
                }
            }
            // Pages are re-inserted below with a fixed Parent; outlines
            // reference pages across documents and are dropped wholesale.
            ObjectKind::Dropped => {}
            ObjectKind::Plain => {
                merged.objects.insert(object_id, object);
            }
        }
    }

    let (pages_id, pages_obj) = page_tree.ok_or_else(|| PdfMillError::CorruptPdf {
        detail: "no page tree found in any input".to_string(),
    })?;
    let (catalog_id, catalog_obj) = catalog.ok_or_else(|| PdfMillError::CorruptPdf {
        detail: "no document catalog found in any input".to_string(),
    })?;

    for (page_id, page) in &pooled_pages {
        if let Ok(dict) = page.as_dict() {
            let mut dict = dict.clone();
            dict.set("Parent", pages_id);
            merged.objects.insert(*page_id, Object::Dictionary(dict));
        }
    }

    if let Ok(dict) = pages_obj.as_dict() {
        let mut dict = dict.clone();
        dict.set("Count", pooled_pages.len() as i64);
        dict.set(
            "Kids",
            pooled_pages
                .keys()
                .map(|id| Object::Reference(*id))
                .collect::<Vec<_>>(),
        );
        merged.objects.insert(pages_id, Object::Dictionary(dict));
    }

    if let Ok(dict) = catalog_obj.as_dict() {
        let mut dict = dict.clone();
        dict.set("Pages", pages_id);
        dict.remove(b"Outlines");
        merged.objects.insert(catalog_id, Object::Dictionary(dict));
    }

    merged.trailer.set("Root", catalog_id);
    merged.max_id = merged.objects.len() as u32;
    merged.renumber_objects();
    merged.compress();

    let page_total = pooled_pages.len();
    let mut out = Vec::new();
    merged.save_to(&mut out).map_err(corrupt)?;
    debug!(inputs = inputs.len(), pages = page_total, "merged in-process");
    Ok((out, page_total))
}

enum ObjectKind {
    Catalog,
    PageTree,
    Dropped,
    Plain,
}

fn classify(object: &Object) -> ObjectKind {
    match object_type(object) {
        Some(b"Catalog") => ObjectKind::Catalog,
        Some(b"Pages") => ObjectKind::PageTree,
        Some(b"Page") | Some(b"Outlines") | Some(b"Outline") => ObjectKind::Dropped,
        _ => ObjectKind::Plain,
    }
}

/// Type name of a dictionary or stream object, if it has one.
fn object_type(object: &Object) -> Option<&[u8]> {
    let dict = match object {
        Object::Dictionary(dict) => dict,
        Object::Stream(stream) => &stream.dict,
        _ => return None,
    };
    dict.get(b"Type").and_then(|t| t.as_name()).ok()
}

// ── Page extraction ───────────────────────────────────────────────────────

/// Copy an inclusive 1-based page range into a standalone document.
///
/// Pages outside the document are clamped away; a range that misses the
/// document entirely is an error rather than an empty file.
pub async fn copy_page_range(
    bytes: &[u8],
    first: usize,
    last: usize,
) -> Result<Vec<u8>, PdfMillError> {
    let owned = bytes.to_vec();
    tokio::task::spawn_blocking(move || copy_page_range_blocking(&owned, first, last))
        .await
        .map_err(join_panic)?
}

fn copy_page_range_blocking(
    bytes: &[u8],
    first: usize,
    last: usize,
) -> Result<Vec<u8>, PdfMillError> {
    let mut doc = load(bytes)?;
    let total = doc.get_pages().len();

    let keep_first = first.max(1);
    let keep_last = last.min(total);
    if keep_first > keep_last {
        return Err(PdfMillError::InvalidPageRange {
            range: format!("{first}-{last}"),
            reason: format!("document has only {total} pages"),
        });
    }

    let delete: Vec<u32> = (1..=total)
        .filter(|n| *n < keep_first || *n > keep_last)
        .map(|n| n as u32)
        .collect();
    if !delete.is_empty() {
        doc.delete_pages(&delete);
    }
    doc.prune_objects();
    doc.renumber_objects();
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out).map_err(corrupt)?;
    debug!(
        first = keep_first,
        last = keep_last,
        total,
        "extracted page range in-process"
    );
    Ok(out)
}

// ── Recompression ─────────────────────────────────────────────────────────

/// Reserialize the document with compressed streams.
///
/// This is the mildest compression in the crate: it never resamples images
/// and cannot honor a quality tier, but it also cannot damage content.
pub async fn recompress(bytes: &[u8]) -> Result<Vec<u8>, PdfMillError> {
    let owned = bytes.to_vec();
    tokio::task::spawn_blocking(move || recompress_blocking(&owned))
        .await
        .map_err(join_panic)?
}

fn recompress_blocking(bytes: &[u8]) -> Result<Vec<u8>, PdfMillError> {
    let mut doc = load(bytes)?;
    doc.compress();
    let mut out = Vec::new();
    doc.save_to(&mut out).map_err(corrupt)?;
    Ok(out)
}

// ── Inspection ────────────────────────────────────────────────────────────

/// Summary facts about a document, without transforming it.
pub async fn inspect(bytes: &[u8]) -> Result<DocumentInfo, PdfMillError> {
    let owned = bytes.to_vec();
    tokio::task::spawn_blocking(move || inspect_blocking(&owned))
        .await
        .map_err(join_panic)?
}

fn inspect_blocking(bytes: &[u8]) -> Result<DocumentInfo, PdfMillError> {
    let doc = load(bytes)?;
    let info_dict = doc
        .trailer
        .get(b"Info")
        .ok()
        .map(|obj| resolve(&doc, obj))
        .and_then(|obj| obj.as_dict().ok());

    let text_entry = |key: &[u8]| -> Option<String> {
        let raw = info_dict?.get(key).ok()?;
        let Object::String(bytes, _) = resolve(&doc, raw) else {
            return None;
        };
        let text = decode_pdf_string(bytes);
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    };

    Ok(DocumentInfo {
        page_count: doc.get_pages().len(),
        pdf_version: doc.version.clone(),
        encrypted: doc.trailer.get(b"Encrypt").is_ok(),
        title: text_entry(b"Title"),
        author: text_entry(b"Author"),
        file_size: bytes.len() as u64,
    })
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

/// Decode a PDF text string: UTF-16BE when BOM-prefixed, latin-1 otherwise.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

// ── Test documents ────────────────────────────────────────────────────────


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn page_count_counts_pages() {
        let pdf = testdoc::pdf_with_pages(&["one", "two", "three"]);
        assert_eq!(page_count(&pdf).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn garbage_fails_with_corrupt_pdf() {
        let err = page_count(b"%PDF-1.5 but nothing else").await.unwrap_err();
        assert!(matches!(err, PdfMillError::CorruptPdf { .. }));
    }

    #[tokio::test]
    async fn embedded_text_covers_every_page() {
        let pdf = testdoc::pdf_with_pages(&["alpha page", "beta page"]);
        let (text, pages) = extract_embedded_text(&pdf).await.unwrap();
        assert_eq!(pages, 2);
        assert!(text.contains("alpha page"), "got: {text:?}");
        assert!(text.contains("beta page"), "got: {text:?}");
    }

    #[tokio::test]
    async fn merge_preserves_input_order_and_page_count() {
        let first = testdoc::pdf_with_pages(&["doc one page one", "doc one page two"]);
        let second = testdoc::pdf_with_pages(&["doc two page one"]);

        let (bytes, pages) = merge_documents(&[first, second]).await.unwrap();
        assert_eq!(pages, 3);

        let (text, merged_pages) = extract_embedded_text(&bytes).await.unwrap();
        assert_eq!(merged_pages, 3);
        let one = text.find("doc one page one").expect("first doc text");
        let two = text.find("doc two page one").expect("second doc text");
        assert!(one < two, "pages out of order: {text:?}");
    }

    #[tokio::test]
    async fn copy_range_keeps_only_requested_pages() {
        let pdf = testdoc::pdf_with_pages(&["one", "two", "three", "four", "five"]);
        let part = copy_page_range(&pdf, 2, 4).await.unwrap();

        let (text, pages) = extract_embedded_text(&part).await.unwrap();
        assert_eq!(pages, 3);
        assert!(text.contains("two") && text.contains("four"));
        assert!(!text.contains("one") && !text.contains("five"));
    }

    #[tokio::test]
    async fn copy_range_clamps_overshoot() {
        let pdf = testdoc::pdf_with_pages(&["one", "two"]);
        let part = copy_page_range(&pdf, 2, 9).await.unwrap();
        assert_eq!(page_count(&part).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn copy_range_wholly_outside_errors() {
        let pdf = testdoc::pdf_with_pages(&["one", "two"]);
        let err = copy_page_range(&pdf, 5, 9).await.unwrap_err();
        assert!(matches!(err, PdfMillError::InvalidPageRange { .. }));
    }

    #[tokio::test]
    async fn recompress_preserves_content() {
        let pdf = testdoc::pdf_with_pages(&["survives recompression"]);
        let out = recompress(&pdf).await.unwrap();
        let (text, pages) = extract_embedded_text(&out).await.unwrap();
        assert_eq!(pages, 1);
        assert!(text.contains("survives recompression"));
    }

    #[tokio::test]
    async fn inspect_reads_metadata() {
        let pdf = testdoc::pdf_with_info(&["a", "b"], "Quarterly Report", "Jane Doe");
        let info = inspect(&pdf).await.unwrap();
        assert_eq!(info.page_count, 2);
        assert_eq!(info.pdf_version, "1.5");
        assert!(!info.encrypted);
        assert_eq!(info.title.as_deref(), Some("Quarterly Report"));
        assert_eq!(info.author.as_deref(), Some("Jane Doe"));
        assert_eq!(info.file_size, pdf.len() as u64);
    }

    #[tokio::test]
    async fn inspect_without_info_dict_has_no_title() {
        let pdf = testdoc::pdf_with_pages(&["plain"]);
        let info = inspect(&pdf).await.unwrap();
        assert_eq!(info.title, None);
        assert_eq!(info.author, None);
    }

    #[test]
    fn pdf_strings_decode_utf16_and_latin1() {
        let mut utf16 = vec![0xFE, 0xFF];
        for unit in "Résumé".encode_utf16() {
            utf16.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(decode_pdf_string(&utf16), "Résumé");
        assert_eq!(decode_pdf_string(b"plain ascii"), "plain ascii");
    }
}
