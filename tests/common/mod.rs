//! Helpers shared by the integration test binaries.
#![allow(dead_code)]

use pdfmill::EngineConfig;

/// Build a PDF with one page per entry in `page_texts`.
pub fn sample_pdf(page_texts: &[&str]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(page_texts.len());
    for text in page_texts {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content stream"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("serialize test PDF");
    out
}

pub fn page_count_of(bytes: &[u8]) -> usize {
    lopdf::Document::load_mem(bytes)
        .expect("output must be a parseable PDF")
        .get_pages()
        .len()
}

/// Embedded text of every page, concatenated in page order.
pub fn embedded_text_of(bytes: &[u8]) -> String {
    let doc = lopdf::Document::load_mem(bytes).expect("output must be a parseable PDF");
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    doc.extract_text(&pages).expect("output must have a text layer")
}

/// Config whose candidate lists point at binaries that cannot exist, forcing
/// every operation onto the in-process fallback.
pub fn offline_config() -> EngineConfig {
    EngineConfig::builder()
        .ghostscript_candidates(vec!["e2e-missing-gs".into()])
        .qpdf_candidates(vec!["e2e-missing-qpdf".into()])
        .pdftk_candidates(vec!["e2e-missing-pdftk".into()])
        .pdftoppm_candidates(vec!["e2e-missing-pdftoppm".into()])
        .tesseract_candidates(vec!["e2e-missing-tesseract".into()])
        .build()
        .expect("valid config")
}
