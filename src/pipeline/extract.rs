//! Text extraction: embedded text layer first, optical recognition second.
//!
//! The cascade for a PDF input:
//!
//! 1. read the embedded text layer; if [`quality::is_meaningful`] says it is
//!    real content, return it at full confidence and stop;
//! 2. otherwise rasterise the first page and hand it to the recognition
//!    engine, returning its text at the engine's own confidence;
//! 3. if recognition cannot run, fall back to the thin embedded layer at
//!    degraded confidence — better a low-confidence answer than none;
//! 4. nothing anywhere: `NoTextAvailable`.
//!
//! Image inputs skip straight to recognition. A PDF that cannot be parsed at
//! all is a hard error, not a cascade step — rendering requires a parseable
//! document just as much as the text layer does.

use crate::config::EngineConfig;
use crate::error::{AttemptRecord, PdfMillError};
use crate::output::{round2, ExtractionOutcome, ExtractionSource};
use crate::pipeline::{document, quality, render, PDF_MAGIC};
use crate::recognize::{RecognitionEngine, TesseractEngine};
use crate::scratch::TempScope;
use image::ImageFormat;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Confidence assigned to a meaningful embedded text layer.
const EMBEDDED_CONFIDENCE: f64 = 95.0;

/// Confidence assigned to a thin embedded layer returned as a last resort.
const DEGRADED_CONFIDENCE: f64 = 50.0;

/// Shorter extracted text than this is reported as an error.
const MIN_TEXT_LEN: usize = 3;

/// Extract text from a PDF or a scanned image.
pub async fn extract_text(
    input: &[u8],
    config: &EngineConfig,
) -> Result<ExtractionOutcome, PdfMillError> {
    let started = Instant::now();
    let engine = resolve_engine(config);

    let (raw_text, confidence, pages, source, attempts) = match sniff(input)? {
        InputKind::Pdf => extract_from_pdf(input, engine.as_ref(), config).await?,
        InputKind::Image(format) => extract_from_image(input, format, engine.as_ref()).await?,
    };

    let text = raw_text.trim();
    if text.is_empty() {
        return Err(PdfMillError::NoTextAvailable);
    }
    let len = text.chars().count();
    if len < MIN_TEXT_LEN {
        return Err(PdfMillError::TextTooShort { len });
    }

    Ok(ExtractionOutcome {
        text: text.to_string(),
        confidence: round2(confidence),
        pages,
        language: language_name(&config.ocr_language),
        source,
        duration_ms: started.elapsed().as_millis() as u64,
        attempts,
    })
}

type CascadeResult = (String, f64, usize, ExtractionSource, Vec<AttemptRecord>);

async fn extract_from_pdf(
    input: &[u8],
    engine: &dyn RecognitionEngine,
    config: &EngineConfig,
) -> Result<CascadeResult, PdfMillError> {
    let (embedded, pages) = document::extract_embedded_text(input).await?;

    if quality::is_meaningful(&embedded) {
        debug!(chars = embedded.len(), "embedded text layer is meaningful");
        return Ok((
            embedded,
            EMBEDDED_CONFIDENCE,
            pages,
            ExtractionSource::Embedded,
            Vec::new(),
        ));
    }

    debug!(
        chars = embedded.len(),
        "embedded text layer is thin, trying optical recognition"
    );
    let mut attempts = Vec::new();

    let scope = TempScope::new()?;
    let pdf_path = scope.write("input.pdf", input).await?;

    match render::render_first_page(&pdf_path, &scope, config).await {
        Ok(win) => {
            attempts.extend(win.attempts);
            let recognize_started = Instant::now();
            match engine.recognize(&win.value).await {
                Ok(rec) => {
                    return Ok((
                        rec.text,
                        rec.confidence,
                        pages,
                        ExtractionSource::Recognition,
                        attempts,
                    ));
                }
                Err(error) => {
                    attempts.push(AttemptRecord {
                        strategy: "recognition".to_string(),
                        error,
                        duration_ms: recognize_started.elapsed().as_millis() as u64,
                    });
                }
            }
        }
        Err(PdfMillError::AllStrategiesExhausted {
            attempts: render_attempts,
            ..
        }) => {
            attempts.extend(render_attempts);
        }
        Err(other) => return Err(other),
    }

    // Recognition came up empty. A thin embedded layer is still better than
    // nothing when there is one at all.
    if !embedded.trim().is_empty() {
        warn!("recognition unavailable, returning the embedded text layer at degraded confidence");
        return Ok((
            embedded,
            DEGRADED_CONFIDENCE,
            pages,
            ExtractionSource::DegradedEmbedded,
            attempts,
        ));
    }

    Err(PdfMillError::NoTextAvailable)
}

async fn extract_from_image(
    input: &[u8],
    format: ImageFormat,
    engine: &dyn RecognitionEngine,
) -> Result<CascadeResult, PdfMillError> {
    let scope = TempScope::new()?;
    let ext = format.extensions_str().first().copied().unwrap_or("img");
    let image_path = scope.write(&format!("input.{ext}"), input).await?;

    let recognize_started = Instant::now();
    match engine.recognize(&image_path).await {
        Ok(rec) => Ok((
            rec.text,
            rec.confidence,
            1,
            ExtractionSource::Recognition,
            Vec::new(),
        )),
        Err(error) => Err(PdfMillError::AllStrategiesExhausted {
            operation: "text extraction",
            attempts: vec![AttemptRecord {
                strategy: "recognition".to_string(),
                error,
                duration_ms: recognize_started.elapsed().as_millis() as u64,
            }],
        }),
    }
}

// ── Input sniffing ────────────────────────────────────────────────────────

enum InputKind {
    Pdf,
    Image(ImageFormat),
}

fn sniff(bytes: &[u8]) -> Result<InputKind, PdfMillError> {
    if bytes.is_empty() {
        return Err(PdfMillError::EmptyInput);
    }
    if bytes.len() >= PDF_MAGIC.len() && &bytes[..PDF_MAGIC.len()] == PDF_MAGIC {
        return Ok(InputKind::Pdf);
    }
    match image::guess_format(bytes) {
        Ok(
            format @ (ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Tiff | ImageFormat::Bmp),
        ) => Ok(InputKind::Image(format)),
        _ => Err(PdfMillError::UnsupportedFormat),
    }
}

// ── Engine resolution ─────────────────────────────────────────────────────

fn resolve_engine(config: &EngineConfig) -> Arc<dyn RecognitionEngine> {
    match &config.recognition {
        Some(engine) => Arc::clone(engine),
        None => Arc::new(TesseractEngine::new(
            config.tools.tesseract.clone(),
            config.ocr_language.clone(),
            config.tool_timeout_secs,
        )),
    }
}

/// Display name for a tesseract language code; unknown codes pass through.
fn language_name(code: &str) -> String {
    match code {
        "eng" => "English",
        "deu" => "German",
        "fra" => "French",
        "spa" => "Spanish",
        "ita" => "Italian",
        "por" => "Portuguese",
        "nld" => "Dutch",
        "rus" => "Russian",
        "jpn" => "Japanese",
        other => other,
    }
    .to_string()
}
