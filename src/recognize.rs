//! Optical text recognition seam.
//!
//! The extraction pipeline needs exactly one capability from recognition:
//! hand it an image file, get back text plus a confidence figure. That
//! contract is the [`RecognitionEngine`] trait, injected through
//! [`crate::config::EngineConfig::recognition`] so hosts can swap backends —
//! or drive the pipeline in tests without any OCR stack installed. When
//! nothing is injected, the extraction pipeline falls back to
//! [`TesseractEngine`], which shells out to the `tesseract` CLI.

use crate::error::StrategyError;
use crate::tools;
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Text recognised from one image.
#[derive(Debug, Clone)]
pub struct RecognizedText {
    pub text: String,
    /// Engine-reported confidence, 0–100.
    pub confidence: f64,
}

/// One optical-recognition backend.
///
/// Implementations must be `Send + Sync`: the engine is shared across
/// concurrent extraction requests behind an `Arc`. Failures are
/// [`StrategyError`]s because a recognition failure is one more candidate
/// failure in the extraction cascade, not a fatal condition on its own.
pub trait RecognitionEngine: Send + Sync {
    /// Short name used in logs and attempt ledgers.
    fn name(&self) -> &str;

    /// Recognise the text in the image at `image_path`.
    fn recognize<'a>(
        &'a self,
        image_path: &'a Path,
    ) -> BoxFuture<'a, Result<RecognizedText, StrategyError>>;
}

/// The default engine: the `tesseract` CLI.
///
/// Runs `tesseract {image} {outbase} -l {lang} txt tsv`, reads the text from
/// the `.txt` artifact and computes the confidence as the mean word
/// confidence of the `.tsv` table. Output artifacts land next to the image,
/// which lives inside the caller's scratch scope, so they are cleaned up with
/// everything else.
pub struct TesseractEngine {
    candidates: Vec<String>,
    language: String,
    timeout_secs: u64,
}

impl TesseractEngine {
    pub fn new(candidates: Vec<String>, language: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            candidates,
            language: language.into(),
            timeout_secs,
        }
    }
}

impl RecognitionEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize<'a>(
        &'a self,
        image_path: &'a Path,
    ) -> BoxFuture<'a, Result<RecognizedText, StrategyError>> {
        Box::pin(async move {
            let outbase = extend_path(image_path, ".ocr");
            let txt_path = extend_path(&outbase, ".txt");
            let tsv_path = extend_path(&outbase, ".tsv");

            let args = vec![
                image_path.to_string_lossy().into_owned(),
                outbase.to_string_lossy().into_owned(),
                "-l".to_string(),
                self.language.clone(),
                "txt".to_string(),
                "tsv".to_string(),
            ];

            tools::invoke(
                "tesseract",
                &self.candidates,
                &args,
                &txt_path,
                1,
                self.timeout_secs,
            )
            .await?;

            let text = tokio::fs::read_to_string(&txt_path)
                .await
                .map_err(|e| StrategyError::Recognition(format!("reading OCR text: {e}")))?;

            // The tsv table is best-effort: text without a confidence figure
            // still beats no text at all.
            let confidence = match tokio::fs::read_to_string(&tsv_path).await {
                Ok(tsv) => mean_word_confidence(&tsv),
                Err(_) => 0.0,
            };

            debug!(
                chars = text.len(),
                confidence, "tesseract finished recognising"
            );
            Ok(RecognizedText { text, confidence })
        })
    }
}

/// Append a suffix to a path without touching its existing extension.
fn extend_path(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(suffix);
    PathBuf::from(os)
}

/// Mean confidence of the word rows (level 5) in a tesseract `tsv` table.
///
/// Structural rows carry a confidence of -1 and are skipped, as is anything
/// that does not parse. An empty table yields 0.
fn mean_word_confidence(tsv: &str) -> f64 {
    let mut sum = 0.0;
    let mut words = 0usize;

    for line in tsv.lines().skip(1) {
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let Ok(conf) = cols[10].parse::<f64>() else {
            continue;
        };
        if conf < 0.0 {
            continue;
        }
        sum += conf;
        words += 1;
    }

    if words == 0 {
        0.0
    } else {
        sum / words as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TSV_HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn word_row(conf: &str, text: &str) -> String {
        format!("5\t1\t1\t1\t1\t1\t10\t10\t50\t12\t{conf}\t{text}")
    }

    #[test]
    fn mean_confidence_averages_word_rows() {
        let tsv = format!(
            "{TSV_HEADER}\n{}\n{}\n{}",
            word_row("90", "alpha"),
            word_row("80", "beta"),
            word_row("70", "gamma"),
        );
        let mean = mean_word_confidence(&tsv);
        assert!((mean - 80.0).abs() < 1e-9, "got {mean}");
    }

    #[test]
    fn structural_rows_and_negative_confidences_are_ignored() {
        let tsv = format!(
            "{TSV_HEADER}\n1\t1\t0\t0\t0\t0\t0\t0\t100\t100\t-1\t\n{}\n{}",
            word_row("-1", "rejected"),
            word_row("60", "kept"),
        );
        assert!((mean_word_confidence(&tsv) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn fractional_confidences_survive() {
        let tsv = format!("{TSV_HEADER}\n{}", word_row("96.58", "word"));
        assert!((mean_word_confidence(&tsv) - 96.58).abs() < 1e-9);
    }

    #[test]
    fn empty_or_malformed_tables_yield_zero() {
        assert_eq!(mean_word_confidence(""), 0.0);
        assert_eq!(mean_word_confidence(TSV_HEADER), 0.0);
        assert_eq!(mean_word_confidence("not\ta\ttable"), 0.0);
    }

    #[test]
    fn extend_path_keeps_the_original_extension() {
        let p = extend_path(Path::new("/tmp/page.png"), ".ocr");
        assert_eq!(p, Path::new("/tmp/page.png.ocr"));
        let t = extend_path(&p, ".txt");
        assert_eq!(t, Path::new("/tmp/page.png.ocr.txt"));
    }
}
