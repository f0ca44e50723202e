//! Outcome types returned by the pipelines.
//!
//! Every pipeline yields its payload bytes plus a report: which method won,
//! what it cost, and the ledger of strategies that failed before it. The
//! reports serialize to JSON for machine consumers; payload bytes are always
//! skipped so a report is safe to log or ship over a wire.

use crate::error::AttemptRecord;
use serde::Serialize;
use std::fmt;

// ── Methods ───────────────────────────────────────────────────────────────

/// Which strategy produced the compressed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionMethod {
    Ghostscript,
    Qpdf,
    /// The in-process engine, or the untouched input when even that failed.
    Embedded,
}

impl CompressionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionMethod::Ghostscript => "ghostscript",
            CompressionMethod::Qpdf => "qpdf",
            CompressionMethod::Embedded => "embedded",
        }
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which strategy assembled a merged document or a split part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyMethod {
    Pdftk,
    Qpdf,
    Embedded,
}

impl AssemblyMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssemblyMethod::Pdftk => "pdftk",
            AssemblyMethod::Qpdf => "qpdf",
            AssemblyMethod::Embedded => "embedded",
        }
    }
}

impl fmt::Display for AssemblyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where extracted text ultimately came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    /// The text layer embedded in the PDF, judged meaningful.
    Embedded,
    /// Optical recognition of a rendered page.
    Recognition,
    /// The embedded text layer, returned as a last resort after recognition
    /// failed. Confidence is capped accordingly.
    DegradedEmbedded,
}

impl ExtractionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionSource::Embedded => "embedded",
            ExtractionSource::Recognition => "recognition",
            ExtractionSource::DegradedEmbedded => "degraded_embedded",
        }
    }
}

impl fmt::Display for ExtractionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Outcomes ──────────────────────────────────────────────────────────────

/// Result of compressing one document.
#[derive(Debug, Clone, Serialize)]
pub struct CompressionOutcome {
    /// The compressed document.
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub method: CompressionMethod,
    pub original_size: u64,
    pub compressed_size: u64,
    /// Percent of the original size that was saved. Negative when the
    /// "compressed" output came out larger.
    pub ratio_percent: f64,
    pub duration_ms: u64,
    /// Strategies that failed before `method` succeeded, in order.
    pub attempts: Vec<AttemptRecord>,
}

/// Result of merging two or more documents.
#[derive(Debug, Clone, Serialize)]
pub struct MergeOutcome {
    /// The merged document.
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub method: AssemblyMethod,
    /// Page count of the merged document.
    pub page_count: usize,
    pub duration_ms: u64,
    pub attempts: Vec<AttemptRecord>,
}

/// One extracted part of a split document.
#[derive(Debug, Clone, Serialize)]
pub struct SplitPart {
    /// The extracted pages as a standalone document.
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// The range token this part was built from, as requested.
    pub page_range: String,
    /// Human-readable description, e.g. `Pages 2-5 (4 pages) of 9`.
    pub description: String,
    pub method: AssemblyMethod,
    pub attempts: Vec<AttemptRecord>,
}

/// Result of splitting one document into parts.
#[derive(Debug, Clone, Serialize)]
pub struct SplitOutcome {
    pub parts: Vec<SplitPart>,
    /// Page count of the source document.
    pub total_pages: usize,
    pub duration_ms: u64,
}

/// Result of extracting text from a document or image.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutcome {
    /// The extracted text, trimmed.
    pub text: String,
    /// Confidence in the text, 0–100, rounded to two decimals.
    pub confidence: f64,
    /// Page count of the source (1 for images).
    pub pages: usize,
    /// Display name of the recognition language, e.g. `English`.
    pub language: String,
    pub source: ExtractionSource,
    pub duration_ms: u64,
    pub attempts: Vec<AttemptRecord>,
}

/// Summary facts about a document, for inspection without transformation.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub pdf_version: String,
    pub encrypted: bool,
    pub title: Option<String>,
    pub author: Option<String>,
    pub file_size: u64,
}

/// Round a report figure to two decimals.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
