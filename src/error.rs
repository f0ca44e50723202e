//! Error types for the pdfmill library.
//!
//! Two distinct error types reflect the two failure modes of a fallback
//! engine:
//!
//! * [`PdfMillError`] — **Fatal**: the operation as a whole failed (bad
//!   input, malformed page range, every strategy exhausted). Returned as
//!   `Err(PdfMillError)` from the top-level pipeline functions.
//!
//! * [`StrategyError`] — **Non-fatal**: one candidate strategy (or one
//!   executable candidate inside a strategy) failed and the engine moved on
//!   to the next one. Recorded in an [`AttemptRecord`] so callers can see
//!   the full diagnostic trail of *why* the winning method was chosen — or,
//!   when nothing won, receive every recorded failure inside
//!   [`PdfMillError::AllStrategiesExhausted`].
//!
//! The separation keeps the cascade honest: a failed candidate is a data
//! point, not an exception, right up until there are no candidates left.

use thiserror::Error;

/// All fatal errors returned by the pdfmill library.
///
/// Per-strategy failures use [`StrategyError`] and travel in the attempt
/// ledger rather than being propagated here.
#[derive(Debug, Error)]
pub enum PdfMillError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The input buffer contained no bytes at all.
    #[error("Input buffer is empty\nA PDF is at least a few hundred bytes.")]
    EmptyInput,

    /// The buffer does not begin with the PDF signature.
    #[error("{context} is not a PDF (first bytes: {magic:?})\nPDF files start with '%PDF-'.")]
    NotAPdf { context: String, magic: Vec<u8> },

    /// The signature was present but the document cannot be parsed.
    #[error("Cannot parse PDF: {detail}\nThe file may be corrupt or truncated; try: qpdf --check input.pdf")]
    CorruptPdf { detail: String },

    /// Merge was asked to combine fewer than two documents.
    #[error("Merging requires at least 2 documents (got {got})")]
    NotEnoughInputs { got: usize },

    /// A page-range token failed up-front validation.
    #[error("Invalid page range '{range}': {reason}\nRanges are 1-indexed: '5' or '2-7', comma-separated.")]
    InvalidPageRange { range: String, reason: String },

    /// Extraction input is neither a PDF nor a recognizable image.
    #[error("Unsupported input: not a PDF and not a recognizable image format")]
    UnsupportedFormat,

    // ── Fallback exhaustion ───────────────────────────────────────────────
    /// Every strategy for a logical operation failed.
    ///
    /// Carries the ordered ledger of every attempt so the caller can see
    /// exactly what was tried and how each try died.
    #[error("{operation} failed: all {} strategies exhausted\n{}", .attempts.len(), render_attempts(.attempts))]
    AllStrategiesExhausted {
        operation: &'static str,
        attempts: Vec<AttemptRecord>,
    },

    // ── Extraction terminal errors ────────────────────────────────────────
    /// Nothing resembling text came out of any extraction path.
    #[error("No text could be extracted from the document")]
    NoTextAvailable,

    /// Text was produced but is too short to be useful.
    #[error("Extracted text is too short to be meaningful ({len} chars; minimum is 3)")]
    TextTooShort { len: usize },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or populate the scratch directory for an attempt.
    #[error("Failed to prepare scratch space: {source}")]
    ScratchSetupFailed {
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal failure of one candidate strategy or executable.
///
/// These never abort an operation on their own; they are recorded and the
/// cascade advances. They surface to callers only inside the attempt ledger.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum StrategyError {
    /// No candidate binary for the tool could be launched.
    #[error("{tool} is not installed (tried: {})", .tried.join(", "))]
    ToolUnavailable { tool: String, tried: Vec<String> },

    /// A candidate launched but exited unsuccessfully.
    #[error("{binary} failed ({status}): {stderr}")]
    ToolFailed {
        binary: String,
        status: String,
        stderr: String,
    },

    /// A candidate exceeded the subprocess timeout and was killed.
    #[error("{binary} timed out after {secs}s and was killed")]
    ToolTimedOut { binary: String, secs: u64 },

    /// A candidate exited zero but its output artifact is missing or tiny.
    ///
    /// Guards against tools that silently no-op: exit code 0, nothing (or
    /// nearly nothing) written.
    #[error("{binary} produced an implausibly small output ({size} bytes; expected at least {min})")]
    ImplausibleOutput { binary: String, size: u64, min: u64 },

    /// Every candidate for one tool failed, each for its own reason.
    #[error("{tool}: no candidate succeeded: {}", .diagnostics.join("; "))]
    CandidatesExhausted {
        tool: String,
        diagnostics: Vec<String>,
    },

    /// The in-process PDF engine failed.
    #[error("in-process PDF engine: {0}")]
    Embedded(String),

    /// The recognition engine failed on an image it was handed.
    #[error("recognition failed: {0}")]
    Recognition(String),
}

/// One entry in the attempt ledger: a strategy that ran and failed.
///
/// Attached to successful outcomes (the failures that preceded the win) and
/// to [`PdfMillError::AllStrategiesExhausted`] (every failure, in order).
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
#[error("{strategy}: {error}")]
pub struct AttemptRecord {
    /// Name of the strategy as declared in its chain.
    pub strategy: String,
    /// Why it failed.
    pub error: StrategyError,
    /// Wall-clock time spent on the attempt.
    pub duration_ms: u64,
}

/// Render the ledger for `AllStrategiesExhausted`'s Display impl.
fn render_attempts(attempts: &[AttemptRecord]) -> String {
    attempts
        .iter()
        .map(|a| format!("  - {} ({}ms): {}", a.strategy, a.duration_ms, a.error))
        .collect::<Vec<_>>()
        .join("\n")
}
