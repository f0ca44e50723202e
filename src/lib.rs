//! # pdfmill
//!
//! Compress, merge, split, and extract text from PDF documents with
//! cascading tool fallbacks.
//!
//! ## Why this crate?
//!
//! The strongest PDF tooling lives in battle-tested native binaries —
//! Ghostscript, qpdf, pdftk, poppler, tesseract — but no two machines have
//! the same set installed. pdfmill treats every operation as a chain of
//! strategies: the best external tool first, alternates next, and an
//! in-process lopdf fallback last. Each call either produces a result (with
//! the method that won) or an error carrying a ledger of every attempt and
//! why it failed.
//!
//! ## Operation Overview
//!
//! ```text
//! compress   ghostscript ─▸ qpdf ─▸ in-process rewrite (never fails)
//! merge      pdftk ─▸ qpdf ─▸ in-process page-tree stitch
//! split      pdftk ─▸ qpdf ─▸ in-process page extraction
//! extract    embedded text ─▸ render + recognition ─▸ degraded embedded
//! ```
//!
//! Subprocesses are spawned with argument arrays (never through a shell),
//! run under a timeout, and write into a per-call scratch directory that is
//! removed when the call returns, success or not.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfmill::{compress, EngineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let input = tokio::fs::read("report.pdf").await?;
//!     let outcome = compress(&input, Some(75), &EngineConfig::default()).await?;
//!     tokio::fs::write("report-small.pdf", &outcome.bytes).await?;
//!     eprintln!("{} -> {} bytes ({}% smaller, via {})",
//!         outcome.original_size,
//!         outcome.compressed_size,
//!         outcome.ratio_percent,
//!         outcome.method);
//!     Ok(())
//! }
//! ```
//!
//! ## External Tools
//!
//! | Tool | Used for | Notes |
//! |------|----------|-------|
//! | Ghostscript (`gs`) | compression, page rendering | best compression ratios |
//! | `qpdf` | compression, merge, split | also the only tool that linearizes |
//! | `pdftk` | merge, split | understands symbolic ranges (`end`, `odd`) |
//! | `pdftoppm` (poppler) | page rendering | preferred renderer for recognition |
//! | `tesseract` | optical text recognition | needed for scanned documents |
//!
//! None of them is mandatory: every operation degrades to the in-process
//! fallback, though symbolic split ranges and scanned-document recognition
//! do need their external tool installed.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfmill` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pdfmill = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod recognize;
pub mod scratch;
pub mod strategy;
pub mod tools;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{EngineConfig, EngineConfigBuilder, ToolCandidates};
pub use error::{AttemptRecord, PdfMillError, StrategyError};
pub use output::{
    AssemblyMethod, CompressionMethod, CompressionOutcome, DocumentInfo, ExtractionOutcome,
    ExtractionSource, MergeOutcome, SplitOutcome, SplitPart,
};
pub use pipeline::compress::{compress, CompressionTier};
pub use pipeline::document::inspect;
pub use pipeline::extract::extract_text;
pub use pipeline::merge_split::{merge_pdfs, split_pdf};
pub use recognize::{RecognitionEngine, RecognizedText, TesseractEngine};
pub use scratch::TempScope;
pub use strategy::{ChainWin, StrategyChain, StrategyFuture};
