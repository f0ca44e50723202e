//! Configuration types for the transformation engine.
//!
//! All engine behaviour is controlled through [`EngineConfig`], built via its
//! [`EngineConfigBuilder`]. Keeping every knob in one struct makes it trivial
//! to share a config across concurrent requests and to see, in one place,
//! exactly which executables the host is willing to run.
//!
//! # Design choice: builder over constructor
//! Candidate lists, thresholds, and timeouts will keep growing; a positional
//! constructor breaks on every new field. The builder lets callers set only
//! what they care about and rely on documented defaults for the rest.

use crate::error::PdfMillError;
use crate::recognize::RecognitionEngine;
use std::fmt;
use std::sync::Arc;

/// Ordered executable candidates for each external tool.
///
/// One logical tool may live under several names or absolute paths depending
/// on platform and installation; candidates are tried strictly in order and a
/// missing binary simply advances to the next entry. The defaults cover the
/// common Unix names plus the Windows installs the engine historically ran
/// against — a nonexistent candidate costs one failed spawn and nothing else.
#[derive(Debug, Clone)]
pub struct ToolCandidates {
    /// Ghostscript, used for raster-aware compression and page rasterisation.
    pub ghostscript: Vec<String>,
    /// qpdf, used for structural compression and page assembly.
    pub qpdf: Vec<String>,
    /// pdftk, used for merge and split.
    pub pdftk: Vec<String>,
    /// pdftoppm (poppler-utils), the preferred page rasteriser.
    pub pdftoppm: Vec<String>,
    /// tesseract, the default optical-recognition engine.
    pub tesseract: Vec<String>,
}

impl Default for ToolCandidates {
    fn default() -> Self {
        Self {
            ghostscript: vec![
                "gswin64c".into(),
                "gswin32c".into(),
                "gs".into(),
                r"C:\Program Files\gs\gs10.06.0\bin\gswin64c.exe".into(),
                r"C:\Program Files (x86)\gs\gs10.06.0\bin\gswin32c.exe".into(),
            ],
            qpdf: vec!["tools/qpdf.exe".into(), "qpdf.exe".into(), "qpdf".into()],
            pdftk: vec!["pdftk".into()],
            pdftoppm: vec!["pdftoppm".into()],
            tesseract: vec!["tesseract".into()],
        }
    }
}

/// Configuration for the transformation engine.
///
/// Built via [`EngineConfig::builder()`] or [`EngineConfig::default()`].
///
/// # Example
/// ```rust
/// use pdfmill::EngineConfig;
///
/// let config = EngineConfig::builder()
///     .tool_timeout_secs(60)
///     .render_dpi(300)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct EngineConfig {
    /// Executable candidates per external tool.
    pub tools: ToolCandidates,

    /// Hard wall-clock bound on every subprocess invocation, in seconds. Default: 120.
    ///
    /// A hung external tool would otherwise block its request forever. On
    /// timeout the process is killed and that candidate is classified exactly
    /// like a non-zero exit: recorded, then superseded by the next candidate.
    pub tool_timeout_secs: u64,

    /// Rasterisation DPI for the recognition path. Range: 72–1200. Default: 300.
    ///
    /// 300 DPI is the floor at which tesseract reads ordinary body text
    /// reliably; below that, recognition confidence collapses on small fonts.
    /// Raising it improves tiny print at the cost of render time and memory.
    pub render_dpi: u32,

    /// Minimum byte size for a tool's output artifact to count as real. Default: 100.
    ///
    /// Some tools exit zero after writing nothing, or an empty shell of a
    /// file. Anything below this threshold fails the candidate that produced
    /// it; even a blank single-page PDF comfortably clears 100 bytes.
    pub min_output_bytes: u64,

    /// Minimum byte size for a rendered page image. Default: 1000.
    ///
    /// A first-page render smaller than ~1 KB is a blank or broken raster and
    /// would only feed the recognition engine noise.
    pub min_image_bytes: u64,

    /// Recognition language passed to the engine (tesseract code). Default: "eng".
    pub ocr_language: String,

    /// Pre-constructed recognition engine. Takes precedence over the default
    /// tesseract CLI engine built from `tools.tesseract` and `ocr_language`.
    pub recognition: Option<Arc<dyn RecognitionEngine>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tools: ToolCandidates::default(),
            tool_timeout_secs: 120,
            render_dpi: 300,
            min_output_bytes: 100,
            min_image_bytes: 1000,
            ocr_language: "eng".into(),
            recognition: None,
        }
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("tools", &self.tools)
            .field("tool_timeout_secs", &self.tool_timeout_secs)
            .field("render_dpi", &self.render_dpi)
            .field("min_output_bytes", &self.min_output_bytes)
            .field("min_image_bytes", &self.min_image_bytes)
            .field("ocr_language", &self.ocr_language)
            .field(
                "recognition",
                &self.recognition.as_ref().map(|_| "<dyn RecognitionEngine>"),
            )
            .finish()
    }
}

impl EngineConfig {
    /// Create a new builder for `EngineConfig`.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn tool_timeout_secs(mut self, secs: u64) -> Self {
        self.config.tool_timeout_secs = secs.max(1);
        self
    }

    pub fn render_dpi(mut self, dpi: u32) -> Self {
        self.config.render_dpi = dpi.clamp(72, 1200);
        self
    }

    pub fn min_output_bytes(mut self, bytes: u64) -> Self {
        self.config.min_output_bytes = bytes;
        self
    }

    pub fn min_image_bytes(mut self, bytes: u64) -> Self {
        self.config.min_image_bytes = bytes;
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn recognition(mut self, engine: Arc<dyn RecognitionEngine>) -> Self {
        self.config.recognition = Some(engine);
        self
    }

    pub fn ghostscript_candidates(mut self, candidates: Vec<String>) -> Self {
        self.config.tools.ghostscript = candidates;
        self
    }

    pub fn qpdf_candidates(mut self, candidates: Vec<String>) -> Self {
        self.config.tools.qpdf = candidates;
        self
    }

    pub fn pdftk_candidates(mut self, candidates: Vec<String>) -> Self {
        self.config.tools.pdftk = candidates;
        self
    }

    pub fn pdftoppm_candidates(mut self, candidates: Vec<String>) -> Self {
        self.config.tools.pdftoppm = candidates;
        self
    }

    pub fn tesseract_candidates(mut self, candidates: Vec<String>) -> Self {
        self.config.tools.tesseract = candidates;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<EngineConfig, PdfMillError> {
        let c = &self.config;
        if c.tool_timeout_secs == 0 {
            return Err(PdfMillError::InvalidConfig(
                "tool timeout must be ≥ 1 second".into(),
            ));
        }
        if c.render_dpi < 72 || c.render_dpi > 1200 {
            return Err(PdfMillError::InvalidConfig(format!(
                "render DPI must be 72–1200, got {}",
                c.render_dpi
            )));
        }
        if c.ocr_language.trim().is_empty() {
            return Err(PdfMillError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        let lists = [
            ("ghostscript", &c.tools.ghostscript),
            ("qpdf", &c.tools.qpdf),
            ("pdftk", &c.tools.pdftk),
            ("pdftoppm", &c.tools.pdftoppm),
            ("tesseract", &c.tools.tesseract),
        ];
        for (tool, candidates) in lists {
            if candidates.is_empty() {
                return Err(PdfMillError::InvalidConfig(format!(
                    "candidate list for {tool} must not be empty"
                )));
            }
        }
        Ok(self.config)
    }
}
