//! Quality-tiered PDF compression.
//!
//! Ghostscript rewrites the whole document through `pdfwrite` with a
//! PDFSETTINGS preset and achieves the deepest reduction (it resamples
//! images). qpdf only repacks streams but is far more commonly installed.
//! The in-process engine is the floor: reserialize with compressed streams,
//! and when even that fails, hand back the original bytes unchanged. On a
//! non-empty PDF buffer, compression degrades in effectiveness but does not
//! fail.

use crate::config::EngineConfig;
use crate::error::PdfMillError;
use crate::output::{round2, CompressionMethod, CompressionOutcome};
use crate::pipeline::{document, require_pdf};
use crate::scratch::TempScope;
use crate::strategy::StrategyChain;
use crate::tools;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

// ── Quality tiers ─────────────────────────────────────────────────────────

/// The four compression tiers, keyed off the 0–100 quality knob.
///
/// Lower quality buys harder compression. Tier names follow the ghostscript
/// PDFSETTINGS presets they map onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionTier {
    Screen,
    Ebook,
    Printer,
    Prepress,
}

impl CompressionTier {
    /// Map the optional quality knob to a tier. Unset quality gets the
    /// balanced default.
    pub fn from_level(quality: Option<u8>) -> Self {
        match quality {
            None => CompressionTier::Ebook,
            Some(q) if q <= 50 => CompressionTier::Screen,
            Some(q) if q <= 75 => CompressionTier::Ebook,
            Some(q) if q <= 90 => CompressionTier::Printer,
            Some(_) => CompressionTier::Prepress,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CompressionTier::Screen => "screen",
            CompressionTier::Ebook => "ebook",
            CompressionTier::Printer => "printer",
            CompressionTier::Prepress => "prepress",
        }
    }

    /// The ghostscript PDFSETTINGS preset.
    pub fn gs_setting(&self) -> &'static str {
        match self {
            CompressionTier::Screen => "/screen",
            CompressionTier::Ebook => "/ebook",
            CompressionTier::Printer => "/printer",
            CompressionTier::Prepress => "/prepress",
        }
    }

    /// The qpdf stream compression level.
    pub fn qpdf_level(&self) -> u8 {
        match self {
            CompressionTier::Screen => 1,
            CompressionTier::Ebook => 3,
            CompressionTier::Printer => 6,
            CompressionTier::Prepress => 9,
        }
    }
}

// ── Pipeline ──────────────────────────────────────────────────────────────

/// Compress a PDF, honoring the optional 0–100 quality knob.
pub async fn compress(
    input: &[u8],
    quality: Option<u8>,
    config: &EngineConfig,
) -> Result<CompressionOutcome, PdfMillError> {
    let started = Instant::now();
    require_pdf("compression input", input)?;

    let tier = CompressionTier::from_level(quality);
    let scope = TempScope::new()?;
    let input_path = scope.write("input.pdf", input).await?;
    let input_path = input_path.as_path();
    let scope = &scope;

    let mut chain = StrategyChain::new("compression");

    chain.push("ghostscript", move || {
        Box::pin(async move {
            let out = scope.allocate("gs-out.pdf");
            let args = ghostscript_args(tier, input_path, &out);
            let binary = tools::invoke(
                "ghostscript",
                &config.tools.ghostscript,
                &args,
                &out,
                config.min_output_bytes,
                config.tool_timeout_secs,
            )
            .await?;
            let bytes = tools::read_output(&binary, &out).await?;
            Ok((bytes, CompressionMethod::Ghostscript))
        })
    });

    chain.push("qpdf", move || {
        Box::pin(async move {
            let out = scope.allocate("qpdf-out.pdf");
            let args = qpdf_args(tier, input_path, &out);
            let binary = tools::invoke(
                "qpdf",
                &config.tools.qpdf,
                &args,
                &out,
                config.min_output_bytes,
                config.tool_timeout_secs,
            )
            .await?;
            let bytes = tools::read_output(&binary, &out).await?;
            Ok((bytes, CompressionMethod::Qpdf))
        })
    });

    chain.push("embedded", move || {
        Box::pin(async move {
            match document::recompress(input).await {
                Ok(bytes) => Ok((bytes, CompressionMethod::Embedded)),
                Err(e) => {
                    // Unparseable input cannot be recompressed but can still
                    // be returned, so this strategy cannot fail.
                    warn!("in-process recompression failed, keeping the original bytes: {e}");
                    Ok((input.to_vec(), CompressionMethod::Embedded))
                }
            }
        })
    });

    let win = chain.run().await?;
    let (bytes, method) = win.value;

    let original_size = input.len() as u64;
    let compressed_size = bytes.len() as u64;
    let ratio_percent = round2(
        (original_size as f64 - compressed_size as f64) / original_size as f64 * 100.0,
    );
    let duration_ms = started.elapsed().as_millis() as u64;

    info!(
        method = %method,
        tier = tier.name(),
        original_size,
        compressed_size,
        ratio_percent,
        "compression finished"
    );

    Ok(CompressionOutcome {
        bytes,
        method,
        original_size,
        compressed_size,
        ratio_percent,
        duration_ms,
        attempts: win.attempts,
    })
}

/// `gs -sDEVICE=pdfwrite -dCompatibilityLevel=1.4 -dPDFSETTINGS=<preset>
/// -dNOPAUSE -dQUIET -dBATCH -sOutputFile=OUT IN`
fn ghostscript_args(tier: CompressionTier, input: &Path, output: &Path) -> Vec<String> {
    vec![
        "-sDEVICE=pdfwrite".to_string(),
        "-dCompatibilityLevel=1.4".to_string(),
        format!("-dPDFSETTINGS={}", tier.gs_setting()),
        "-dNOPAUSE".to_string(),
        "-dQUIET".to_string(),
        "-dBATCH".to_string(),
        format!("-sOutputFile={}", output.display()),
        input.to_string_lossy().into_owned(),
    ]
}

/// `qpdf IN OUT --compress-streams=y --compression-level=<n>
/// [--object-streams=generate] --linearize`
fn qpdf_args(tier: CompressionTier, input: &Path, output: &Path) -> Vec<String> {
    let mut args = vec![
        input.to_string_lossy().into_owned(),
        output.to_string_lossy().into_owned(),
        "--compress-streams=y".to_string(),
        format!("--compression-level={}", tier.qpdf_level()),
    ];
    if tier == CompressionTier::Prepress {
        args.push("--object-streams=generate".to_string());
    }
    args.push("--linearize".to_string());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::document::testdoc;

    fn no_tools() -> EngineConfig {
        EngineConfig::builder()
            .ghostscript_candidates(vec!["pdfmill-test-no-such-gs".to_string()])
            .qpdf_candidates(vec!["pdfmill-test-no-such-qpdf".to_string()])
            .build()
            .unwrap()
    }

    #[test]
    fn quality_maps_to_tiers_at_the_documented_boundaries() {
        use CompressionTier::*;
        assert_eq!(CompressionTier::from_level(None), Ebook);
        assert_eq!(CompressionTier::from_level(Some(0)), Screen);
        assert_eq!(CompressionTier::from_level(Some(40)), Screen);
        assert_eq!(CompressionTier::from_level(Some(50)), Screen);
        assert_eq!(CompressionTier::from_level(Some(51)), Ebook);
        assert_eq!(CompressionTier::from_level(Some(75)), Ebook);
        assert_eq!(CompressionTier::from_level(Some(76)), Printer);
        assert_eq!(CompressionTier::from_level(Some(90)), Printer);
        assert_eq!(CompressionTier::from_level(Some(91)), Prepress);
        assert_eq!(CompressionTier::from_level(Some(100)), Prepress);
        assert_eq!(CompressionTier::from_level(Some(255)), Prepress);
    }

    #[test]
    fn ghostscript_args_follow_the_pdfwrite_recipe() {
        let args = ghostscript_args(
            CompressionTier::Ebook,
            Path::new("/t/in.pdf"),
            Path::new("/t/out.pdf"),
        );
        assert_eq!(
            args,
            vec![
                "-sDEVICE=pdfwrite",
                "-dCompatibilityLevel=1.4",
                "-dPDFSETTINGS=/ebook",
                "-dNOPAUSE",
                "-dQUIET",
                "-dBATCH",
                "-sOutputFile=/t/out.pdf",
                "/t/in.pdf",
            ]
        );
    }

    #[test]
    fn qpdf_args_only_generate_object_streams_at_prepress() {
        let screen = qpdf_args(
            CompressionTier::Screen,
            Path::new("/t/in.pdf"),
            Path::new("/t/out.pdf"),
        );
        assert_eq!(
            screen,
            vec![
                "/t/in.pdf",
                "/t/out.pdf",
                "--compress-streams=y",
                "--compression-level=1",
                "--linearize",
            ]
        );

        let prepress = qpdf_args(
            CompressionTier::Prepress,
            Path::new("/t/in.pdf"),
            Path::new("/t/out.pdf"),
        );
        assert_eq!(
            prepress,
            vec![
                "/t/in.pdf",
                "/t/out.pdf",
                "--compress-streams=y",
                "--compression-level=9",
                "--object-streams=generate",
                "--linearize",
            ]
        );
    }

    #[tokio::test]
    async fn empty_input_is_rejected_before_any_strategy() {
        let err = compress(b"", None, &EngineConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PdfMillError::EmptyInput));
    }

    #[tokio::test]
    async fn non_pdf_input_is_rejected() {
        let err = compress(b"GIF89a not a pdf", None, &EngineConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PdfMillError::NotAPdf { .. }));
    }

    #[tokio::test]
    async fn falls_back_to_in_process_when_no_tool_is_installed() {
        let pdf = testdoc::pdf_with_pages(&["compress me", "and me"]);
        let outcome = compress(&pdf, Some(60), &no_tools()).await.unwrap();

        assert_eq!(outcome.method, CompressionMethod::Embedded);
        assert_eq!(outcome.attempts.len(), 2);
        assert_eq!(outcome.attempts[0].strategy, "ghostscript");
        assert_eq!(outcome.attempts[1].strategy, "qpdf");
        assert_eq!(outcome.original_size, pdf.len() as u64);
        assert_eq!(outcome.compressed_size, outcome.bytes.len() as u64);

        // The winner still parses and keeps every page.
        assert_eq!(document::page_count(&outcome.bytes).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn unparseable_input_comes_back_untouched() {
        let junk = b"%PDF-1.4\nnot actually parseable".to_vec();
        let outcome = compress(&junk, None, &no_tools()).await.unwrap();

        assert_eq!(outcome.method, CompressionMethod::Embedded);
        assert_eq!(outcome.bytes, junk);
        assert_eq!(outcome.ratio_percent, 0.0);
    }
}
