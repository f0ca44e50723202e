//! First-page rasterisation for the recognition path.
//!
//! Optical recognition needs a bitmap, and producing one from a PDF is
//! itself a cascade: `pdftoppm` (poppler) renders faithfully and fast where
//! installed, ghostscript is the broadly-available fallback. Both write PNG
//! into the caller's scratch scope.
//!
//! Only the first page is rendered. Scanned documents that reach this path
//! are overwhelmingly single-page captures, and recognising one page is
//! enough to decide whether the document has any text at all.

use crate::config::EngineConfig;
use crate::error::PdfMillError;
use crate::scratch::TempScope;
use crate::strategy::{ChainWin, StrategyChain};
use crate::tools;
use std::path::{Path, PathBuf};

/// Render page 1 of `pdf_path` to a PNG inside `scope`.
///
/// Returns the winning strategy's PNG path plus the attempt ledger. Images
/// smaller than [`EngineConfig::min_image_bytes`] are rejected as render
/// failures rather than fed to recognition.
pub async fn render_first_page(
    pdf_path: &Path,
    scope: &TempScope,
    config: &EngineConfig,
) -> Result<ChainWin<PathBuf>, PdfMillError> {
    let mut chain = StrategyChain::new("page render");

    chain.push("pdftoppm", move || {
        Box::pin(async move {
            let outbase = scope.allocate("page");
            let expected = outbase.with_extension("png");
            let args = pdftoppm_args(pdf_path, &outbase, config.render_dpi);
            tools::invoke(
                "pdftoppm",
                &config.tools.pdftoppm,
                &args,
                &expected,
                config.min_image_bytes,
                config.tool_timeout_secs,
            )
            .await?;
            Ok(expected)
        })
    });

    chain.push("ghostscript", move || {
        Box::pin(async move {
            let out = scope.allocate("page.png");
            let args = ghostscript_args(pdf_path, &out, config.render_dpi);
            tools::invoke(
                "ghostscript",
                &config.tools.ghostscript,
                &args,
                &out,
                config.min_image_bytes,
                config.tool_timeout_secs,
            )
            .await?;
            Ok(out)
        })
    });

    chain.run().await
}

/// `pdftoppm -png -r D -f 1 -l 1 -singlefile IN OUTBASE`; the tool appends
/// `.png` to the output base itself.
fn pdftoppm_args(pdf: &Path, outbase: &Path, dpi: u32) -> Vec<String> {
    vec![
        "-png".to_string(),
        "-r".to_string(),
        dpi.to_string(),
        "-f".to_string(),
        "1".to_string(),
        "-l".to_string(),
        "1".to_string(),
        "-singlefile".to_string(),
        pdf.to_string_lossy().into_owned(),
        outbase.to_string_lossy().into_owned(),
    ]
}

fn ghostscript_args(pdf: &Path, out: &Path, dpi: u32) -> Vec<String> {
    vec![
        "-dNOPAUSE".to_string(),
        "-dBATCH".to_string(),
        "-dQUIET".to_string(),
        "-sDEVICE=png16m".to_string(),
        format!("-r{dpi}"),
        "-dFirstPage=1".to_string(),
        "-dLastPage=1".to_string(),
        format!("-sOutputFile={}", out.display()),
        pdf.to_string_lossy().into_owned(),
    ]
}
