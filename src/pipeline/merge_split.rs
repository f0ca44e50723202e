//! Document assembly: merging PDFs and splitting out page ranges.
//!
//! Both operations prefer `pdftk` (fast, battle-tested page plumbing), fall
//! back to `qpdf`, and finally to the in-process engine. The in-process
//! fallback understands plain numeric ranges only; pdftk-style symbolic
//! ranges ("2-end", "odd") ride through to the external tools verbatim and
//! fail the in-process strategy cleanly.
//!
//! Range validation happens before any strategy runs: a range that is
//! malformed on its face ("0", "5-2") fails the whole call immediately
//! instead of burning through the cascade.

use crate::config::EngineConfig;
use crate::error::{PdfMillError, StrategyError};
use crate::output::{AssemblyMethod, MergeOutcome, SplitOutcome, SplitPart};
use crate::pipeline::{document, require_pdf};
use crate::scratch::TempScope;
use crate::strategy::StrategyChain;
use crate::tools;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

// ── Page ranges ───────────────────────────────────────────────────────────

/// One comma-separated token of a split expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeToken {
    /// A single 1-based page: `"5"`.
    Single(usize),
    /// An inclusive 1-based span: `"2-7"`.
    Span(usize, usize),
    /// Anything else, passed to the external tools untouched: `"2-end"`.
    Other(String),
}

impl RangeToken {
    /// The normalized token as handed to external tools.
    pub fn as_arg(&self) -> String {
        match self {
            RangeToken::Single(n) => n.to_string(),
            RangeToken::Span(a, b) => format!("{a}-{b}"),
            RangeToken::Other(raw) => raw.clone(),
        }
    }
}

/// Parse one range token, rejecting what can never be valid.
pub fn parse_range_token(raw: &str) -> Result<RangeToken, PdfMillError> {
    let token = raw.trim();
    if token.is_empty() {
        return Err(PdfMillError::InvalidPageRange {
            range: raw.to_string(),
            reason: "empty range token".to_string(),
        });
    }

    if let Ok(n) = token.parse::<usize>() {
        if n == 0 {
            return Err(PdfMillError::InvalidPageRange {
                range: token.to_string(),
                reason: "pages are numbered from 1".to_string(),
            });
        }
        return Ok(RangeToken::Single(n));
    }

    if let Some((start, end)) = token.split_once('-') {
        if let (Ok(a), Ok(b)) = (start.trim().parse::<usize>(), end.trim().parse::<usize>()) {
            if a == 0 || b == 0 {
                return Err(PdfMillError::InvalidPageRange {
                    range: token.to_string(),
                    reason: "pages are numbered from 1".to_string(),
                });
            }
            if a > b {
                return Err(PdfMillError::InvalidPageRange {
                    range: token.to_string(),
                    reason: format!("start {a} is after end {b}"),
                });
            }
            return Ok(RangeToken::Span(a, b));
        }
    }

    Ok(RangeToken::Other(token.to_string()))
}

/// Parse a full comma-separated split expression.
pub fn parse_ranges(raw: &str) -> Result<Vec<RangeToken>, PdfMillError> {
    if raw.trim().is_empty() {
        return Err(PdfMillError::InvalidPageRange {
            range: raw.to_string(),
            reason: "no ranges given".to_string(),
        });
    }
    raw.split(',').map(parse_range_token).collect()
}

/// Human-readable description of one extracted part.
pub fn describe_range(token: &RangeToken, total_pages: usize) -> String {
    match token {
        RangeToken::Single(n) => format!("Page {n} of {total_pages}"),
        RangeToken::Span(a, b) => {
            let pages = b - a + 1;
            format!("Pages {a}-{b} ({pages} pages) of {total_pages}")
        }
        RangeToken::Other(raw) => format!("Pages {raw} of {total_pages}"),
    }
}

// ── Merge ─────────────────────────────────────────────────────────────────

/// Merge two or more PDFs into one, preserving input order.
pub async fn merge_pdfs(
    inputs: &[Vec<u8>],
    config: &EngineConfig,
) -> Result<MergeOutcome, PdfMillError> {
    let started = Instant::now();

    if inputs.len() < 2 {
        return Err(PdfMillError::NotEnoughInputs { got: inputs.len() });
    }
    for (i, input) in inputs.iter().enumerate() {
        require_pdf(&format!("input {} of {}", i + 1, inputs.len()), input)?;
    }

    let scope = TempScope::new()?;
    let mut input_paths = Vec::with_capacity(inputs.len());
    for input in inputs {
        input_paths.push(scope.write("input.pdf", input).await?);
    }
    let input_paths = input_paths.as_slice();
    let scope = &scope;

    let mut chain = StrategyChain::new("merge");

    chain.push("pdftk", move || {
        Box::pin(async move {
            let out = scope.allocate("merged.pdf");
            let args = pdftk_merge_args(input_paths, &out);
            let binary = tools::invoke(
                "pdftk",
                &config.tools.pdftk,
                &args,
                &out,
                config.min_output_bytes,
                config.tool_timeout_secs,
            )
            .await?;
            let bytes = tools::read_output(&binary, &out).await?;
            Ok((bytes, AssemblyMethod::Pdftk))
        })
    });

    chain.push("qpdf", move || {
        Box::pin(async move {
            let out = scope.allocate("merged.pdf");
            let args = qpdf_merge_args(input_paths, &out);
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
            Ok((bytes, AssemblyMethod::Qpdf))
        })
    });

    chain.push("embedded", move || {
        Box::pin(async move {
            let (bytes, _) = document::merge_documents(inputs)
                .await
                .map_err(|e| StrategyError::Embedded(e.to_string()))?;
            Ok((bytes, AssemblyMethod::Embedded))
        })
    });

    let win = chain.run().await?;
    let (bytes, method) = win.value;
    let page_count = document::page_count(&bytes).await?;
    let duration_ms = started.elapsed().as_millis() as u64;

    info!(
        method = %method,
        inputs = inputs.len(),
        pages = page_count,
        "merge finished"
    );

    Ok(MergeOutcome {
        bytes,
        method,
        page_count,
        duration_ms,
        attempts: win.attempts,
    })
}

// ── Split ─────────────────────────────────────────────────────────────────

/// Split a PDF into one part per range token ("1-3,5,7-9").
///
/// The page count is read upfront — an unparseable source fails the call no
/// matter which strategy would have done the cutting — and each part then
/// runs its own cascade. One failed part fails the whole split.
pub async fn split_pdf(
    input: &[u8],
    ranges: &str,
    config: &EngineConfig,
) -> Result<SplitOutcome, PdfMillError> {
    let started = Instant::now();
    require_pdf("split input", input)?;

    let tokens = parse_ranges(ranges)?;
    let total_pages = document::page_count(input).await?;

    let scope = TempScope::new()?;
    let input_path = scope.write("input.pdf", input).await?;
    let input_path = input_path.as_path();
    let scope = &scope;

    let mut parts = Vec::with_capacity(tokens.len());
    for token in &tokens {
        let range_arg = token.as_arg();
        let range_arg = range_arg.as_str();

        let mut chain = StrategyChain::new("page extraction");

        chain.push("pdftk", move || {
            Box::pin(async move {
                let out = scope.allocate("part.pdf");
                let args = pdftk_split_args(input_path, range_arg, &out);
                let binary = tools::invoke(
                    "pdftk",
                    &config.tools.pdftk,
                    &args,
                    &out,
                    config.min_output_bytes,
                    config.tool_timeout_secs,
                )
                .await?;
                let bytes = tools::read_output(&binary, &out).await?;
                Ok((bytes, AssemblyMethod::Pdftk))
            })
        });

        chain.push("qpdf", move || {
            Box::pin(async move {
                let out = scope.allocate("part.pdf");
                let args = qpdf_split_args(input_path, range_arg, &out);
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
                Ok((bytes, AssemblyMethod::Qpdf))
            })
        });

        chain.push("embedded", move || {
            Box::pin(async move {
                let (first, last) = match token {
                    RangeToken::Single(n) => (*n, *n),
                    RangeToken::Span(a, b) => (*a, *b),
                    RangeToken::Other(raw) => {
                        return Err(StrategyError::Embedded(format!(
                            "range '{raw}' is only supported by external tools"
                        )))
                    }
                };
                let bytes = document::copy_page_range(input, first, last)
                    .await
                    .map_err(|e| StrategyError::Embedded(e.to_string()))?;
                Ok((bytes, AssemblyMethod::Embedded))
            })
        });

        let win = chain.run().await?;
        let (bytes, method) = win.value;
        parts.push(SplitPart {
            bytes,
            page_range: token.as_arg(),
            description: describe_range(token, total_pages),
            method,
            attempts: win.attempts,
        });
    }

    let duration_ms = started.elapsed().as_millis() as u64;
    info!(parts = parts.len(), total_pages, "split finished");

    Ok(SplitOutcome {
        parts,
        total_pages,
        duration_ms,
    })
}

// ── Tool argument vectors ─────────────────────────────────────────────────

/// `pdftk IN1 IN2 … cat output OUT`
fn pdftk_merge_args(inputs: &[PathBuf], output: &Path) -> Vec<String> {
    let mut args: Vec<String> = inputs
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    args.push("cat".to_string());
    args.push("output".to_string());
    args.push(output.to_string_lossy().into_owned());
    args
}

/// `qpdf --empty --pages IN1 IN2 … -- OUT`
fn qpdf_merge_args(inputs: &[PathBuf], output: &Path) -> Vec<String> {
    let mut args = vec!["--empty".to_string(), "--pages".to_string()];
    args.extend(inputs.iter().map(|p| p.to_string_lossy().into_owned()));
    args.push("--".to_string());
    args.push(output.to_string_lossy().into_owned());
    args
}

/// `pdftk IN cat RANGE output OUT`
fn pdftk_split_args(input: &Path, range: &str, output: &Path) -> Vec<String> {
    vec![
        input.to_string_lossy().into_owned(),
        "cat".to_string(),
        range.to_string(),
        "output".to_string(),
        output.to_string_lossy().into_owned(),
    ]
}

/// `qpdf IN --pages . RANGE -- OUT`
fn qpdf_split_args(input: &Path, range: &str, output: &Path) -> Vec<String> {
    vec![
        input.to_string_lossy().into_owned(),
        "--pages".to_string(),
        ".".to_string(),
        range.to_string(),
        "--".to_string(),
        output.to_string_lossy().into_owned(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::document::testdoc;

    fn no_tools() -> EngineConfig {
        EngineConfig::builder()
            .pdftk_candidates(vec!["pdfmill-test-no-such-pdftk".to_string()])
            .qpdf_candidates(vec!["pdfmill-test-no-such-qpdf".to_string()])
            .build()
            .unwrap()
    }

    // ── Range parsing ────────────────────────────────────────────────────

    #[test]
    fn numeric_tokens_parse() {
        assert_eq!(parse_range_token("5").unwrap(), RangeToken::Single(5));
        assert_eq!(parse_range_token(" 2-7 ").unwrap(), RangeToken::Span(2, 7));
        assert_eq!(parse_range_token("3-3").unwrap(), RangeToken::Span(3, 3));
    }

    #[test]
    fn symbolic_tokens_pass_through() {
        assert_eq!(
            parse_range_token("2-end").unwrap(),
            RangeToken::Other("2-end".to_string())
        );
    }

    #[test]
    fn zero_pages_are_rejected() {
        assert!(matches!(
            parse_range_token("0"),
            Err(PdfMillError::InvalidPageRange { .. })
        ));
        assert!(matches!(
            parse_range_token("0-3"),
            Err(PdfMillError::InvalidPageRange { .. })
        ));
    }

    #[test]
    fn backwards_spans_are_rejected() {
        let err = parse_range_token("5-2").unwrap_err();
        match err {
            PdfMillError::InvalidPageRange { reason, .. } => {
                assert!(reason.contains("start 5 is after end 2"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn expressions_split_on_commas() {
        let tokens = parse_ranges("1-3,5").unwrap();
        assert_eq!(
            tokens,
            vec![RangeToken::Span(1, 3), RangeToken::Single(5)]
        );
        assert!(parse_ranges("").is_err());
        assert!(parse_ranges("1,,2").is_err());
    }

    // ── Descriptions ─────────────────────────────────────────────────────

    #[test]
    fn descriptions_follow_the_three_forms() {
        assert_eq!(
            describe_range(&RangeToken::Single(3), 9),
            "Page 3 of 9"
        );
        assert_eq!(
            describe_range(&RangeToken::Span(2, 5), 9),
            "Pages 2-5 (4 pages) of 9"
        );
        assert_eq!(
            describe_range(&RangeToken::Other("2-end".to_string()), 9),
            "Pages 2-end of 9"
        );
    }

    // ── Argument vectors ─────────────────────────────────────────────────

    #[test]
    fn merge_argument_vectors_are_exact() {
        let inputs = vec![PathBuf::from("/t/a.pdf"), PathBuf::from("/t/b.pdf")];
        assert_eq!(
            pdftk_merge_args(&inputs, Path::new("/t/out.pdf")),
            vec!["/t/a.pdf", "/t/b.pdf", "cat", "output", "/t/out.pdf"]
        );
        assert_eq!(
            qpdf_merge_args(&inputs, Path::new("/t/out.pdf")),
            vec!["--empty", "--pages", "/t/a.pdf", "/t/b.pdf", "--", "/t/out.pdf"]
        );
    }

    #[test]
    fn split_argument_vectors_are_exact() {
        assert_eq!(
            pdftk_split_args(Path::new("/t/in.pdf"), "2-5", Path::new("/t/out.pdf")),
            vec!["/t/in.pdf", "cat", "2-5", "output", "/t/out.pdf"]
        );
        assert_eq!(
            qpdf_split_args(Path::new("/t/in.pdf"), "2-5", Path::new("/t/out.pdf")),
            vec!["/t/in.pdf", "--pages", ".", "2-5", "--", "/t/out.pdf"]
        );
    }

    // ── Merge pipeline ───────────────────────────────────────────────────

    #[tokio::test]
    async fn merging_one_document_is_an_error() {
        let pdf = testdoc::pdf_with_pages(&["only"]);
        let err = merge_pdfs(&[pdf], &EngineConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PdfMillError::NotEnoughInputs { got: 1 }));
    }

    #[tokio::test]
    async fn merge_rejects_a_non_pdf_input_by_position() {
        let pdf = testdoc::pdf_with_pages(&["fine"]);
        let err = merge_pdfs(
            &[pdf, b"ZIP not a pdf".to_vec()],
            &EngineConfig::default(),
        )
        .await
        .unwrap_err();
        match err {
            PdfMillError::NotAPdf { context, .. } => assert_eq!(context, "input 2 of 2"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unparseable_merge_inputs_exhaust_the_chain() {
        let junk = b"%PDF-1.4\nnot parseable".to_vec();
        let err = merge_pdfs(&[junk.clone(), junk], &no_tools()).await.unwrap_err();
        match err {
            PdfMillError::AllStrategiesExhausted {
                operation,
                attempts,
            } => {
                assert_eq!(operation, "merge");
                assert_eq!(attempts.len(), 3);
                assert_eq!(attempts[2].strategy, "embedded");
                assert!(matches!(attempts[2].error, StrategyError::Embedded(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn merge_falls_back_to_in_process() {
        let first = testdoc::pdf_with_pages(&["first one", "first two"]);
        let second = testdoc::pdf_with_pages(&["second one"]);

        let outcome = merge_pdfs(&[first, second], &no_tools()).await.unwrap();
        assert_eq!(outcome.method, AssemblyMethod::Embedded);
        assert_eq!(outcome.page_count, 3);
        assert_eq!(outcome.attempts.len(), 2);
        assert_eq!(outcome.attempts[0].strategy, "pdftk");
        assert_eq!(outcome.attempts[1].strategy, "qpdf");

        let (text, _) = document::extract_embedded_text(&outcome.bytes)
            .await
            .unwrap();
        assert!(text.contains("first two") && text.contains("second one"));
    }

    // ── Split pipeline ───────────────────────────────────────────────────

    #[tokio::test]
    async fn split_rejects_bad_ranges_before_any_work() {
        let pdf = testdoc::pdf_with_pages(&["a", "b", "c"]);
        let err = split_pdf(&pdf, "0-3", &EngineConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PdfMillError::InvalidPageRange { .. }));
    }

    #[tokio::test]
    async fn split_falls_back_to_in_process() {
        let pdf = testdoc::pdf_with_pages(&["one", "two", "three", "four", "five"]);
        let outcome = split_pdf(&pdf, "1-2,4", &no_tools()).await.unwrap();

        assert_eq!(outcome.total_pages, 5);
        assert_eq!(outcome.parts.len(), 2);

        let span = &outcome.parts[0];
        assert_eq!(span.page_range, "1-2");
        assert_eq!(span.description, "Pages 1-2 (2 pages) of 5");
        assert_eq!(span.method, AssemblyMethod::Embedded);
        assert_eq!(document::page_count(&span.bytes).await.unwrap(), 2);

        let single = &outcome.parts[1];
        assert_eq!(single.page_range, "4");
        assert_eq!(single.description, "Page 4 of 5");
        assert_eq!(document::page_count(&single.bytes).await.unwrap(), 1);
        let (text, _) = document::extract_embedded_text(&single.bytes)
            .await
            .unwrap();
        assert!(text.contains("four"));
    }

    #[tokio::test]
    async fn symbolic_range_without_tools_exhausts_the_chain() {
        let pdf = testdoc::pdf_with_pages(&["a", "b", "c"]);
        let err = split_pdf(&pdf, "2-end", &no_tools()).await.unwrap_err();
        match err {
            PdfMillError::AllStrategiesExhausted {
                operation,
                attempts,
            } => {
                assert_eq!(operation, "page extraction");
                assert_eq!(attempts.len(), 3);
                assert_eq!(attempts[2].strategy, "embedded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unparseable_split_input_fails_upfront() {
        let err = split_pdf(b"%PDF-1.4\njunk", "1", &no_tools())
            .await
            .unwrap_err();
        assert!(matches!(err, PdfMillError::CorruptPdf { .. }));
    }
}
