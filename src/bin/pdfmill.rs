//! CLI binary for pdfmill.
//!
//! A thin shim over the library crate that maps subcommand flags to
//! `EngineConfig` and prints outcome reports.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdfmill::{
    compress, extract_text, inspect, merge_pdfs, split_pdf, AttemptRecord, EngineConfig,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Compress to ebook quality (the default)
  pdfmill compress report.pdf -o report-small.pdf

  # Smallest possible file
  pdfmill compress report.pdf -o report-tiny.pdf --quality 10

  # Merge chapters in order
  pdfmill merge ch1.pdf ch2.pdf ch3.pdf -o book.pdf

  # One output file per range
  pdfmill split book.pdf --ranges 1-3,4-9,10-end --out-dir chapters/

  # Text from a scanned document (needs tesseract)
  pdfmill extract scan.pdf

  # Metadata only
  pdfmill inspect report.pdf --json

EXTERNAL TOOLS:
  Each operation tries the best installed tool first and falls back to the
  built-in engine, so nothing below is mandatory:

  Tool         Operations              Notes
  ─────────    ──────────────────────  ────────────────────────────────────
  ghostscript  compress, extract       best compression ratios
  qpdf         compress, merge, split  produces linearized output
  pdftk        merge, split            symbolic ranges (end, odd, even)
  pdftoppm     extract                 poppler-utils, preferred renderer
  tesseract    extract                 recognition for scanned documents

ENVIRONMENT VARIABLES:
  PDFMILL_TOOL_TIMEOUT   External tool timeout in seconds (default 120)
  PDFMILL_OCR_LANGUAGE   Recognition language code (default eng)
  PDFMILL_DPI            Render DPI for recognition (default 300)
  PDFMILL_JSON           Emit JSON reports
  PDFMILL_VERBOSE        DEBUG-level logs
  PDFMILL_QUIET          Errors only
  RUST_LOG               Full tracing filter override
"#;

/// Compress, merge, split, and extract text from PDF documents.
#[derive(Parser, Debug)]
#[command(
    name = "pdfmill",
    version,
    about = "Compress, merge, split, and extract text from PDF documents",
    long_about = "PDF operations with cascading tool fallbacks. Every command tries the best \
external tool installed on this machine (Ghostscript, qpdf, pdftk, poppler, tesseract) and \
falls back to a built-in engine, so results degrade gracefully rather than failing outright.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output a structured JSON report instead of human-readable text.
    #[arg(long, global = true, env = "PDFMILL_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFMILL_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFMILL_QUIET")]
    quiet: bool,

    /// External tool timeout in seconds.
    #[arg(long, global = true, env = "PDFMILL_TOOL_TIMEOUT", default_value_t = 120)]
    tool_timeout: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Shrink a PDF, trading quality for size.
    Compress {
        /// Input PDF path.
        input: PathBuf,

        /// Write the compressed PDF here.
        #[arg(short, long)]
        output: PathBuf,

        /// Quality from 1 (smallest) to 100 (best); ebook-grade when omitted.
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: Option<u8>,
    },

    /// Concatenate two or more PDFs in argument order.
    Merge {
        /// Input PDF paths, at least two.
        #[arg(num_args = 2.., required = true)]
        inputs: Vec<PathBuf>,

        /// Write the merged PDF here.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Cut page ranges out of a PDF, one output file per range.
    Split {
        /// Input PDF path.
        input: PathBuf,

        /// Comma-separated ranges: "1-3,7,9-end".
        #[arg(short, long)]
        ranges: String,

        /// Directory for the part files.
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Extract text from a PDF or a scanned image.
    Extract {
        /// Input PDF or image path.
        input: PathBuf,

        /// Write the text here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Recognition language (tesseract code).
        #[arg(long, env = "PDFMILL_OCR_LANGUAGE", default_value = "eng")]
        language: String,

        /// Render DPI used when recognition is needed (72-1200).
        #[arg(long, env = "PDFMILL_DPI", default_value_t = 300,
              value_parser = clap::value_parser!(u32).range(72..=1200))]
        dpi: u32,
    },

    /// Print document metadata, no processing.
    Inspect {
        /// Input PDF path.
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Summaries are printed directly, so library INFO logs stay off unless
    // asked for.
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let mut builder = EngineConfig::builder().tool_timeout_secs(cli.tool_timeout);
    if let Command::Extract { language, dpi, .. } = &cli.command {
        builder = builder.ocr_language(language.clone()).render_dpi(*dpi);
    }
    let config = builder.build().context("Invalid configuration")?;

    let chatty = !cli.quiet && !cli.json;

    match cli.command {
        // ── Compress ─────────────────────────────────────────────────────
        Command::Compress {
            input,
            output,
            quality,
        } => {
            let bytes = read_input(&input).await?;
            let outcome = compress(&bytes, quality, &config)
                .await
                .context("Compression failed")?;

            tokio::fs::write(&output, &outcome.bytes)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;

            if cli.json {
                print_json(&outcome)?;
            } else if !cli.quiet {
                print_attempts(&outcome.attempts);
                let change = if outcome.ratio_percent >= 0.0 {
                    format!("{:.1}% smaller", outcome.ratio_percent)
                } else {
                    format!("{:.1}% larger", -outcome.ratio_percent)
                };
                eprintln!(
                    "{} {} → {}  ({change})  via {}  in {}ms",
                    green("✔"),
                    human_bytes(outcome.original_size),
                    human_bytes(outcome.compressed_size),
                    outcome.method,
                    outcome.duration_ms,
                );
                eprintln!("  → {}", bold(&output.display().to_string()));
            }
        }

        // ── Merge ────────────────────────────────────────────────────────
        Command::Merge { inputs, output } => {
            let mut docs = Vec::with_capacity(inputs.len());
            for path in &inputs {
                docs.push(read_input(path).await?);
            }
            let outcome = merge_pdfs(&docs, &config).await.context("Merge failed")?;

            tokio::fs::write(&output, &outcome.bytes)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;

            if cli.json {
                print_json(&outcome)?;
            } else if !cli.quiet {
                print_attempts(&outcome.attempts);
                eprintln!(
                    "{} {} files → {} pages  via {}  in {}ms",
                    green("✔"),
                    inputs.len(),
                    outcome.page_count,
                    outcome.method,
                    outcome.duration_ms,
                );
                eprintln!("  → {}", bold(&output.display().to_string()));
            }
        }

        // ── Split ────────────────────────────────────────────────────────
        Command::Split {
            input,
            ranges,
            out_dir,
        } => {
            let bytes = read_input(&input).await?;
            let outcome = split_pdf(&bytes, &ranges, &config)
                .await
                .context("Split failed")?;

            tokio::fs::create_dir_all(&out_dir)
                .await
                .with_context(|| format!("Failed to create {}", out_dir.display()))?;

            let stem = input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("part");

            for part in &outcome.parts {
                let path = out_dir.join(format!("{stem}-pages-{}.pdf", part.page_range));
                tokio::fs::write(&path, &part.bytes)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                if chatty {
                    print_attempts(&part.attempts);
                    eprintln!(
                        "  {} {}  {}  → {}",
                        green("✓"),
                        part.description,
                        dim(&format!("via {}", part.method)),
                        path.display(),
                    );
                }
            }

            if cli.json {
                print_json(&outcome)?;
            } else if !cli.quiet {
                eprintln!(
                    "{} {} parts from {} pages  in {}ms",
                    green("✔"),
                    outcome.parts.len(),
                    outcome.total_pages,
                    outcome.duration_ms,
                );
            }
        }

        // ── Extract ──────────────────────────────────────────────────────
        Command::Extract { input, output, .. } => {
            let bytes = read_input(&input).await?;
            let outcome = extract_text(&bytes, &config)
                .await
                .context("Text extraction failed")?;

            if cli.json {
                print_json(&outcome)?;
            } else {
                match output {
                    Some(ref path) => {
                        tokio::fs::write(path, outcome.text.as_bytes())
                            .await
                            .with_context(|| format!("Failed to write {}", path.display()))?;
                    }
                    None => {
                        let stdout = io::stdout();
                        let mut handle = stdout.lock();
                        handle
                            .write_all(outcome.text.as_bytes())
                            .context("Failed to write to stdout")?;
                        if !outcome.text.ends_with('\n') {
                            handle.write_all(b"\n").ok();
                        }
                    }
                }
                if !cli.quiet {
                    print_attempts(&outcome.attempts);
                    eprintln!(
                        "{} {} chars  {}% confidence  via {}  {}  in {}ms",
                        green("✔"),
                        outcome.text.chars().count(),
                        outcome.confidence,
                        outcome.source,
                        dim(&outcome.language),
                        outcome.duration_ms,
                    );
                    if let Some(ref path) = output {
                        eprintln!("  → {}", bold(&path.display().to_string()));
                    }
                }
            }
        }

        // ── Inspect ──────────────────────────────────────────────────────
        Command::Inspect { input } => {
            let bytes = read_input(&input).await?;
            let info = inspect(&bytes).await.context("Failed to inspect PDF")?;

            if cli.json {
                print_json(&info)?;
            } else {
                println!("File:         {}", input.display());
                if let Some(ref t) = info.title {
                    println!("Title:        {t}");
                }
                if let Some(ref a) = info.author {
                    println!("Author:       {a}");
                }
                println!("Pages:        {}", info.page_count);
                println!("PDF Version:  {}", info.pdf_version);
                println!("Encrypted:    {}", info.encrypted);
                println!("File size:    {}", human_bytes(info.file_size));
            }
        }
    }

    Ok(())
}

async fn read_input(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize report")?
    );
    Ok(())
}

/// One dim line per strategy that failed before the winner.
fn print_attempts(attempts: &[AttemptRecord]) {
    for attempt in attempts {
        eprintln!("  {}", dim(&format!("↻ {attempt}")));
    }
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
