//! External tool invocation.
//!
//! One logical tool ("ghostscript", "qpdf", …) may live under several
//! executable identities depending on platform and install method, so each
//! tool is described by an ordered candidate list. [`invoke`] walks that list,
//! spawning each candidate directly with an argument vector — never through a
//! shell — until one launches, exits zero within the timeout, and leaves a
//! plausible output artifact behind.
//!
//! Candidate failures are not errors; they are diagnostics. Only when the
//! whole list is spent does the invoker return a single [`StrategyError`]
//! carrying every candidate's diagnostic, which the calling chain records as
//! one failed strategy.

use crate::error::StrategyError;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Diagnostics keep at most this much stderr per candidate.
const STDERR_SNIPPET_LEN: usize = 300;

/// Run the first workable candidate of a tool and verify its output file.
///
/// For each candidate in order:
/// * a spawn failure (binary missing, not executable) advances to the next
///   candidate;
/// * a non-zero exit or a kill after `timeout_secs` advances as well;
/// * an exit code of zero is only accepted if `expected_output` exists and
///   holds at least `min_output_bytes` — tools that exit zero but silently
///   no-op fail here.
///
/// Returns the winning candidate's binary name. When nothing wins, the error
/// is [`StrategyError::ToolUnavailable`] if no candidate so much as launched,
/// otherwise [`StrategyError::CandidatesExhausted`] with one diagnostic per
/// candidate.
pub async fn invoke(
    tool: &str,
    candidates: &[String],
    args: &[String],
    expected_output: &Path,
    min_output_bytes: u64,
    timeout_secs: u64,
) -> Result<String, StrategyError> {
    let mut diagnostics = Vec::new();
    let mut any_launched = false;

    for candidate in candidates {
        // A plausible artifact left behind by an earlier candidate must not
        // satisfy this candidate's check.
        let _ = tokio::fs::remove_file(expected_output).await;

        match run_once(candidate, args, timeout_secs).await {
            Ok(()) => {
                any_launched = true;
                match output_size(expected_output).await {
                    size if size >= min_output_bytes => {
                        debug!(tool, binary = %candidate, size, "tool produced output");
                        return Ok(candidate.clone());
                    }
                    size => {
                        let err = StrategyError::ImplausibleOutput {
                            binary: candidate.clone(),
                            size,
                            min: min_output_bytes,
                        };
                        debug!(tool, binary = %candidate, %err, "candidate rejected");
                        diagnostics.push(err.to_string());
                    }
                }
            }
            Err(err) => {
                if !matches!(err, StrategyError::ToolUnavailable { .. }) {
                    any_launched = true;
                }
                debug!(tool, binary = %candidate, %err, "candidate failed");
                diagnostics.push(err.to_string());
            }
        }
    }

    if any_launched {
        Err(StrategyError::CandidatesExhausted {
            tool: tool.to_string(),
            diagnostics,
        })
    } else {
        Err(StrategyError::ToolUnavailable {
            tool: tool.to_string(),
            tried: candidates.to_vec(),
        })
    }
}

/// Read the artifact a successful [`invoke`] left behind.
pub async fn read_output(binary: &str, path: &Path) -> Result<Vec<u8>, StrategyError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| StrategyError::ToolFailed {
            binary: binary.to_string(),
            status: "output unreadable".to_string(),
            stderr: e.to_string(),
        })
}

/// Spawn one candidate and wait for it, bounded by the timeout.
async fn run_once(binary: &str, args: &[String], timeout_secs: u64) -> Result<(), StrategyError> {
    debug!(%binary, ?args, "spawning");

    let child = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| StrategyError::ToolUnavailable {
            tool: binary.to_string(),
            tried: vec![format!("{binary} ({e})")],
        })?;

    // Dropping the wait future on timeout drops the child, and kill_on_drop
    // reaps the process; a hung tool cannot block the request.
    let output = match timeout(Duration::from_secs(timeout_secs), child.wait_with_output()).await {
        Ok(waited) => waited.map_err(|e| StrategyError::ToolFailed {
            binary: binary.to_string(),
            status: "wait failed".to_string(),
            stderr: e.to_string(),
        })?,
        Err(_) => {
            return Err(StrategyError::ToolTimedOut {
                binary: binary.to_string(),
                secs: timeout_secs,
            })
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(StrategyError::ToolFailed {
            binary: binary.to_string(),
            status: output.status.to_string(),
            stderr: snippet(&stderr),
        });
    }

    Ok(())
}

/// Size of the output artifact; 0 when it does not exist.
async fn output_size(path: &Path) -> u64 {
    match tokio::fs::metadata(path).await {
        Ok(meta) => meta.len(),
        Err(_) => 0,
    }
}

fn snippet(s: &str) -> String {
    let s = s.trim();
    if s.len() <= STDERR_SNIPPET_LEN {
        s.to_string()
    } else {
        let mut end = STDERR_SNIPPET_LEN;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &s[..end])
    }
}
