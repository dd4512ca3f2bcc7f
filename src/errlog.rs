//! Durable error log.
//!
//! One line per pipeline failure, append-only, so failed runs stay
//! diagnosable after the process exits. The webhook response never reflects
//! pipeline errors; this file and tracing are the only places they surface.

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::config::config;

const LOG_FILE: &str = "errors.log";

/// Context for a logged failure
pub struct ErrorContext<'a> {
    /// Which component failed (e.g. "pipeline", "GitHub Release")
    pub caller: &'a str,
    pub commit_sha: &'a str,
    pub commit_message: &'a str,
}

fn one_line(text: &str) -> String {
    text.replace('\n', " ")
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Append a failure line: timestamp, caller, short sha, truncated message,
/// error text. Never fails the caller beyond returning the io error.
pub async fn log_error(ctx: ErrorContext<'_>, error: &anyhow::Error) -> Result<()> {
    let short_sha = truncate(ctx.commit_sha, 7);
    let message = one_line(truncate(ctx.commit_message, 80));
    let error_text = one_line(&format!("{error:#}"));

    let line = format!(
        "{} | {} | {} | {} | {}\n",
        Utc::now().to_rfc3339(),
        ctx.caller,
        short_sha,
        message,
        error_text,
    );

    let dir = &config().logs_dir;
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create logs dir: {}", dir.display()))?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE))
        .await
        .context("Failed to open error log")?;

    file.write_all(line.as_bytes())
        .await
        .context("Failed to append to error log")?;

    Ok(())
}

/// Log a failure and swallow any logging error; failures here must never
/// escalate into the pipeline.
pub async fn log_error_best_effort(ctx: ErrorContext<'_>, error: &anyhow::Error) {
    if let Err(log_err) = log_error(ctx, error).await {
        tracing::warn!(%log_err, "Failed to write durable error log");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("ab", 3), "ab");
        // Multi-byte characters must not be split
        assert_eq!(truncate("perché", 5), "perch");
    }

    #[test]
    fn test_one_line_flattens_newlines() {
        assert_eq!(one_line("a\nb\nc"), "a b c");
    }
}
