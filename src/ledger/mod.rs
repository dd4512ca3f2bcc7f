//! History ledger.
//!
//! Append-only record of completed runs, kept as a markdown table with the
//! newest row first. Appends are read-modify-write cycles over the whole
//! file, serialized by a process-local mutex; the deployment assumes this
//! process is the only writer. After a successful append the file is
//! committed and pushed, best-effort.

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::config;
use crate::domain::HistoryRow;

const HEADER_TITLE: &str = "# Video History";
const HEADER_ROW: &str = "| Data | Autore | Titolo | Release | YouTube | Facebook |";
const SEPARATOR_ROW: &str = "|------|--------|--------|---------|---------|----------|";

fn header_template() -> String {
    [HEADER_TITLE, "", HEADER_ROW, SEPARATOR_ROW].join("\n")
}

fn sanitize_cell(value: &str) -> String {
    value.replace('|', "\\|").trim().to_string()
}

fn link_or_dash(url: Option<&str>, label: &str) -> String {
    match url {
        Some(url) if !url.is_empty() => format!("[{label}]({url})"),
        _ => "-".to_string(),
    }
}

/// The durable run history
pub struct HistoryLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl Default for HistoryLedger {
    fn default() -> Self {
        Self::new(config().history_path.clone())
    }
}

impl HistoryLedger {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Insert a row at the top of the table.
    ///
    /// A missing file starts from the header template; a file written before
    /// the YouTube/Facebook columns existed gets its header and separator
    /// rewritten to the current schema first. Existing rows are never
    /// touched.
    pub async fn append(&self, row: &HistoryRow) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => header_template(),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to read ledger: {}", self.path.display()))
            }
        };

        let mut lines: Vec<String> = content.split('\n').map(str::to_string).collect();

        // Pre-extension files have a four-column header.
        if let Some(header_idx) = lines.iter().position(|l| l.starts_with("| Data")) {
            if !lines[header_idx].contains("YouTube") {
                lines[header_idx] = HEADER_ROW.to_string();
                let sep_idx = header_idx + 1;
                if sep_idx < lines.len() && lines[sep_idx].starts_with("|---") {
                    lines[sep_idx] = SEPARATOR_ROW.to_string();
                }
            }
        }

        let data_start = lines
            .iter()
            .position(|line| line.starts_with('|') && !line.contains("---"))
            .map(|header_idx| header_idx + 2)
            .unwrap_or(lines.len());

        let release_cell = if row.release_url.is_empty() {
            row.tag_name.clone()
        } else {
            format!("[{}]({})", row.tag_name, row.release_url)
        };

        let rendered = format!(
            "| {} | {} | {} | {} | {} | {} |",
            sanitize_cell(&row.date),
            sanitize_cell(&row.author),
            sanitize_cell(&row.title),
            sanitize_cell(&release_cell),
            sanitize_cell(&link_or_dash(row.youtube_url.as_deref(), "YouTube")),
            sanitize_cell(&link_or_dash(row.facebook_url.as_deref(), "Facebook")),
        );

        let data_start = data_start.min(lines.len());
        lines.insert(data_start, rendered);

        let mut final_content = lines.join("\n");
        if !final_content.ends_with('\n') {
            final_content.push('\n');
        }

        tokio::fs::write(&self.path, final_content)
            .await
            .with_context(|| format!("Failed to write ledger: {}", self.path.display()))?;

        info!(title = %row.title, "History row appended");
        Ok(())
    }

    /// Commit and push the ledger file. Best-effort: the caller logs a
    /// failure but an already-appended row stands.
    pub async fn publish(&self) -> Result<()> {
        run_git(&["add", &self.path.to_string_lossy()]).await?;
        run_git(&["commit", "-m", "docs: update HISTORY.md [skip ci]"]).await?;
        run_git(&["push"]).await?;
        Ok(())
    }
}

async fn run_git(args: &[&str]) -> Result<()> {
    let output = Command::new("git")
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .context("Failed to spawn git")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("git {} failed: {}", args.join(" "), stderr.trim());
    }

    Ok(())
}
