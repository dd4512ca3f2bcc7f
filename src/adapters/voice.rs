//! Voice synthesis via an external speech engine.
//!
//! Spawns the synthesizer binary (piper by default), pipes the lyrics to
//! stdin and captures raw mono s16le PCM from stdout. The raw track is mixed
//! over the instrumental later; when synthesis fails the pipeline continues
//! with the instrumental alone.

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::info;

use crate::config::config;
use crate::genre::Genre;

/// Sample rate of the raw PCM the engine emits
pub const VOICE_SAMPLE_RATE: u32 = 22050;

/// Synthesize the sung lyrics, returning the path of the raw PCM track
pub async fn synthesize(lyrics: &str, genre: Genre, short_sha: &str) -> Result<PathBuf> {
    let cfg = config();

    tokio::fs::create_dir_all(&cfg.temp_dir)
        .await
        .context("Failed to create temp dir")?;

    let voice_path = cfg.temp_dir.join(format!("{short_sha}_voice.pcm"));
    let style = genre.voice_style();

    let length_scale = style.length_scale.to_string();
    let noise_scale = style.noise_scale.to_string();

    let mut child = Command::new(&cfg.piper_bin)
        .args([
            "--model",
            cfg.voice_id.as_str(),
            "--length_scale",
            length_scale.as_str(),
            "--noise_scale",
            noise_scale.as_str(),
            "--output-raw",
        ])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to spawn speech engine '{}'", cfg.piper_bin))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(lyrics.as_bytes())
            .await
            .context("Failed to write lyrics to speech engine stdin")?;
        // Drop stdin to signal EOF
    }

    let output = child
        .wait_with_output()
        .await
        .context("Failed to wait for speech engine")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Speech engine failed: {}", stderr.trim());
    }

    if output.stdout.is_empty() {
        anyhow::bail!("Speech engine produced no audio");
    }

    tokio::fs::write(&voice_path, &output.stdout)
        .await
        .with_context(|| format!("Failed to write voice track: {}", voice_path.display()))?;

    info!(
        kib = output.stdout.len() / 1024,
        ?genre,
        voice = %cfg.voice_id,
        "Generated voice track"
    );

    Ok(voice_path)
}
