//! Audio post-processing via the ffmpeg binary.
//!
//! Each operation is a fixed argument list; ffmpeg reads and writes files at
//! the given paths and is otherwise a black box.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;

use crate::adapters::voice::VOICE_SAMPLE_RATE;
use crate::config::config;

/// Final song length in seconds; everything past this is cut
const OUTPUT_DURATION_SECS: u32 = 10;

/// Instrumental is ducked under the voice at this volume
const INSTRUMENTAL_VOLUME: &str = "0.3";
const VOICE_VOLUME: &str = "1.0";

async fn run_ffmpeg(args: &[&str]) -> Result<()> {
    let output = Command::new(&config().ffmpeg_bin)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .context("Failed to spawn ffmpeg")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let exit_code = output.status.code().unwrap_or(-1);
        anyhow::bail!(
            "ffmpeg failed with exit code {}: {}",
            exit_code,
            stderr.trim()
        );
    }

    Ok(())
}

/// Convert raw mono float32 samples to an mp3
pub async fn raw_f32_to_mp3(input: &Path, sample_rate: u32, output: &Path) -> Result<()> {
    let rate = sample_rate.to_string();
    run_ffmpeg(&[
        "-y",
        "-f",
        "f32le",
        "-ar",
        &rate,
        "-ac",
        "1",
        "-i",
        &input.to_string_lossy(),
        "-q:a",
        "4",
        "-acodec",
        "libmp3lame",
        &output.to_string_lossy(),
    ])
    .await
}

/// Mix the instrumental mp3 with the raw voice track: instrumental ducked,
/// voice at full level, result capped at the output duration.
pub async fn mix_tracks(instrumental: &Path, voice: &Path, output: &Path) -> Result<()> {
    let voice_rate = VOICE_SAMPLE_RATE.to_string();
    let filter = format!(
        "[0:a]volume={INSTRUMENTAL_VOLUME}[m];\
         [1:a]volume={VOICE_VOLUME},aformat=sample_rates=44100[v];\
         [m][v]amix=inputs=2:duration=first"
    );
    let duration = OUTPUT_DURATION_SECS.to_string();

    run_ffmpeg(&[
        "-y",
        "-i",
        &instrumental.to_string_lossy(),
        "-f",
        "s16le",
        "-ar",
        &voice_rate,
        "-ac",
        "1",
        "-i",
        &voice.to_string_lossy(),
        "-filter_complex",
        &filter,
        "-t",
        &duration,
        "-acodec",
        "libmp3lame",
        "-q:a",
        "4",
        &output.to_string_lossy(),
    ])
    .await
}
