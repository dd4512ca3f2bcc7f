//! Instrumental generation.
//!
//! Model artifacts are fetched into the on-disk cache and validated on load;
//! the actual inference runs as an external process pointed at the cached
//! model. Loading goes through the `ResourceLoader` so concurrent runs share
//! one download and a corrupt cache gets purged and refetched.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use tracing::info;

use crate::adapters::ffmpeg;
use crate::config::config;
use crate::core::loader::{run_generation, ModelSource};
use crate::genre::Genre;

const MODEL_ID: &str = "Xenova/musicgen-small";
const MODEL_BASE_URL: &str = "https://huggingface.co";
const MODEL_FILES: [&str; 3] = ["tokenizer.json", "config.json", "model.onnx"];
const DEFAULT_SAMPLE_RATE: u32 = 32000;
const GUIDANCE_SCALE: &str = "3";

/// Validated handles to the cached model artifacts
#[derive(Debug)]
pub struct ModelHandles {
    pub tokenizer_path: PathBuf,
    pub weights_path: PathBuf,
    pub sampling_rate: u32,
}

/// Fetches and validates the model artifacts
pub struct MusicGenSource {
    client: reqwest::Client,
}

impl Default for MusicGenSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MusicGenSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    fn cache_dir() -> PathBuf {
        config().model_cache_dir.join(MODEL_ID)
    }

    async fn fetch_missing(&self, dir: &Path, file: &str) -> Result<PathBuf> {
        let target = dir.join(file);
        if target.exists() {
            return Ok(target);
        }

        let url = format!("{MODEL_BASE_URL}/{MODEL_ID}/resolve/main/{file}");
        info!(%url, "Downloading model artifact");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to download {file}"))?
            .error_for_status()
            .with_context(|| format!("Download of {file} rejected"))?;

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {file}"))?;

        tokio::fs::write(&target, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", target.display()))?;

        info!(file, kib = bytes.len() / 1024, "Model artifact cached");
        Ok(target)
    }
}

#[async_trait]
impl ModelSource for MusicGenSource {
    type Handles = ModelHandles;

    /// Fetch whatever is missing from the cache and validate what is there.
    /// A truncated or corrupt artifact fails validation here, which is what
    /// triggers the loader's purge-and-retry.
    async fn load(&self) -> Result<ModelHandles> {
        let dir = Self::cache_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create model cache: {}", dir.display()))?;

        let mut paths = Vec::with_capacity(MODEL_FILES.len());
        for file in MODEL_FILES {
            paths.push(self.fetch_missing(&dir, file).await?);
        }

        let tokenizer_path = paths[0].clone();
        let tokenizer_json = tokio::fs::read_to_string(&tokenizer_path)
            .await
            .context("Failed to read tokenizer")?;
        serde_json::from_str::<Value>(&tokenizer_json).context("Tokenizer is not valid JSON")?;

        let model_config = tokio::fs::read_to_string(&paths[1])
            .await
            .context("Failed to read model config")?;
        let model_config: Value =
            serde_json::from_str(&model_config).context("Model config is not valid JSON")?;

        let sampling_rate = model_config
            .pointer("/audio_encoder/sampling_rate")
            .and_then(Value::as_u64)
            .map(|rate| rate as u32)
            .unwrap_or(DEFAULT_SAMPLE_RATE);

        let weights_path = paths[2].clone();
        let weights_len = tokio::fs::metadata(&weights_path)
            .await
            .context("Failed to stat model weights")?
            .len();
        if weights_len == 0 {
            anyhow::bail!("Model weights are empty: {}", weights_path.display());
        }

        Ok(ModelHandles {
            tokenizer_path,
            weights_path,
            sampling_rate,
        })
    }

    /// Remove the cache directory for this model; missing is fine
    async fn purge_cache(&self) -> Result<()> {
        let dir = Self::cache_dir();
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                info!(dir = %dir.display(), "Purged model cache");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("Failed to purge cache: {}", dir.display()))
            }
        }
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

async fn run_inference(
    model_dir: PathBuf,
    prompt: String,
    max_new_tokens: u32,
    raw_out: PathBuf,
) -> Result<()> {
    let model_dir = model_dir.to_string_lossy().to_string();
    let raw_out = raw_out.to_string_lossy().to_string();
    let max_new_tokens = max_new_tokens.to_string();

    let output = Command::new(&config().musicgen_bin)
        .args([
            "--model-dir",
            model_dir.as_str(),
            "--prompt",
            prompt.as_str(),
            "--max-new-tokens",
            max_new_tokens.as_str(),
            "--guidance-scale",
            GUIDANCE_SCALE,
            "--output",
            raw_out.as_str(),
        ])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .context("Failed to spawn instrumental generator")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Instrumental generation failed: {}", stderr.trim());
    }

    Ok(())
}

/// Generate the instrumental track for a work unit, returning the mp3 path.
///
/// The inference call is raced against the generation deadline; on timeout
/// the external process is abandoned and the stage fails with a timeout
/// error.
pub async fn generate_instrumental(
    handles: Arc<ModelHandles>,
    genre: Genre,
    commit_message: &str,
    short_sha: &str,
) -> Result<PathBuf> {
    let cfg = config();
    tokio::fs::create_dir_all(&cfg.temp_dir)
        .await
        .context("Failed to create temp dir")?;

    let raw_path = cfg.temp_dir.join(format!("{short_sha}_instrumental.raw"));
    let mp3_path = cfg.temp_dir.join(format!("{short_sha}_instrumental.mp3"));

    let prompt = format!(
        "{}, inspired by: {}",
        genre.music_prompt(),
        truncate_chars(commit_message, 60)
    );

    let model_dir = MusicGenSource::cache_dir();
    run_generation(run_inference(
        model_dir,
        prompt,
        genre.max_new_tokens(),
        raw_path.clone(),
    ))
    .await?;

    ffmpeg::raw_f32_to_mp3(&raw_path, handles.sampling_rate, &mp3_path).await?;

    if let Err(err) = tokio::fs::remove_file(&raw_path).await {
        tracing::debug!(?err, "Raw instrumental already gone");
    }

    info!(path = %mp3_path.display(), "Instrumental generated");
    Ok(mp3_path)
}
