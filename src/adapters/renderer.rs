//! Video rendering via the external compositor.
//!
//! The renderer is a black box: it takes a validated props bundle as JSON
//! and writes an H.264 video at the requested path. Audio lives outside the
//! renderer's asset root, so it is staged in with a guard that removes the
//! copy on every exit path.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tokio::process::Command;
use tracing::info;
use uuid::Uuid;

use crate::config::config;
use crate::genre::{Genre, Palette};

/// Props bundle handed to the compositor
#[derive(Debug, Clone, Serialize)]
pub struct RenderProps {
    pub commit_message: String,
    pub author_name: String,
    pub author_avatar_url: String,
    pub generated_text: String,
    pub genre: Genre,
    pub palette: Palette,
    pub my_face_url: String,
    pub company_logo_url: String,
    /// Path of the mixed audio track, staged before rendering
    pub audio_path: String,
}

impl RenderProps {
    /// Check the bundle against the schema the composition expects.
    /// The renderer gives unhelpful errors for missing fields, so reject
    /// bad bundles before spawning it.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("commit_message", &self.commit_message),
            ("author_name", &self.author_name),
            ("author_avatar_url", &self.author_avatar_url),
            ("generated_text", &self.generated_text),
            ("my_face_url", &self.my_face_url),
            ("company_logo_url", &self.company_logo_url),
            ("audio_path", &self.audio_path),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                anyhow::bail!("Render props missing required field '{field}'");
            }
        }

        Ok(())
    }
}

/// A file copied into the renderer's asset directory, removed on drop
struct StagedAsset {
    path: PathBuf,
}

impl StagedAsset {
    async fn stage(source: &Path, assets_dir: &Path, label: &str) -> Result<Self> {
        tokio::fs::create_dir_all(assets_dir)
            .await
            .context("Failed to create render assets dir")?;

        let ext = source
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let staged = assets_dir.join(format!("_tmp_{label}_{}{ext}", Uuid::new_v4()));

        tokio::fs::copy(source, &staged)
            .await
            .with_context(|| format!("Failed to stage {}", source.display()))?;

        Ok(Self { path: staged })
    }
}

impl Drop for StagedAsset {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), ?err, "Failed to remove staged asset");
            }
        }
    }
}

/// Render the karaoke video, returning the output path
pub async fn render_video(mut props: RenderProps, short_sha: &str) -> Result<PathBuf> {
    let cfg = config();

    tokio::fs::create_dir_all(&cfg.out_dir)
        .await
        .context("Failed to create output dir")?;
    tokio::fs::create_dir_all(&cfg.temp_dir)
        .await
        .context("Failed to create temp dir")?;

    // Stage the audio where the compositor can serve it; the guard removes
    // the copy whether the render succeeds or fails.
    let assets_dir = cfg.temp_dir.join("render-assets");
    let _staged = {
        let audio = PathBuf::from(&props.audio_path);
        let staged = StagedAsset::stage(&audio, &assets_dir, &format!("audio_{short_sha}")).await?;
        props.audio_path = staged.path.to_string_lossy().to_string();
        staged
    };

    props.validate()?;

    let props_path = cfg.temp_dir.join(format!("{short_sha}_props.json"));
    let props_json = serde_json::to_vec(&props).context("Failed to serialize render props")?;
    tokio::fs::write(&props_path, &props_json)
        .await
        .context("Failed to write render props")?;

    let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S");
    let output_path = cfg
        .out_dir
        .join(format!("video_{short_sha}_{timestamp}.mp4"));

    let props_arg = props_path.to_string_lossy().to_string();
    let output_arg = output_path.to_string_lossy().to_string();

    let result = Command::new(&cfg.renderer_bin)
        .args([
            "--props",
            props_arg.as_str(),
            "--codec",
            "h264",
            "--output",
            output_arg.as_str(),
        ])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .context("Failed to spawn renderer");

    // Props file is scratch either way.
    if let Err(err) = tokio::fs::remove_file(&props_path).await {
        tracing::debug!(?err, "Render props already gone");
    }

    let output = result?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Renderer failed: {}", stderr.trim());
    }

    info!(path = %output_path.display(), "Video rendered");
    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props() -> RenderProps {
        RenderProps {
            commit_message: "feat: x".to_string(),
            author_name: "mario".to_string(),
            author_avatar_url: "https://github.com/mario.png".to_string(),
            generated_text: "la la la".to_string(),
            genre: Genre::Pop,
            palette: Genre::Pop.palette(),
            my_face_url: "/my_face.png".to_string(),
            company_logo_url: "/company_logo.png".to_string(),
            audio_path: "/tmp/a.mp3".to_string(),
        }
    }

    #[test]
    fn test_valid_props_pass() {
        assert!(props().validate().is_ok());
    }

    #[test]
    fn test_blank_field_rejected() {
        let mut bad = props();
        bad.generated_text = "   ".to_string();

        let err = bad.validate().unwrap_err().to_string();
        assert!(err.contains("generated_text"));
    }

    #[tokio::test]
    async fn test_staged_asset_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("track.mp3");
        tokio::fs::write(&source, b"audio").await.unwrap();

        let assets = dir.path().join("assets");
        let staged_path = {
            let staged = StagedAsset::stage(&source, &assets, "audio_test")
                .await
                .unwrap();
            assert!(staged.path.exists());
            staged.path.clone()
        };

        assert!(!staged_path.exists());
    }
}
