//! GitHub release publishing via the `gh` CLI.
//!
//! A release is created under `v-<short_sha>`; when that tag already exists
//! (a force-push replaying a sha, or an earlier partial run) one retry runs
//! under a uniquified tag. After the destination uploads settle, the same
//! call runs again in update mode to put the links into the notes.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use rand::Rng;
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::config;

/// Everything the release notes are built from
#[derive(Debug, Clone)]
pub struct ReleaseParams {
    pub commit_sha: String,
    pub commit_message: String,
    pub generated_title: String,
    pub generated_text: String,
    pub author_name: String,
    pub author_avatar_url: String,
    pub repo_full_name: String,
    pub video_path: String,
    pub youtube_url: Option<String>,
    pub facebook_url: Option<String>,
}

/// A created (or updated) release
#[derive(Debug, Clone)]
pub struct CreatedRelease {
    pub tag_name: String,
    pub release_url: String,
}

fn social_line(label: &str, url: Option<&str>) -> String {
    match url {
        Some(url) => format!("- {label}: [{url}]({url})"),
        None => format!("- {label}: coming soon"),
    }
}

fn build_notes(params: &ReleaseParams) -> String {
    [
        "## Idiotsyncratic Song".to_string(),
        String::new(),
        params.generated_text.clone(),
        String::new(),
        "## Commit originale".to_string(),
        String::new(),
        format!("- SHA: `{}`", params.commit_sha),
        format!("- Messaggio: {}", params.commit_message),
        String::new(),
        "## Social".to_string(),
        String::new(),
        social_line("YouTube", params.youtube_url.as_deref()),
        social_line("Facebook", params.facebook_url.as_deref()),
        String::new(),
        "## Crediti".to_string(),
        String::new(),
        format!("- Autore: @{}", params.author_name),
        format!("- Avatar: {}", params.author_avatar_url),
    ]
    .join("\n")
}

/// Pull the release URL out of gh's output
fn extract_release_url(output: &str) -> Option<String> {
    output
        .split_whitespace()
        .find(|word| word.starts_with("https://github.com/") && word.contains("/releases/tag/"))
        .map(str::to_string)
}

async fn run_gh_create(
    tag_name: &str,
    title: &str,
    notes: &str,
    video_path: &Path,
    repo_full_name: &str,
) -> Result<CreatedRelease> {
    let video_arg = video_path.to_string_lossy().to_string();

    let output = Command::new(&config().gh_bin)
        .args([
            "release",
            "create",
            tag_name,
            video_arg.as_str(),
            "--title",
            title,
            "--notes",
            notes,
            "--repo",
            repo_full_name,
        ])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .context("Failed to spawn gh")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!(
            "gh release create '{}' failed: {}",
            tag_name,
            stderr.trim()
        );
    }

    let combined = format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    Ok(CreatedRelease {
        tag_name: tag_name.to_string(),
        release_url: extract_release_url(&combined).unwrap_or_default(),
    })
}

fn short_sha(sha: &str) -> &str {
    &sha[..sha.len().min(7)]
}

/// Create the release, retrying once under a uniquified tag on collision
pub async fn create_release(params: &ReleaseParams) -> Result<CreatedRelease> {
    let short = short_sha(&params.commit_sha);
    let title = if params.generated_title.trim().is_empty() {
        params.commit_message.trim()
    } else {
        params.generated_title.trim()
    };
    let notes = build_notes(params);
    let video_path = Path::new(&params.video_path);

    let primary_tag = format!("v-{short}");
    match run_gh_create(&primary_tag, title, &notes, video_path, &params.repo_full_name).await {
        Ok(release) => {
            info!(tag = %release.tag_name, "Release created");
            Ok(release)
        }
        Err(primary_err) => {
            let suffix: u32 = rand::thread_rng().gen_range(0..0xff_ffff);
            let fallback_tag = format!("v-{short}-{suffix:06x}");
            warn!(
                error = format!("{primary_err:#}"),
                fallback = %fallback_tag,
                "Primary tag failed, retrying under fallback"
            );

            run_gh_create(
                &fallback_tag,
                title,
                &notes,
                video_path,
                &params.repo_full_name,
            )
            .await
        }
    }
}

/// Rewrite an existing release's notes, attaching destination links that
/// settled after creation
pub async fn update_release_notes(tag_name: &str, params: &ReleaseParams) -> Result<()> {
    let notes = build_notes(params);

    let output = Command::new(&config().gh_bin)
        .args([
            "release",
            "edit",
            tag_name,
            "--notes",
            notes.as_str(),
            "--repo",
            params.repo_full_name.as_str(),
        ])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .context("Failed to spawn gh")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("gh release edit '{}' failed: {}", tag_name, stderr.trim());
    }

    info!(tag = tag_name, "Release notes updated with social links");
    Ok(())
}
