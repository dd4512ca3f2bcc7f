//! YouTube upload destination.
//!
//! Credentials follow the installed-app OAuth layout: `client_secret.json`
//! plus a `token.json` holding a refresh token obtained out of band. Each
//! upload refreshes the access token, starts a resumable upload session and
//! streams the video in one shot.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;

use crate::config::config;

const CLIENT_SECRET_PATH: &str = "client_secret.json";
const TOKEN_PATH: &str = "token.json";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const UPLOAD_ENDPOINT: &str =
    "https://www.googleapis.com/upload/youtube/v3/videos?uploadType=resumable&part=snippet,status";

const MAX_TITLE_CHARS: usize = 100;
const MAX_DESCRIPTION_CHARS: usize = 5000;

#[derive(Debug, Deserialize)]
struct ClientCredentials {
    client_id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    #[serde(default)]
    installed: Option<ClientCredentials>,
    #[serde(default)]
    web: Option<ClientCredentials>,
}

#[derive(Debug, Deserialize)]
struct SavedToken {
    #[serde(default)]
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct InsertResponse {
    #[serde(default)]
    id: String,
}

async fn load_client_credentials() -> Result<ClientCredentials> {
    let raw = tokio::fs::read_to_string(CLIENT_SECRET_PATH)
        .await
        .with_context(|| format!("Failed to read {CLIENT_SECRET_PATH}"))?;

    let file: ClientSecretFile =
        serde_json::from_str(&raw).with_context(|| format!("Malformed {CLIENT_SECRET_PATH}"))?;

    file.installed.or(file.web).context(
        "client_secret.json must contain 'installed' or 'web' credentials",
    )
}

async fn refresh_access_token(client: &reqwest::Client) -> Result<String> {
    let creds = load_client_credentials().await?;

    let raw = tokio::fs::read_to_string(TOKEN_PATH)
        .await
        .with_context(|| format!("Failed to read {TOKEN_PATH}; authorize the app first"))?;
    let token: SavedToken =
        serde_json::from_str(&raw).with_context(|| format!("Malformed {TOKEN_PATH}"))?;

    if token.refresh_token.is_empty() {
        anyhow::bail!("{TOKEN_PATH} has no refresh_token; authorize the app first");
    }

    let response = client
        .post(TOKEN_ENDPOINT)
        .form(&[
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
            ("refresh_token", token.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await
        .context("Token refresh request failed")?
        .error_for_status()
        .context("Token refresh rejected")?;

    let refreshed: RefreshResponse = response
        .json()
        .await
        .context("Malformed token refresh response")?;

    Ok(refreshed.access_token)
}

fn cap_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Upload a rendered video, returning its public URL
pub async fn upload(video_path: &str, title: &str, description: &str) -> Result<String> {
    let client = reqwest::Client::new();
    let access_token = refresh_access_token(&client).await?;

    let metadata = json!({
        "snippet": {
            "title": cap_chars(title, MAX_TITLE_CHARS),
            "description": cap_chars(description, MAX_DESCRIPTION_CHARS),
            "categoryId": "22",
        },
        "status": {
            "privacyStatus": config().youtube_privacy,
        },
    });

    let session = client
        .post(UPLOAD_ENDPOINT)
        .bearer_auth(&access_token)
        .header("X-Upload-Content-Type", "video/mp4")
        .json(&metadata)
        .send()
        .await
        .context("Failed to start YouTube upload session")?
        .error_for_status()
        .context("YouTube upload session rejected")?;

    let upload_url = session
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .context("YouTube session returned no upload URL")?
        .to_string();

    let bytes = tokio::fs::read(video_path)
        .await
        .with_context(|| format!("Failed to read video: {video_path}"))?;

    let response = client
        .put(&upload_url)
        .bearer_auth(&access_token)
        .header(reqwest::header::CONTENT_TYPE, "video/mp4")
        .body(bytes)
        .send()
        .await
        .context("YouTube upload failed")?
        .error_for_status()
        .context("YouTube upload rejected")?;

    let inserted: InsertResponse = response
        .json()
        .await
        .context("Malformed YouTube insert response")?;

    if inserted.id.is_empty() {
        anyhow::bail!("YouTube upload succeeded but returned no video ID");
    }

    Ok(format!("https://youtu.be/{}", inserted.id))
}
