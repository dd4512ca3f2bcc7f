//! Facebook page video destination.
//!
//! Graph API three-step flow: open an upload session against the app,
//! upload the file bytes, then publish the received handle as a page video.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;

use crate::config::config;

const GRAPH_API: &str = "https://graph.facebook.com/v22.0";

const MAX_TITLE_CHARS: usize = 255;
const MAX_DESCRIPTION_CHARS: usize = 5000;

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    h: String,
}

#[derive(Debug, Deserialize)]
struct PublishResponse {
    id: String,
}

struct Credentials {
    access_token: String,
    page_id: String,
    app_id: String,
}

fn credentials() -> Result<Credentials> {
    let cfg = config();
    match (
        &cfg.facebook_page_access_token,
        &cfg.facebook_page_id,
        &cfg.facebook_app_id,
    ) {
        (Some(access_token), Some(page_id), Some(app_id)) => Ok(Credentials {
            access_token: access_token.clone(),
            page_id: page_id.clone(),
            app_id: app_id.clone(),
        }),
        _ => anyhow::bail!(
            "Facebook credentials not configured \
             (FACEBOOK_PAGE_ACCESS_TOKEN, FACEBOOK_PAGE_ID, FACEBOOK_APP_ID)"
        ),
    }
}

async fn start_upload_session(
    client: &reqwest::Client,
    creds: &Credentials,
    file_name: &str,
    file_length: u64,
) -> Result<String> {
    let response = client
        .post(format!("{GRAPH_API}/{}/uploads", creds.app_id))
        .bearer_auth(&creds.access_token)
        .json(&json!({
            "file_name": file_name,
            "file_length": file_length,
            "file_type": "video/mp4",
        }))
        .send()
        .await
        .context("FB upload session request failed")?
        .error_for_status()
        .context("FB upload session rejected")?;

    let session: SessionResponse = response
        .json()
        .await
        .context("Malformed FB session response")?;
    Ok(session.id)
}

async fn upload_file(
    client: &reqwest::Client,
    creds: &Credentials,
    session_id: &str,
    bytes: Vec<u8>,
) -> Result<String> {
    let response = client
        .post(format!("{GRAPH_API}/{session_id}"))
        .header(
            reqwest::header::AUTHORIZATION,
            format!("OAuth {}", creds.access_token),
        )
        .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
        .header("file_offset", "0")
        .body(bytes)
        .send()
        .await
        .context("FB file upload failed")?
        .error_for_status()
        .context("FB file upload rejected")?;

    let uploaded: UploadResponse = response
        .json()
        .await
        .context("Malformed FB upload response")?;
    Ok(uploaded.h)
}

async fn publish_video(
    client: &reqwest::Client,
    creds: &Credentials,
    file_handle: &str,
    title: &str,
    description: &str,
) -> Result<String> {
    let response = client
        .post(format!("{GRAPH_API}/{}/videos", creds.page_id))
        .bearer_auth(&creds.access_token)
        .json(&json!({
            "file_url": file_handle,
            "title": title,
            "description": description,
        }))
        .send()
        .await
        .context("FB video publish failed")?
        .error_for_status()
        .context("FB video publish rejected")?;

    let published: PublishResponse = response
        .json()
        .await
        .context("Malformed FB publish response")?;
    Ok(published.id)
}

fn cap_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Upload a rendered video to the configured page, returning its public URL
pub async fn upload(video_path: &str, title: &str, description: &str) -> Result<String> {
    let creds = credentials()?;
    let client = reqwest::Client::new();

    let metadata = tokio::fs::metadata(video_path)
        .await
        .with_context(|| format!("Failed to stat video: {video_path}"))?;
    let file_name = std::path::Path::new(video_path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "video.mp4".to_string());

    let session_id = start_upload_session(&client, &creds, &file_name, metadata.len()).await?;

    let bytes = tokio::fs::read(video_path)
        .await
        .with_context(|| format!("Failed to read video: {video_path}"))?;
    let file_handle = upload_file(&client, &creds, &session_id, bytes).await?;

    let video_id = publish_video(
        &client,
        &creds,
        &file_handle,
        &cap_chars(title, MAX_TITLE_CHARS),
        &cap_chars(description, MAX_DESCRIPTION_CHARS),
    )
    .await?;

    Ok(format!(
        "https://facebook.com/{}/videos/{}",
        creds.page_id, video_id
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cap_chars_boundaries() {
        assert_eq!(cap_chars(&"x".repeat(300), MAX_TITLE_CHARS).len(), 255);
        assert_eq!(cap_chars("breve", MAX_TITLE_CHARS), "breve");
    }
}
