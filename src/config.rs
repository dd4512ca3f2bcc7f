//! Service configuration.
//!
//! Everything is driven by environment variables, read once at first use and
//! cached for the lifetime of the process. Paths are relative to the working
//! directory the service is launched from.

use std::path::PathBuf;
use std::sync::OnceLock;

/// Global cached configuration
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret for webhook signature verification
    pub webhook_secret: String,

    /// Repository releases are created against (owner/name)
    pub github_repo: String,

    /// Base URL of the local LLM used for lyrics and CTA text
    pub ollama_host: String,

    /// Face overlay shown in the rendered video
    pub my_face_url: String,

    /// Company logo shown in the rendered video
    pub company_logo_url: String,

    /// Whether the YouTube upload stage runs
    pub youtube_enabled: bool,

    /// Privacy status for uploaded YouTube videos
    pub youtube_privacy: String,

    /// Whether the Facebook upload stage runs
    pub facebook_enabled: bool,

    pub facebook_page_access_token: Option<String>,
    pub facebook_page_id: Option<String>,
    pub facebook_app_id: Option<String>,

    /// Speech synthesis voice id
    pub voice_id: String,

    /// External binaries (overridable for deployment layouts)
    pub ffmpeg_bin: String,
    pub piper_bin: String,
    pub musicgen_bin: String,
    pub renderer_bin: String,
    pub gh_bin: String,

    /// Rendered videos land here
    pub out_dir: PathBuf,

    /// Scratch files for in-flight runs
    pub temp_dir: PathBuf,

    /// Durable error log directory
    pub logs_dir: PathBuf,

    /// On-disk cache for downloaded model artifacts
    pub model_cache_dir: PathBuf,

    /// History ledger file
    pub history_path: PathBuf,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_bool(key: &str) -> bool {
    matches!(std::env::var(key).as_deref(), Ok("true") | Ok("1"))
}

impl Config {
    /// Build a configuration from the current environment
    pub fn from_env() -> Self {
        Self {
            webhook_secret: env_or("GITHUB_WEBHOOK_SECRET", "dev-secret"),
            github_repo: env_or("GITHUB_REPO", "owner/repo-name"),
            ollama_host: env_or("OLLAMA_HOST", "http://localhost:11434"),
            my_face_url: env_or("MY_FACE_URL", "/my_face.png"),
            company_logo_url: env_or("COMPANY_LOGO_URL", "/company_logo.png"),
            youtube_enabled: env_bool("YOUTUBE_ENABLED"),
            youtube_privacy: env_or("YOUTUBE_PRIVACY", "unlisted"),
            facebook_enabled: env_bool("FACEBOOK_ENABLED"),
            facebook_page_access_token: env_opt("FACEBOOK_PAGE_ACCESS_TOKEN"),
            facebook_page_id: env_opt("FACEBOOK_PAGE_ID"),
            facebook_app_id: env_opt("FACEBOOK_APP_ID"),
            voice_id: env_or("VOICE_ID", "it_IT-paola-medium"),
            ffmpeg_bin: env_or("FFMPEG_PATH", "ffmpeg"),
            piper_bin: env_or("PIPER_PATH", "piper"),
            musicgen_bin: env_or("MUSICGEN_PATH", "musicgen-infer"),
            renderer_bin: env_or("RENDERER_PATH", "karaoke-render"),
            gh_bin: env_or("GH_PATH", "gh"),
            out_dir: PathBuf::from(env_or("OUT_DIR", "out")),
            temp_dir: PathBuf::from(env_or("TEMP_DIR", "temp")),
            logs_dir: PathBuf::from(env_or("LOGS_DIR", "logs")),
            model_cache_dir: PathBuf::from(env_or("MODEL_CACHE_DIR", ".cache/models")),
            history_path: PathBuf::from(env_or("HISTORY_PATH", "HISTORY.md")),
        }
    }
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        let config = Config::from_env();

        assert_eq!(config.github_repo, "owner/repo-name");
        assert_eq!(config.voice_id, "it_IT-paola-medium");
        assert_eq!(config.history_path, PathBuf::from("HISTORY.md"));
    }

    #[test]
    fn test_bool_parsing() {
        std::env::set_var("KARAOKE_TEST_FLAG", "1");
        assert!(env_bool("KARAOKE_TEST_FLAG"));

        std::env::set_var("KARAOKE_TEST_FLAG", "false");
        assert!(!env_bool("KARAOKE_TEST_FLAG"));

        std::env::remove_var("KARAOKE_TEST_FLAG");
        assert!(!env_bool("KARAOKE_TEST_FLAG"));
    }
}
