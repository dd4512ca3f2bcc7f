//! Per-run data owned by a single pipeline task.

use serde::{Deserialize, Serialize};

use crate::domain::Commit;
use crate::genre::Genre;

/// The resolved unit one pipeline run processes: a single commit, or a batch
/// of commits folded into one synthesized message keyed on the first commit.
#[derive(Debug, Clone)]
pub struct WorkUnit {
    /// Representative commit (identity, sha, tag derivation)
    pub commit: Commit,

    /// Effective message: the commit's own, or the synthesized combination
    pub message: String,

    /// Resolved author handle
    pub author: String,

    /// Avatar shown in the video
    pub avatar_url: String,

    /// How many commits were folded in (1 = no batching)
    pub batched: usize,
}

/// Output of the lyrics stage; immutable once produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lyrics {
    pub genre: Genre,
    pub title: String,
    pub text: String,
}

/// What a completed run produced, for logging and the caller of `run`
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    pub release_url: String,
    pub tag_name: String,
    pub youtube_url: Option<String>,
    pub facebook_url: Option<String>,
    pub video_path: String,
}

/// One row of the history ledger
#[derive(Debug, Clone)]
pub struct HistoryRow {
    /// `YYYY-MM-DD HH:MM`
    pub date: String,
    pub author: String,
    pub title: String,
    pub release_url: String,
    pub tag_name: String,
    pub youtube_url: Option<String>,
    pub facebook_url: Option<String>,
}
