//! GitHub push event payload.
//!
//! These types mirror the subset of the webhook payload the pipeline reads.
//! Commits are read-only once deserialized; nothing downstream mutates them.

use serde::{Deserialize, Serialize};

/// A single commit in a push
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    /// Full commit sha
    pub id: String,

    /// Commit message, free text
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    pub author: CommitAuthor,

    /// Line-change counts; absent in some delivery shapes
    #[serde(default)]
    pub additions: Option<u64>,

    #[serde(default)]
    pub deletions: Option<u64>,
}

impl Commit {
    /// Truncated identifier used in tags, filenames and responses
    pub fn short_sha(&self) -> &str {
        let end = self.id.len().min(7);
        &self.id[..end]
    }

    /// Total changed lines, treating missing counts as zero
    pub fn changed_lines(&self) -> u64 {
        self.additions.unwrap_or(0) + self.deletions.unwrap_or(0)
    }
}

/// Commit author identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitAuthor {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub full_name: String,

    #[serde(default)]
    pub html_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sender {
    pub login: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// The push event as delivered by the webhook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushPayload {
    #[serde(rename = "ref")]
    pub git_ref: String,

    pub repository: Repository,

    pub sender: Sender,

    #[serde(default)]
    pub head_commit: Option<Commit>,

    /// Chronological commit sequence (insertion order)
    #[serde(default)]
    pub commits: Vec<Commit>,
}

impl PushPayload {
    /// Handle shown as the song's author: commit username, then sender login,
    /// then the raw author name.
    pub fn author_handle<'a>(&'a self, commit: &'a Commit) -> &'a str {
        commit
            .author
            .username
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                if self.sender.login.is_empty() {
                    &commit.author.name
                } else {
                    &self.sender.login
                }
            })
    }

    /// Avatar shown in the video for the resolved author
    pub fn avatar_url(&self, author: &str) -> String {
        self.sender
            .avatar_url
            .clone()
            .unwrap_or_else(|| format!("https://github.com/{author}.png"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(id: &str, username: Option<&str>) -> Commit {
        Commit {
            id: id.to_string(),
            message: "msg".to_string(),
            timestamp: None,
            url: None,
            author: CommitAuthor {
                name: "Mario Rossi".to_string(),
                username: username.map(String::from),
            },
            additions: None,
            deletions: None,
        }
    }

    fn payload(login: &str, avatar: Option<&str>) -> PushPayload {
        PushPayload {
            git_ref: "refs/heads/main".to_string(),
            repository: Repository {
                full_name: "acme/widgets".to_string(),
                html_url: String::new(),
            },
            sender: Sender {
                login: login.to_string(),
                avatar_url: avatar.map(String::from),
            },
            head_commit: None,
            commits: vec![],
        }
    }

    #[test]
    fn test_short_sha_truncates() {
        let c = commit("0123456789abcdef", None);
        assert_eq!(c.short_sha(), "0123456");

        let tiny = commit("abc", None);
        assert_eq!(tiny.short_sha(), "abc");
    }

    #[test]
    fn test_changed_lines_treats_missing_as_zero() {
        let mut c = commit("a", None);
        assert_eq!(c.changed_lines(), 0);

        c.additions = Some(3);
        c.deletions = Some(4);
        assert_eq!(c.changed_lines(), 7);
    }

    #[test]
    fn test_author_handle_precedence() {
        let p = payload("sender-login", None);

        let with_username = commit("a", Some("committer"));
        assert_eq!(p.author_handle(&with_username), "committer");

        let without = commit("a", None);
        assert_eq!(p.author_handle(&without), "sender-login");

        let anonymous = payload("", None);
        assert_eq!(anonymous.author_handle(&without), "Mario Rossi");
    }

    #[test]
    fn test_avatar_falls_back_to_github() {
        let p = payload("sender", None);
        assert_eq!(p.avatar_url("mario"), "https://github.com/mario.png");

        let with = payload("sender", Some("https://example.com/a.png"));
        assert_eq!(with.avatar_url("mario"), "https://example.com/a.png");
    }

    #[test]
    fn test_payload_deserializes_minimal_delivery() {
        let json = r#"{
            "ref": "refs/heads/main",
            "repository": {"full_name": "acme/widgets"},
            "sender": {"login": "mario"},
            "head_commit": null,
            "commits": []
        }"#;

        let payload: PushPayload = serde_json::from_str(json).unwrap();
        assert!(payload.head_commit.is_none());
        assert!(payload.commits.is_empty());
    }
}
