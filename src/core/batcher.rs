//! Commit batching.
//!
//! A push with several small commits makes one song instead of many. The
//! heuristic weighs message length and changed lines; when commits are
//! combined, the first commit of the push keeps the identity (sha, tag) and
//! the message becomes a synthesized enumeration of everything in the batch.

use crate::domain::{Commit, PushPayload, WorkUnit};

const COMBINED_LEAD_IN: &str = "Oggi abbiamo lavorato su: ";
const COMBINED_SEPARATOR: &str = " | ";

/// Weighted complexity of one commit
fn commit_complexity(commit: &Commit) -> f64 {
    commit.message.len() as f64 * 0.1 + commit.changed_lines() as f64 * 0.01
}

/// Whether the commits of one push should be folded into a single work unit
pub fn should_combine(commits: &[Commit]) -> bool {
    if commits.len() <= 1 {
        return false;
    }

    let avg_complexity =
        commits.iter().map(commit_complexity).sum::<f64>() / commits.len() as f64;
    let total_changes: u64 = commits.iter().map(Commit::changed_lines).sum();

    (total_changes < 50 && commits.len() > 2)
        || (avg_complexity < 10.0 && commits.len() > 3)
        || commits.len() > 5
}

/// Fold all commit messages into one description, enumerating each message
/// with its changed-line count
pub fn combine_messages(commits: &[Commit]) -> String {
    let combined = commits
        .iter()
        .enumerate()
        .map(|(index, commit)| {
            format!(
                "{}. {} ({} righe modificate)",
                index + 1,
                commit.message,
                commit.changed_lines()
            )
        })
        .collect::<Vec<_>>()
        .join(COMBINED_SEPARATOR);

    format!("{COMBINED_LEAD_IN}{combined}")
}

/// Resolve the unit of work for a push: either the triggering commit alone,
/// or the whole push folded into one batch keyed on its first commit.
pub fn resolve_work_unit(payload: &PushPayload, triggering: Commit) -> WorkUnit {
    let commits = if payload.commits.is_empty() {
        std::slice::from_ref(&triggering)
    } else {
        payload.commits.as_slice()
    };

    if should_combine(commits) {
        tracing::info!(count = commits.len(), "Combining commits into one video");

        let representative = commits[0].clone();
        let author = payload.author_handle(&representative).to_string();
        let avatar_url = payload.avatar_url(&author);

        WorkUnit {
            message: combine_messages(commits),
            author,
            avatar_url,
            batched: commits.len(),
            commit: representative,
        }
    } else {
        let author = payload.author_handle(&triggering).to_string();
        let avatar_url = payload.avatar_url(&author);

        WorkUnit {
            message: triggering.message.trim().to_string(),
            author,
            avatar_url,
            batched: 1,
            commit: triggering,
        }
    }
}
