//! Push event filtering.
//!
//! Decides which commit, if any, a push should trigger a run for. Pure
//! functions over the payload; no side effects.

use crate::domain::{Commit, PushPayload};

const SKIP_MARKER: &str = "[skip ci]";

/// What to do with an authenticated push event
#[derive(Debug, Clone)]
pub enum FilterDecision {
    /// Run the pipeline for this commit
    Process(Commit),

    /// Nothing to work on
    NoCommit,

    /// The triggering commit opted out
    SkipRequested,
}

/// Resolve the triggering commit: the explicit head commit when present,
/// otherwise the most recent entry of the commit sequence.
pub fn resolve_commit(payload: &PushPayload) -> Option<Commit> {
    if let Some(head) = &payload.head_commit {
        return Some(head.clone());
    }
    payload.commits.last().cloned()
}

/// Whether a commit message carries the skip marker (case-insensitive)
pub fn has_skip_marker(message: &str) -> bool {
    message.to_lowercase().contains(SKIP_MARKER)
}

/// Decide whether a push produces work
pub fn decide(payload: &PushPayload) -> FilterDecision {
    let commit = match resolve_commit(payload) {
        Some(commit) => commit,
        None => return FilterDecision::NoCommit,
    };

    if has_skip_marker(&commit.message) {
        return FilterDecision::SkipRequested;
    }

    FilterDecision::Process(commit)
}
