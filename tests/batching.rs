//! Commit Batching Tests
//!
//! The combine heuristic over whole pushes, through the public API.

use commit_karaoke::core::{combine_messages, resolve_work_unit, should_combine};
use commit_karaoke::domain::{Commit, CommitAuthor, PushPayload, Repository, Sender};

fn commit(id: &str, message: &str, additions: u64, deletions: u64) -> Commit {
    Commit {
        id: id.to_string(),
        message: message.to_string(),
        timestamp: None,
        url: None,
        author: CommitAuthor {
            name: "Mario Rossi".to_string(),
            username: Some("mario".to_string()),
        },
        additions: Some(additions),
        deletions: Some(deletions),
    }
}

fn push(commits: Vec<Commit>) -> PushPayload {
    PushPayload {
        git_ref: "refs/heads/main".to_string(),
        repository: Repository {
            full_name: "acme/widgets".to_string(),
            html_url: String::new(),
        },
        sender: Sender {
            login: "mario".to_string(),
            avatar_url: None,
        },
        head_commit: None,
        commits,
    }
}

#[test]
fn test_six_commits_with_zero_changes_combine() {
    let commits: Vec<_> = (0..6)
        .map(|i| commit(&format!("c{i}"), "wip", 0, 0))
        .collect();
    assert!(should_combine(&commits));
}

#[test]
fn test_one_commit_never_combines() {
    assert!(!should_combine(&[commit("a", "feat: everything", 1000, 0)]));
}

#[test]
fn test_three_commits_of_ten_lines_combine() {
    let commits = vec![
        commit("a", "fix: tokenizer edge case in parser", 10, 0),
        commit("b", "fix: handle empty input gracefully", 5, 5),
        commit("c", "docs: document the new behavior", 0, 10),
    ];
    // 30 total changed lines < 50 with more than 2 commits.
    assert!(should_combine(&commits));
}

#[test]
fn test_seven_trivial_commits_become_one_unit_keyed_on_first() {
    let commits: Vec<_> = (0..7)
        .map(|i| commit(&format!("sha-{i}"), &format!("fix {i}"), 1, 0))
        .collect();
    let payload = push(commits);
    let triggering = payload.commits.last().unwrap().clone();

    let unit = resolve_work_unit(&payload, triggering);

    assert_eq!(unit.commit.id, "sha-0");
    assert_eq!(unit.batched, 7);
    for i in 0..7 {
        assert!(
            unit.message.contains(&format!("fix {i}")),
            "message must enumerate commit {i}"
        );
    }
}

#[test]
fn test_combined_message_counts_changed_lines() {
    let commits = vec![
        commit("a", "fix uno", 2, 1),
        commit("b", "fix due", 0, 4),
        commit("c", "fix tre", 0, 0),
    ];

    let message = combine_messages(&commits);
    assert!(message.contains("1. fix uno (3 righe modificate)"));
    assert!(message.contains("2. fix due (4 righe modificate)"));
    assert!(message.contains("3. fix tre (0 righe modificate)"));
}

#[test]
fn test_substantial_pair_is_processed_singly() {
    let commits = vec![
        commit("a", "feat: rework the scheduler with a cost-based planner", 300, 120),
        commit("b", "feat: persistent cache layer with invalidation hooks", 250, 80),
    ];
    let payload = push(commits);
    let triggering = payload.commits.last().unwrap().clone();

    let unit = resolve_work_unit(&payload, triggering);
    assert_eq!(unit.batched, 1);
    assert_eq!(unit.commit.id, "b");
    assert_eq!(unit.message, "feat: persistent cache layer with invalidation hooks");
}
