//! History Ledger Tests
//!
//! Round-trip properties: newest-first ordering under sequential appends,
//! no lost rows, schema upgrades on old files.

use commit_karaoke::{HistoryLedger, HistoryRow};

fn row(date: &str, title: &str) -> HistoryRow {
    HistoryRow {
        date: date.to_string(),
        author: "@mario".to_string(),
        title: title.to_string(),
        release_url: format!("https://github.com/acme/widgets/releases/tag/{title}"),
        tag_name: format!("v-{title}"),
        youtube_url: Some("https://youtu.be/xyz".to_string()),
        facebook_url: None,
    }
}

#[tokio::test]
async fn test_sequential_appends_put_newest_on_top() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = HistoryLedger::new(dir.path().join("HISTORY.md"));

    ledger.append(&row("2026-08-01 10:00", "riga-a")).await.unwrap();
    ledger.append(&row("2026-08-02 10:00", "riga-b")).await.unwrap();

    let content = tokio::fs::read_to_string(ledger.path()).await.unwrap();

    // Most-recent-first: B's row sits above A's.
    let a = content.find("riga-a").unwrap();
    let b = content.find("riga-b").unwrap();
    assert!(b < a);
}

#[tokio::test]
async fn test_every_appended_row_survives_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = HistoryLedger::new(dir.path().join("HISTORY.md"));

    for i in 0..10 {
        ledger
            .append(&row("2026-08-07 12:00", &format!("riga-{i}")))
            .await
            .unwrap();
    }

    let content = tokio::fs::read_to_string(ledger.path()).await.unwrap();
    for i in 0..10 {
        assert_eq!(
            content.matches(&format!("v-riga-{i}")).count(),
            1,
            "row {i} must appear exactly once"
        );
    }

    // Data rows (not header/separator) match the appended count.
    let data_rows = content
        .lines()
        .filter(|l| l.starts_with('|') && !l.starts_with("| Data") && !l.contains("---"))
        .count();
    assert_eq!(data_rows, 10);
}

#[tokio::test]
async fn test_rows_land_directly_under_the_separator() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = HistoryLedger::new(dir.path().join("HISTORY.md"));

    ledger.append(&row("2026-08-07 12:00", "unica")).await.unwrap();

    let content = tokio::fs::read_to_string(ledger.path()).await.unwrap();
    let lines: Vec<&str> = content.lines().collect();

    let sep_idx = lines.iter().position(|l| l.starts_with("|---")).unwrap();
    assert!(lines[sep_idx + 1].contains("unica"));
}

#[tokio::test]
async fn test_four_column_file_is_upgraded_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("HISTORY.md");

    let legacy = "# Video History\n\n\
                  | Data | Autore | Titolo | Release |\n\
                  |------|--------|--------|---------|\n\
                  | 2025-12-01 09:00 | @legacy | Canzone storica | v-legacy |\n";
    tokio::fs::write(&path, legacy).await.unwrap();

    let ledger = HistoryLedger::new(path.clone());
    ledger.append(&row("2026-08-07 12:00", "moderna")).await.unwrap();

    let content = tokio::fs::read_to_string(&path).await.unwrap();
    assert!(content.contains("| Data | Autore | Titolo | Release | YouTube | Facebook |"));
    assert!(content.contains("Canzone storica"), "old rows preserved");
    assert!(content.contains("moderna"));
}

#[tokio::test]
async fn test_delimiter_is_escaped_in_untrusted_cells() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = HistoryLedger::new(dir.path().join("HISTORY.md"));

    let mut tricky = row("2026-08-07 12:00", "plain");
    tricky.title = "fix: pipe | in title".to_string();
    tricky.author = "@evil|author".to_string();
    ledger.append(&tricky).await.unwrap();

    let content = tokio::fs::read_to_string(ledger.path()).await.unwrap();
    assert!(content.contains("fix: pipe \\| in title"));
    assert!(content.contains("@evil\\|author"));
}
