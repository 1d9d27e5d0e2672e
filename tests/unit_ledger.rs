// Ledger behaviour through the public API: backfill cost is paid once,
// malformed fields degrade per row, and reports read what the ledger loads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use toxgate::classifier::traits::ToxicityClassifier;
use toxgate::ledger::{Author, CommentLedger, CsvLedger, NewComment};
use toxgate::report;

struct CountingClassifier {
    calls: AtomicUsize,
}

impl CountingClassifier {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ToxicityClassifier for CountingClassifier {
    fn is_toxic(&self, text: &str) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(text.contains("idiot") || text.contains("moron"))
    }
}

struct BrokenClassifier;

impl ToxicityClassifier for BrokenClassifier {
    fn is_toxic(&self, _text: &str) -> Result<bool> {
        anyhow::bail!("model unavailable")
    }
}

const UNLABELLED: &str = "comment,username,timestamp,profile_color,avatar,is_toxic\n\
    what a moron,Coding Champion,2024-04-01 08:00:00,\"rgb(150,120,110)\",,\n\
    lovely photo,Coding Champion,2024-04-01 08:05:00,\"rgb(150,120,110)\",,\n\
    you idiot,Digital Explorer,not-a-time,\"rgb(101,199,150)\",,\n";

#[tokio::test]
async fn backfill_happens_once() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("comments.csv");
    std::fs::write(&path, UNLABELLED).unwrap();
    let ledger = CsvLedger::new(&path);

    let first = CountingClassifier::new();
    let rows = ledger.load_all(&first).await.unwrap();
    assert_eq!(first.calls(), 3);
    assert_eq!(
        rows.iter().map(|c| c.is_toxic).collect::<Vec<_>>(),
        vec![true, false, true]
    );

    let second = CountingClassifier::new();
    let again = ledger.load_all(&second).await.unwrap();
    assert_eq!(second.calls(), 0);
    assert_eq!(rows, again);
}

#[tokio::test]
async fn bad_timestamp_degrades_only_that_field() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("comments.csv");
    std::fs::write(&path, UNLABELLED).unwrap();

    let rows = CsvLedger::new(&path)
        .load_all(&CountingClassifier::new())
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows[0].submitted_at.is_some());
    assert!(rows[2].submitted_at.is_none());
    assert_eq!(rows[2].author.display_name, "Digital Explorer");
}

#[tokio::test]
async fn failed_backfill_leaves_file_untouched() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("comments.csv");
    std::fs::write(&path, UNLABELLED).unwrap();

    assert!(CsvLedger::new(&path).load_all(&BrokenClassifier).await.is_err());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), UNLABELLED);
}

#[tokio::test]
async fn labelled_ledger_loads_without_a_model() {
    let tmp = tempfile::tempdir().unwrap();
    let ledger = Arc::new(CsvLedger::new(tmp.path().join("comments.csv")));
    for (text, is_toxic) in [("hello", false), ("you idiot", true)] {
        ledger
            .append(NewComment {
                text: text.to_string(),
                author: Author {
                    display_name: "Tech Enthusiast".to_string(),
                    color: "rgb(100,150,200)".to_string(),
                    avatar: String::new(),
                },
                is_toxic,
            })
            .await
            .unwrap();
    }

    let rows = ledger.load_all(&BrokenClassifier).await.unwrap();
    let summary = report::summarize(&rows);
    assert_eq!(summary.total, 2);
    assert_eq!(summary.toxic, 1);
    assert_eq!(report::user_activity(&rows)[0].total, 2);
    assert_eq!(report::recent(&rows, 100).len(), 2);
}

#[tokio::test]
async fn append_after_unterminated_last_row_keeps_both() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("comments.csv");
    std::fs::write(
        &path,
        "comment,username,timestamp,profile_color,avatar,is_toxic\n\
         hello,Code Ninja,2024-01-01 00:00:00,\"rgb(1,2,3)\",,False",
    )
    .unwrap();

    let ledger = CsvLedger::new(&path);
    ledger
        .append(NewComment {
            text: "second".to_string(),
            author: Author {
                display_name: "Pixel Pioneer".to_string(),
                color: "rgb(120,120,120)".to_string(),
                avatar: String::new(),
            },
            is_toxic: true,
        })
        .await
        .unwrap();

    let classifier = CountingClassifier::new();
    let rows = ledger.load_all(&classifier).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].text, "hello");
    assert!(!rows[0].is_toxic);
    assert_eq!(rows[1].text, "second");
    assert!(rows[1].is_toxic);
    assert_eq!(classifier.calls(), 0);
}
