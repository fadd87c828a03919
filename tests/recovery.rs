//! Recovery policy for file-open failures during a build.

mod common;

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use tempfile::TempDir;
use treepack::progress::StatisticsProgress;
use treepack::{
    ArchiveBuilder, BuildOptions, Error, FileRef, OpenFailure, PhysicalFile, ProgressReporter,
    RecoveryAction, TransferProgress, error_fn,
};

/// Queues `a.txt`, a missing `missing.txt`, then `c.txt` and `d.txt`.
fn queue_with_missing(builder: &mut ArchiveBuilder, temp: &TempDir) {
    let missing: FileRef = Rc::new(PhysicalFile::new(temp.path().join("missing.txt")));
    builder.add_file(common::memory_file("a.txt", b"a")).unwrap();
    builder.add_file(missing).unwrap();
    builder.add_file(common::memory_file("c.txt", b"c")).unwrap();
    builder.add_file(common::memory_file("d.txt", b"d")).unwrap();
}

#[derive(Debug, Clone, PartialEq)]
struct Seen {
    entry: String,
    archive_path: String,
    attempt: u32,
    kind: Option<io::ErrorKind>,
}

fn recording(log: Rc<RefCell<Vec<Seen>>>, answer: bool) -> impl FnMut(&OpenFailure<'_>) -> bool {
    move |failure| {
        log.borrow_mut().push(Seen {
            entry: failure.entry.to_string(),
            archive_path: failure.archive_path.to_string(),
            attempt: failure.attempt,
            kind: failure.error.io_kind(),
        });
        answer
    }
}

#[test]
fn test_ignore_skips_failing_entry() {
    let temp = TempDir::new().unwrap();
    let mut builder = ArchiveBuilder::new();
    queue_with_missing(&mut builder, &temp);

    let log = Rc::new(RefCell::new(Vec::new()));
    let result = builder
        .build(
            temp.path().join("out.zip"),
            BuildOptions::new()
                .recovery(RecoveryAction::Ignore)
                .on_error(error_fn(recording(Rc::clone(&log), true))),
        )
        .unwrap();

    assert_eq!(result.entries_written, 3);
    assert_eq!(result.entries_skipped, 1);
    assert_eq!(result.retries, 0);
    assert_eq!(
        common::archive_names(result.into_file()),
        vec!["a.txt", "c.txt", "d.txt"]
    );

    let log = log.borrow();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].archive_path, "missing.txt");
    assert_eq!(log[0].attempt, 1);
    assert_eq!(log[0].kind, Some(io::ErrorKind::NotFound));
    assert!(log[0].entry.ends_with("missing.txt"));
}

#[test]
fn test_abort_raises_build_aborted() {
    let temp = TempDir::new().unwrap();
    let mut builder = ArchiveBuilder::new();
    queue_with_missing(&mut builder, &temp);

    let log = Rc::new(RefCell::new(Vec::new()));
    let err = builder
        .build(
            temp.path().join("out.zip"),
            BuildOptions::new()
                .recovery(RecoveryAction::Abort)
                .on_error(error_fn(recording(Rc::clone(&log), true))),
        )
        .unwrap_err();

    assert!(err.is_aborted());
    assert!(err.entry().unwrap().ends_with("missing.txt"));
    match &err {
        Error::BuildAborted { source, .. } => assert!(source.is_recoverable()),
        other => panic!("expected BuildAborted, got {:?}", other),
    }
    assert_eq!(log.borrow().len(), 1);
    assert!(builder.is_empty());

    // Records written before the failure remain; later ones never start.
    assert_eq!(
        common::read_archive_at(&temp.path().join("out.zip")),
        vec![("a.txt".to_string(), b"a".to_vec())]
    );
}

#[test]
fn test_observer_declining_aborts_even_with_ignore() {
    let temp = TempDir::new().unwrap();
    let mut builder = ArchiveBuilder::new();
    queue_with_missing(&mut builder, &temp);

    let log = Rc::new(RefCell::new(Vec::new()));
    let err = builder
        .build(
            temp.path().join("out.zip"),
            BuildOptions::new()
                .recovery(RecoveryAction::Ignore)
                .on_error(error_fn(recording(Rc::clone(&log), false))),
        )
        .unwrap_err();

    assert!(err.is_aborted());
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn test_no_observer_is_fatal() {
    let temp = TempDir::new().unwrap();
    let mut builder = ArchiveBuilder::new();
    queue_with_missing(&mut builder, &temp);

    let err = builder
        .build(
            temp.path().join("out.zip"),
            BuildOptions::new().recovery(RecoveryAction::Retry),
        )
        .unwrap_err();
    assert!(err.is_aborted());
    assert_eq!(err.io_kind(), Some(io::ErrorKind::NotFound));
}

#[test]
fn test_retry_until_source_appears() {
    let temp = TempDir::new().unwrap();
    let late = temp.path().join("late.txt");

    let mut builder = ArchiveBuilder::new();
    builder.add_file(Rc::new(PhysicalFile::new(&late))).unwrap();

    let attempts = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&attempts);
    let create = late.clone();
    let options = BuildOptions::new()
        .recovery(RecoveryAction::Retry)
        .on_error(error_fn(move |failure| {
            seen.borrow_mut().push(failure.attempt);
            if failure.attempt == 2 {
                std::fs::write(&create, b"arrived late").unwrap();
            }
            true
        }));

    let result = builder.build(temp.path().join("out.zip"), options).unwrap();
    assert_eq!(result.retries, 2);
    assert_eq!(result.entries_written, 1);
    assert_eq!(*attempts.borrow(), vec![1, 2]);
    assert_eq!(
        common::read_archive(result.into_file()),
        vec![("late.txt".to_string(), b"arrived late".to_vec())]
    );
}

#[test]
fn test_retry_stops_when_observer_declines() {
    let temp = TempDir::new().unwrap();
    let mut builder = ArchiveBuilder::new();
    builder
        .add_file(Rc::new(PhysicalFile::new(temp.path().join("never.txt"))))
        .unwrap();

    let attempts = Rc::new(RefCell::new(0u32));
    let counter = Rc::clone(&attempts);
    let err = builder
        .build(
            temp.path().join("out.zip"),
            BuildOptions::new()
                .recovery(RecoveryAction::Retry)
                .on_error(error_fn(move |failure| {
                    *counter.borrow_mut() = failure.attempt;
                    failure.attempt < 3
                })),
        )
        .unwrap_err();

    assert!(err.is_aborted());
    assert_eq!(*attempts.borrow(), 3);
}

/// Records completion callbacks so skipped entries can be observed.
#[derive(Default)]
struct Completions(Rc<RefCell<Vec<(String, bool)>>>);

impl ProgressReporter for Completions {
    fn on_progress(&mut self, _progress: &TransferProgress<'_>) {}

    fn on_entry_complete(&mut self, entry_name: &str, success: bool) {
        self.0.borrow_mut().push((entry_name.to_string(), success));
    }
}

#[test]
fn test_skipped_entry_reports_unsuccessful_completion() {
    let temp = TempDir::new().unwrap();
    let mut builder = ArchiveBuilder::new();
    queue_with_missing(&mut builder, &temp);

    let completions = Completions::default();
    let record = Rc::clone(&completions.0);
    let result = builder
        .build(
            temp.path().join("out.zip"),
            BuildOptions::new()
                .recovery(RecoveryAction::Ignore)
                .on_error(error_fn(|_| true))
                .progress(completions),
        )
        .unwrap();
    assert_eq!(result.entries_skipped, 1);

    assert_eq!(
        *record.borrow(),
        vec![
            ("a.txt".to_string(), true),
            ("missing.txt".to_string(), false),
            ("c.txt".to_string(), true),
            ("d.txt".to_string(), true),
        ]
    );
}

#[test]
fn test_statistics_progress_counts_failures() {
    let mut stats = StatisticsProgress::new();
    stats.on_entry_complete("x", false);
    assert_eq!(stats.state().entries_failed, 1);
}
