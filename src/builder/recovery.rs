//! Error observers for file-open failures during a build.
//!
//! When an entry's content cannot be opened, the build hands an
//! [`OpenFailure`] to the registered [`ErrorObserver`]. The observer's answer
//! combines with the configured [`RecoveryAction`](super::RecoveryAction):
//!
//! | Observer | Answer | Retry | Ignore | Abort |
//! |----------|--------|-------|--------|-------|
//! | none | - | abort | abort | abort |
//! | present | `false` | abort | abort | abort |
//! | present | `true` | reopen | skip entry | abort |

use crate::{ArchivePath, Error};

/// A failed attempt to open an entry's content.
#[derive(Debug)]
pub struct OpenFailure<'a> {
    /// Full name of the entry.
    pub entry: &'a str,
    /// Path the entry would have in the archive.
    pub archive_path: &'a ArchivePath,
    /// Attempt number for this entry, starting at 1.
    pub attempt: u32,
    /// The [`Error::EntryUnavailable`] raised by the open.
    pub error: &'a Error,
}

/// Decides whether a build continues after a file-open failure.
pub trait ErrorObserver {
    /// Called once per failed open.
    ///
    /// Returns `true` to apply the configured recovery action, or `false` to
    /// abort the build.
    fn on_open_error(&mut self, failure: &OpenFailure<'_>) -> bool;
}

/// An error observer that calls a closure.
pub struct ClosureObserver<F> {
    callback: F,
}

impl<F> ClosureObserver<F>
where
    F: FnMut(&OpenFailure<'_>) -> bool,
{
    /// Creates an observer from a closure.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ErrorObserver for ClosureObserver<F>
where
    F: FnMut(&OpenFailure<'_>) -> bool,
{
    fn on_open_error(&mut self, failure: &OpenFailure<'_>) -> bool {
        (self.callback)(failure)
    }
}

/// Creates a closure-based error observer.
pub fn error_fn<F>(f: F) -> ClosureObserver<F>
where
    F: FnMut(&OpenFailure<'_>) -> bool,
{
    ClosureObserver::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_closure_observer() {
        let path = ArchivePath::new("dir/a.txt").unwrap();
        let error = Error::unavailable("a.txt", io::Error::from(io::ErrorKind::NotFound));
        let failure = OpenFailure {
            entry: "a.txt",
            archive_path: &path,
            attempt: 1,
            error: &error,
        };

        let mut calls = Vec::new();
        let mut observer = error_fn(|f| {
            calls.push((f.archive_path.to_string(), f.attempt));
            f.attempt < 2
        });
        assert!(observer.on_open_error(&failure));
        assert!(!observer.on_open_error(&OpenFailure {
            attempt: 2,
            ..failure
        }));
        drop(observer);
        assert_eq!(
            calls,
            vec![("dir/a.txt".to_string(), 1), ("dir/a.txt".to_string(), 2)]
        );
    }
}
