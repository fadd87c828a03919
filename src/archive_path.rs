//! Relative, forward-slash archive paths.
//!
//! Every record the builder writes is named by an [`ArchivePath`]. The path is
//! derived from entry *names* only, joined from the enqueued root downwards,
//! so absolute origin locations never reach the archive. The extractor parses
//! stored record names back through [`ArchivePath::from_record_name`].

use crate::{Error, Result};
use std::fmt;

/// Zip stores record names with a 16-bit length.
const MAX_RECORD_NAME: usize = u16::MAX as usize;

/// Why a segment cannot appear in a record name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Empty,
    CurrentDir,
    Traversal,
    Nul,
    Separator,
    Backslash,
}

impl Rejection {
    fn check(segment: &str) -> Option<Self> {
        match segment {
            "" => Some(Self::Empty),
            "." => Some(Self::CurrentDir),
            ".." => Some(Self::Traversal),
            _ => segment.chars().find_map(|c| match c {
                '\0' => Some(Self::Nul),
                '/' => Some(Self::Separator),
                '\\' => Some(Self::Backslash),
                _ => None,
            }),
        }
    }

    fn into_error(self, segment: &str) -> Error {
        let reason = match self {
            Self::Empty => "empty segment".to_string(),
            Self::CurrentDir => "'.' segment".to_string(),
            Self::Traversal => "'..' segment escapes the archive root".to_string(),
            Self::Nul => "NUL byte in name".to_string(),
            Self::Separator => format!("entry name '{}' contains a separator", segment),
            Self::Backslash => format!("'{}' contains a backslash", segment),
        };
        Error::InvalidArchivePath(reason)
    }
}

fn check_segment(segment: &str) -> Result<()> {
    match Rejection::check(segment) {
        Some(rejection) => Err(rejection.into_error(segment)),
        None => Ok(()),
    }
}

/// A validated, relative archive path.
///
/// Segments are joined with `/`. Every segment is non-empty and is neither
/// `.` nor `..`; no segment contains NUL or a backslash.
///
/// ```
/// use treepack::ArchivePath;
///
/// let root = ArchivePath::from_name("photos").unwrap();
/// let file = root.join("cat.jpg").unwrap();
/// assert_eq!(file.as_str(), "photos/cat.jpg");
/// assert_eq!(file.parent(), Some(root));
///
/// assert!(ArchivePath::new("../secret").is_err());
/// assert!(ArchivePath::new("/etc/passwd").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArchivePath(String);

impl ArchivePath {
    /// Parses a `/`-delimited relative path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArchivePath`] for an empty, absolute or
    /// overlong path, and for any segment rejected by [`ArchivePath::join`].
    pub fn new(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::InvalidArchivePath("empty path".into()));
        }
        if s.len() > MAX_RECORD_NAME {
            return Err(Error::InvalidArchivePath(format!(
                "{} bytes exceeds the record name limit of {}",
                s.len(),
                MAX_RECORD_NAME
            )));
        }
        if s.starts_with('/') {
            return Err(Error::InvalidArchivePath(format!("'{}' is absolute", s)));
        }
        s.split('/').try_for_each(check_segment)?;
        Ok(Self(s.to_owned()))
    }

    /// A single-segment path naming a top-level record.
    ///
    /// A `/` inside `name` is rejected rather than read as a separator.
    pub fn from_name(name: &str) -> Result<Self> {
        check_segment(name)?;
        Self::new(name)
    }

    /// Parses a record name as stored in a zip archive.
    ///
    /// Backslashes written by some archivers are read as separators and a
    /// trailing `/` marks a directory record. Returns the path and whether
    /// the record is a directory.
    pub fn from_record_name(raw: &str) -> Result<(Self, bool)> {
        let normalized = raw.replace('\\', "/");
        match normalized.strip_suffix('/') {
            Some(dir) => Ok((Self::new(dir)?, true)),
            None => Ok((Self::new(&normalized)?, false)),
        }
    }

    /// The path as stored in the archive.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The path of child `name` beneath this one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArchivePath`] when `name` is empty, is `.` or
    /// `..`, or contains `/`, `\` or NUL.
    pub fn join(&self, name: &str) -> Result<Self> {
        check_segment(name)?;
        Self::new(&format!("{}/{}", self.0, name))
    }

    /// The enclosing path, or `None` for a top-level record.
    pub fn parent(&self) -> Option<Self> {
        let (head, _) = self.0.rsplit_once('/')?;
        Some(Self(head.to_owned()))
    }

    /// The last segment.
    pub fn file_name(&self) -> &str {
        self.0.rsplit_once('/').map_or(&self.0, |(_, tail)| tail)
    }

    /// Segments from the top level down.
    ///
    /// ```
    /// use treepack::ArchivePath;
    ///
    /// let path = ArchivePath::new("a/b/c.txt").unwrap();
    /// assert_eq!(path.components().collect::<Vec<_>>(), ["a", "b", "c.txt"]);
    /// ```
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.0.matches('/').count() + 1
    }
}

impl AsRef<str> for ArchivePath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ArchivePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for ArchivePath {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}
