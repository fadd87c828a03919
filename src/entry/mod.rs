//! The entry capability set shared by physical and virtual nodes.
//!
//! Every node in a hierarchy implements [`Entry`]. Files add
//! [`FileEntry::length`] and [`FileEntry::open`]; directories add ordered
//! listings of their child files and child directories.
//!
//! Two families of implementations exist:
//!
//! - [`PhysicalFile`] / [`PhysicalDirectory`] forward to a live path on disk.
//! - [`InMemoryFile`] and [`VirtualDirectory`](crate::VirtualDirectory) hold an
//!   in-memory snapshot built by a [`TreeResolver`](crate::TreeResolver).
//!
//! Entries are shared through [`FileRef`] and [`DirRef`] handles. The crate is
//! single-threaded by design, so handles are reference counted with [`Rc`].
//!
//! # Example
//!
//! ```rust
//! use treepack::{DirectoryEntry, Entry, TreeResolver, Timestamp};
//!
//! let mut resolver = TreeResolver::new(Timestamp::EPOCH);
//! let leaf = resolver.leaf_directory("docs/api").unwrap();
//! assert_eq!(leaf.name(), "api");
//! assert_eq!(leaf.parent().unwrap().full_name(), "docs");
//! assert!(leaf.files().unwrap().is_empty());
//! ```

mod memory;
mod physical;

pub use memory::InMemoryFile;
pub use physical::{PhysicalDirectory, PhysicalFile};

use std::fmt;
use std::io::Read;
use std::path::Path;
use std::rc::Rc;

use crate::{Result, Timestamp};

/// Shared handle to a file entry.
pub type FileRef = Rc<dyn FileEntry>;

/// Shared handle to a directory entry.
pub type DirRef = Rc<dyn DirectoryEntry>;

/// Capabilities common to files and directories.
pub trait Entry {
    /// The final path segment.
    fn name(&self) -> String;

    /// The full delimited path or identifier.
    fn full_name(&self) -> String;

    /// The containing directory, or `None` for a root entry.
    ///
    /// The returned handle is a fresh view of the parent; entries never own
    /// their parent.
    fn parent(&self) -> Option<DirRef>;

    /// Whether the entry currently exists.
    fn exists(&self) -> bool;

    /// Whether the entry rejects modification.
    fn is_read_only(&self) -> bool;

    /// Creation time (UTC).
    fn creation_time(&self) -> Timestamp;

    /// Last access time (UTC).
    fn last_access_time(&self) -> Timestamp;

    /// Last write time (UTC).
    fn last_write_time(&self) -> Timestamp;

    /// Location on disk, for entries backed by one.
    fn physical_path(&self) -> Option<&Path> {
        None
    }

    /// Re-reads cached metadata. A no-op for in-memory entries.
    fn refresh(&self) {}
}

/// A file: an entry with a length and readable content.
pub trait FileEntry: Entry {
    /// Content length in bytes.
    fn length(&self) -> u64;

    /// Opens the content for reading.
    ///
    /// The stream is owned by the caller and released when dropped. Nothing
    /// prevents concurrent modification of the underlying source while it is
    /// open.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntryUnavailable`](crate::Error::EntryUnavailable)
    /// when the content source is missing or cannot be read.
    fn open(&self) -> Result<Box<dyn Read + '_>>;
}

/// A directory: an entry with ordered child listings.
pub trait DirectoryEntry: Entry {
    /// The direct child files, in listing order.
    fn files(&self) -> Result<Vec<FileRef>>;

    /// The direct child directories, in listing order.
    fn directories(&self) -> Result<Vec<DirRef>>;
}

/// Either kind of entry.
///
/// This is what the archive builder queues; it decides between streaming a
/// file and walking a directory by matching on the variant.
#[derive(Clone)]
pub enum EntryRef {
    /// A file entry.
    File(FileRef),
    /// A directory entry.
    Directory(DirRef),
}

impl EntryRef {
    /// The entry's final path segment.
    pub fn name(&self) -> String {
        match self {
            EntryRef::File(file) => file.name(),
            EntryRef::Directory(dir) => dir.name(),
        }
    }

    /// The entry's full name.
    pub fn full_name(&self) -> String {
        match self {
            EntryRef::File(file) => file.full_name(),
            EntryRef::Directory(dir) => dir.full_name(),
        }
    }

    /// Returns true for [`EntryRef::Directory`].
    pub fn is_directory(&self) -> bool {
        matches!(self, EntryRef::Directory(_))
    }
}

impl From<FileRef> for EntryRef {
    fn from(file: FileRef) -> Self {
        EntryRef::File(file)
    }
}

impl From<DirRef> for EntryRef {
    fn from(dir: DirRef) -> Self {
        EntryRef::Directory(dir)
    }
}

impl fmt::Debug for EntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryRef::File(file) => f.debug_tuple("File").field(&file.full_name()).finish(),
            EntryRef::Directory(dir) => {
                f.debug_tuple("Directory").field(&dir.full_name()).finish()
            }
        }
    }
}

/// Returns true if both handles point at the same file entry instance.
pub fn same_file(a: &FileRef, b: &FileRef) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Returns the last non-empty segment of `path`, splitting on `/` and `\`.
pub(crate) fn last_segment(path: &str) -> &str {
    path.rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .unwrap_or("")
}
