//! In-memory file entries.

use std::fmt;
use std::io::{Cursor, Read};
use std::rc::Rc;
use std::sync::Arc;

use super::{DirRef, Entry, FileEntry};
use crate::resolver::{VirtualDirectory, WeakDirectory};
use crate::{Result, Timestamp};

/// A file whose content is a byte buffer held in memory.
///
/// Metadata is fixed at construction. The entry always exists and is always
/// read-only. Its full name is its name: in-memory files carry no path
/// prefix, their location is expressed only through [`Entry::parent`].
///
/// # Example
///
/// ```rust
/// use treepack::{Entry, FileEntry, InMemoryFile, Timestamp};
/// use std::io::Read;
///
/// let file = InMemoryFile::new("hello.txt", b"Hello".to_vec(), None, Timestamp::EPOCH);
/// let mut content = String::new();
/// file.open().unwrap().read_to_string(&mut content).unwrap();
/// assert_eq!(content, "Hello");
/// assert_eq!(file.length(), 5);
/// ```
pub struct InMemoryFile {
    name: String,
    content: Arc<[u8]>,
    parent: Option<WeakDirectory>,
    creation_time: Timestamp,
    last_access_time: Timestamp,
    last_write_time: Timestamp,
}

impl InMemoryFile {
    /// Creates a file with all three timestamps set to `timestamp`.
    ///
    /// `parent` is recorded as a weak link; the file does not keep the
    /// directory tree alive.
    pub fn new(
        name: impl Into<String>,
        content: impl Into<Arc<[u8]>>,
        parent: Option<&VirtualDirectory>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            parent: parent.map(VirtualDirectory::downgrade),
            creation_time: timestamp,
            last_access_time: timestamp,
            last_write_time: timestamp,
        }
    }

    /// Sets the three timestamps individually.
    pub fn with_times(mut self, created: Timestamp, accessed: Timestamp, written: Timestamp) -> Self {
        self.creation_time = created;
        self.last_access_time = accessed;
        self.last_write_time = written;
        self
    }

    /// Returns the content.
    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

impl Entry for InMemoryFile {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn full_name(&self) -> String {
        self.name.clone()
    }

    fn parent(&self) -> Option<DirRef> {
        let dir: DirRef = Rc::new(self.parent.as_ref()?.upgrade()?);
        Some(dir)
    }

    fn exists(&self) -> bool {
        true
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn creation_time(&self) -> Timestamp {
        self.creation_time
    }

    fn last_access_time(&self) -> Timestamp {
        self.last_access_time
    }

    fn last_write_time(&self) -> Timestamp {
        self.last_write_time
    }
}

impl FileEntry for InMemoryFile {
    fn length(&self) -> u64 {
        self.content.len() as u64
    }

    fn open(&self) -> Result<Box<dyn Read + '_>> {
        Ok(Box::new(Cursor::new(&self.content[..])))
    }
}

impl fmt::Debug for InMemoryFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryFile")
            .field("name", &self.name)
            .field("length", &self.content.len())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}
