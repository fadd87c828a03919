//! Reading a zip archive back as virtual entries.
//!
//! [`ZipExtractor`] loads every file record of an archive into an
//! [`InMemoryFile`] and rebuilds the directory structure with a
//! [`TreeResolver`]. The result can be inspected, or queued on another
//! [`ArchiveBuilder`](crate::ArchiveBuilder) to repack it.
//!
//! # Example
//!
//! ```rust,no_run
//! use treepack::{Entry, ZipExtractor};
//!
//! let extractor = ZipExtractor::open("bundle.zip")?;
//! for file in extractor.files() {
//!     let parent = file.parent().map(|p| p.full_name());
//!     println!("{} in {:?}", file.name(), parent);
//! }
//! # Ok::<(), treepack::Error>(())
//! ```

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use zip::ZipArchive;

use crate::entry::{FileRef, InMemoryFile};
use crate::resolver::{TreeResolver, VirtualDirectory};
use crate::{ArchivePath, Result, Timestamp};

/// The files and directory tree of one zip archive, held in memory.
pub struct ZipExtractor {
    resolver: TreeResolver,
    files: Vec<FileRef>,
}

impl ZipExtractor {
    /// Opens and loads the archive at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Loading archive '{}'", path.display());
        Self::new(BufReader::new(File::open(path)?))
    }

    /// Loads an archive from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Archive`](crate::Error::Archive) for a malformed
    /// archive and [`Error::InvalidArchivePath`](crate::Error::InvalidArchivePath)
    /// for a record named with an absolute path or `..` segment.
    pub fn new<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut resolver = TreeResolver::new(Timestamp::EPOCH);
        let mut files = Vec::new();

        for index in 0..archive.len() {
            let mut record = archive.by_index(index)?;
            let (path, is_dir) = ArchivePath::from_record_name(record.name())?;

            if is_dir {
                resolver.leaf_directory(path.as_str())?;
                continue;
            }

            let timestamp = Timestamp::from_zip_datetime(record.last_modified());
            let mut content = Vec::new();
            record.read_to_end(&mut content)?;
            log::trace!("Loaded '{}' ({} bytes)", path, content.len());

            let file = resolver.file_with_path(path.as_str(), |name, parent| {
                InMemoryFile::new(name, content, parent, timestamp)
            })?;
            files.push(file as FileRef);
        }

        Ok(Self { resolver, files })
    }

    /// Returns every file record, in archive order.
    pub fn files(&self) -> &[FileRef] {
        &self.files
    }

    /// Returns the top-level directories of the archive.
    ///
    /// Files stored at the archive root have no parent and do not appear
    /// beneath any of these.
    pub fn root_directories(&self) -> Vec<VirtualDirectory> {
        self.resolver.root_directories()
    }

    /// Returns the directory stored under `path`, if any.
    pub fn directory(&self, path: &str) -> Option<VirtualDirectory> {
        self.resolver.directory(path)
    }

    /// Returns the number of file records.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if the archive holds no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl fmt::Debug for ZipExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZipExtractor")
            .field("files", &self.files.len())
            .field("resolver", &self.resolver)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DirectoryEntry, Entry, Error, FileEntry};
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;

    fn archive(records: &[(&str, &[u8])]) -> Cursor<Vec<u8>> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, content) in records {
            if name.ends_with('/') {
                zip.add_directory(*name, options).unwrap();
            } else {
                zip.start_file(*name, options).unwrap();
                zip.write_all(content).unwrap();
            }
        }
        let mut cursor = zip.finish().unwrap();
        cursor.set_position(0);
        cursor
    }

    #[test]
    fn test_files_with_parents() {
        let extractor = ZipExtractor::new(archive(&[
            ("top.txt", &b"top"[..]),
            ("a/b/deep.txt", &b"deep"[..]),
        ]))
        .unwrap();

        assert_eq!(extractor.len(), 2);
        let top = &extractor.files()[0];
        assert_eq!(top.name(), "top.txt");
        assert!(top.parent().is_none());

        let deep = &extractor.files()[1];
        assert_eq!(deep.name(), "deep.txt");
        assert_eq!(deep.parent().unwrap().full_name(), "a\\b");

        let mut content = String::new();
        deep.open().unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "deep");
    }

    #[test]
    fn test_directory_records_resolve_empty_dirs() {
        let extractor = ZipExtractor::new(archive(&[("empty/", &b""[..]), ("x/y.txt", &b"y"[..])])).unwrap();
        let roots: Vec<_> = extractor
            .root_directories()
            .iter()
            .map(Entry::name)
            .collect();
        assert_eq!(roots, vec!["empty", "x"]);
        assert_eq!(extractor.len(), 1);

        let x = extractor.directory("x").unwrap();
        assert_eq!(x.files().unwrap().len(), 1);
    }

    #[test]
    fn test_rejects_traversal_names() {
        let err = ZipExtractor::new(archive(&[("../evil.txt", &b"x"[..])])).unwrap_err();
        assert!(matches!(err, Error::InvalidArchivePath(_)));
    }

    #[test]
    fn test_rejects_garbage() {
        let err = ZipExtractor::new(Cursor::new(b"not a zip".to_vec())).unwrap_err();
        assert!(matches!(err, Error::Archive(_)));
    }
}
