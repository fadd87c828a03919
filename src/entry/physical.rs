//! Entries backed by a live path on disk.
//!
//! Metadata is read once when an entry is created and cached until
//! [`Entry::refresh`] is called. A path that does not exist is not an error:
//! the entry reports `exists() == false` and [`Timestamp::EPOCH`] for all
//! three timestamps.

use std::cell::RefCell;
use std::fmt;
use std::fs::{self, File, Metadata};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;

use super::{DirRef, DirectoryEntry, Entry, FileEntry, FileRef, last_segment};
use crate::{Error, Result, Timestamp};

/// Cached metadata shared by both physical entry kinds.
struct Snapshot {
    path: PathBuf,
    metadata: RefCell<Option<Metadata>>,
}

impl Snapshot {
    fn load(path: PathBuf) -> Self {
        let metadata = RefCell::new(read_metadata(&path));
        Self { path, metadata }
    }

    fn reload(&self) {
        *self.metadata.borrow_mut() = read_metadata(&self.path);
    }

    /// The final component with `.` and `..` resolved, so `project/.`
    /// is named `project`.
    fn name(&self) -> String {
        match self.path.components().next_back() {
            Some(Component::Normal(name)) => last_segment(&name.to_string_lossy()).to_string(),
            _ => fs::canonicalize(&self.path)
                .ok()
                .and_then(|resolved| resolved.file_name().map(|n| n.to_string_lossy().into_owned()))
                .unwrap_or_else(|| last_segment(&self.path.to_string_lossy()).to_string()),
        }
    }

    fn full_name(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    fn parent_path(&self) -> Option<&Path> {
        self.path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
    }

    fn is_read_only(&self) -> bool {
        self.metadata
            .borrow()
            .as_ref()
            .is_some_and(|m| m.permissions().readonly())
    }

    fn time(&self, get: impl Fn(&Metadata) -> io::Result<SystemTime>) -> Timestamp {
        self.metadata
            .borrow()
            .as_ref()
            .and_then(|m| get(m).ok())
            .and_then(Timestamp::from_system_time)
            .unwrap_or(Timestamp::EPOCH)
    }

    fn set_times(&self, accessed: Option<Timestamp>, written: Option<Timestamp>) -> Result<()> {
        if let Some(ts) = accessed {
            filetime::set_file_atime(&self.path, ts.into())?;
        }
        if let Some(ts) = written {
            filetime::set_file_mtime(&self.path, ts.into())?;
        }
        self.reload();
        Ok(())
    }
}

fn read_metadata(path: &Path) -> Option<Metadata> {
    match fs::metadata(path) {
        Ok(metadata) => Some(metadata),
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                log::debug!("Cannot read metadata of '{}': {}", path.display(), e);
            }
            None
        }
    }
}

/// A file on disk.
///
/// # Example
///
/// ```rust,no_run
/// use treepack::{Entry, FileEntry, PhysicalFile};
///
/// let file = PhysicalFile::new("/etc/hostname");
/// if file.exists() {
///     println!("{} is {} bytes", file.name(), file.length());
/// }
/// ```
pub struct PhysicalFile {
    snapshot: Snapshot,
}

impl PhysicalFile {
    /// Wraps `path`, reading its metadata.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot: Snapshot::load(path.into()),
        }
    }

    /// Returns the wrapped path.
    pub fn path(&self) -> &Path {
        &self.snapshot.path
    }

    /// Sets the last access time on disk.
    pub fn set_last_access_time(&self, time: Timestamp) -> Result<()> {
        self.snapshot.set_times(Some(time), None)
    }

    /// Sets the last write time on disk.
    pub fn set_last_write_time(&self, time: Timestamp) -> Result<()> {
        self.snapshot.set_times(None, Some(time))
    }

    /// Sets the creation time on disk.
    ///
    /// # Errors
    ///
    /// Always returns [`Error::UnsupportedFeature`]: birth times cannot be
    /// set portably.
    pub fn set_creation_time(&self, _time: Timestamp) -> Result<()> {
        Err(Error::UnsupportedFeature {
            feature: "setting file creation time",
        })
    }

    /// Deletes the file.
    pub fn delete(&self) -> Result<()> {
        fs::remove_file(&self.snapshot.path)?;
        self.snapshot.reload();
        Ok(())
    }

    /// Moves the file to `destination` and returns an entry for the new location.
    pub fn move_to(&self, destination: impl AsRef<Path>) -> Result<PhysicalFile> {
        let destination = destination.as_ref();
        fs::rename(&self.snapshot.path, destination)?;
        self.snapshot.reload();
        Ok(PhysicalFile::new(destination))
    }

    /// Copies the file to `destination` and returns an entry for the copy.
    ///
    /// # Errors
    ///
    /// Fails with an [`io::ErrorKind::AlreadyExists`] I/O error if the
    /// destination exists and `overwrite` is false.
    pub fn copy_to(&self, destination: impl AsRef<Path>, overwrite: bool) -> Result<PhysicalFile> {
        let destination = destination.as_ref();
        if !overwrite && destination.exists() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("'{}' already exists", destination.display()),
            )));
        }
        fs::copy(&self.snapshot.path, destination)?;
        Ok(PhysicalFile::new(destination))
    }
}

impl Entry for PhysicalFile {
    fn name(&self) -> String {
        self.snapshot.name()
    }

    fn full_name(&self) -> String {
        self.snapshot.full_name()
    }

    fn parent(&self) -> Option<DirRef> {
        let parent: DirRef = Rc::new(PhysicalDirectory::new(self.snapshot.parent_path()?));
        Some(parent)
    }

    fn exists(&self) -> bool {
        self.snapshot
            .metadata
            .borrow()
            .as_ref()
            .is_some_and(Metadata::is_file)
    }

    fn is_read_only(&self) -> bool {
        self.snapshot.is_read_only()
    }

    fn creation_time(&self) -> Timestamp {
        self.snapshot.time(Metadata::created)
    }

    fn last_access_time(&self) -> Timestamp {
        self.snapshot.time(Metadata::accessed)
    }

    fn last_write_time(&self) -> Timestamp {
        self.snapshot.time(Metadata::modified)
    }

    fn physical_path(&self) -> Option<&Path> {
        Some(&self.snapshot.path)
    }

    fn refresh(&self) {
        self.snapshot.reload();
    }
}

impl FileEntry for PhysicalFile {
    fn length(&self) -> u64 {
        self.snapshot
            .metadata
            .borrow()
            .as_ref()
            .map_or(0, Metadata::len)
    }

    fn open(&self) -> Result<Box<dyn Read + '_>> {
        let file = File::open(&self.snapshot.path)
            .map_err(|e| Error::unavailable(self.full_name(), e))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

impl fmt::Debug for PhysicalFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicalFile")
            .field("path", &self.snapshot.path)
            .finish()
    }
}

/// A directory on disk.
///
/// Child listings are read from the live directory on every call and sorted
/// by name so that traversal order does not depend on the host filesystem.
pub struct PhysicalDirectory {
    snapshot: Snapshot,
}

impl PhysicalDirectory {
    /// Wraps `path`, reading its metadata.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot: Snapshot::load(path.into()),
        }
    }

    /// Returns the wrapped path.
    pub fn path(&self) -> &Path {
        &self.snapshot.path
    }

    /// Returns the parent as a concrete physical directory.
    pub fn parent_directory(&self) -> Option<PhysicalDirectory> {
        self.snapshot.parent_path().map(PhysicalDirectory::new)
    }

    /// Sets the last access time on disk.
    pub fn set_last_access_time(&self, time: Timestamp) -> Result<()> {
        self.snapshot.set_times(Some(time), None)
    }

    /// Sets the last write time on disk.
    pub fn set_last_write_time(&self, time: Timestamp) -> Result<()> {
        self.snapshot.set_times(None, Some(time))
    }

    /// Sets the creation time on disk.
    ///
    /// # Errors
    ///
    /// Always returns [`Error::UnsupportedFeature`].
    pub fn set_creation_time(&self, _time: Timestamp) -> Result<()> {
        Err(Error::UnsupportedFeature {
            feature: "setting directory creation time",
        })
    }

    /// Creates the directory and any missing ancestors.
    pub fn create(&self) -> Result<()> {
        fs::create_dir_all(&self.snapshot.path)?;
        self.snapshot.reload();
        Ok(())
    }

    /// Deletes the directory; `recursive` also removes its contents.
    pub fn delete(&self, recursive: bool) -> Result<()> {
        if recursive {
            fs::remove_dir_all(&self.snapshot.path)?;
        } else {
            fs::remove_dir(&self.snapshot.path)?;
        }
        self.snapshot.reload();
        Ok(())
    }

    /// Lists child paths of one kind, sorted by file name.
    fn children(&self, want_dirs: bool) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.snapshot.path)? {
            let path = entry?.path();
            // Follows symlinks, so a link to a directory is listed as one.
            if path.is_dir() == want_dirs {
                paths.push(path);
            }
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(paths)
    }
}

impl Entry for PhysicalDirectory {
    fn name(&self) -> String {
        self.snapshot.name()
    }

    fn full_name(&self) -> String {
        self.snapshot.full_name()
    }

    fn parent(&self) -> Option<DirRef> {
        let parent: DirRef = Rc::new(self.parent_directory()?);
        Some(parent)
    }

    fn exists(&self) -> bool {
        self.snapshot
            .metadata
            .borrow()
            .as_ref()
            .is_some_and(Metadata::is_dir)
    }

    fn is_read_only(&self) -> bool {
        self.snapshot.is_read_only()
    }

    fn creation_time(&self) -> Timestamp {
        self.snapshot.time(Metadata::created)
    }

    fn last_access_time(&self) -> Timestamp {
        self.snapshot.time(Metadata::accessed)
    }

    fn last_write_time(&self) -> Timestamp {
        self.snapshot.time(Metadata::modified)
    }

    fn physical_path(&self) -> Option<&Path> {
        Some(&self.snapshot.path)
    }

    fn refresh(&self) {
        self.snapshot.reload();
    }
}

impl DirectoryEntry for PhysicalDirectory {
    fn files(&self) -> Result<Vec<FileRef>> {
        Ok(self
            .children(false)?
            .into_iter()
            .map(|path| Rc::new(PhysicalFile::new(path)) as FileRef)
            .collect())
    }

    fn directories(&self) -> Result<Vec<DirRef>> {
        Ok(self
            .children(true)?
            .into_iter()
            .map(|path| Rc::new(PhysicalDirectory::new(path)) as DirRef)
            .collect())
    }
}

impl fmt::Debug for PhysicalDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicalDirectory")
            .field("path", &self.snapshot.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_file_metadata() {
        let temp = TempDir::new().unwrap();
        let path = write(temp.path(), "note.txt", b"hello world");
        let file = PhysicalFile::new(&path);

        assert!(file.exists());
        assert_eq!(file.name(), "note.txt");
        assert_eq!(file.full_name(), path.to_string_lossy());
        assert_eq!(file.length(), 11);
        assert!(!file.is_read_only());
        assert_eq!(file.physical_path(), Some(path.as_path()));
        assert_ne!(file.last_write_time(), Timestamp::EPOCH);
    }

    #[test]
    fn test_missing_file() {
        let temp = TempDir::new().unwrap();
        let file = PhysicalFile::new(temp.path().join("absent.bin"));

        assert!(!file.exists());
        assert_eq!(file.length(), 0);
        assert_eq!(file.last_write_time(), Timestamp::EPOCH);

        let err = file.open().err().unwrap();
        assert!(err.is_recoverable());
        assert_eq!(err.io_kind(), Some(io::ErrorKind::NotFound));
    }

    #[test]
    fn test_open_reads_content() {
        let temp = TempDir::new().unwrap();
        let path = write(temp.path(), "data.bin", &[7u8; 100]);
        let file = PhysicalFile::new(path);

        let mut buf = Vec::new();
        file.open().unwrap().read_to_end(&mut buf).unwrap();
        assert_eq!(buf, vec![7u8; 100]);
    }

    #[test]
    fn test_refresh_rereads_metadata() {
        let temp = TempDir::new().unwrap();
        let path = write(temp.path(), "grow.txt", b"abc");
        let file = PhysicalFile::new(&path);
        assert_eq!(file.length(), 3);

        fs::write(&path, b"abcdef").unwrap();
        assert_eq!(file.length(), 3);
        file.refresh();
        assert_eq!(file.length(), 6);
    }

    #[test]
    fn test_set_last_write_time() {
        let temp = TempDir::new().unwrap();
        let path = write(temp.path(), "stamp.txt", b"x");
        let file = PhysicalFile::new(&path);

        let when = Timestamp::from_ymd_hms(2009, 10, 10, 0, 0, 0).unwrap();
        file.set_last_write_time(when).unwrap();
        assert_eq!(file.last_write_time(), when);
    }

    #[test]
    fn test_set_creation_time_unsupported() {
        let temp = TempDir::new().unwrap();
        let file = PhysicalFile::new(write(temp.path(), "c.txt", b""));
        let err = file.set_creation_time(Timestamp::EPOCH).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFeature { .. }));
    }

    #[test]
    fn test_copy_move_delete() {
        let temp = TempDir::new().unwrap();
        let original = PhysicalFile::new(write(temp.path(), "a.txt", b"payload"));

        let copy = original.copy_to(temp.path().join("b.txt"), false).unwrap();
        assert!(copy.exists());
        assert_eq!(copy.length(), 7);

        let err = original.copy_to(copy.path(), false).unwrap_err();
        assert_eq!(err.io_kind(), Some(io::ErrorKind::AlreadyExists));
        assert!(original.copy_to(copy.path(), true).is_ok());

        let moved = original.move_to(temp.path().join("c.txt")).unwrap();
        assert!(!original.exists());
        assert!(moved.exists());

        moved.delete().unwrap();
        assert!(!moved.exists());
    }

    #[test]
    fn test_file_parent_is_containing_directory() {
        let temp = TempDir::new().unwrap();
        let file = PhysicalFile::new(write(temp.path(), "child.txt", b""));
        let parent = file.parent().unwrap();
        assert_eq!(parent.full_name(), temp.path().to_string_lossy());
        assert!(parent.exists());
    }

    #[test]
    fn test_directory_listing_is_sorted() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "b.txt", b"b");
        write(temp.path(), "a.txt", b"a");
        fs::create_dir(temp.path().join("zeta")).unwrap();
        fs::create_dir(temp.path().join("alpha")).unwrap();

        let dir = PhysicalDirectory::new(temp.path());
        let files: Vec<_> = dir.files().unwrap().iter().map(|f| f.name()).collect();
        let dirs: Vec<_> = dir.directories().unwrap().iter().map(|d| d.name()).collect();

        assert_eq!(files, vec!["a.txt", "b.txt"]);
        assert_eq!(dirs, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_directory_parent_is_os_parent() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("inner");
        fs::create_dir(&nested).unwrap();

        let dir = PhysicalDirectory::new(&nested);
        assert_eq!(dir.name(), "inner");
        let parent = dir.parent().unwrap();
        assert_eq!(parent.full_name(), temp.path().to_string_lossy());
        assert_ne!(parent.full_name(), dir.full_name());
    }

    #[test]
    fn test_dot_components_resolve_to_directory_name() {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("project");
        fs::create_dir_all(project.join("sub")).unwrap();

        assert_eq!(PhysicalDirectory::new(project.join(".")).name(), "project");
        assert_eq!(PhysicalDirectory::new(project.join("sub").join("..")).name(), "project");

        let cwd = PhysicalDirectory::new(".");
        assert!(!cwd.name().is_empty());
        assert_ne!(cwd.name(), ".");
    }

    #[test]
    fn test_directory_create_and_delete() {
        let temp = TempDir::new().unwrap();
        let dir = PhysicalDirectory::new(temp.path().join("x").join("y"));
        assert!(!dir.exists());

        dir.create().unwrap();
        assert!(dir.exists());
        write(dir.path(), "f.txt", b"1");

        assert!(dir.delete(false).is_err());
        dir.delete(true).unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn test_missing_directory_listing_fails() {
        let temp = TempDir::new().unwrap();
        let dir = PhysicalDirectory::new(temp.path().join("nope"));
        let err = dir.files().err().unwrap();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_recoverable());
    }
}
