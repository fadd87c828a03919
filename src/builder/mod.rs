//! Streaming entries into a zip archive.
//!
//! An [`ArchiveBuilder`] collects file and directory entries of any origin
//! and writes them into one archive with [`ArchiveBuilder::build`].
//!
//! # Traversal
//!
//! Queued entries are written in the order they were added. A queued file is
//! stored under its own name. A queued directory is walked depth-first: its
//! direct child files first, then each child directory in turn. Nested
//! records are named by joining entry names from the queued directory down,
//! so the archive never contains absolute origin paths. Directories produce
//! no record of their own.
//!
//! # Failure handling
//!
//! Only failures to *open* a file's content are recoverable. They are offered
//! to the [`ErrorObserver`] configured in [`BuildOptions`], which together
//! with the [`RecoveryAction`] decides whether to retry, skip or abort. Every
//! other failure (creating the output, listing a directory, writing) ends the
//! build immediately.
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use treepack::{ArchiveBuilder, BuildOptions, InMemoryFile, Timestamp};
//!
//! # fn main() -> treepack::Result<()> {
//! let dir = tempfile::tempdir()?;
//! let mut builder = ArchiveBuilder::new();
//! builder.add_file(Rc::new(InMemoryFile::new(
//!     "hello.txt",
//!     b"Hello, World!".to_vec(),
//!     None,
//!     Timestamp::EPOCH,
//! )))?;
//!
//! let result = builder.build(dir.path().join("out.zip"), BuildOptions::new())?;
//! assert_eq!(result.entries_written, 1);
//! assert!(builder.is_empty());
//! # Ok(())
//! # }
//! ```

mod copy;
mod options;
mod recovery;

pub use options::{
    BuildOptions, CompressionMethod, DEFAULT_BUFFER_SIZE, DEFAULT_LEVEL, RecoveryAction,
};
pub use recovery::{ClosureObserver, ErrorObserver, OpenFailure, error_fn};

use std::fs::File;
use std::io::{BufWriter, Read, Seek, Write};
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use zip::ZipWriter;
use zip::write::FileOptions;

use crate::entry::{DirRef, DirectoryEntry, Entry, EntryRef, FileEntry, FileRef};
use crate::progress::{NoProgress, ProgressReporter, format_bytes_iec, format_duration};
use crate::{ArchivePath, Error, Result};

use copy::copy_with_progress;

/// Records at or above this size need zip64 headers.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Accumulates entries and serializes them into a zip archive.
///
/// The builder is single-use per batch: [`build`](Self::build) drains the
/// queue whether it succeeds or fails, after which new entries can be added
/// for another build.
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    queue: Vec<EntryRef>,
}

impl ArchiveBuilder {
    /// Creates a builder with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the file's name is empty.
    pub fn add_file(&mut self, file: FileRef) -> Result<()> {
        self.add(EntryRef::File(file))
    }

    /// Queues a directory and, at build time, everything beneath it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the directory's name is empty.
    pub fn add_directory(&mut self, directory: DirRef) -> Result<()> {
        self.add(EntryRef::Directory(directory))
    }

    /// Queues an entry of either kind.
    pub fn add(&mut self, entry: EntryRef) -> Result<()> {
        if entry.name().is_empty() {
            return Err(Error::invalid_argument(
                "entry",
                format!("entry '{}' has an empty name", entry.full_name()),
            ));
        }
        log::trace!("Queued {:?}", entry);
        self.queue.push(entry);
        Ok(())
    }

    /// Returns the number of queued entries.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the queued entries in insertion order.
    pub fn pending(&self) -> &[EntryRef] {
        &self.queue
    }

    /// Writes every queued entry to a new archive at `path`.
    ///
    /// The file at `path` is created or truncated. On success the archive is
    /// finalized and reopened read-only; the returned [`BuildResult`] owns
    /// that handle. The queue is empty afterwards in every case except an
    /// empty `path`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `path` is empty.
    /// - [`Error::BuildAborted`] if a file could not be opened and the
    ///   failure was not recovered. The output is partial.
    /// - [`Error::InvalidArchivePath`] if an entry name cannot be stored.
    /// - [`Error::Io`] or [`Error::Archive`] for any other failure.
    pub fn build(&mut self, path: impl AsRef<Path>, options: BuildOptions) -> Result<BuildResult> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(Error::invalid_argument("path", "output path is empty"));
        }

        let queue = std::mem::take(&mut self.queue);
        let started = Instant::now();
        log::debug!(
            "Building '{}' from {} queued entries",
            path.display(),
            queue.len()
        );

        let output = File::create(path)?;
        let mut session = Session::new(BufWriter::new(output), options);
        for entry in &queue {
            session.write_root(entry)?;
        }
        let stats = session.finish()?;

        log::info!(
            "Wrote {} entries ({}) to '{}' in {}",
            stats.entries_written,
            format_bytes_iec(stats.bytes_written),
            path.display(),
            format_duration(started.elapsed())
        );

        Ok(BuildResult {
            file: File::open(path)?,
            path: path.to_path_buf(),
            entries_written: stats.entries_written,
            entries_skipped: stats.entries_skipped,
            bytes_written: stats.bytes_written,
            retries: stats.retries,
        })
    }
}

/// Outcome of a successful build.
///
/// Owns a read-only handle to the finished archive.
#[derive(Debug)]
#[must_use]
pub struct BuildResult {
    file: File,
    path: PathBuf,
    /// Files written to the archive.
    pub entries_written: usize,
    /// Files skipped after an ignored open failure.
    pub entries_skipped: usize,
    /// Uncompressed bytes streamed into the archive.
    pub bytes_written: u64,
    /// Number of reopen attempts made.
    pub retries: u32,
}

impl BuildResult {
    /// Returns the path of the archive.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the read-only archive handle.
    pub fn file(&self) -> &File {
        &self.file
    }

    /// Takes ownership of the read-only archive handle.
    pub fn into_file(self) -> File {
        self.file
    }
}

#[derive(Debug, Default)]
struct BuildStats {
    entries_written: usize,
    entries_skipped: usize,
    bytes_written: u64,
    retries: u32,
}

/// The name an entry is stored under.
///
/// A disk entry whose final component is not valid UTF-8 is rejected rather
/// than stored under a lossy replacement.
fn record_name<E: Entry + ?Sized>(entry: &E) -> Result<String> {
    if let Some(path) = entry.physical_path() {
        if let Some(Component::Normal(name)) = path.components().next_back() {
            if name.to_str().is_none() {
                return Err(Error::InvalidArchivePath(format!(
                    "'{}' is not valid UTF-8",
                    path.display()
                )));
            }
        }
    }
    Ok(entry.name())
}

/// State of one in-progress build.
struct Session<W: Write + Seek> {
    zip: ZipWriter<W>,
    file_options: FileOptions,
    recovery: RecoveryAction,
    observer: Option<Box<dyn ErrorObserver>>,
    progress: Box<dyn ProgressReporter>,
    buffer: Vec<u8>,
    stats: BuildStats,
}

impl<W: Write + Seek> Session<W> {
    fn new(writer: W, options: BuildOptions) -> Self {
        let file_options = options.file_options();
        Self {
            zip: ZipWriter::new(writer),
            file_options,
            recovery: options.recovery,
            observer: options.on_error,
            progress: options.progress.unwrap_or_else(|| Box::new(NoProgress)),
            buffer: vec![0u8; options.buffer_size.max(1)],
            stats: BuildStats::default(),
        }
    }

    fn write_root(&mut self, entry: &EntryRef) -> Result<()> {
        match entry {
            EntryRef::File(file) => {
                let path = ArchivePath::from_name(&record_name(file.as_ref())?)?;
                self.write_file(file.as_ref(), &path)
            }
            EntryRef::Directory(dir) => {
                let path = ArchivePath::from_name(&record_name(dir.as_ref())?)?;
                self.write_directory(dir.as_ref(), &path)
            }
        }
    }

    fn write_directory(&mut self, dir: &dyn DirectoryEntry, path: &ArchivePath) -> Result<()> {
        log::trace!("Entering directory '{}'", path);
        for file in dir.files()? {
            let child = path.join(&record_name(file.as_ref())?)?;
            self.write_file(file.as_ref(), &child)?;
        }
        for sub in dir.directories()? {
            let child = path.join(&record_name(sub.as_ref())?)?;
            self.write_directory(sub.as_ref(), &child)?;
        }
        Ok(())
    }

    fn write_file(&mut self, file: &dyn FileEntry, path: &ArchivePath) -> Result<()> {
        let name = path.as_str();
        let mut reader = match self.open_with_recovery(file, path) {
            Ok(Some(reader)) => reader,
            Ok(None) => {
                self.stats.entries_skipped += 1;
                self.progress.on_entry_complete(name, false);
                return Ok(());
            }
            Err(e) => {
                self.progress.on_entry_complete(name, false);
                return Err(e);
            }
        };

        let total = file.length();
        let options = self
            .file_options
            .last_modified_time(file.last_write_time().to_zip_datetime())
            .large_file(total >= ZIP64_THRESHOLD);
        self.zip.start_file(name, options)?;
        self.progress.on_entry_start(name, total);

        let copied = copy_with_progress(
            &mut reader,
            &mut self.zip,
            &mut self.buffer,
            name,
            total,
            self.progress.as_mut(),
        );
        let copied = match copied {
            Ok(n) => n,
            Err(e) => {
                self.progress.on_entry_complete(name, false);
                return Err(e.into());
            }
        };

        self.progress.on_entry_complete(name, true);
        self.stats.entries_written += 1;
        self.stats.bytes_written += copied;
        log::debug!("Added '{}' ({})", name, format_bytes_iec(copied));
        Ok(())
    }

    /// Opens `file`, consulting the observer on failure.
    ///
    /// Returns `Ok(None)` when the entry is to be skipped.
    fn open_with_recovery<'f>(
        &mut self,
        file: &'f dyn FileEntry,
        path: &ArchivePath,
    ) -> Result<Option<Box<dyn Read + 'f>>> {
        let entry = file.full_name();
        let mut attempt = 1u32;
        loop {
            // Length and timestamps must describe the content about to be read.
            file.refresh();
            let error = match file.open() {
                Ok(reader) => return Ok(Some(reader)),
                Err(Error::Io(e)) => Error::unavailable(entry.as_str(), e),
                Err(e @ Error::EntryUnavailable { .. }) => e,
                Err(e) => return Err(e),
            };
            log::warn!("Cannot open '{}' (attempt {}): {}", entry, attempt, error);

            let proceed = match self.observer.as_mut() {
                Some(observer) => observer.on_open_error(&OpenFailure {
                    entry: &entry,
                    archive_path: path,
                    attempt,
                    error: &error,
                }),
                None => false,
            };

            match (proceed, self.recovery) {
                (true, RecoveryAction::Retry) => {
                    self.stats.retries += 1;
                    attempt += 1;
                }
                (true, RecoveryAction::Ignore) => {
                    log::warn!("Skipping '{}'", entry);
                    return Ok(None);
                }
                _ => {
                    return Err(Error::BuildAborted {
                        entry,
                        source: Box::new(error),
                    });
                }
            }
        }
    }

    fn finish(self) -> Result<BuildStats> {
        let Session {
            mut zip, stats, ..
        } = self;
        let mut writer = zip.finish()?;
        writer.flush()?;
        Ok(stats)
    }
}
