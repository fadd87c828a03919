//! # treepack
//!
//! Uniform file and directory entries, memoized virtual trees, and
//! recoverable streaming into zip archives.
//!
//! Files and directories are modelled through one capability set
//! ([`Entry`], [`FileEntry`], [`DirectoryEntry`]) whether they live on disk
//! ([`PhysicalFile`], [`PhysicalDirectory`]) or only in memory
//! ([`InMemoryFile`], [`VirtualDirectory`]). An [`ArchiveBuilder`] accepts any
//! mixture of them and streams the selected subtree into a single zip file,
//! so packaging code never needs to know where a file came from.
//!
//! ## Quick Start
//!
//! ### Building a virtual tree
//!
//! ```rust
//! use treepack::{DirectoryEntry, Entry, InMemoryFile, Timestamp, TreeResolver};
//!
//! let baseline = Timestamp::from_ymd_hms(2000, 1, 1, 0, 0, 0).unwrap();
//! let mut resolver = TreeResolver::new(baseline);
//!
//! let readme = resolver.file_with_path("docs\\README.txt", |name, parent| {
//!     InMemoryFile::new(name, b"Read me".to_vec(), parent, baseline)
//! })?;
//!
//! let docs = resolver.leaf_directory("docs")?;
//! assert_eq!(docs.files()?.len(), 1);
//! assert_eq!(readme.parent().unwrap().full_name(), "docs");
//! # Ok::<(), treepack::Error>(())
//! ```
//!
//! ### Packaging mixed sources
//!
//! ```rust,no_run
//! use std::rc::Rc;
//! use treepack::{
//!     ArchiveBuilder, BuildOptions, InMemoryFile, PhysicalDirectory, RecoveryAction,
//!     Timestamp, error_fn,
//! };
//!
//! fn main() -> treepack::Result<()> {
//!     let mut builder = ArchiveBuilder::new();
//!     builder.add_directory(Rc::new(PhysicalDirectory::new("assets")))?;
//!     builder.add_file(Rc::new(InMemoryFile::new(
//!         "manifest.txt",
//!         b"generated".to_vec(),
//!         None,
//!         Timestamp::now(),
//!     )))?;
//!
//!     let options = BuildOptions::new()
//!         .recovery(RecoveryAction::Ignore)
//!         .on_error(error_fn(|failure| {
//!             eprintln!("skipping {}: {}", failure.entry, failure.error);
//!             true
//!         }));
//!
//!     let result = builder.build("bundle.zip", options)?;
//!     println!(
//!         "{} files, {} skipped",
//!         result.entries_written, result.entries_skipped
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `deflate` | Yes | DEFLATE compression for archive records |
//!
//! Without `deflate` only [`CompressionMethod::Stored`] is available.
//!
//! ## Threading
//!
//! Entries, resolvers and builders are single-threaded (`Rc`-based) and
//! builds are synchronous. Run a build on a worker thread if the caller must
//! stay responsive; [`progress::AtomicProgress`] can publish counters across
//! threads.
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod archive_path;
pub mod builder;
pub mod entry;
pub mod error;
pub mod extract;
pub mod progress;
pub mod resolver;
pub mod timestamp;

pub use archive_path::ArchivePath;
pub use error::{Error, Result};
pub use timestamp::Timestamp;

pub use entry::{
    DirRef, DirectoryEntry, Entry, EntryRef, FileEntry, FileRef, InMemoryFile, PhysicalDirectory,
    PhysicalFile, same_file,
};

pub use resolver::{DirId, TreeResolver, VirtualDirectory, WeakDirectory};

pub use builder::{
    ArchiveBuilder, BuildOptions, BuildResult, ClosureObserver, CompressionMethod, ErrorObserver,
    OpenFailure, RecoveryAction, error_fn,
};

pub use extract::ZipExtractor;

pub use progress::{
    AtomicProgress, ClosureProgress, NoProgress, ProgressReporter, ProgressState,
    StatisticsProgress, TransferProgress, progress_fn,
};
