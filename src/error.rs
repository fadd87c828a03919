//! Error types for tree resolution and archive building.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes when resolving virtual trees, querying physical entries and
//! building archives, along with a convenient [`Result<T>`] type alias.
//!
//! # Error Categories
//!
//! | Category | Variants | Handling |
//! |----------|----------|----------|
//! | Caller mistakes | [`InvalidArgument`][Error::InvalidArgument], [`InvalidCompressionLevel`][Error::InvalidCompressionLevel] | Always fatal, never retried |
//! | Per-file failures | [`EntryUnavailable`][Error::EntryUnavailable] | Offered to the build's error observer |
//! | Build termination | [`BuildAborted`][Error::BuildAborted] | Output on disk is partial |
//! | Everything else | [`Io`][Error::Io], [`Archive`][Error::Archive], [`InvalidArchivePath`][Error::InvalidArchivePath] | Always fatal |
//!
//! # Example
//!
//! ```rust,no_run
//! use treepack::{ArchiveBuilder, BuildOptions, Error, PhysicalDirectory};
//! use std::rc::Rc;
//!
//! fn pack(dir: &str) -> treepack::Result<()> {
//!     let mut builder = ArchiveBuilder::new();
//!     builder.add_directory(Rc::new(PhysicalDirectory::new(dir)))?;
//!     match builder.build("out.zip", BuildOptions::new()) {
//!         Ok(_) => Ok(()),
//!         Err(e @ Error::BuildAborted { .. }) => {
//!             eprintln!("out.zip is incomplete: {}", e);
//!             Err(e)
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//! ```

use std::io;

/// The error type for all treepack operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error outside of opening an entry's content.
    ///
    /// Creating the output artifact, writing to it and enumerating a
    /// physical directory fail with this variant. It is never subject to
    /// the recovery policy.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The zip codec rejected an operation.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// A required argument was empty or otherwise unusable.
    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument {
        /// Name of the offending parameter.
        name: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// The content of an entry could not be opened.
    ///
    /// Raised for missing sources, permission denials and other I/O failures
    /// while opening a file entry. During a build this error is handed to
    /// the registered [`ErrorObserver`](crate::ErrorObserver) first.
    #[error("Entry '{entry}' is unavailable: {source}")]
    EntryUnavailable {
        /// Full name of the entry that failed to open.
        entry: String,
        /// The underlying failure.
        #[source]
        source: io::Error,
    },

    /// A build was terminated after a per-entry failure.
    ///
    /// Entries written before the failure remain in the output, entries not
    /// yet reached were never written. The output must be treated as
    /// unreliable.
    #[error("Build aborted at entry '{entry}'")]
    BuildAborted {
        /// Full name of the entry that triggered the abort.
        entry: String,
        /// The failure that led to the abort.
        #[source]
        source: Box<Error>,
    },

    /// An entry name cannot be stored as a relative archive path.
    #[error("Invalid archive path: {0}")]
    InvalidArchivePath(String),

    /// Compression level outside 0-9.
    #[error("invalid compression level {level}: must be 0-9")]
    InvalidCompressionLevel {
        /// The rejected level.
        level: u32,
    },

    /// The host platform does not support the requested operation.
    #[error("Unsupported feature: {feature}")]
    UnsupportedFeature {
        /// Description of the missing capability.
        feature: &'static str,
    },
}

impl Error {
    /// Creates an [`Error::InvalidArgument`].
    pub(crate) fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::EntryUnavailable`].
    pub(crate) fn unavailable(entry: impl Into<String>, source: io::Error) -> Self {
        Error::EntryUnavailable {
            entry: entry.into(),
            source,
        }
    }

    /// Returns `true` if a build may recover from this error.
    ///
    /// Only per-entry open failures are recoverable; whether they are
    /// actually recovered from depends on the build's recovery policy.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::EntryUnavailable { .. })
    }

    /// Returns `true` if this error terminated a build early.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::BuildAborted { .. })
    }

    /// Returns the entry name associated with this error, if any.
    ///
    /// # Example
    ///
    /// ```rust
    /// use treepack::Error;
    ///
    /// fn report(error: &Error) {
    ///     match error.entry() {
    ///         Some(name) => eprintln!("failed on {}: {}", name, error),
    ///         None => eprintln!("failed: {}", error),
    ///     }
    /// }
    /// ```
    pub fn entry(&self) -> Option<&str> {
        match self {
            Error::EntryUnavailable { entry, .. } | Error::BuildAborted { entry, .. } => {
                Some(entry)
            }
            _ => None,
        }
    }

    /// Returns the underlying I/O error kind, looking through aborts.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Error::Io(e) | Error::EntryUnavailable { source: e, .. } => Some(e.kind()),
            Error::BuildAborted { source, .. } => source.io_kind(),
            _ => None,
        }
    }
}

/// A specialized Result type for treepack operations.
pub type Result<T> = std::result::Result<T, Error>;
