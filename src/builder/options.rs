//! Build options and configuration.

use super::recovery::ErrorObserver;
use crate::progress::ProgressReporter;
use crate::{Error, Result};

/// Default size of the buffer used to stream file content.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Default compression level.
pub const DEFAULT_LEVEL: u32 = 6;

/// What a build does when a file cannot be opened and the error observer
/// agrees to continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryAction {
    /// Open the same entry again.
    Retry,
    /// Skip the entry; no archive record is created for it.
    Ignore,
    /// Stop the build with [`Error::BuildAborted`].
    #[default]
    Abort,
}

/// How file content is stored in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum CompressionMethod {
    /// No compression.
    #[cfg_attr(not(feature = "deflate"), default)]
    Stored,
    /// DEFLATE compression.
    #[cfg(feature = "deflate")]
    #[default]
    Deflated,
}

impl CompressionMethod {
    pub(crate) fn to_zip(self) -> zip::CompressionMethod {
        match self {
            CompressionMethod::Stored => zip::CompressionMethod::Stored,
            #[cfg(feature = "deflate")]
            CompressionMethod::Deflated => zip::CompressionMethod::Deflated,
        }
    }

    /// Returns true if the method uses the compression level.
    pub fn uses_level(self) -> bool {
        !matches!(self, CompressionMethod::Stored)
    }
}

/// Options for [`ArchiveBuilder::build`](crate::ArchiveBuilder::build).
///
/// # Example
///
/// ```rust
/// use treepack::{BuildOptions, CompressionMethod, RecoveryAction, error_fn};
///
/// let options = BuildOptions::new()
///     .recovery(RecoveryAction::Ignore)
///     .on_error(error_fn(|failure| {
///         eprintln!("skipping {}: {}", failure.entry, failure.error);
///         true
///     }))
///     .compression(CompressionMethod::Stored);
/// assert_eq!(options.recovery, RecoveryAction::Ignore);
/// ```
pub struct BuildOptions {
    /// Action taken after the observer accepts an open failure.
    pub recovery: RecoveryAction,
    /// Observer for file-open failures. Without one, any failure aborts.
    pub on_error: Option<Box<dyn ErrorObserver>>,
    /// Progress reporter (optional).
    pub progress: Option<Box<dyn ProgressReporter>>,
    /// Compression method for every record.
    pub compression: CompressionMethod,
    /// Compression level (0-9).
    pub level: u32,
    /// Size of the streaming buffer in bytes.
    pub buffer_size: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            recovery: RecoveryAction::default(),
            on_error: None,
            progress: None,
            compression: CompressionMethod::default(),
            level: DEFAULT_LEVEL,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl std::fmt::Debug for BuildOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildOptions")
            .field("recovery", &self.recovery)
            .field("has_observer", &self.on_error.is_some())
            .field("compression", &self.compression)
            .field("level", &self.level)
            .field("buffer_size", &self.buffer_size)
            .finish_non_exhaustive()
    }
}

impl BuildOptions {
    /// Creates build options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the recovery action.
    pub fn recovery(mut self, action: RecoveryAction) -> Self {
        self.recovery = action;
        self
    }

    /// Sets the error observer.
    pub fn on_error(mut self, observer: impl ErrorObserver + 'static) -> Self {
        self.on_error = Some(Box::new(observer));
        self
    }

    /// Sets the progress reporter.
    pub fn progress(mut self, reporter: impl ProgressReporter + 'static) -> Self {
        self.progress = Some(Box::new(reporter));
        self
    }

    /// Sets the compression method.
    pub fn compression(mut self, method: CompressionMethod) -> Self {
        self.compression = method;
        self
    }

    /// Sets the compression level.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCompressionLevel`] if level is greater than 9.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use treepack::BuildOptions;
    ///
    /// let opts = BuildOptions::new().level(9)?;
    /// assert_eq!(opts.level, 9);
    /// assert!(BuildOptions::new().level(15).is_err());
    /// # Ok::<(), treepack::Error>(())
    /// ```
    pub fn level(mut self, level: u32) -> Result<Self> {
        if level > 9 {
            return Err(Error::InvalidCompressionLevel { level });
        }
        self.level = level;
        Ok(self)
    }

    /// Sets the compression level, clamping values above 9.
    pub fn level_clamped(mut self, level: u32) -> Self {
        self.level = level.min(9);
        self
    }

    /// Sets the streaming buffer size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `size` is zero.
    pub fn buffer_size(mut self, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::invalid_argument(
                "buffer_size",
                "buffer size must be non-zero",
            ));
        }
        self.buffer_size = size;
        Ok(self)
    }

    /// Clones all settings except the observer and progress reporter.
    pub fn clone_settings(&self) -> Self {
        Self {
            recovery: self.recovery,
            on_error: None,
            progress: None,
            compression: self.compression,
            level: self.level,
            buffer_size: self.buffer_size,
        }
    }

    /// Returns the zip record options for every file this build writes.
    pub(crate) fn file_options(&self) -> zip::write::FileOptions {
        let level = self
            .compression
            .uses_level()
            .then_some(self.level as i32);
        zip::write::FileOptions::default()
            .compression_method(self.compression.to_zip())
            .compression_level(level)
    }
}
