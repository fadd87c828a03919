//! Progress reporting for archive builds.
//!
//! While a build streams one file, it calls
//! [`ProgressReporter::on_progress`] once per non-empty chunk copied. Each
//! notification carries the chunk size, the running total and the file's
//! length, so for a file that streams completely the `chunk_bytes` values
//! sum to exactly its length.
//!
//! # Example
//!
//! ```rust
//! use treepack::progress::{ProgressReporter, StatisticsProgress, TransferProgress};
//!
//! let mut stats = StatisticsProgress::new();
//! stats.on_entry_start("a.txt", 10);
//! stats.on_progress(&TransferProgress {
//!     entry: "a.txt",
//!     chunk_bytes: 10,
//!     bytes_transferred: 10,
//!     total_bytes: 10,
//! });
//! stats.on_entry_complete("a.txt", true);
//! assert_eq!(stats.state().bytes_transferred, 10);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// One kibibyte.
pub const BYTES_KIB: u64 = 1 << 10;
/// One mebibyte.
pub const BYTES_MIB: u64 = 1 << 20;
/// One gibibyte.
pub const BYTES_GIB: u64 = 1 << 30;

/// One chunk of a file being streamed into the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress<'a> {
    /// In-archive path of the file.
    pub entry: &'a str,
    /// Bytes copied by this chunk.
    pub chunk_bytes: u64,
    /// Bytes copied for this file so far, including this chunk.
    pub bytes_transferred: u64,
    /// The file's length as reported before streaming started.
    pub total_bytes: u64,
}

impl TransferProgress<'_> {
    /// Returns the completion percentage for the file (0.0 - 100.0).
    pub fn percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            100.0
        } else {
            (self.bytes_transferred as f64 / self.total_bytes as f64) * 100.0
        }
    }
}

/// Receives notifications while a build streams files.
///
/// All methods have empty default implementations. Builds are synchronous,
/// so callbacks run on the building thread and block it while they execute.
pub trait ProgressReporter {
    /// Called before a file is streamed, with its in-archive path and length.
    fn on_entry_start(&mut self, entry_name: &str, size: u64) {
        let _ = (entry_name, size);
    }

    /// Called after each non-empty chunk is written.
    fn on_progress(&mut self, progress: &TransferProgress<'_>) {
        let _ = progress;
    }

    /// Called when a file has been handled.
    ///
    /// `success` is false when the file was skipped or the build stopped
    /// while it was current.
    fn on_entry_complete(&mut self, entry_name: &str, success: bool) {
        let _ = (entry_name, success);
    }
}

/// Counters accumulated over one build.
#[derive(Debug, Clone)]
pub struct ProgressState {
    /// Bytes copied across all files.
    pub bytes_transferred: u64,
    /// In-archive path of the file being streamed.
    pub current_entry: Option<String>,
    /// Length of the current file.
    pub current_total: u64,
    /// Bytes copied for the current file.
    pub current_transferred: u64,
    /// Files streamed completely.
    pub entries_completed: usize,
    /// Files skipped, or current when the build stopped.
    pub entries_failed: usize,
    /// Chunk notifications received.
    pub notifications: usize,
    /// When the first notification arrived, or the state was created.
    pub start_time: Instant,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressState {
    /// Zeroed counters starting now.
    pub fn new() -> Self {
        Self {
            bytes_transferred: 0,
            current_entry: None,
            current_total: 0,
            current_transferred: 0,
            entries_completed: 0,
            entries_failed: 0,
            notifications: 0,
            start_time: Instant::now(),
        }
    }

    /// Share of the current file copied so far, 0.0 to 100.0.
    pub fn percentage(&self) -> f64 {
        match self.current_total {
            0 => 0.0,
            total => self.current_transferred as f64 * 100.0 / total as f64,
        }
    }

    /// Time since [`ProgressState::start_time`].
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Mean copy rate since the start.
    pub fn bytes_per_second(&self) -> f64 {
        rate(self.bytes_transferred, self.start_time)
    }

    /// [`ProgressState::bytes_per_second`] in IEC units, e.g. `"3.2 MiB/s"`.
    pub fn format_rate(&self) -> String {
        format_bytes_per_second_iec(self.bytes_per_second())
    }
}

fn rate(bytes: u64, since: Instant) -> f64 {
    let secs = since.elapsed().as_secs_f64();
    if secs < 0.001 { 0.0 } else { bytes as f64 / secs }
}

/// Ignores every notification.
#[derive(Debug, Default, Clone)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {}

/// Accumulates a [`ProgressState`].
#[derive(Debug, Default, Clone)]
pub struct StatisticsProgress {
    /// The collected state.
    pub state: ProgressState,
}

impl StatisticsProgress {
    /// A reporter with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters collected so far.
    pub fn state(&self) -> &ProgressState {
        &self.state
    }
}

impl ProgressReporter for StatisticsProgress {
    fn on_entry_start(&mut self, entry_name: &str, size: u64) {
        let state = &mut self.state;
        state.current_entry = Some(entry_name.to_owned());
        state.current_total = size;
        state.current_transferred = 0;
    }

    fn on_progress(&mut self, progress: &TransferProgress<'_>) {
        let state = &mut self.state;
        state.bytes_transferred += progress.chunk_bytes;
        state.current_transferred = progress.bytes_transferred;
        state.notifications += 1;
    }

    fn on_entry_complete(&mut self, _entry_name: &str, success: bool) {
        let state = &mut self.state;
        if success {
            state.entries_completed += 1;
        } else {
            state.entries_failed += 1;
        }
        state.current_entry = None;
    }
}

/// Byte and file counters readable from another thread.
///
/// The build itself runs on one thread; hand an `Arc<AtomicProgress>` to the
/// options and poll a clone of it from elsewhere.
#[derive(Debug)]
pub struct AtomicProgress {
    bytes: AtomicU64,
    completed: AtomicU64,
    created: Instant,
}

impl Default for AtomicProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomicProgress {
    /// Zeroed counters.
    pub fn new() -> Self {
        Self {
            bytes: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            created: Instant::now(),
        }
    }

    /// Zeroed counters behind an [`Arc`].
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Bytes copied so far.
    pub fn bytes_transferred(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    /// Files streamed completely so far.
    pub fn entries_completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Mean copy rate since creation.
    pub fn bytes_per_second(&self) -> f64 {
        rate(self.bytes_transferred(), self.created)
    }

    fn count(&self, progress: &TransferProgress<'_>) {
        self.bytes.fetch_add(progress.chunk_bytes, Ordering::Relaxed);
    }

    fn finish(&self, success: bool) {
        if success {
            self.completed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl ProgressReporter for AtomicProgress {
    fn on_progress(&mut self, progress: &TransferProgress<'_>) {
        self.count(progress);
    }

    fn on_entry_complete(&mut self, _entry_name: &str, success: bool) {
        self.finish(success);
    }
}

impl ProgressReporter for Arc<AtomicProgress> {
    fn on_progress(&mut self, progress: &TransferProgress<'_>) {
        self.count(progress);
    }

    fn on_entry_complete(&mut self, _entry_name: &str, success: bool) {
        self.finish(success);
    }
}

/// Forwards chunk notifications to a closure. See [`progress_fn`].
pub struct ClosureProgress<F> {
    callback: F,
}

impl<F> ClosureProgress<F>
where
    F: FnMut(&TransferProgress<'_>),
{
    /// Wraps `callback`.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgress<F>
where
    F: FnMut(&TransferProgress<'_>),
{
    fn on_progress(&mut self, progress: &TransferProgress<'_>) {
        (self.callback)(progress)
    }
}

/// A reporter that calls `f` for every chunk.
///
/// ```rust
/// use treepack::BuildOptions;
/// use treepack::progress::progress_fn;
///
/// let options = BuildOptions::new().progress(progress_fn(|p| {
///     println!("{}: {:.0}%", p.entry, p.percentage());
/// }));
/// ```
pub fn progress_fn<F>(f: F) -> ClosureProgress<F>
where
    F: FnMut(&TransferProgress<'_>),
{
    ClosureProgress::new(f)
}

const IEC_UNITS: [(u64, &str); 3] = [(BYTES_GIB, "GiB"), (BYTES_MIB, "MiB"), (BYTES_KIB, "KiB")];

/// Picks the largest IEC unit not exceeding `value`.
fn scale(value: f64) -> Option<(f64, &'static str)> {
    IEC_UNITS
        .iter()
        .find(|(size, _)| value >= *size as f64)
        .map(|(size, unit)| (value / *size as f64, *unit))
}

/// Formats a copy rate, e.g. `"1.5 MiB/s"`.
pub fn format_bytes_per_second_iec(rate: f64) -> String {
    match scale(rate) {
        Some((value, unit)) => format!("{:.1} {}/s", value, unit),
        None => format!("{:.0} B/s", rate),
    }
}

/// Formats a byte count in IEC units.
///
/// ```rust
/// use treepack::progress::format_bytes_iec;
///
/// assert_eq!(format_bytes_iec(0), "0 B");
/// assert_eq!(format_bytes_iec(1023), "1023 B");
/// assert_eq!(format_bytes_iec(1536), "1.5 KiB");
/// assert_eq!(format_bytes_iec(3 * 1024 * 1024), "3.0 MiB");
/// ```
pub fn format_bytes_iec(bytes: u64) -> String {
    match scale(bytes as f64) {
        Some((value, unit)) => format!("{:.1} {}", value, unit),
        None => format!("{} B", bytes),
    }
}

/// Formats an elapsed time with its two most significant units.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    match secs {
        0 => format!("{}ms", duration.as_millis()),
        1..60 => format!("{}s", secs),
        60..3600 => format!("{}m {}s", secs / 60, secs % 60),
        _ => format!("{}h {}m", secs / 3600, secs % 3600 / 60),
    }
}
