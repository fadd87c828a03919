//! UTC timestamps for entries.
//!
//! This module provides the [`Timestamp`] type shared by physical and virtual
//! entries. A timestamp is stored as a Windows FILETIME value, which gives
//! 100-nanosecond precision and a range starting at January 1, 1601 (UTC).
//!
//! # Example
//!
//! ```rust
//! use treepack::Timestamp;
//!
//! let baseline = Timestamp::from_ymd_hms(2000, 1, 1, 0, 0, 0).unwrap();
//! assert_eq!(baseline.as_unix_secs(), 946_684_800);
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

/// Windows FILETIME epoch: January 1, 1601 (UTC)
/// Difference from Unix epoch (January 1, 1970) in 100-nanosecond intervals.
const FILETIME_UNIX_DIFF: u64 = 116444736000000000;

/// Number of 100-nanosecond intervals per second.
const INTERVALS_PER_SECOND: u64 = 10_000_000;

/// A UTC instant with 100-nanosecond precision.
///
/// Wraps a Windows FILETIME value (100-nanosecond intervals since January 1, 1601).
/// The zero value, [`Timestamp::EPOCH`], is what physical entries report for
/// paths that do not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    filetime: u64,
}

impl Timestamp {
    /// January 1, 1601 00:00:00 UTC.
    pub const EPOCH: Timestamp = Timestamp { filetime: 0 };

    /// Creates a timestamp from a raw Windows FILETIME value.
    #[inline]
    pub const fn from_filetime(filetime: u64) -> Self {
        Self { filetime }
    }

    /// Creates a timestamp from Unix seconds (since January 1, 1970).
    ///
    /// Returns `None` if the timestamp would fall outside the FILETIME range.
    pub fn from_unix_secs(secs: i64) -> Option<Self> {
        Self::from_unix_secs_nanos(secs, 0)
    }

    /// Creates a timestamp from Unix seconds and nanoseconds.
    ///
    /// Only 100-nanosecond precision is preserved; `nanos` is truncated.
    pub fn from_unix_secs_nanos(secs: i64, nanos: u32) -> Option<Self> {
        let nano_intervals = u64::from(nanos) / 100;
        let base = if secs < 0 {
            let neg_intervals = secs.unsigned_abs().checked_mul(INTERVALS_PER_SECOND)?;
            FILETIME_UNIX_DIFF.checked_sub(neg_intervals)?
        } else {
            let intervals = secs.unsigned_abs().checked_mul(INTERVALS_PER_SECOND)?;
            FILETIME_UNIX_DIFF.checked_add(intervals)?
        };
        base.checked_add(nano_intervals).map(Self::from_filetime)
    }

    /// Creates a timestamp from a `SystemTime`.
    pub fn from_system_time(time: SystemTime) -> Option<Self> {
        match time.duration_since(UNIX_EPOCH) {
            Ok(duration) => Self::from_unix_secs_nanos(
                i64::try_from(duration.as_secs()).ok()?,
                duration.subsec_nanos(),
            ),
            Err(e) => {
                let intervals = e.duration().as_nanos() / 100;
                let intervals = u64::try_from(intervals).ok()?;
                FILETIME_UNIX_DIFF
                    .checked_sub(intervals)
                    .map(Self::from_filetime)
            }
        }
    }

    /// Creates a timestamp from a UTC calendar date and time.
    ///
    /// Returns `None` for an invalid date or one before 1601.
    pub fn from_ymd_hms(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Option<Self> {
        let datetime = Utc
            .with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()?;
        Self::from_datetime(&datetime)
    }

    /// Creates a timestamp from a chrono UTC date time.
    pub fn from_datetime(datetime: &DateTime<Utc>) -> Option<Self> {
        Self::from_unix_secs_nanos(datetime.timestamp(), datetime.timestamp_subsec_nanos())
    }

    /// Returns the current time.
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now()).unwrap_or(Self::EPOCH)
    }

    /// Returns the raw Windows FILETIME value.
    #[inline]
    pub const fn as_filetime(&self) -> u64 {
        self.filetime
    }

    /// Returns the timestamp as Unix seconds, rounded towards negative infinity.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use treepack::Timestamp;
    ///
    /// let ts = Timestamp::from_unix_secs(-3600).unwrap();
    /// assert_eq!(ts.as_unix_secs(), -3600);
    /// ```
    pub fn as_unix_secs(&self) -> i64 {
        if self.filetime >= FILETIME_UNIX_DIFF {
            ((self.filetime - FILETIME_UNIX_DIFF) / INTERVALS_PER_SECOND) as i64
        } else {
            let intervals = FILETIME_UNIX_DIFF - self.filetime;
            let secs = intervals.div_ceil(INTERVALS_PER_SECOND);
            -(secs as i64)
        }
    }

    /// Returns the sub-second portion as nanoseconds (0-999999900).
    #[inline]
    pub fn sub_second_nanos(&self) -> u32 {
        ((self.filetime % INTERVALS_PER_SECOND) * 100) as u32
    }

    /// Converts to a `SystemTime`, preserving full precision.
    pub fn as_system_time(&self) -> SystemTime {
        let (intervals, after_epoch) = if self.filetime >= FILETIME_UNIX_DIFF {
            (self.filetime - FILETIME_UNIX_DIFF, true)
        } else {
            (FILETIME_UNIX_DIFF - self.filetime, false)
        };
        let offset = Duration::new(
            intervals / INTERVALS_PER_SECOND,
            ((intervals % INTERVALS_PER_SECOND) * 100) as u32,
        );
        if after_epoch {
            UNIX_EPOCH + offset
        } else {
            UNIX_EPOCH - offset
        }
    }

    /// Converts to a chrono UTC date time.
    pub fn to_datetime(&self) -> DateTime<Utc> {
        // FILETIME_UNIX_DIFF is a whole number of seconds, so the floored
        // seconds and the sub-second remainder always line up.
        DateTime::from_timestamp(self.as_unix_secs(), self.sub_second_nanos())
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Converts to the MS-DOS date time stored in zip records.
    ///
    /// Zip dates cover 1980-2107 with two-second resolution; instants outside
    /// that range map to the zip default of 1980-01-01.
    pub(crate) fn to_zip_datetime(self) -> zip::DateTime {
        let dt = self.to_datetime();
        let Ok(year) = u16::try_from(dt.year()) else {
            return zip::DateTime::default();
        };
        zip::DateTime::from_date_and_time(
            year,
            dt.month() as u8,
            dt.day() as u8,
            dt.hour() as u8,
            dt.minute() as u8,
            dt.second() as u8,
        )
        .unwrap_or_default()
    }

    /// Converts a zip record's MS-DOS date time.
    pub(crate) fn from_zip_datetime(dt: zip::DateTime) -> Self {
        Self::from_ymd_hms(
            i32::from(dt.year()),
            u32::from(dt.month()),
            u32::from(dt.day()),
            u32::from(dt.hour()),
            u32::from(dt.minute()),
            u32::from(dt.second()),
        )
        .unwrap_or(Self::EPOCH)
    }
}

impl Default for Timestamp {
    /// Returns [`Timestamp::EPOCH`].
    fn default() -> Self {
        Self::EPOCH
    }
}

impl From<Timestamp> for SystemTime {
    fn from(ts: Timestamp) -> SystemTime {
        ts.as_system_time()
    }
}

impl From<Timestamp> for filetime::FileTime {
    fn from(ts: Timestamp) -> filetime::FileTime {
        filetime::FileTime::from_system_time(ts.as_system_time())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_datetime().format("%Y-%m-%dT%H:%M:%SZ"))
    }
}
