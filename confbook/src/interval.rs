//! Half-open time intervals used for reservation slots.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A half-open time interval `[start, end)` in UTC.
///
/// Intervals describe reservation slots. Two intervals overlap only when
/// they share a non-empty span, so back-to-back slots never collide.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use confbook::Interval;
///
/// let start = Utc.with_ymd_and_hms(2013, 1, 1, 12, 0, 0).unwrap();
/// let slot = Interval::from_duration(start, Duration::hours(2)).unwrap();
/// assert_eq!(slot.duration(), Duration::hours(2));
///
/// let next = Interval::from_duration(slot.end(), Duration::hours(1)).unwrap();
/// assert!(!slot.overlaps(&next));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Interval {
    /// Creates an interval from its bounds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInterval`] when `end` precedes `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end < start {
            return Err(Error::InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates an interval starting at `start` and lasting `duration`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInterval`] for a negative duration.
    pub fn from_duration(start: DateTime<Utc>, duration: Duration) -> Result<Self> {
        Self::new(start, start + duration)
    }

    /// Returns the inclusive start of the interval.
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Returns the exclusive end of the interval.
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Returns the length of the interval.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Checks whether `other` lies entirely within this interval.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Checks whether the given instant lies within this interval.
    #[must_use]
    pub fn contains_instant(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Checks whether the two intervals share a non-empty span.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns the common span of two intervals, if they overlap.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        if !self.overlaps(other) {
            return None;
        }
        Some(Self {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}
