//! Wall-clock source for alarm computations.
//!
//! Dose and appointment times are local wall-clock values. Converting one to
//! an instant needs the UTC offset in force on that date, which after a
//! daylight-saving change differs from the offset in force now.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    /// Epoch milliseconds of a local wall-clock time.
    fn local_to_epoch_ms(&self, local: NaiveDateTime) -> i64;
}

/// Epoch milliseconds of `local` read at a fixed offset.
pub fn fixed_epoch_ms(offset: FixedOffset, local: NaiveDateTime) -> i64 {
    local.and_utc().timestamp_millis() - i64::from(offset.local_minus_utc()) * 1000
}

/// Epoch milliseconds of `local` in `tz`, using the offset of that date.
///
/// An ambiguous time (clocks going back) resolves to its first occurrence.
/// A time inside a gap (clocks going forward) is read at `gap_offset`.
pub fn zoned_epoch_ms<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime, gap_offset: FixedOffset) -> i64 {
    match tz.from_local_datetime(&local).earliest() {
        Some(dt) => dt.timestamp_millis(),
        None => fixed_epoch_ms(gap_offset, local),
    }
}

/// The system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }

    fn local_to_epoch_ms(&self, local: NaiveDateTime) -> i64 {
        zoned_epoch_ms(&Local, local, *self.now().offset())
    }
}

/// A clock pinned to one instant, in a zone without daylight saving.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl FixedClock {
    /// Pin to a local wall-clock time at `offset_hours` east of UTC.
    pub fn at(local: NaiveDateTime, offset_hours: i32) -> Option<Self> {
        let offset = FixedOffset::east_opt(offset_hours * 3600)?;
        offset.from_local_datetime(&local).single().map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }

    fn local_to_epoch_ms(&self, local: NaiveDateTime) -> i64 {
        fixed_epoch_ms(*self.0.offset(), local)
    }
}
