//! Seams to the external record store, portrait blob store, and wall clock.

use crate::types::{Identity, Profile, ATTENDANCE_TIME_FORMAT};
use chrono::{Local, NaiveDateTime};
use std::cell::Cell;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("malformed record for {id}: {reason}")]
    Malformed { id: String, reason: String },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Key-value document store holding one [`Profile`] per identity.
pub trait RecordStore {
    /// Read the full document. `Ok(None)` means no record exists.
    fn fetch(&self, id: &Identity) -> Result<Option<Profile>, StoreError>;

    /// Write the two attendance fields of a document.
    fn record_attendance(
        &self,
        id: &Identity,
        total_attendance: u64,
        last_attendance_time: &str,
    ) -> Result<(), StoreError>;
}

/// Blob store holding an encoded portrait image per identity.
pub trait PortraitStore {
    /// Raw encoded bytes. `Ok(None)` means no portrait is stored.
    fn fetch(&self, id: &Identity) -> Result<Option<Vec<u8>>, StoreError>;
}

/// Source of local wall-clock time for the daily attendance rule.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// The external collaborators a session talks to, borrowed for its lifetime.
#[derive(Clone, Copy)]
pub struct Backends<'a> {
    pub records: &'a dyn RecordStore,
    pub portraits: &'a dyn PortraitStore,
    pub clock: &'a dyn Clock,
}

impl<'a> Backends<'a> {
    pub fn new(
        records: &'a dyn RecordStore,
        portraits: &'a dyn PortraitStore,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            records,
            portraits,
            clock,
        }
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock that only moves when told to. Used for replays and tests.
pub struct FixedClock {
    now: Cell<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Cell::new(now),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        self.now.set(now);
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.now.get()
    }
}

/// Format a timestamp the way `last_attendance_time` is stored.
pub fn format_attendance_time(at: NaiveDateTime) -> String {
    at.format(ATTENDANCE_TIME_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_format_attendance_time() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 0)
            .unwrap();
        assert_eq!(format_attendance_time(at), "2024-03-09 07:05:00");
    }

    #[test]
    fn test_fixed_clock_advance() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(23, 59, 0)
            .unwrap();
        let clock = FixedClock::new(start);
        clock.advance(chrono::Duration::minutes(2));
        assert_eq!(clock.now().date(), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
    }
}
