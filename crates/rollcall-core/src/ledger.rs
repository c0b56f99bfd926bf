//! Once-per-calendar-day attendance marking.
//!
//! The ledger keeps two local guards in front of the record store: a
//! per-identity "already marked today" flag and the set of identities
//! marked during this process. Both are caches; the record's
//! `last_attendance_time` stays the source of truth and is re-derived on
//! first sight after a restart.

use crate::cache::IdentityCache;
use crate::store::{format_attendance_time, Backends, StoreError};
use crate::types::Identity;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("could not refresh record for {id} before writing: {source}")]
    Refresh {
        id: Identity,
        #[source]
        source: StoreError,
    },
    #[error("attendance write failed for {id}: {source}")]
    Write {
        id: Identity,
        #[source]
        source: StoreError,
    },
}

/// What a mark attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkOutcome {
    /// Marked earlier in this session; nothing was read or written.
    SessionHit,
    /// The record is already dated today.
    AlreadyMarkedToday,
    /// The counter was incremented and the timestamp written.
    Marked { before: u64, after: u64, at: String },
}

#[derive(Debug, Clone, Copy)]
struct DailyFlag {
    date: NaiveDate,
    marked: bool,
}

#[derive(Default)]
pub struct AttendanceLedger {
    daily: HashMap<Identity, DailyFlag>,
    session_marked: HashSet<Identity>,
}

impl AttendanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the identity's attendance unless it is already marked today.
    ///
    /// On error no local state changes, so calling again retries the whole
    /// sequence. Retrying is up to the caller.
    pub fn mark_if_needed(
        &mut self,
        id: &Identity,
        cache: &mut IdentityCache,
        backends: &Backends<'_>,
    ) -> Result<MarkOutcome, LedgerError> {
        let today = backends.clock.now().date();

        if self.session_marked.contains(id) && self.flag_for(id, today) == Some(true) {
            return Ok(MarkOutcome::SessionHit);
        }

        let entry = cache.get(id, backends);
        let already_marked = match self.flag_for(id, today) {
            Some(marked) => marked,
            None => {
                let marked = entry.profile.last_attendance_date() == Some(today);
                self.daily.insert(id.clone(), DailyFlag { date: today, marked });
                marked
            }
        };
        if already_marked {
            return Ok(MarkOutcome::AlreadyMarkedToday);
        }

        // Re-read right before writing so the increment starts from the
        // stored counter rather than the cached one.
        let fresh = backends
            .records
            .fetch(id)
            .map_err(|source| LedgerError::Refresh {
                id: id.clone(),
                source,
            })?
            .unwrap_or_default();

        let before = fresh.total();
        let after = before + 1;
        let now = backends.clock.now();
        let stamp = format_attendance_time(now);

        backends
            .records
            .record_attendance(id, after, &stamp)
            .map_err(|source| LedgerError::Write {
                id: id.clone(),
                source,
            })?;

        self.daily.insert(
            id.clone(),
            DailyFlag {
                date: now.date(),
                marked: true,
            },
        );
        self.session_marked.insert(id.clone());
        cache.record_mark(id, after, &stamp);

        tracing::info!(id = %id, before, after, at = %stamp, "attendance marked");

        Ok(MarkOutcome::Marked {
            before,
            after,
            at: stamp,
        })
    }

    /// Whether this process has marked the identity at least once.
    pub fn marked_this_session(&self, id: &Identity) -> bool {
        self.session_marked.contains(id)
    }

    /// The cached daily flag, ignoring flags computed on an earlier date.
    fn flag_for(&self, id: &Identity, today: NaiveDate) -> Option<bool> {
        self.daily
            .get(id)
            .filter(|flag| flag.date == today)
            .map(|flag| flag.marked)
    }
}
