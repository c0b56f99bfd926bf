//! rollcall-core — Presence tracking and daily attendance arbitration.
//!
//! Turns a per-frame stream of recognised faces into idempotent,
//! once-per-day attendance writes and a rotating info-panel selection.
//! Face embedding, record storage, portrait storage, and rendering are
//! supplied from outside through the traits in [`store`] and [`source`].

pub mod cache;
pub mod display;
pub mod ledger;
pub mod matcher;
pub mod presence;
pub mod session;
pub mod source;
pub mod store;
pub mod types;

#[cfg(test)]
mod testing;

pub use cache::{CacheEntry, IdentityCache};
pub use display::{mode_for, DisplayCard, DisplayMode, PanelView};
pub use ledger::{AttendanceLedger, LedgerError, MarkOutcome};
pub use matcher::{identify_frame, DistanceMatcher, Matcher, DEFAULT_MATCH_TOLERANCE};
pub use presence::{PresenceConfig, PresenceTracker};
pub use session::{RunSummary, Session, StopReason};
pub use source::{CaptureError, FrameSource};
pub use store::{Backends, Clock, FixedClock, PortraitStore, RecordStore, StoreError, SystemClock};
pub use types::{DetectionFrame, Embedding, Identity, KnownFace, MatchResult, Profile};
