//! Per-frame orchestration: identify, mark, track, pick a mode, build the card.

use crate::cache::IdentityCache;
use crate::display::{mode_for, DisplayCard, PanelView};
use crate::ledger::{AttendanceLedger, MarkOutcome};
use crate::matcher::{identify_frame, Matcher};
use crate::presence::{PresenceConfig, PresenceTracker};
use crate::source::{CaptureError, FrameSource};
use crate::store::Backends;
use crate::types::{DetectionFrame, Identity, KnownFace};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Why [`Session::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub marks: u64,
    pub stop: StopReason,
}

/// All mutable tracking state for one process run.
///
/// Owns the caches, ledger, and tracker; borrows the external stores.
/// Everything runs on the caller's thread.
pub struct Session<'a> {
    backends: Backends<'a>,
    gallery: Vec<KnownFace>,
    matcher: Box<dyn Matcher + 'a>,
    cache: IdentityCache,
    ledger: AttendanceLedger,
    tracker: PresenceTracker,
    marks: u64,
}

impl<'a> Session<'a> {
    pub fn new(
        backends: Backends<'a>,
        gallery: Vec<KnownFace>,
        matcher: Box<dyn Matcher + 'a>,
        presence: PresenceConfig,
    ) -> Self {
        tracing::info!(
            gallery = gallery.len(),
            rotate_interval = ?presence.rotate_interval,
            idle_timeout = ?presence.idle_timeout,
            "session created"
        );
        Self {
            backends,
            gallery,
            matcher,
            cache: IdentityCache::new(),
            ledger: AttendanceLedger::new(),
            tracker: PresenceTracker::new(presence),
            marks: 0,
        }
    }

    /// Match a frame's faces against the gallery, then process the result.
    pub fn process_frame(&mut self, frame: &DetectionFrame) -> PanelView {
        let visible = identify_frame(frame, &self.gallery, self.matcher.as_ref());
        self.observe(&visible, frame.at)
    }

    /// Process one frame whose faces are already resolved to identities.
    pub fn observe(&mut self, visible: &[Identity], at: Duration) -> PanelView {
        for id in visible {
            match self.ledger.mark_if_needed(id, &mut self.cache, &self.backends) {
                Ok(MarkOutcome::Marked { .. }) => self.marks += 1,
                Ok(_) => {}
                Err(err) => {
                    tracing::error!(id = %id, error = %err, "attendance not recorded; will retry on next sighting");
                }
            }
        }

        let cursor = self.tracker.update(visible, at).cloned();
        let mode = mode_for(visible, cursor.as_ref());

        let card = cursor.map(|id| {
            let entry = self.cache.get(&id, &self.backends);
            DisplayCard {
                profile: entry.profile.clone(),
                portrait: entry.portrait.clone(),
                identity: id,
            }
        });

        PanelView { at, mode, card }
    }

    /// Pull frames until the source ends, `stop` is raised, or capture fails.
    ///
    /// `stop` is checked once before each frame. A capture error ends the
    /// loop and is returned to the caller.
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        stop: &AtomicBool,
        mut sink: impl FnMut(&PanelView),
    ) -> Result<RunSummary, CaptureError> {
        let mut frames = 0u64;
        let marks_before = self.marks;

        let reason = loop {
            if stop.load(Ordering::Relaxed) {
                break StopReason::Cancelled;
            }
            let Some(frame) = source.next_frame()? else {
                break StopReason::EndOfStream;
            };
            let view = self.process_frame(&frame);
            sink(&view);
            frames += 1;
        };

        let summary = RunSummary {
            frames,
            marks: self.marks - marks_before,
            stop: reason,
        };
        tracing::info!(frames, marks = summary.marks, stop = ?reason, "frame loop finished");
        Ok(summary)
    }

    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    pub fn ledger(&self) -> &AttendanceLedger {
        &self.ledger
    }

    pub fn tracker(&self) -> &PresenceTracker {
        &self.tracker
    }

    /// Attendance writes made by this session so far.
    pub fn marks(&self) -> u64 {
        self.marks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DisplayMode;
    use crate::matcher::DistanceMatcher;
    use crate::store::FixedClock;
    use crate::testing::{at, png_bytes, student, MemoryPortraits, MemoryRecords, ScriptedSource};
    use crate::types::Embedding;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn gallery() -> Vec<KnownFace> {
        vec![
            KnownFace {
                id: Identity::from("011"),
                embedding: Embedding::new(vec![1.0, 0.0]),
            },
            KnownFace {
                id: Identity::from("012"),
                embedding: Embedding::new(vec![0.0, 1.0]),
            },
        ]
    }

    fn frame(t: u64, faces: &[[f32; 2]]) -> DetectionFrame {
        DetectionFrame {
            at: ms(t),
            faces: faces.iter().map(|f| Embedding::new(f.to_vec())).collect(),
        }
    }

    #[test]
    fn test_single_identity_for_one_second() {
        let records = MemoryRecords::with([("011", student(7, "2022-12-11 00:54:34"))]);
        let portraits = MemoryPortraits::with([("011", png_bytes(8, 8))]);
        let clock = FixedClock::new(at(2024, 5, 2, 9, 0, 0));
        let backends = Backends::new(&records, &portraits, &clock);
        let mut session = Session::new(
            backends,
            gallery(),
            Box::new(DistanceMatcher::default()),
            PresenceConfig::default(),
        );

        for i in 0..10u64 {
            let view = session.process_frame(&frame(i * 100, &[[0.98, 0.05]]));
            assert_eq!(view.mode, DisplayMode::Info);
            let card = view.card.expect("card shown");
            assert_eq!(card.identity.as_str(), "011");
            assert_eq!(card.profile.total(), 8);
            assert!(card.portrait.is_some());
        }

        assert_eq!(records.writes.get(), 1);
        assert_eq!(portraits.fetches.get(), 1);
        assert_eq!(session.marks(), 1);
    }

    #[test]
    fn test_nobody_ever_seen() {
        let records = MemoryRecords::default();
        let portraits = MemoryPortraits::default();
        let clock = FixedClock::new(at(2024, 5, 2, 9, 0, 0));
        let backends = Backends::new(&records, &portraits, &clock);
        let mut session = Session::new(
            backends,
            gallery(),
            Box::new(DistanceMatcher::default()),
            PresenceConfig::default(),
        );

        for i in 0..50u64 {
            let view = session.process_frame(&frame(i * 200, &[]));
            assert_eq!(view.mode, DisplayMode::Active);
            assert!(view.card.is_none());
        }
        // Unrecognised faces count as nobody.
        let view = session.process_frame(&frame(10_000, &[[-5.0, -5.0]]));
        assert_eq!(view.mode, DisplayMode::Active);
        assert_eq!(records.fetches.get(), 0);
    }

    #[test]
    fn test_idle_hold_keeps_info_mode() {
        let records = MemoryRecords::with([("011", student(7, "2022-12-11 00:54:34"))]);
        let portraits = MemoryPortraits::default();
        let clock = FixedClock::new(at(2024, 5, 2, 9, 0, 0));
        let backends = Backends::new(&records, &portraits, &clock);
        let mut session = Session::new(
            backends,
            gallery(),
            Box::new(DistanceMatcher::default()),
            PresenceConfig::default(),
        );

        session.process_frame(&frame(0, &[[1.0, 0.0]]));
        let held = session.process_frame(&frame(4_000, &[]));
        assert_eq!(held.mode, DisplayMode::Info);
        assert_eq!(held.identity().map(Identity::as_str), Some("011"));

        let idle = session.process_frame(&frame(5_000, &[]));
        assert_eq!(idle.mode, DisplayMode::Active);
        assert!(idle.card.is_none());
    }

    #[test]
    fn test_two_people_marked_and_rotated() {
        let records = MemoryRecords::with([
            ("011", student(7, "2022-12-11 00:54:34")),
            ("012", student(12, "2022-12-11 00:54:34")),
        ]);
        let portraits = MemoryPortraits::default();
        let clock = FixedClock::new(at(2024, 5, 2, 9, 0, 0));
        let backends = Backends::new(&records, &portraits, &clock);
        let mut session = Session::new(
            backends,
            gallery(),
            Box::new(DistanceMatcher::default()),
            PresenceConfig::default(),
        );

        let both = [[1.0, 0.0], [0.0, 1.0]];
        let shown: Vec<String> = (0..4u64)
            .map(|i| {
                session
                    .process_frame(&frame(i * 200, &both))
                    .identity()
                    .unwrap()
                    .to_string()
            })
            .collect();
        assert_eq!(shown, vec!["011", "012", "011", "012"]);
        assert_eq!(records.writes.get(), 2);
        assert_eq!(records.get("012").unwrap().total(), 13);
    }

    #[test]
    fn test_write_failure_does_not_stop_frame() {
        let records = MemoryRecords::with([("011", student(7, "2022-12-11 00:54:34"))]);
        records.fail_writes.set(true);
        let portraits = MemoryPortraits::default();
        let clock = FixedClock::new(at(2024, 5, 2, 9, 0, 0));
        let backends = Backends::new(&records, &portraits, &clock);
        let mut session = Session::new(
            backends,
            gallery(),
            Box::new(DistanceMatcher::default()),
            PresenceConfig::default(),
        );

        let view = session.process_frame(&frame(0, &[[1.0, 0.0]]));
        assert_eq!(view.mode, DisplayMode::Info);
        assert_eq!(view.card.unwrap().profile.total(), 7);

        records.fail_writes.set(false);
        let view = session.process_frame(&frame(100, &[[1.0, 0.0]]));
        assert_eq!(view.card.unwrap().profile.total(), 8);
        assert_eq!(records.writes.get(), 1);
    }

    #[test]
    fn test_run_until_end_of_stream() {
        let records = MemoryRecords::with([("011", student(7, "2022-12-11 00:54:34"))]);
        let portraits = MemoryPortraits::default();
        let clock = FixedClock::new(at(2024, 5, 2, 9, 0, 0));
        let backends = Backends::new(&records, &portraits, &clock);
        let mut session = Session::new(
            backends,
            gallery(),
            Box::new(DistanceMatcher::default()),
            PresenceConfig::default(),
        );
        let mut source = ScriptedSource::new(vec![
            Ok(frame(0, &[[1.0, 0.0]])),
            Ok(frame(100, &[[1.0, 0.0]])),
            Ok(frame(200, &[])),
        ]);

        let mut modes = Vec::new();
        let summary = session
            .run(&mut source, &AtomicBool::new(false), |view| modes.push(view.mode))
            .unwrap();
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.marks, 1);
        assert_eq!(summary.stop, StopReason::EndOfStream);
        assert_eq!(modes, vec![DisplayMode::Info; 3]);
    }

    #[test]
    fn test_run_honours_stop_flag() {
        let records = MemoryRecords::default();
        let portraits = MemoryPortraits::default();
        let clock = FixedClock::new(at(2024, 5, 2, 9, 0, 0));
        let backends = Backends::new(&records, &portraits, &clock);
        let mut session = Session::new(
            backends,
            gallery(),
            Box::new(DistanceMatcher::default()),
            PresenceConfig::default(),
        );
        let mut source = ScriptedSource::new((0..10).map(|i| Ok(frame(i * 10, &[]))).collect());
        let stop = AtomicBool::new(false);

        let mut seen = 0;
        let summary = session
            .run(&mut source, &stop, |_| {
                seen += 1;
                if seen == 3 {
                    stop.store(true, Ordering::Relaxed);
                }
            })
            .unwrap();
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.stop, StopReason::Cancelled);
    }

    #[test]
    fn test_run_stops_on_capture_failure() {
        let records = MemoryRecords::default();
        let portraits = MemoryPortraits::default();
        let clock = FixedClock::new(at(2024, 5, 2, 9, 0, 0));
        let backends = Backends::new(&records, &portraits, &clock);
        let mut session = Session::new(
            backends,
            gallery(),
            Box::new(DistanceMatcher::default()),
            PresenceConfig::default(),
        );
        let mut source = ScriptedSource::new(vec![
            Ok(frame(0, &[])),
            Err(CaptureError::Device("unplugged".into())),
            Ok(frame(20, &[])),
        ]);

        let mut frames = 0;
        let err = session
            .run(&mut source, &AtomicBool::new(false), |_| frames += 1)
            .unwrap_err();
        assert!(matches!(err, CaptureError::Device(_)));
        assert_eq!(frames, 1);
    }
}
