//! Rotation queue of visible identities and the single "on display" cursor.
//!
//! The queue keeps first-seen order and drops an identity on the first
//! non-empty frame it is missing from. The cursor walks the queue
//! round-robin every `rotate_interval`. When nobody is visible the queue
//! and cursor are held for `idle_timeout` after the last sighting, so a
//! brief look-away neither flashes the idle screen nor resets rotation.

use crate::types::Identity;
use std::collections::VecDeque;
use std::time::Duration;

pub const DEFAULT_ROTATE_INTERVAL: Duration = Duration::from_millis(200);
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceConfig {
    pub rotate_interval: Duration,
    pub idle_timeout: Duration,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            rotate_interval: DEFAULT_ROTATE_INTERVAL,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

pub struct PresenceTracker {
    config: PresenceConfig,
    queue: VecDeque<Identity>,
    cursor: Option<Identity>,
    /// Queue position the cursor was last placed at.
    slot: usize,
    last_face_time: Option<Duration>,
    last_rotate_time: Option<Duration>,
}

impl PresenceTracker {
    pub fn new(config: PresenceConfig) -> Self {
        Self {
            config,
            queue: VecDeque::new(),
            cursor: None,
            slot: 0,
            last_face_time: None,
            last_rotate_time: None,
        }
    }

    /// Feed one frame's visible identities and return the one to display.
    ///
    /// `visible` must be duplicate-free; its order decides the queue order
    /// of identities first seen in the same frame.
    pub fn update(&mut self, visible: &[Identity], now: Duration) -> Option<&Identity> {
        if visible.is_empty() {
            let holding = self
                .last_face_time
                .is_some_and(|seen| now.saturating_sub(seen) < self.config.idle_timeout);
            if !holding {
                if let Some(last) = self.cursor.take() {
                    tracing::debug!(last = %last, "idle timeout; display cleared");
                }
                self.queue.clear();
                self.slot = 0;
            }
            return self.cursor.as_ref();
        }

        self.queue.retain(|id| visible.contains(id));
        for id in visible {
            if !self.queue.contains(id) {
                self.queue.push_back(id.clone());
            }
        }
        self.last_face_time = Some(now);

        let interval_elapsed = self
            .last_rotate_time
            .map_or(true, |t| now.saturating_sub(t) >= self.config.rotate_interval);
        let cursor_queued = self
            .cursor
            .as_ref()
            .is_some_and(|c| self.queue.contains(c));

        if interval_elapsed || !cursor_queued {
            self.rotate();
            self.last_rotate_time = Some(now);
        }

        self.cursor.as_ref()
    }

    /// Advance the cursor to the next queued identity.
    ///
    /// If the displayed identity left the queue, whoever moved into its
    /// slot is shown next. Requires a non-empty queue.
    fn rotate(&mut self) {
        let len = self.queue.len();
        let position = self
            .cursor
            .as_ref()
            .and_then(|c| self.queue.iter().position(|q| q == c));

        self.slot = match position {
            Some(pos) => (pos + 1) % len,
            None if self.slot < len => self.slot,
            None => 0,
        };
        self.cursor = Some(self.queue[self.slot].clone());
    }

    pub fn cursor(&self) -> Option<&Identity> {
        self.cursor.as_ref()
    }

    /// Queued identities in first-seen order.
    pub fn queue(&self) -> impl Iterator<Item = &Identity> {
        self.queue.iter()
    }

    pub fn is_queued(&self, id: &Identity) -> bool {
        self.queue.contains(id)
    }

    pub fn config(&self) -> PresenceConfig {
        self.config
    }
}
