use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(150);

/// Sentinel for "not reported yet" in every field of [`PositionSnapshot`].
pub const UNKNOWN: f64 = -1.0;

/// Last known timing of a session, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub position: f64,
    pub duration: f64,
    pub remaining: f64,
}

impl Default for PositionSnapshot {
    fn default() -> Self {
        Self {
            position: UNKNOWN,
            duration: UNKNOWN,
            remaining: UNKNOWN,
        }
    }
}

impl PositionSnapshot {
    pub fn duration_known(&self) -> bool {
        self.duration >= 0.0
    }

    pub fn position_known(&self) -> bool {
        self.position >= 0.0
    }

    /// Playback reached the end of the media: there was progress and nothing
    /// is left of a known duration.
    pub fn at_end(&self) -> bool {
        self.duration_known() && self.position > 0.0 && self.remaining <= 0.0
    }
}

/// Position bookkeeping and the polling schedule of one session.
///
/// The schedule is a single optional deadline. Starting an already scheduled
/// tracker does nothing, so a session never owns two timers; stopping is the
/// absence of a reschedule.
#[derive(Debug, Default)]
pub struct PositionTracker {
    snapshot: PositionSnapshot,
    next_tick: Option<Instant>,
}

impl PositionTracker {
    pub fn snapshot(&self) -> PositionSnapshot {
        self.snapshot
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.snapshot.duration = duration;
    }

    /// Applies a position report and recomputes `remaining`; returns it.
    pub fn apply_position(&mut self, position: f64) -> f64 {
        self.snapshot.position = position;
        self.snapshot.remaining = self.snapshot.duration - position;
        self.snapshot.remaining
    }

    /// Overrides the position after a stop or seek acknowledgement.
    ///
    /// `remaining` is left as is: it is only derived from position reports.
    pub fn set_position(&mut self, position: f64) {
        self.snapshot.position = position;
    }

    pub fn next_tick(&self) -> Option<Instant> {
        self.next_tick
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_tick.is_some_and(|t| t <= now)
    }

    /// Schedules an immediate first tick unless already scheduled.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.next_tick.is_some() {
            return false;
        }
        self.next_tick = Some(now);
        true
    }

    /// Top of a tick: reschedules only while `active`, otherwise drops the
    /// schedule. Returns whether the tick should run.
    pub fn begin_tick(&mut self, now: Instant, interval: Duration, active: bool) -> bool {
        if !active {
            self.next_tick = None;
            return false;
        }
        self.next_tick = Some(now + interval);
        true
    }
}
