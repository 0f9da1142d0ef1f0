//! Session clock - the monotonic time source every generator is scheduled by

use serde::{Deserialize, Serialize};

/// Seconds of session time since the clock was created
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Timestamp(f64);

impl Timestamp {
    pub const ZERO: Self = Self(0.0);

    pub fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> f64 {
        self.0
    }

    /// Timestamp `secs` seconds after this one
    pub fn after(self, secs: f64) -> Self {
        Self(self.0 + secs)
    }

    /// Seconds from `earlier` to `self`, zero if `earlier` is later
    pub fn since(self, earlier: Timestamp) -> f64 {
        (self.0 - earlier.0).max(0.0)
    }

    pub fn max(self, other: Timestamp) -> Self {
        if other.0 > self.0 {
            other
        } else {
            self
        }
    }
}

/// Anything that can tell the scheduler what time it is.
///
/// Implementations must never report a time earlier than one already reported
/// within the same session.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Monotonic simulation clock driven by frame deltas.
///
/// A paused clock is frozen: deltas delivered while paused are discarded
/// rather than replayed on resume.
#[derive(Debug, Clone)]
pub struct SessionClock {
    now: Timestamp,
    paused: bool,
    time_scale: f32,
}

impl SessionClock {
    pub fn new() -> Self {
        Self::starting_at(Timestamp::ZERO)
    }

    pub fn starting_at(now: Timestamp) -> Self {
        Self {
            now,
            paused: false,
            time_scale: 1.0,
        }
    }

    /// Advance by `delta_seconds` of wall time, scaled by the time scale.
    /// Negative and non-finite deltas are ignored.
    pub fn advance(&mut self, delta_seconds: f32) {
        if self.paused || !delta_seconds.is_finite() || delta_seconds <= 0.0 {
            return;
        }
        self.now = self.now.after((delta_seconds * self.time_scale) as f64);
    }

    /// Jump forward to `target`. Earlier targets are ignored.
    pub fn advance_to(&mut self, target: Timestamp) {
        self.now = self.now.max(target);
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Set time scale (1.0 = real-time, 2.0 = 2x speed, etc.)
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = if scale.is_finite() { scale.max(0.0) } else { 1.0 };
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SessionClock {
    fn now(&self) -> Timestamp {
        self.now
    }
}
