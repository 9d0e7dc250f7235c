//! Elapsed/duration bookkeeping for the active source.
//!
//! The clock is not a timer: it is fed positions by the controller, which
//! samples the remote source at most once per interval.

use std::time::{Duration, Instant};

pub struct ProgressClock {
    elapsed: f64,
    duration: f64,
    interval: Duration,
    last_sample: Option<Instant>,
}

impl ProgressClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            elapsed: 0.0,
            duration: 0.0,
            interval,
            last_sample: None,
        }
    }

    /// Forget the current track's position and duration.
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.duration = 0.0;
        self.last_sample = None;
    }

    /// Record the duration. `None`, NaN, infinite or negative values mean unknown.
    pub fn set_duration(&mut self, duration: Option<f64>) {
        self.duration = duration.map(sanitize).unwrap_or(0.0);
        self.elapsed = self.clamp(self.elapsed);
    }

    /// Record a playback position and return the stored (clamped) value.
    pub fn update(&mut self, elapsed: f64) -> f64 {
        self.elapsed = self.clamp(sanitize(elapsed));
        self.elapsed
    }

    /// Whether a new position sample is due at `now`; marks the sample taken.
    pub fn due(&mut self, now: Instant) -> bool {
        match self.last_sample {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last_sample = Some(now);
                true
            }
        }
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    fn clamp(&self, elapsed: f64) -> f64 {
        if self.duration > 0.0 {
            elapsed.min(self.duration)
        } else {
            elapsed
        }
    }
}

fn sanitize(secs: f64) -> f64 {
    if secs.is_finite() && secs > 0.0 { secs } else { 0.0 }
}

/// Progress in percent, 0 when the duration is unknown.
pub fn percentage(elapsed: f64, duration: f64) -> f64 {
    let duration = sanitize(duration);
    if duration > 0.0 {
        (sanitize(elapsed) / duration * 100.0).min(100.0)
    } else {
        0.0
    }
}

/// Format seconds as `m:ss`; unknown values render as `0:00`.
pub fn format_time(secs: f64) -> String {
    let total = sanitize(secs).floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
