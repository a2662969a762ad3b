//! Wall-clock countdown.
//!
//! Remaining time is always derived from a stored start instant, never from
//! a count of ticks, so missed polls or a suspended host do not drift.

use chrono::{DateTime, Duration, Local};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    total: Duration,
    /// Nominal start: the instant the countdown would have started had it
    /// never been paused.
    started_at: DateTime<Local>,
    /// Elapsed time frozen at the moment of pausing.
    frozen: Option<Duration>,
}

impl Countdown {
    pub fn start(total: Duration, now: DateTime<Local>) -> Self {
        Self {
            total,
            started_at: now,
            frozen: None,
        }
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn is_paused(&self) -> bool {
        self.frozen.is_some()
    }

    /// Time counted so far, within `0..=total`.
    pub fn elapsed(&self, now: DateTime<Local>) -> Duration {
        match self.frozen {
            Some(elapsed) => elapsed,
            None => (now - self.started_at).clamp(Duration::zero(), self.total),
        }
    }

    /// Never negative.
    pub fn remaining(&self, now: DateTime<Local>) -> Duration {
        self.total - self.elapsed(now)
    }

    /// Fraction of the session still to go, from 1.0 down to 0.0.
    pub fn progress(&self, now: DateTime<Local>) -> f64 {
        let total = self.total.num_milliseconds();
        if total <= 0 {
            return 0.0;
        }
        self.remaining(now).num_milliseconds() as f64 / total as f64
    }

    pub fn is_finished(&self, now: DateTime<Local>) -> bool {
        self.remaining(now) <= Duration::zero()
    }

    pub fn pause(&mut self, now: DateTime<Local>) {
        if self.frozen.is_none() {
            self.frozen = Some(self.elapsed(now));
        }
    }

    /// Re-anchors the start at `now - elapsed` so the deadline moves by
    /// exactly the time spent paused.
    pub fn resume(&mut self, now: DateTime<Local>) {
        if let Some(elapsed) = self.frozen.take() {
            self.started_at = now - elapsed;
        }
    }

    /// Instant at which the countdown reaches zero if it keeps running.
    pub fn deadline(&self, now: DateTime<Local>) -> DateTime<Local> {
        now + self.remaining(now)
    }
}

/// Formats a remaining duration as `MM:SS`, rounding down.
pub fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.num_seconds().max(0);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
