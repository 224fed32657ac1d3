//! Wall-clock sources.
//!
//! Engines never read the clock themselves; callers pass `now` in. The card
//! controller and the frame loop read it through this trait so tests and
//! replays can substitute a [`ManualClock`].

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A settable clock with millisecond resolution.
///
/// Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    epoch_ms: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            epoch_ms: Arc::new(AtomicI64::new(start.timestamp_millis())),
        }
    }

    /// A clock parked at the Unix epoch.
    pub fn at_epoch() -> Self {
        Self::new(DateTime::<Utc>::default())
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.epoch_ms.store(at.timestamp_millis(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.epoch_ms
            .fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }

    pub fn advance_secs_f64(&self, secs: f64) {
        self.epoch_ms
            .fetch_add((secs * 1000.0).round() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.epoch_ms.load(Ordering::SeqCst))
            .single()
            .unwrap_or_default()
    }
}

/// Seconds from `earlier` to `later`, never negative.
pub fn seconds_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    let delta = later - earlier;
    let secs = match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1000.0,
    };
    secs.max(0.0)
}

/// `at` shifted back by a fractional number of seconds. Saturates at the
/// earliest representable instant.
pub fn shift_back(at: DateTime<Utc>, secs: f64) -> DateTime<Utc> {
    let delta = Duration::microseconds((secs * 1_000_000.0).round() as i64);
    at.checked_sub_signed(delta).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::at_epoch();
        let other = clock.clone();
        clock.advance(Duration::seconds(5));
        assert_eq!(other.now().timestamp(), 5);
    }

    #[test]
    fn seconds_between_clamps_negative() {
        let a = DateTime::<Utc>::default();
        let b = a + Duration::milliseconds(1500);
        assert_eq!(seconds_between(a, b), 1.5);
        assert_eq!(seconds_between(b, a), 0.0);
    }

    #[test]
    fn shift_back_is_inverse_of_seconds_between() {
        let now = DateTime::<Utc>::default() + Duration::seconds(100);
        let start = shift_back(now, 12.25);
        assert_eq!(seconds_between(start, now), 12.25);
    }

    #[test]
    fn shift_back_saturates_instead_of_overflowing() {
        let now = DateTime::<Utc>::default();
        assert_eq!(shift_back(now, 1e18), DateTime::<Utc>::MIN_UTC);
    }
}
