//! Countdown engine for a single timer.
//!
//! The engine is a wall-clock-based state machine. It does not use internal
//! threads or decrement a counter: the caller passes `now` into `poll()` and
//! remaining time is recomputed from the start of the current run segment,
//! so missed or extra polls never accumulate drift.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> (Paused | Completed) -> Idle
//!            ^----------'
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new("tea", "Tea", 180.0);
//! engine.start(now)?;
//! // On every frame:
//! if let Some(Event::TimerCompleted { .. }) = engine.poll(now) { ring(); }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::display::format_remaining;
use crate::clock::{seconds_between, shift_back};
use crate::error::ValidationError;
use crate::events::Event;

/// Longest countdown a timer accepts: one hundred years.
pub const MAX_DURATION_SECS: f64 = 100.0 * 365.25 * 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
}

/// Core countdown engine.
///
/// Serialized as the persisted timer record (`timerState_<id>`); every field
/// falls back to a default so legacy records still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerEngine {
    id: String,
    #[serde(default)]
    name: String,
    /// Configured countdown length in seconds.
    #[serde(default)]
    initial_duration: f64,
    /// Remaining seconds. Authoritative while not running; while running it
    /// caches the value computed by the latest poll.
    #[serde(default)]
    remaining: f64,
    #[serde(default)]
    state: TimerState,
    #[serde(default)]
    show_decimals: bool,
    #[serde(default = "default_true")]
    alarm_enabled: bool,
    /// Back-dated start of the current run segment: `now - (initial - remaining)`
    /// at the moment `start()` was called.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    segment_started_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl TimerEngine {
    /// Create an idle engine with `remaining == initial_duration`.
    ///
    /// Zero is accepted here (a fresh, unconfigured timer); `configure()` is
    /// the validated path.
    pub fn new(id: impl Into<String>, name: impl Into<String>, initial_duration: f64) -> Self {
        let initial_duration = sanitize_secs(initial_duration);
        Self {
            id: id.into(),
            name: name.into(),
            initial_duration,
            remaining: initial_duration,
            state: TimerState::Idle,
            show_decimals: false,
            alarm_enabled: true,
            segment_started_at: None,
        }
    }

    /// Bring a deserialized record back to a consistent state.
    ///
    /// Out-of-range numbers are clamped, including durations past
    /// [`MAX_DURATION_SECS`]. A running record without a segment
    /// start cannot be resumed and is restored as paused.
    pub fn normalized(mut self) -> Self {
        self.initial_duration = sanitize_secs(self.initial_duration);
        self.remaining = sanitize_secs(self.remaining).min(self.initial_duration);
        match self.state {
            TimerState::Running if self.segment_started_at.is_none() => {
                self.state = TimerState::Paused;
            }
            TimerState::Running => {}
            TimerState::Completed => {
                self.remaining = 0.0;
                self.segment_started_at = None;
            }
            TimerState::Idle | TimerState::Paused => {
                self.segment_started_at = None;
            }
        }
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn initial_duration(&self) -> f64 {
        self.initial_duration
    }

    /// Remaining seconds as of the last mutation or poll.
    pub fn remaining(&self) -> f64 {
        self.remaining
    }

    /// Remaining seconds at `now` without mutating anything.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> f64 {
        match (self.state, self.segment_started_at) {
            (TimerState::Running, Some(start)) => {
                (self.initial_duration - seconds_between(start, now)).max(0.0)
            }
            _ => self.remaining,
        }
    }

    pub fn segment_started_at(&self) -> Option<DateTime<Utc>> {
        self.segment_started_at
    }

    pub fn show_decimals(&self) -> bool {
        self.show_decimals
    }

    pub fn alarm_enabled(&self) -> bool {
        self.alarm_enabled
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    /// 0.0 .. 1.0 fraction of the configured duration already used.
    pub fn progress(&self, now: DateTime<Utc>) -> f64 {
        if self.initial_duration <= 0.0 {
            return 0.0;
        }
        (1.0 - self.remaining_at(now) / self.initial_duration).clamp(0.0, 1.0)
    }

    pub fn display(&self, now: DateTime<Utc>) -> String {
        format_remaining(self.remaining_at(now), self.show_decimals)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Event {
        Event::StateSnapshot {
            timer_id: self.id.clone(),
            name: self.name.clone(),
            state: self.state,
            remaining_secs: self.remaining_at(now),
            duration_secs: self.initial_duration,
            display: self.display(now),
            progress: self.progress(now),
            at: now,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Set a new duration and name. Always lands in `Idle` at full duration.
    ///
    /// # Errors
    /// Rejects a non-positive duration or blank name without touching state.
    pub fn configure(
        &mut self,
        initial_duration: f64,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Event, ValidationError> {
        if !initial_duration.is_finite() || initial_duration <= 0.0 {
            return Err(ValidationError::NonPositiveDuration {
                value: initial_duration,
            });
        }
        if initial_duration > MAX_DURATION_SECS {
            return Err(ValidationError::DurationTooLong {
                value: initial_duration,
                max: MAX_DURATION_SECS,
            });
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName { field: "name" });
        }
        self.name = name.to_string();
        self.initial_duration = initial_duration;
        self.remaining = initial_duration;
        self.state = TimerState::Idle;
        self.segment_started_at = None;
        debug!(timer_id = %self.id, duration = initial_duration, "timer configured");
        Ok(Event::TimerConfigured {
            timer_id: self.id.clone(),
            name: self.name.clone(),
            duration_secs: initial_duration,
            at: now,
        })
    }

    /// Begin or resume a run segment.
    ///
    /// Returns `Ok(None)` when already running.
    ///
    /// # Errors
    /// `NothingToRun` when there is no remaining time (completed, or a zero
    /// duration timer).
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<Option<Event>, ValidationError> {
        match self.state {
            TimerState::Running => Ok(None),
            _ if self.remaining <= 0.0 => Err(ValidationError::NothingToRun {
                timer_id: self.id.clone(),
            }),
            TimerState::Idle | TimerState::Paused | TimerState::Completed => {
                let used = self.initial_duration - self.remaining;
                self.segment_started_at = Some(shift_back(now, used));
                self.state = TimerState::Running;
                debug!(timer_id = %self.id, remaining = self.remaining, "timer started");
                Ok(Some(Event::TimerStarted {
                    timer_id: self.id.clone(),
                    remaining_secs: self.remaining,
                    at: now,
                }))
            }
        }
    }

    /// Close the current segment, fixing `remaining` at its value for `now`.
    ///
    /// If the segment already ran out, this completes the timer instead.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.state != TimerState::Running {
            return None;
        }
        if let Some(done) = self.poll(now) {
            return Some(done);
        }
        self.segment_started_at = None;
        self.state = TimerState::Paused;
        debug!(timer_id = %self.id, remaining = self.remaining, "timer paused");
        Some(Event::TimerPaused {
            timer_id: self.id.clone(),
            remaining_secs: self.remaining,
            at: now,
        })
    }

    pub fn reset(&mut self, now: DateTime<Utc>) -> Event {
        self.state = TimerState::Idle;
        self.remaining = self.initial_duration;
        self.segment_started_at = None;
        debug!(timer_id = %self.id, "timer reset");
        Event::TimerReset {
            timer_id: self.id.clone(),
            duration_secs: self.initial_duration,
            at: now,
        }
    }

    /// Call on every frame. Returns `Some(Event::TimerCompleted)` exactly once
    /// per run that reaches zero.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.state != TimerState::Running {
            return None;
        }
        self.remaining = self.remaining_at(now);
        if self.remaining > 0.0 {
            return None;
        }
        self.remaining = 0.0;
        self.state = TimerState::Completed;
        self.segment_started_at = None;
        debug!(timer_id = %self.id, "timer completed");
        Some(Event::TimerCompleted {
            timer_id: self.id.clone(),
            at: now,
        })
    }

    /// Extend the countdown by `secs` in any state.
    ///
    /// A completed timer becomes paused with the added time left on it.
    ///
    /// # Errors
    /// Rejects a non-positive amount, or one that would push the duration
    /// past [`MAX_DURATION_SECS`].
    pub fn add_time(&mut self, secs: f64, now: DateTime<Utc>) -> Result<Event, ValidationError> {
        if !secs.is_finite() || secs <= 0.0 {
            return Err(ValidationError::NonPositiveDuration { value: secs });
        }
        if self.initial_duration + secs > MAX_DURATION_SECS {
            return Err(ValidationError::DurationTooLong {
                value: self.initial_duration + secs,
                max: MAX_DURATION_SECS,
            });
        }
        self.initial_duration += secs;
        match self.state {
            // The segment start is anchored to the old duration, so growing
            // the duration grows the remaining time by the same amount.
            TimerState::Running => self.remaining = self.remaining_at(now),
            TimerState::Completed => {
                self.remaining = secs;
                self.state = TimerState::Paused;
            }
            TimerState::Idle | TimerState::Paused => self.remaining += secs,
        }
        Ok(Event::TimeAdded {
            timer_id: self.id.clone(),
            added_secs: secs,
            remaining_secs: self.remaining,
            at: now,
        })
    }

    pub fn set_show_decimals(&mut self, show: bool) {
        self.show_decimals = show;
    }

    pub fn set_alarm_enabled(&mut self, enabled: bool) {
        self.alarm_enabled = enabled;
    }
}

fn sanitize_secs(secs: f64) -> f64 {
    if secs.is_finite() {
        secs.clamp(0.0, MAX_DURATION_SECS)
    } else {
        0.0
    }
}
