use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::TimerState;

/// Every state change in the system produces an Event.
/// The host renders them; the CLI prints them as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        timer_id: String,
        remaining_secs: f64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        timer_id: String,
        remaining_secs: f64,
        at: DateTime<Utc>,
    },
    TimerReset {
        timer_id: String,
        duration_secs: f64,
        at: DateTime<Utc>,
    },
    TimerConfigured {
        timer_id: String,
        name: String,
        duration_secs: f64,
        at: DateTime<Utc>,
    },
    /// Remaining time reached zero while running. Emitted once per run.
    TimerCompleted {
        timer_id: String,
        at: DateTime<Utc>,
    },
    TimeAdded {
        timer_id: String,
        added_secs: f64,
        remaining_secs: f64,
        at: DateTime<Utc>,
    },
    TimerAdded {
        group_id: String,
        timer_id: String,
        at: DateTime<Utc>,
    },
    TimerRemoved {
        group_id: String,
        timer_id: String,
        at: DateTime<Utc>,
    },
    GroupCreated {
        group_id: String,
        name: String,
        at: DateTime<Utc>,
    },
    GroupRenamed {
        group_id: String,
        name: String,
        at: DateTime<Utc>,
    },
    GroupDeleted {
        group_id: String,
        timers_removed: usize,
        at: DateTime<Utc>,
    },
    DeckCleared {
        at: DateTime<Utc>,
    },
    StateSnapshot {
        timer_id: String,
        name: String,
        state: TimerState,
        remaining_secs: f64,
        duration_secs: f64,
        display: String,
        progress: f64,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn is_completion(&self) -> bool {
        matches!(self, Event::TimerCompleted { .. })
    }
}
