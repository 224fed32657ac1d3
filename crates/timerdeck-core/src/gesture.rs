//! Gesture interpretation for one timer card's touch surface.
//!
//! A gesture session runs from pointer-down to pointer-up (or cancel) and
//! commits at most one [`GestureAction`]:
//!
//! - **Tap** (released before the long-press deadline, never dragged) -> `Toggle`
//! - **Long press** (deadline passes while still pressing) -> `OpenEditor`,
//!   emitted from `poll()` the moment the deadline is seen
//! - **Swipe** (dragged, released past the commit threshold) -> `Delete`
//!   (left) or `Reset` (right)
//!
//! Like the timer engine, the interpreter has no internal timers: the long
//! press is a deadline checked by `poll(now)`, and cancelling it is clearing
//! the deadline.
//!
//! ## Priority
//!
//! Dragging suppresses `Toggle`. A fired long press suppresses everything
//! else for the rest of the session.
//!
//! ## Tap window
//!
//! A release counts as a tap only when it happens strictly before the
//! long-press deadline. A release at or after the deadline whose long press
//! was never polled emits nothing.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Thresholds for one interpreter. Distances are in logical units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureConfig {
    #[serde(default = "default_long_press_ms")]
    pub long_press_ms: u64,
    /// Horizontal displacement beyond which a press becomes a drag.
    #[serde(default = "default_move_threshold")]
    pub move_threshold: f64,
    /// Visual offset is clamped to `±max_offset`.
    #[serde(default = "default_max_offset")]
    pub max_offset: f64,
    /// Release displacement beyond which a drag commits to Delete/Reset.
    #[serde(default = "default_commit_threshold")]
    pub commit_threshold: f64,
}

fn default_long_press_ms() -> u64 {
    800
}
fn default_move_threshold() -> f64 {
    5.0
}
fn default_max_offset() -> f64 {
    80.0
}
fn default_commit_threshold() -> f64 {
    100.0
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            long_press_ms: default_long_press_ms(),
            move_threshold: default_move_threshold(),
            max_offset: default_max_offset(),
            commit_threshold: default_commit_threshold(),
        }
    }
}

impl GestureConfig {
    pub fn long_press(&self) -> Duration {
        Duration::milliseconds(self.long_press_ms as i64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureAction {
    Toggle,
    OpenEditor,
    Delete,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GesturePhase {
    #[default]
    Idle,
    Pressing,
    Dragging,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One raw pointer event as delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointerEvent {
    Down { x: f64, y: f64, at: DateTime<Utc> },
    Move { x: f64, y: f64, at: DateTime<Utc> },
    Up { at: DateTime<Utc> },
    Cancel { at: DateTime<Utc> },
}

impl PointerEvent {
    pub fn at(&self) -> DateTime<Utc> {
        match *self {
            PointerEvent::Down { at, .. }
            | PointerEvent::Move { at, .. }
            | PointerEvent::Up { at }
            | PointerEvent::Cancel { at } => at,
        }
    }

    /// The same event moved in time by `by`.
    pub fn shifted(self, by: Duration) -> Self {
        match self {
            PointerEvent::Down { x, y, at } => PointerEvent::Down { x, y, at: at + by },
            PointerEvent::Move { x, y, at } => PointerEvent::Move { x, y, at: at + by },
            PointerEvent::Up { at } => PointerEvent::Up { at: at + by },
            PointerEvent::Cancel { at } => PointerEvent::Cancel { at: at + by },
        }
    }
}

/// Transient state between pointer-down and pointer-up.
#[derive(Debug, Clone, PartialEq)]
struct GestureSession {
    started_at: DateTime<Utc>,
    start: Point,
    /// Unclamped horizontal displacement, used for the commit decision.
    dx: f64,
    /// Clamped horizontal displacement, exposed for visual feedback.
    offset: f64,
    committed_as_drag: bool,
    /// Pending long press; `None` once cancelled or fired.
    long_press_deadline: Option<DateTime<Utc>>,
    long_press_fired: bool,
}

#[derive(Debug, Clone, Default)]
pub struct GestureInterpreter {
    config: GestureConfig,
    session: Option<GestureSession>,
}

impl GestureInterpreter {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn phase(&self) -> GesturePhase {
        match &self.session {
            None => GesturePhase::Idle,
            Some(s) if s.committed_as_drag => GesturePhase::Dragging,
            Some(_) => GesturePhase::Pressing,
        }
    }

    /// Current clamped horizontal offset (0 when idle).
    pub fn offset(&self) -> f64 {
        self.session.as_ref().map(|s| s.offset).unwrap_or(0.0)
    }

    pub fn long_press_pending(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.long_press_deadline.is_some())
    }

    /// Feed one raw event. Returns the committed action, if any.
    pub fn handle(&mut self, event: PointerEvent) -> Option<GestureAction> {
        match event {
            PointerEvent::Down { x, y, at } => {
                self.pointer_down(Point::new(x, y), at);
                None
            }
            PointerEvent::Move { x, y, at } => self.pointer_move(Point::new(x, y), at),
            PointerEvent::Up { at } => self.pointer_up(at),
            PointerEvent::Cancel { at } => self.pointer_cancel(at),
        }
    }

    /// Open a session and arm the long press. A session still open from a
    /// lost pointer-up is discarded without an action.
    pub fn pointer_down(&mut self, at_point: Point, at: DateTime<Utc>) {
        if self.session.is_some() {
            debug!("pointer down over an open session; discarding it");
        }
        self.session = Some(GestureSession {
            started_at: at,
            start: at_point,
            dx: 0.0,
            offset: 0.0,
            committed_as_drag: false,
            long_press_deadline: Some(at + self.config.long_press()),
            long_press_fired: false,
        });
    }

    /// Track movement. A long press whose deadline already passed fires
    /// before the movement is applied.
    pub fn pointer_move(&mut self, point: Point, at: DateTime<Utc>) -> Option<GestureAction> {
        let fired = self.poll(at);
        let config = &self.config;
        let session = self.session.as_mut()?;
        session.dx = point.x - session.start.x;
        if !session.committed_as_drag && session.dx.abs() > config.move_threshold {
            session.committed_as_drag = true;
            session.long_press_deadline = None;
            debug!(dx = session.dx, "gesture committed as drag");
        }
        if session.committed_as_drag {
            session.offset = session.dx.clamp(-config.max_offset, config.max_offset);
        }
        fired
    }

    /// Fire the long press if its deadline has passed.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Option<GestureAction> {
        let session = self.session.as_mut()?;
        let deadline = session.long_press_deadline?;
        if now < deadline {
            return None;
        }
        session.long_press_deadline = None;
        session.long_press_fired = true;
        debug!("long press fired");
        Some(GestureAction::OpenEditor)
    }

    /// Close the session and resolve it.
    pub fn pointer_up(&mut self, at: DateTime<Utc>) -> Option<GestureAction> {
        let session = self.session.take()?;
        let action = if session.long_press_fired {
            None
        } else if session.committed_as_drag {
            self.resolve_swipe(session.dx)
        } else {
            self.resolve_tap(&session, at)
        };
        debug!(?action, "gesture resolved");
        action
    }

    /// Abort the session. Only the tap rule can still apply: a cancelled
    /// gesture never deletes or resets, and a dragged one never toggles.
    pub fn pointer_cancel(&mut self, at: DateTime<Utc>) -> Option<GestureAction> {
        let session = self.session.take()?;
        if session.long_press_fired || session.committed_as_drag {
            return None;
        }
        self.resolve_tap(&session, at)
    }

    fn resolve_tap(&self, session: &GestureSession, at: DateTime<Utc>) -> Option<GestureAction> {
        let held = at - session.started_at;
        (held < self.config.long_press()).then_some(GestureAction::Toggle)
    }

    fn resolve_swipe(&self, dx: f64) -> Option<GestureAction> {
        if dx < -self.config.commit_threshold {
            Some(GestureAction::Delete)
        } else if dx > self.config.commit_threshold {
            Some(GestureAction::Reset)
        } else {
            None
        }
    }
}
