//! Timer card controller.
//!
//! Binds one [`TimerEngine`] to one [`GestureInterpreter`] and to the
//! collaborators it needs (clock, persistence, alarm). Parents drive a card
//! either through gestures or through the imperative `start`/`pause`/`reset`
//! surface; both paths share the same transitions.
//!
//! Every transition stages a full snapshot of the engine under
//! `timerState_<id>`; completion rings the alarm when the timer allows it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::collaborators::Alarm;
use crate::error::CoreError;
use crate::events::Event;
use crate::gesture::{GestureAction, GestureConfig, GestureInterpreter, PointerEvent};
use crate::storage::{timer_key, Persistence};
use crate::timer::{TimerEngine, TimerState};

/// Collaborators shared by every card of a deck.
#[derive(Clone)]
pub struct CardContext {
    pub clock: Arc<dyn Clock>,
    pub persistence: Arc<Persistence>,
    pub alarm: Arc<dyn Alarm>,
    pub gesture: GestureConfig,
}

/// Configuration request surfaced to the editor, and its confirmed answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    pub name: String,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub show_decimals: bool,
    #[serde(default = "default_true")]
    pub alarm_enabled: bool,
}

fn default_true() -> bool {
    true
}

impl EditRequest {
    pub fn total_secs(&self) -> f64 {
        f64::from(self.hours) * 3600.0 + f64::from(self.minutes) * 60.0 + f64::from(self.seconds)
    }
}

/// What a card asks of its host after handling input.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum CardEffect {
    /// Nothing happened (ambiguous gesture, no-op command).
    None,
    Event(Event),
    /// The owner should remove this card.
    RemoveRequested { timer_id: String },
    /// The host should show the editor; confirm with [`TimerCard::configure`].
    EditRequested(EditRequest),
}

pub struct TimerCard {
    engine: TimerEngine,
    gesture: GestureInterpreter,
    ctx: CardContext,
}

impl TimerCard {
    /// Wrap `engine` and stage its initial record.
    pub fn create(engine: TimerEngine, ctx: CardContext) -> Self {
        let card = Self::restore(engine, ctx);
        card.persist();
        card
    }

    /// Wrap an engine loaded from storage without re-writing it.
    pub fn restore(engine: TimerEngine, ctx: CardContext) -> Self {
        Self {
            gesture: GestureInterpreter::new(ctx.gesture.clone()),
            engine,
            ctx,
        }
    }

    pub fn id(&self) -> &str {
        self.engine.id()
    }

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn gesture(&self) -> &GestureInterpreter {
        &self.gesture
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.ctx.clock.now()
    }

    pub fn snapshot(&self) -> Event {
        self.engine.snapshot(self.now())
    }

    // ── Imperative surface ───────────────────────────────────────────

    pub fn start(&mut self) -> Result<Option<Event>, CoreError> {
        let now = self.now();
        let event = self.engine.start(now)?;
        Ok(self.record(event))
    }

    pub fn pause(&mut self) -> Option<Event> {
        let now = self.now();
        let event = self.engine.pause(now);
        self.record(event)
    }

    pub fn reset(&mut self) -> Event {
        let now = self.now();
        let event = self.engine.reset(now);
        self.persist();
        event
    }

    /// Start when idle or paused, pause when running. A completed timer is
    /// re-armed to idle.
    pub fn toggle(&mut self) -> Result<Option<Event>, CoreError> {
        match self.engine.state() {
            TimerState::Idle | TimerState::Paused => self.start(),
            TimerState::Running => Ok(self.pause()),
            TimerState::Completed => Ok(Some(self.reset())),
        }
    }

    /// Apply a confirmed edit.
    ///
    /// # Errors
    /// Validation failures leave the card untouched.
    pub fn configure(&mut self, edit: &EditRequest) -> Result<Event, CoreError> {
        let now = self.now();
        let event = self.engine.configure(edit.total_secs(), &edit.name, now)?;
        self.engine.set_show_decimals(edit.show_decimals);
        self.engine.set_alarm_enabled(edit.alarm_enabled);
        self.persist();
        Ok(event)
    }

    pub fn add_time(&mut self, secs: f64) -> Result<Event, CoreError> {
        let now = self.now();
        let event = self.engine.add_time(secs, now)?;
        self.persist();
        Ok(event)
    }

    /// Current settings in editor form.
    pub fn edit_request(&self) -> EditRequest {
        let total = self.engine.initial_duration().round().max(0.0) as u64;
        EditRequest {
            name: self.engine.name().to_string(),
            hours: (total / 3600) as u32,
            minutes: ((total % 3600) / 60) as u32,
            seconds: (total % 60) as u32,
            show_decimals: self.engine.show_decimals(),
            alarm_enabled: self.engine.alarm_enabled(),
        }
    }

    // ── Gesture surface ──────────────────────────────────────────────

    pub fn handle_pointer(&mut self, event: PointerEvent) -> Result<CardEffect, CoreError> {
        match self.gesture.handle(event) {
            Some(action) => self.apply(action),
            None => Ok(CardEffect::None),
        }
    }

    /// Carry out a committed gesture action.
    pub fn apply(&mut self, action: GestureAction) -> Result<CardEffect, CoreError> {
        debug!(timer_id = %self.id(), ?action, "applying gesture action");
        let effect = match action {
            GestureAction::Toggle => self.toggle()?.map_or(CardEffect::None, CardEffect::Event),
            GestureAction::Reset => CardEffect::Event(self.reset()),
            GestureAction::Delete => CardEffect::RemoveRequested {
                timer_id: self.id().to_string(),
            },
            GestureAction::OpenEditor => CardEffect::EditRequested(self.edit_request()),
        };
        Ok(effect)
    }

    /// One frame: advance the countdown and check the long-press deadline.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Vec<CardEffect> {
        let mut effects = Vec::new();
        if let Some(event) = self.engine.poll(now) {
            if let Some(event) = self.record(Some(event)) {
                effects.push(CardEffect::Event(event));
            }
        }
        if let Some(action) = self.gesture.poll(now) {
            match self.apply(action) {
                Ok(CardEffect::None) => {}
                Ok(effect) => effects.push(effect),
                Err(e) => debug!(timer_id = %self.id(), error = %e, "gesture action ignored"),
            }
        }
        effects
    }

    /// Remove this card's record from storage.
    pub fn forget(&self) {
        self.ctx.persistence.stage_remove(&timer_key(self.id()));
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn record(&self, event: Option<Event>) -> Option<Event> {
        let event = event?;
        self.persist();
        if event.is_completion() && self.engine.alarm_enabled() {
            if let Err(e) = self.ctx.alarm.ring() {
                warn!(timer_id = %self.id(), error = %e, "alarm failed");
            }
        }
        Some(event)
    }

    fn persist(&self) {
        self.ctx
            .persistence
            .stage(&timer_key(self.id()), &self.engine);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::collaborators::{AlarmError, LogNotifier};
    use crate::storage::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    pub(crate) struct CountingAlarm(pub AtomicUsize);

    impl Alarm for CountingAlarm {
        fn ring(&self) -> Result<(), AlarmError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    pub(crate) struct Harness {
        pub clock: ManualClock,
        pub store: MemoryStore,
        pub alarm: Arc<CountingAlarm>,
        pub ctx: CardContext,
    }

    pub(crate) fn harness() -> Harness {
        let clock = ManualClock::at_epoch();
        let store = MemoryStore::new();
        let alarm = Arc::new(CountingAlarm::default());
        let ctx = CardContext {
            clock: Arc::new(clock.clone()),
            persistence: Persistence::new(Box::new(store.clone()), Arc::new(LogNotifier)),
            alarm: alarm.clone(),
            gesture: GestureConfig::default(),
        };
        Harness {
            clock,
            store,
            alarm,
            ctx,
        }
    }

    fn card(h: &Harness, secs: f64) -> TimerCard {
        TimerCard::create(TimerEngine::new("t1", "Tea", secs), h.ctx.clone())
    }

    fn ms(n: i64) -> chrono::Duration {
        chrono::Duration::milliseconds(n)
    }

    #[test]
    fn create_stages_record() {
        let h = harness();
        let _card = card(&h, 60.0);
        h.ctx.persistence.flush();
        assert!(h.store.contains("timerState_t1"));
    }

    #[test]
    fn tap_toggles_running_state() {
        let h = harness();
        let mut card = card(&h, 60.0);
        let t0 = h.clock.now();
        card.handle_pointer(PointerEvent::Down { x: 0.0, y: 0.0, at: t0 })
            .unwrap();
        let effect = card
            .handle_pointer(PointerEvent::Up { at: t0 + ms(120) })
            .unwrap();
        assert!(matches!(effect, CardEffect::Event(Event::TimerStarted { .. })));
        assert_eq!(card.engine().state(), TimerState::Running);
    }

    #[test]
    fn long_press_requests_editor_with_current_settings() {
        let h = harness();
        let mut card = card(&h, 3725.0);
        let t0 = h.clock.now();
        card.handle_pointer(PointerEvent::Down { x: 0.0, y: 0.0, at: t0 })
            .unwrap();
        let effects = card.poll(t0 + ms(800));
        let [CardEffect::EditRequested(edit)] = effects.as_slice() else {
            panic!("expected editor request, got {effects:?}");
        };
        assert_eq!((edit.hours, edit.minutes, edit.seconds), (1, 2, 5));
        assert_eq!(edit.name, "Tea");
    }

    #[test]
    fn swipe_left_requests_removal() {
        let h = harness();
        let mut card = card(&h, 60.0);
        let t0 = h.clock.now();
        card.handle_pointer(PointerEvent::Down { x: 0.0, y: 0.0, at: t0 })
            .unwrap();
        card.handle_pointer(PointerEvent::Move { x: -150.0, y: 0.0, at: t0 + ms(50) })
            .unwrap();
        let effect = card
            .handle_pointer(PointerEvent::Up { at: t0 + ms(100) })
            .unwrap();
        assert_eq!(
            effect,
            CardEffect::RemoveRequested {
                timer_id: "t1".into()
            }
        );
    }

    #[test]
    fn completion_rings_alarm_once() {
        let h = harness();
        let mut card = card(&h, 1.0);
        card.start().unwrap();
        h.clock.advance(ms(1500));
        let first = card.poll(h.clock.now());
        let second = card.poll(h.clock.now());
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        assert_eq!(h.alarm.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn disabled_alarm_stays_silent() {
        let h = harness();
        let mut card = card(&h, 1.0);
        let mut edit = card.edit_request();
        edit.alarm_enabled = false;
        card.configure(&edit).unwrap();
        card.start().unwrap();
        h.clock.advance(ms(2000));
        card.poll(h.clock.now());
        assert_eq!(card.engine().state(), TimerState::Completed);
        assert_eq!(h.alarm.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn toggle_rearms_completed_timer() {
        let h = harness();
        let mut card = card(&h, 1.0);
        card.start().unwrap();
        h.clock.advance(ms(1000));
        card.poll(h.clock.now());
        let event = card.toggle().unwrap();
        assert!(matches!(event, Some(Event::TimerReset { .. })));
        assert_eq!(card.engine().state(), TimerState::Idle);
        assert_eq!(card.engine().remaining(), 1.0);
    }

    #[test]
    fn rejected_edit_leaves_card_untouched() {
        let h = harness();
        let mut card = card(&h, 60.0);
        let edit = EditRequest {
            name: "Zero".into(),
            hours: 0,
            minutes: 0,
            seconds: 0,
            show_decimals: true,
            alarm_enabled: true,
        };
        assert!(card.configure(&edit).is_err());
        assert_eq!(card.engine().name(), "Tea");
        assert!(!card.engine().show_decimals());
    }
}
